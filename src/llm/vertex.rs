//! Managed API backend: Anthropic Claude models on Vertex AI, via the
//! vendored `rig-anthropic-vertex` crate. Wraps rig-core's `CompletionModel`
//! trait and normalizes its request/response shapes into the adaptor's
//! internal `LlmResult`.

use async_trait::async_trait;
use rig::completion::{AssistantContent, CompletionModel as RigCompletionModel, CompletionRequest};

use crate::error::ProviderError;
use crate::history::Message;

use super::rig_support::{non_empty_history, system_preamble, to_rig_messages, to_rig_tools};
use super::{strip_think_tags, GenerateOptions, LlmProvider, LlmResult, ToolCallRequest};

pub struct AnthropicVertexProvider {
    model: rig_anthropic_vertex::CompletionModel,
}

impl AnthropicVertexProvider {
    pub fn new(model: rig_anthropic_vertex::CompletionModel) -> Self {
        Self { model }
    }

    pub async fn from_service_account(
        credentials_path: &str,
        project_id: &str,
        location: &str,
        model_id: &str,
    ) -> Result<Self, ProviderError> {
        let client = rig_anthropic_vertex::Client::from_service_account(credentials_path, project_id, location)
            .await
            .map_err(|e| ProviderError::Unavailable(e.to_string()))?;
        Ok(Self::new(client.completion_model(model_id)))
    }
}

#[async_trait]
impl LlmProvider for AnthropicVertexProvider {
    fn name(&self) -> &str {
        "anthropic_vertex"
    }

    async fn generate(&self, messages: &[Message], opts: &GenerateOptions) -> Result<LlmResult, ProviderError> {
        let chat_history = non_empty_history(to_rig_messages(messages));

        let request = CompletionRequest {
            preamble: system_preamble(messages),
            chat_history,
            documents: vec![],
            tools: opts.tools.as_deref().map(to_rig_tools).unwrap_or_default(),
            temperature: Some(opts.temperature as f64),
            max_tokens: Some(opts.max_output_tokens as u64),
            tool_choice: None,
            additional_params: None,
        };

        let response = self
            .model
            .completion(request)
            .await
            .map_err(|e| ProviderError::Unavailable(e.to_string()))?;

        let mut raw_text = String::new();
        let mut tool_calls = Vec::new();
        for content in response.choice.iter() {
            match content {
                AssistantContent::Text(text) => raw_text.push_str(&text.text),
                AssistantContent::ToolCall(call) => {
                    tool_calls.push(ToolCallRequest {
                        call_id: call.id.clone(),
                        name: call.function.name.clone(),
                        arguments: call.function.arguments.clone(),
                    });
                }
                _ => {}
            }
        }

        // Normalization is unconditional: `disable_thinking` is a request to
        // the provider, not a toggle for the adaptor's think-tag stripping.
        let (text, think_tokens, think_detected) = strip_think_tags(&raw_text);

        Ok(LlmResult {
            raw_chars: raw_text.chars().count(),
            text,
            tool_calls,
            prompt_tokens: response.usage.input_tokens as u32,
            output_tokens: response.usage.output_tokens as u32,
            think_tokens,
            think_detected: think_detected.map(str::to_string),
        })
    }
}

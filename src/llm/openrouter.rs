//! Managed API backend: OpenRouter, via rig-core's native OpenRouter
//! completion client (supports tool calling and system prompts, unlike the
//! legacy vtcode-core OpenAI path the teacher also carries).

use async_trait::async_trait;
use rig::client::CompletionClient;
use rig::completion::{AssistantContent, CompletionModel as RigCompletionModel, CompletionRequest};
use rig::providers::openrouter as rig_openrouter;

use crate::error::ProviderError;
use crate::history::Message;

use super::rig_support::{non_empty_history, system_preamble, to_rig_messages, to_rig_tools};
use super::{strip_think_tags, GenerateOptions, LlmProvider, LlmResult, ToolCallRequest};

pub struct OpenRouterProvider {
    model: rig_openrouter::CompletionModel,
}

impl OpenRouterProvider {
    pub fn new(api_key: &str, model_id: &str) -> Self {
        let client = rig_openrouter::Client::new(api_key);
        Self {
            model: client.completion_model(model_id),
        }
    }
}

#[async_trait]
impl LlmProvider for OpenRouterProvider {
    fn name(&self) -> &str {
        "openrouter"
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

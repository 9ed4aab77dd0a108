//! LLM Adaptor (C1): unifies multiple chat-completion providers behind one
//! request/response shape and normalizes tool-call formats.

mod local;
mod openrouter;
mod rig_support;
mod think_strip;
mod vertex;

pub use local::LocalProvider;
pub use openrouter::OpenRouterProvider;
pub use think_strip::strip_think_tags;
pub use vertex::AnthropicVertexProvider;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::ProviderError;
use crate::history::Message;
use crate::tools::ToolSchema;

#[derive(Debug, Clone, Default)]
pub struct GenerateOptions {
    /// Tool schemas offered to the provider. `None` means tools are not
    /// offered at all this turn (e.g. the Orchestrator's final iteration).
    pub tools: Option<Vec<ToolSchema>>,
    pub temperature: f32,
    pub max_output_tokens: u32,
    /// When true, ask the provider to suppress extended-thinking/reasoning
    /// output (workflow steps always set this).
    pub disable_thinking: bool,
}

impl GenerateOptions {
    pub fn new() -> Self {
        Self {
            tools: None,
            temperature: 0.7,
            max_output_tokens: 2048,
            disable_thinking: false,
        }
    }

    pub fn with_tools(mut self, tools: Vec<ToolSchema>) -> Self {
        self.tools = Some(tools);
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_output_tokens(mut self, max_output_tokens: u32) -> Self {
        self.max_output_tokens = max_output_tokens;
        self
    }

    pub fn disable_thinking(mut self) -> Self {
        self.disable_thinking = true;
        self
    }
}

#[derive(Debug, Clone)]
pub struct ToolCallRequest {
    pub call_id: String,
    pub name: String,
    pub arguments: serde_json::Value,
}

#[derive(Debug, Clone, Default)]
pub struct LlmResult {
    pub text: String,
    pub tool_calls: Vec<ToolCallRequest>,
    pub prompt_tokens: u32,
    pub output_tokens: u32,
    pub raw_chars: usize,
    pub think_tokens: usize,
    /// Tag name that was stripped, if any (for `workflow_debug.think_detected`).
    pub think_detected: Option<String>,
}

/// Tags recognized by the think-strip pipeline (§4.1 rule set).
pub const RECOGNIZED_THINK_TAGS: &[&str] = &["think", "reflection", "reasoning"];

/// Unified provider interface (C1's `generate(messages, options) → Result`).
#[async_trait]
pub trait LlmProvider: Send + Sync {
    fn name(&self) -> &str;

    async fn generate(
        &self,
        messages: &[Message],
        opts: &GenerateOptions,
    ) -> Result<LlmResult, ProviderError>;
}

/// Process-wide, immutable-after-startup mapping from provider name to
/// implementation, wired from environment credentials at startup (§4.1).
#[derive(Clone, Default)]
pub struct ProviderRegistry {
    providers: HashMap<String, Arc<dyn LlmProvider>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, provider: Arc<dyn LlmProvider>) {
        self.providers.insert(provider.name().to_string(), provider);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn LlmProvider>> {
        self.providers.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.providers.contains_key(name)
    }
}

/// Applies the normalization contract's text-tool-call fallback: scans each
/// line of `text` for `<tool_name> <json-object>` where `tool_name` is
/// registered. Only produced when the name is live in the registry (P7).
pub fn parse_text_tool_call_fallback(
    text: &str,
    is_registered: impl Fn(&str) -> bool,
) -> Option<ToolCallRequest> {
    for line in text.lines() {
        let line = line.trim();
        let Some(space_idx) = line.find(char::is_whitespace) else {
            continue;
        };
        let (name, rest) = line.split_at(space_idx);
        let rest = rest.trim();
        if name.is_empty() || !is_registered(name) {
            continue;
        }
        if let Ok(value) = serde_json::from_str::<serde_json::Value>(rest) {
            if value.is_object() {
                return Some(ToolCallRequest {
                    call_id: format!("fallback-{}", Uuid::new_v4()),
                    name: name.to_string(),
                    arguments: value,
                });
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fallback_only_fires_for_registered_tools() {
        let result = parse_text_tool_call_fallback(
            "web_search {\"query\": \"weather in paris\"}",
            |name| name == "web_search",
        );
        assert!(result.is_some());
        let result = result.unwrap();
        assert_eq!(result.name, "web_search");
        assert_eq!(result.arguments["query"], "weather in paris");
    }

    #[test]
    fn fallback_ignores_unregistered_names() {
        let result = parse_text_tool_call_fallback(
            "delete_everything {\"confirm\": true}",
            |name| name == "web_search",
        );
        assert!(result.is_none());
    }

    #[test]
    fn fallback_ignores_non_object_json() {
        let result = parse_text_tool_call_fallback("web_search [1, 2, 3]", |name| name == "web_search");
        assert!(result.is_none());
    }

    #[test]
    fn fallback_scans_across_lines() {
        let text = "Let me check that.\nweb_search {\"query\": \"rust async\"}\nThanks.";
        let result = parse_text_tool_call_fallback(text, |name| name == "web_search");
        assert!(result.is_some());
    }
}

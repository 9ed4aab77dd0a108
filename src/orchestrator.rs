//! Orchestrator (C5): the "simple" path. A bounded multi-iteration
//! tool-calling loop with hedging detection, text-tool-call fallback, and
//! think-block stripping. Grounded on `ai/agentic_loop.rs::run_agentic_loop`,
//! stripped of HITL approval, sub-agents, PTY, and the indexer — none of
//! which this core has any use for.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::error::{CoreError, ProviderError};
use crate::history::{HistoryManager, Message, PendingToolCall, ProviderFlavor};
use crate::llm::{parse_text_tool_call_fallback, GenerateOptions, LlmProvider};
use crate::tools::ToolRegistry;

/// Hedging vocabulary (§9 redesign note): a bounded set of normalized
/// lowercase substrings, stored pre-normalized (no punctuation) since
/// `is_hedging` matches them against `normalize()`'s output.
const HEDGING_PHRASES: &[&str] = &[
    "i dont have realtime information",
    "i dont have real time information",
    "i dont have access to realtime",
    "i dont have access to current",
    "i dont have uptodate information",
    "i dont have up to date information",
    "i cannot browse the internet",
    "i cant browse the internet",
    "i am not able to access the internet",
    "let me look that up",
    "i do not have the ability to access realtime",
    "as an ai i dont have access to live data",
];

fn normalize(text: &str) -> String {
    let lowered = text.to_lowercase();
    let mut out = String::with_capacity(lowered.len());
    let mut last_was_space = false;
    for ch in lowered.chars() {
        if ch.is_ascii_punctuation() {
            continue;
        }
        if ch.is_whitespace() {
            if !last_was_space {
                out.push(' ');
            }
            last_was_space = true;
        } else {
            out.push(ch);
            last_was_space = false;
        }
    }
    out.trim().to_string()
}

fn is_hedging(text: &str) -> bool {
    let normalized = normalize(text);
    HEDGING_PHRASES.iter().any(|phrase| normalized.contains(phrase))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusPhase {
    Thinking,
    Searching,
    Tool(String),
}

impl StatusPhase {
    pub fn as_str(&self) -> String {
        match self {
            StatusPhase::Thinking => "thinking".to_string(),
            StatusPhase::Searching => "searching".to_string(),
            StatusPhase::Tool(name) => format!("tool:{name}"),
        }
    }
}

/// Best-effort callbacks (§4.5): `on_status` fires with a coarse phase;
/// `on_tool_call` fires before dispatch. Exceptions from these callbacks are
/// not propagated by the orchestrator (there's nothing to catch in Rust —
/// they simply cannot fail, being plain closures); the analogous "log and
/// swallow" policy applies to dispatch errors instead.
pub struct OrchestratorCallbacks<'a> {
    pub on_status: Box<dyn Fn(StatusPhase) + Send + Sync + 'a>,
    pub on_tool_call: Box<dyn Fn(&str, &serde_json::Value) + Send + Sync + 'a>,
}

impl<'a> Default for OrchestratorCallbacks<'a> {
    fn default() -> Self {
        Self {
            on_status: Box::new(|_| {}),
            on_tool_call: Box::new(|_, _| {}),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ChatOutcome {
    pub final_text: String,
    /// Set when a `ProviderUnavailable` occurred after iteration 1 and a
    /// tentative final was returned instead of propagating the error.
    pub degraded: bool,
}

pub struct Orchestrator {
    provider: Arc<dyn LlmProvider>,
    tools: Arc<ToolRegistry>,
    max_iterations: usize,
    history_group_budget: usize,
}

impl Orchestrator {
    pub fn new(provider: Arc<dyn LlmProvider>, tools: Arc<ToolRegistry>, max_iterations: usize, history_group_budget: usize) -> Self {
        Self {
            provider,
            tools,
            max_iterations: max_iterations.max(1),
            history_group_budget,
        }
    }

    pub async fn chat(
        &self,
        utterance: &str,
        history: &mut HistoryManager,
        callbacks: &OrchestratorCallbacks<'_>,
    ) -> Result<ChatOutcome, CoreError> {
        history.append(Message::user(utterance));

        let mut tentative_final = String::new();
        let mut degraded = false;
        let mut searched_this_exchange = false;

        let mut i = 1;
        'outer: while i <= self.max_iterations {
            (callbacks.on_status)(StatusPhase::Thinking);

            let messages = history.to_messages(ProviderFlavor::SplitToolMessages);
            let offer_tools = i < self.max_iterations;
            let mut opts = GenerateOptions::new();
            if offer_tools {
                opts = opts.with_tools(self.tools.list_schemas());
            }

            let result = match self.provider.generate(&messages, &opts).await {
                Ok(r) => r,
                Err(ProviderError::Unavailable(msg)) => {
                    if i == 1 {
                        return Err(CoreError::Provider(ProviderError::Unavailable(msg)));
                    }
                    warn!("provider unavailable at iteration {i}, returning degraded tentative final: {msg}");
                    degraded = true;
                    break 'outer;
                }
                Err(other) => return Err(CoreError::Provider(other)),
            };

            if !result.tool_calls.is_empty() {
                let assistant_calls: Vec<PendingToolCall> = result
                    .tool_calls
                    .iter()
                    .map(|tc| PendingToolCall {
                        call_id: tc.call_id.clone(),
                        name: tc.name.clone(),
                        arguments: tc.arguments.clone(),
                    })
                    .collect();
                history.append(Message::assistant_with_tool_calls(result.text.clone(), assistant_calls));

                for call in &result.tool_calls {
                    if call.name == "web_search" {
                        searched_this_exchange = true;
                    }
                    (callbacks.on_status)(StatusPhase::Tool(call.name.clone()));
                    (callbacks.on_tool_call)(&call.name, &call.arguments);
                    let (text, is_error) = match self.tools.dispatch(&call.name, call.arguments.clone()).await {
                        Ok(text) => (text, false),
                        Err(e) => (e.to_string(), true),
                    };
                    history.append(Message::tool_result(call.call_id.clone(), text, is_error));
                }
                i += 1;
                continue;
            }

            // No structured tool calls. Try the text-tool-call fallback if
            // iterations remain.
            if i < self.max_iterations {
                if let Some(fallback) = parse_text_tool_call_fallback(&result.text, |name| self.tools.contains(name)) {
                    debug!("text-tool-call fallback synthesized a call to {}", fallback.name);
                    let pending = PendingToolCall {
                        call_id: fallback.call_id.clone(),
                        name: fallback.name.clone(),
                        arguments: fallback.arguments.clone(),
                    };
                    history.append(Message::assistant_with_tool_calls(result.text.clone(), vec![pending]));
                    if fallback.name == "web_search" {
                        searched_this_exchange = true;
                    }
                    (callbacks.on_status)(StatusPhase::Tool(fallback.name.clone()));
                    (callbacks.on_tool_call)(&fallback.name, &fallback.arguments);
                    let (text, is_error) = match self.tools.dispatch(&fallback.name, fallback.arguments.clone()).await {
                        Ok(text) => (text, false),
                        Err(e) => (e.to_string(), true),
                    };
                    history.append(Message::tool_result(fallback.call_id, text, is_error));
                    i += 1;
                    continue;
                }
            }

            tentative_final = result.text;
            break 'outer;
        }

        // Hedging detection and safety-net search: single-shot, only if a
        // search tool is registered and none has run yet this exchange.
        if is_hedging(&tentative_final) && self.tools.contains("web_search") && !searched_this_exchange {
            info!("hedging phrase detected, firing safety-net search");
            (callbacks.on_status)(StatusPhase::Searching);
            let query = utterance.to_string();
            let call_id = format!("safety-net-{}", uuid::Uuid::new_v4());
            let pending = PendingToolCall {
                call_id: call_id.clone(),
                name: "web_search".to_string(),
                arguments: serde_json::json!({"query": query}),
            };
            history.append(Message::assistant_with_tool_calls(tentative_final.clone(), vec![pending]));
            (callbacks.on_tool_call)("web_search", &serde_json::json!({"query": query}));
            let (text, is_error) = match self.tools.dispatch("web_search", serde_json::json!({"query": query})).await {
                Ok(text) => (text, false),
                Err(e) => (e.to_string(), true),
            };
            history.append(Message::tool_result(call_id, text, is_error));

            let messages = history.to_messages(ProviderFlavor::SplitToolMessages);
            let opts = GenerateOptions::new();
            match self.provider.generate(&messages, &opts).await {
                Ok(result) => tentative_final = result.text,
                Err(e) => {
                    warn!("safety-net regeneration failed: {e}");
                    degraded = true;
                }
            }
        }

        history.append(Message::assistant(tentative_final.clone()));
        history.trim(self.history_group_budget);

        Ok(ChatOutcome {
            final_text: tentative_final,
            degraded,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hedging_detection_matches_normalized_phrase() {
        assert!(is_hedging("I don't have real-time information, sorry."));
        assert!(is_hedging("I DON'T HAVE REAL TIME INFORMATION!!"));
        assert!(!is_hedging("The answer is 4."));
    }

    #[test]
    fn normalize_collapses_whitespace_and_punctuation() {
        assert_eq!(normalize("Hello,   World!!"), "hello world");
    }
}

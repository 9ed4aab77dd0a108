//! Shared conversion helpers between our internal `history::Message` shape
//! and rig-core's wire types. Used by both rig-backed providers
//! (`AnthropicVertexProvider`, `OpenRouterProvider`).

use rig::completion::{AssistantContent, ToolDefinition};
use rig::message::{Text, ToolCall as RigToolCall, ToolResult as RigToolResult, ToolResultContent, UserContent};
use rig::one_or_many::OneOrMany;

use crate::history::{Message, Role};
use crate::tools::ToolSchema;

pub fn to_rig_messages(messages: &[Message]) -> Vec<rig::completion::Message> {
    let mut out = Vec::new();
    for m in messages {
        match m.role {
            Role::System => {}
            Role::User => {
                out.push(rig::completion::Message::User {
                    content: OneOrMany::one(UserContent::Text(Text { text: m.text.clone() })),
                });
            }
            Role::Assistant => {
                let mut content = Vec::new();
                if !m.text.is_empty() {
                    content.push(AssistantContent::Text(Text { text: m.text.clone() }));
                }
                for call in &m.tool_calls {
                    content.push(AssistantContent::ToolCall(RigToolCall {
                        id: call.call_id.clone(),
                        call_id: None,
                        function: rig::message::ToolFunction {
                            name: call.name.clone(),
                            arguments: call.arguments.clone(),
                        },
                    }));
                }
                if content.is_empty() {
                    content.push(AssistantContent::Text(Text { text: String::new() }));
                }
                out.push(rig::completion::Message::Assistant {
                    id: None,
                    content: OneOrMany::many(content)
                        .unwrap_or_else(|_| OneOrMany::one(AssistantContent::Text(Text { text: String::new() }))),
                });
            }
            Role::ToolResult => {
                let call_id = m.tool_call_id.clone().unwrap_or_default();
                out.push(rig::completion::Message::User {
                    content: OneOrMany::one(UserContent::ToolResult(RigToolResult {
                        id: call_id.clone(),
                        call_id: Some(call_id),
                        content: OneOrMany::one(ToolResultContent::Text(Text { text: m.text.clone() })),
                    })),
                });
            }
        }
    }
    out
}

pub fn system_preamble(messages: &[Message]) -> Option<String> {
    messages
        .iter()
        .find(|m| m.role == Role::System)
        .map(|m| m.text.clone())
}

pub fn to_rig_tools(tools: &[ToolSchema]) -> Vec<ToolDefinition> {
    tools
        .iter()
        .map(|t| ToolDefinition {
            name: t.name.clone(),
            description: t.description.clone(),
            parameters: t.parameters.clone(),
        })
        .collect()
}

pub fn non_empty_history(
    history: Vec<rig::completion::Message>,
) -> OneOrMany<rig::completion::Message> {
    OneOrMany::many(history.clone()).unwrap_or_else(|_| {
        OneOrMany::one(history.into_iter().next().unwrap_or(rig::completion::Message::User {
            content: OneOrMany::one(UserContent::Text(Text { text: String::new() })),
        }))
    })
}

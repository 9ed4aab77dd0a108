//! History Manager (C4): ordered conversation log with group-aware trimming.
//!
//! Invariant H1 (group integrity): every assistant message carrying pending
//! tool calls is immediately followed by one tool_result message per call, in
//! the same order. Invariant H2 (bounded): at most `max_groups` groups are
//! retained; trimming drops whole groups from the oldest end.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    System,
    User,
    Assistant,
    ToolResult,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingToolCall {
    pub call_id: String,
    pub name: String,
    pub arguments: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub text: String,
    #[serde(default)]
    pub tool_calls: Vec<PendingToolCall>,
    #[serde(default)]
    pub tool_call_id: Option<String>,
    #[serde(default)]
    pub is_error: bool,
}

impl Message {
    pub fn system(text: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            text: text.into(),
            tool_calls: Vec::new(),
            tool_call_id: None,
            is_error: false,
        }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            text: text.into(),
            tool_calls: Vec::new(),
            tool_call_id: None,
            is_error: false,
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            text: text.into(),
            tool_calls: Vec::new(),
            tool_call_id: None,
            is_error: false,
        }
    }

    pub fn assistant_with_tool_calls(text: impl Into<String>, tool_calls: Vec<PendingToolCall>) -> Self {
        Self {
            role: Role::Assistant,
            text: text.into(),
            tool_calls,
            tool_call_id: None,
            is_error: false,
        }
    }

    pub fn tool_result(call_id: impl Into<String>, text: impl Into<String>, is_error: bool) -> Self {
        Self {
            role: Role::ToolResult,
            text: text.into(),
            tool_calls: Vec::new(),
            tool_call_id: Some(call_id.into()),
            is_error,
        }
    }
}

/// How a materialized history is shaped for a provider's wire format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderFlavor {
    /// Tool calls stay on the assistant message; each tool result is its own
    /// following message. Matches rig-core's `Message::Assistant` /
    /// `Message::User(ToolResult)` split.
    SplitToolMessages,
    /// Each assistant-with-tool-calls message is merged with its following
    /// tool_result messages into one message whose text embeds the tool
    /// result inline. Matches local OpenAI-compatible chat wire formats that
    /// report tool execution as inline content rather than distinct turns.
    InlineToolBlocks,
}

#[derive(Debug, Clone, Default)]
pub struct HistoryManager {
    messages: Vec<Message>,
}

impl HistoryManager {
    pub fn new() -> Self {
        Self { messages: Vec::new() }
    }

    pub fn with_system_prompt(system_prompt: impl Into<String>) -> Self {
        Self {
            messages: vec![Message::system(system_prompt)],
        }
    }

    pub fn append(&mut self, message: Message) {
        self.messages.push(message);
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn clear(&mut self) {
        // The system prompt, if any, lives at index 0 and is never trimmed;
        // preserve it across a clear for the same reason.
        self.messages.retain(|m| m.role == Role::System);
    }

    fn has_system_prompt(&self) -> bool {
        matches!(self.messages.first(), Some(m) if m.role == Role::System)
    }

    /// Partition the post-system-prompt messages into groups: a lone `[user]`
    /// message, a lone `[assistant]` message with no tool calls, or an
    /// `[assistant(tools) + matching tool_results...]` run. Returns
    /// half-open index ranges into `self.messages`.
    fn group_ranges(&self) -> Vec<(usize, usize)> {
        let start = if self.has_system_prompt() { 1 } else { 0 };
        let mut groups = Vec::new();
        let mut i = start;
        while i < self.messages.len() {
            let msg = &self.messages[i];
            match msg.role {
                Role::Assistant if !msg.tool_calls.is_empty() => {
                    let expected = msg.tool_calls.len();
                    let mut j = i + 1;
                    let mut seen = 0;
                    while j < self.messages.len() && seen < expected && self.messages[j].role == Role::ToolResult {
                        j += 1;
                        seen += 1;
                    }
                    groups.push((i, j));
                    i = j;
                }
                _ => {
                    groups.push((i, i + 1));
                    i += 1;
                }
            }
        }
        groups
    }

    pub fn group_count(&self) -> usize {
        self.group_ranges().len()
    }

    /// Trim to at most `max_groups` groups, dropping whole groups from the
    /// oldest end. The system prompt at index 0, if present, is never
    /// trimmed (H1/H2).
    pub fn trim(&mut self, max_groups: usize) {
        let groups = self.group_ranges();
        if groups.len() <= max_groups {
            return;
        }
        let drop_count = groups.len() - max_groups;
        let cutoff = groups[drop_count].0;
        let head_len = if self.has_system_prompt() { 1 } else { 0 };
        let mut kept = Vec::with_capacity(self.messages.len());
        kept.extend_from_slice(&self.messages[..head_len]);
        kept.extend_from_slice(&self.messages[cutoff..]);
        self.messages = kept;
    }

    /// Materialize the history into a provider-specific shape. Both flavors
    /// preserve H1 ordering; they differ only in whether a tool result is its
    /// own message.
    pub fn to_messages(&self, flavor: ProviderFlavor) -> Vec<Message> {
        match flavor {
            ProviderFlavor::SplitToolMessages => self.messages.clone(),
            ProviderFlavor::InlineToolBlocks => {
                let mut out = Vec::with_capacity(self.messages.len());
                let mut i = 0;
                while i < self.messages.len() {
                    let msg = &self.messages[i];
                    if msg.role == Role::Assistant && !msg.tool_calls.is_empty() {
                        let mut merged_text = msg.text.clone();
                        let mut j = i + 1;
                        while j < self.messages.len() && self.messages[j].role == Role::ToolResult {
                            let tr = &self.messages[j];
                            merged_text.push_str(&format!(
                                "\n[tool_result call_id={} error={}]\n{}",
                                tr.tool_call_id.as_deref().unwrap_or(""),
                                tr.is_error,
                                tr.text
                            ));
                            j += 1;
                        }
                        out.push(Message {
                            role: Role::Assistant,
                            text: merged_text,
                            tool_calls: msg.tool_calls.clone(),
                            tool_call_id: None,
                            is_error: false,
                        });
                        i = j;
                    } else {
                        out.push(msg.clone());
                        i += 1;
                    }
                }
                out
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assistant_with_one_tool(name: &str) -> Message {
        Message::assistant_with_tool_calls(
            "",
            vec![PendingToolCall {
                call_id: "c1".to_string(),
                name: name.to_string(),
                arguments: serde_json::json!({}),
            }],
        )
    }

    #[test]
    fn group_count_counts_user_and_tool_groups() {
        let mut h = HistoryManager::new();
        h.append(Message::user("hi"));
        h.append(assistant_with_one_tool("search"));
        h.append(Message::tool_result("c1", "result", false));
        h.append(Message::assistant("final"));
        assert_eq!(h.group_count(), 3);
    }

    #[test]
    fn trim_drops_whole_groups_oldest_first() {
        let mut h = HistoryManager::with_system_prompt("sys");
        for i in 0..5 {
            h.append(Message::user(format!("q{i}")));
            h.append(Message::assistant(format!("a{i}")));
        }
        assert_eq!(h.group_count(), 10);
        h.trim(3);
        assert_eq!(h.group_count(), 3);
        // system prompt survives
        assert_eq!(h.messages()[0].role, Role::System);
        // the three most recent user/assistant pairs survive, oldest dropped
        assert_eq!(h.messages()[1].text, "q2");
    }

    #[test]
    fn trim_never_splits_a_tool_call_group() {
        let mut h = HistoryManager::new();
        h.append(Message::user("q0"));
        h.append(assistant_with_one_tool("search"));
        h.append(Message::tool_result("c1", "r0", false));
        h.append(Message::user("q1"));
        h.append(Message::assistant("a1"));
        h.trim(1);
        // Only the last group (q1/a1) should remain; the tool group is
        // removed in its entirety, never split.
        assert_eq!(h.group_count(), 1);
        assert!(h.messages().iter().all(|m| m.tool_call_id.as_deref() != Some("c1")));
    }

    #[test]
    fn inline_flavor_folds_tool_results_into_assistant_message() {
        let mut h = HistoryManager::new();
        h.append(Message::user("q0"));
        h.append(assistant_with_one_tool("search"));
        h.append(Message::tool_result("c1", "paris weather", false));
        let inline = h.to_messages(ProviderFlavor::InlineToolBlocks);
        assert_eq!(inline.len(), 2);
        assert!(inline[1].text.contains("paris weather"));
    }

    /// An assistant-with-tool-calls message is immediately followed by
    /// exactly one tool_result per call, in order (P1).
    fn assert_group_integrity(h: &HistoryManager) {
        let messages = h.messages();
        let mut i = 0;
        while i < messages.len() {
            let msg = &messages[i];
            if msg.role == Role::Assistant && !msg.tool_calls.is_empty() {
                let expected = msg.tool_calls.len();
                for (offset, call) in msg.tool_calls.iter().enumerate() {
                    let result = messages
                        .get(i + 1 + offset)
                        .unwrap_or_else(|| panic!("missing tool_result for call {}", call.call_id));
                    assert_eq!(result.role, Role::ToolResult);
                    assert_eq!(result.tool_call_id.as_deref(), Some(call.call_id.as_str()));
                }
                i += 1 + expected;
            } else {
                i += 1;
            }
        }
    }

    use proptest::prelude::*;

    #[derive(Debug, Clone)]
    enum Op {
        User,
        Assistant,
        ToolGroup(usize),
        Trim(usize),
    }

    fn op_strategy() -> impl Strategy<Value = Op> {
        prop_oneof![
            Just(Op::User),
            Just(Op::Assistant),
            (1..=3usize).prop_map(Op::ToolGroup),
            (1..=8usize).prop_map(Op::Trim),
        ]
    }

    proptest! {
        /// P1 (group integrity) and P2 (bounded history) hold after any
        /// sequence of well-formed appends and trims.
        #[test]
        fn prop_group_integrity_and_bound_hold(ops in prop::collection::vec(op_strategy(), 0..40)) {
            let mut h = HistoryManager::with_system_prompt("sys");
            let mut call_seq = 0usize;

            for op in ops {
                let trimmed_to = match op {
                    Op::User => {
                        h.append(Message::user("q"));
                        None
                    }
                    Op::Assistant => {
                        h.append(Message::assistant("a"));
                        None
                    }
                    Op::ToolGroup(n) => {
                        let calls: Vec<PendingToolCall> = (0..n)
                            .map(|_| {
                                call_seq += 1;
                                PendingToolCall {
                                    call_id: format!("c{call_seq}"),
                                    name: "tool".to_string(),
                                    arguments: serde_json::json!({}),
                                }
                            })
                            .collect();
                        h.append(Message::assistant_with_tool_calls("", calls.clone()));
                        for call in &calls {
                            h.append(Message::tool_result(call.call_id.clone(), "r", false));
                        }
                        None
                    }
                    Op::Trim(k) => {
                        h.trim(k);
                        Some(k)
                    }
                };
                assert_group_integrity(&h);
                if let Some(k) = trimmed_to {
                    prop_assert!(h.group_count() <= k);
                }
            }
        }
    }
}

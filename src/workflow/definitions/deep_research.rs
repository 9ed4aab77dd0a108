//! Deep Research: a broad initial search, an LLM-driven gap evaluation that
//! proposes follow-up queries, a targeted search loop over those, and a
//! synthesis pass. Grounded on `spec.md` §6's required workflow table.

use std::time::Duration;

use crate::workflow::{StepDefinition, StepMeta, WorkflowDefinition};

pub fn definition() -> WorkflowDefinition {
    WorkflowDefinition {
        id: "deep_research".to_string(),
        name: "Deep Research".to_string(),
        description: "Researches a topic in depth across an initial broad pass and targeted follow-ups.".to_string(),
        trigger_patterns: &[
            "tell me about",
            "research",
            "deep dive",
            "comprehensive",
            "what'?s happening with",
        ],
        steps: vec![
            StepDefinition::Llm {
                meta: StepMeta {
                    state_id: "initial_broad_search".to_string(),
                    narration: Some("Starting with a broad search.".to_string()),
                    timeout_secs: Some(30),
                },
                prompt_template: "The user asked: {utterance}\n\nSearch broadly and summarize what's known.".to_string(),
                tool_binding: Some("web_search".to_string()),
                output_key: "broad_summary".to_string(),
                next: Some("gap_evaluation".to_string()),
            },
            StepDefinition::Llm {
                meta: StepMeta {
                    state_id: "gap_evaluation".to_string(),
                    narration: Some("Checking for gaps in what we found.".to_string()),
                    timeout_secs: Some(20),
                },
                prompt_template: "Given this broad summary:\n{broad_summary}\n\nList the open questions or missing angles the user would still want answered. Respond with only a JSON array of short follow-up search queries.".to_string(),
                tool_binding: None,
                output_key: "follow_up_queries".to_string(),
                next: Some("targeted_search".to_string()),
            },
            StepDefinition::Loop {
                meta: StepMeta {
                    state_id: "targeted_search".to_string(),
                    narration: Some("Chasing down the follow-up questions.".to_string()),
                    timeout_secs: Some(60),
                },
                source_key: "follow_up_queries".to_string(),
                child_prompt_template: "Search for: {query}".to_string(),
                child_item_placeholder: "query".to_string(),
                child_tool_binding: Some("web_search".to_string()),
                output_key: "targeted_results".to_string(),
                inter_iteration_delay: Duration::from_millis(1500),
                next: Some("synthesize".to_string()),
            },
            StepDefinition::Synthesize {
                meta: StepMeta {
                    state_id: "synthesize".to_string(),
                    narration: Some("Writing up the full picture.".to_string()),
                    timeout_secs: Some(30),
                },
                prompt_template: "Broad summary:\n{broad_summary}\n\nTargeted follow-up findings:\n{targeted_results}\n\nWrite a comprehensive answer to: {utterance}".to_string(),
                next: None,
            },
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn has_four_steps_in_spec_order() {
        let def = definition();
        let ids: Vec<&str> = def.steps.iter().map(|s| s.meta().state_id.as_str()).collect();
        assert_eq!(ids, vec!["initial_broad_search", "gap_evaluation", "targeted_search", "synthesize"]);
    }
}

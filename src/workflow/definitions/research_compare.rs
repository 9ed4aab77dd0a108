//! Research & Compare: ranks or compares several entities by decomposing the
//! question into one search per entity, then synthesizing a single ranked
//! answer. Grounded on `spec.md` §6's required workflow table.

use std::time::Duration;

use crate::workflow::{StepDefinition, StepMeta, WorkflowDefinition};

pub fn definition() -> WorkflowDefinition {
    WorkflowDefinition {
        id: "research_compare".to_string(),
        name: "Research & Compare".to_string(),
        description: "Ranks or compares several named entities against each other.".to_string(),
        trigger_patterns: &[
            "compare",
            "vs\\.?",
            "versus",
            "top \\d+",
            "market cap",
            "which is better",
            "pros and cons",
        ],
        steps: vec![
            StepDefinition::Llm {
                meta: StepMeta {
                    state_id: "initial_lookup".to_string(),
                    narration: Some("Looking into this.".to_string()),
                    timeout_secs: Some(30),
                },
                prompt_template: "The user asked: {utterance}\n\nSearch for and produce an initial ranking of the entities involved, with one sentence of justification per entity.".to_string(),
                tool_binding: Some("web_search".to_string()),
                output_key: "initial_ranking".to_string(),
                next: Some("decompose".to_string()),
            },
            StepDefinition::Llm {
                meta: StepMeta {
                    state_id: "decompose".to_string(),
                    narration: Some("Breaking this down by entity.".to_string()),
                    timeout_secs: Some(20),
                },
                prompt_template: "Given this initial ranking:\n{initial_ranking}\n\nProduce a JSON array of short search queries, one per entity named above, each query suited to pulling a single up-to-date fact about that entity. Respond with only the JSON array.".to_string(),
                tool_binding: None,
                output_key: "entity_queries".to_string(),
                next: Some("search_each".to_string()),
            },
            StepDefinition::Loop {
                meta: StepMeta {
                    state_id: "search_each".to_string(),
                    narration: Some("Looking up each entity.".to_string()),
                    timeout_secs: Some(60),
                },
                source_key: "entity_queries".to_string(),
                child_prompt_template: "Search for: {query}".to_string(),
                child_item_placeholder: "query".to_string(),
                child_tool_binding: Some("web_search".to_string()),
                output_key: "entity_results".to_string(),
                inter_iteration_delay: Duration::from_millis(1500),
                next: Some("synthesize".to_string()),
            },
            StepDefinition::Synthesize {
                meta: StepMeta {
                    state_id: "synthesize".to_string(),
                    narration: Some("Putting together the final comparison.".to_string()),
                    timeout_secs: Some(30),
                },
                prompt_template: "Initial ranking:\n{initial_ranking}\n\nPer-entity findings:\n{entity_results}\n\nWrite the final ranked comparison, naming every entity explicitly.".to_string(),
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
        assert_eq!(ids, vec!["initial_lookup", "decompose", "search_each", "synthesize"]);
    }
}

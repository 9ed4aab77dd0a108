//! Fact Check: extracts the claim, searches both for supporting and
//! counter-evidence independently, then synthesizes a verdict. Grounded on
//! `spec.md` §6's required workflow table.

use crate::workflow::{StepDefinition, StepMeta, WorkflowDefinition};

pub fn definition() -> WorkflowDefinition {
    WorkflowDefinition {
        id: "fact_check".to_string(),
        name: "Fact Check".to_string(),
        description: "Checks a claim against both supporting and counter evidence.".to_string(),
        trigger_patterns: &["is it true", "fact check", "fact-check", "verify", "debunk"],
        steps: vec![
            StepDefinition::Llm {
                meta: StepMeta {
                    state_id: "claim_extraction".to_string(),
                    narration: Some("Pinning down the exact claim.".to_string()),
                    timeout_secs: Some(15),
                },
                prompt_template: "The user asked: {utterance}\n\nState the precise factual claim being checked, then respond with only a JSON array of exactly two search queries: one phrased to find supporting evidence, one phrased to find counter-evidence.".to_string(),
                tool_binding: None,
                output_key: "claim_queries".to_string(),
                next: Some("supporting_evidence_search".to_string()),
            },
            StepDefinition::Llm {
                meta: StepMeta {
                    state_id: "supporting_evidence_search".to_string(),
                    narration: Some("Looking for supporting evidence.".to_string()),
                    timeout_secs: Some(30),
                },
                prompt_template: "Search for evidence supporting this claim. Candidate queries: {claim_queries}".to_string(),
                tool_binding: Some("web_search".to_string()),
                output_key: "supporting_evidence".to_string(),
                next: Some("counter_evidence_search".to_string()),
            },
            StepDefinition::Llm {
                meta: StepMeta {
                    state_id: "counter_evidence_search".to_string(),
                    narration: Some("Looking for counter-evidence.".to_string()),
                    timeout_secs: Some(30),
                },
                prompt_template: "Search for evidence against this claim. Candidate queries: {claim_queries}".to_string(),
                tool_binding: Some("web_search".to_string()),
                output_key: "counter_evidence".to_string(),
                next: Some("verdict_synthesis".to_string()),
            },
            StepDefinition::Synthesize {
                meta: StepMeta {
                    state_id: "verdict_synthesis".to_string(),
                    narration: Some("Weighing the evidence.".to_string()),
                    timeout_secs: Some(20),
                },
                prompt_template: "Supporting evidence:\n{supporting_evidence}\n\nCounter-evidence:\n{counter_evidence}\n\nGive a verdict on the original claim from \"{utterance}\", stating plainly whether it is true, false, or partly true, and why.".to_string(),
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
        assert_eq!(
            ids,
            vec!["claim_extraction", "supporting_evidence_search", "counter_evidence_search", "verdict_synthesis"]
        );
    }
}

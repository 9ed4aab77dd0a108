//! Keyword Router (C3): a sub-millisecond, fully deterministic classifier
//! deciding whether an utterance should run as a workflow or the simple
//! ("direct") path. No LLM call is needed to decide the route.

use std::sync::Arc;

use regex::RegexSet;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteDecision {
    Workflow(String),
    Simple,
}

/// One workflow's compiled trigger patterns, in definition order.
pub struct RouterEntry {
    pub workflow_id: String,
    patterns: RegexSet,
}

impl RouterEntry {
    /// `patterns` are plain (non-regex-escaped) strings compiled
    /// case-insensitively; each is a standalone alternative.
    pub fn new(workflow_id: impl Into<String>, patterns: &[&str]) -> Self {
        let compiled: Vec<String> = patterns
            .iter()
            .map(|p| format!("(?i){}", p))
            .collect();
        Self {
            workflow_id: workflow_id.into(),
            patterns: RegexSet::new(compiled).expect("router patterns must compile"),
        }
    }

    fn matches(&self, utterance: &str) -> bool {
        self.patterns.is_match(utterance)
    }
}

pub struct KeywordRouter {
    entries: Vec<Arc<RouterEntry>>,
}

impl KeywordRouter {
    pub fn new(entries: Vec<Arc<RouterEntry>>) -> Self {
        Self { entries }
    }

    /// Scan in definition order; the first workflow with any matching
    /// pattern wins. Ties are broken by definition order (stable), so route
    /// is a pure function of the entries and the utterance (P3).
    pub fn route(&self, utterance: &str) -> RouteDecision {
        for entry in &self.entries {
            if entry.matches(utterance) {
                return RouteDecision::Workflow(entry.workflow_id.clone());
            }
        }
        RouteDecision::Simple
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_match_wins_by_definition_order() {
        let a = Arc::new(RouterEntry::new("a", &["compare"]));
        let b = Arc::new(RouterEntry::new("b", &["compare", "versus"]));
        let router = KeywordRouter::new(vec![a, b]);
        assert_eq!(
            router.route("please compare these two phones"),
            RouteDecision::Workflow("a".to_string())
        );
    }

    #[test]
    fn no_match_routes_simple() {
        let a = Arc::new(RouterEntry::new("a", &["compare"]));
        let router = KeywordRouter::new(vec![a]);
        assert_eq!(router.route("what is two plus two"), RouteDecision::Simple);
    }

    #[test]
    fn routing_is_deterministic() {
        let a = Arc::new(RouterEntry::new("a", &["fact check", "verify"]));
        let router = KeywordRouter::new(vec![a]);
        let utterance = "can you verify this claim";
        let first = router.route(utterance);
        let second = router.route(utterance);
        assert_eq!(first, second);
    }

    #[test]
    fn case_insensitive() {
        let a = Arc::new(RouterEntry::new("a", &["deep dive"]));
        let router = KeywordRouter::new(vec![a]);
        assert_eq!(
            router.route("Give me a DEEP DIVE on rust"),
            RouteDecision::Workflow("a".to_string())
        );
    }
}

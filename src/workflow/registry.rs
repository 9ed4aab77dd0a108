//! Workflow registry: a process-wide, immutable-after-startup mapping from
//! workflow id to `WorkflowDefinition`, grounded on the teacher's
//! `ai/workflow/registry.rs` lookup-table shape.

use std::sync::Arc;

use super::WorkflowDefinition;

/// Preserves registration order (not a `HashMap`) so `all()` — and the
/// `RouterEntry` list built from it — reflects trigger-priority order
/// exactly as registered, matching the Keyword Router's documented
/// first-match-wins-by-definition-order contract (P3).
#[derive(Clone, Default)]
pub struct WorkflowRegistry {
    definitions: Vec<Arc<WorkflowDefinition>>,
}

impl WorkflowRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, definition: WorkflowDefinition) {
        self.definitions.push(Arc::new(definition));
    }

    pub fn get(&self, workflow_id: &str) -> Option<Arc<WorkflowDefinition>> {
        self.definitions.iter().find(|d| d.id == workflow_id).cloned()
    }

    /// All registered definitions, in registration order. Used by the
    /// Keyword Router's setup path to build one `RouterEntry` per workflow.
    pub fn all(&self) -> Vec<Arc<WorkflowDefinition>> {
        self.definitions.clone()
    }

    /// The three required workflows (research & compare, deep research,
    /// fact check), registered in trigger-priority order.
    pub fn with_builtin_workflows() -> Self {
        let mut registry = Self::new();
        registry.register(super::definitions::research_compare::definition());
        registry.register(super::definitions::deep_research::definition());
        registry.register(super::definitions::fact_check::definition());
        registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_registry_has_all_three_workflows() {
        let registry = WorkflowRegistry::with_builtin_workflows();
        assert!(registry.get("research_compare").is_some());
        assert!(registry.get("deep_research").is_some());
        assert!(registry.get("fact_check").is_some());
    }
}

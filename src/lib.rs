pub mod cli;
pub mod config;
pub mod entry;
pub mod error;
pub mod events;
pub mod history;
pub mod llm;
pub mod orchestrator;
pub mod router;
pub mod telemetry;
pub mod tools;
pub mod workflow;

#[cfg(feature = "server")]
pub mod server;

pub use config::{Config, ConfigOverrides};
pub use entry::{EntryDispatcher, SessionHandle};
pub use error::{CoreError, ProviderError, ToolError, WorkflowError};
pub use events::{NullObserver, ObservationEvent, Observer, RecordingObserver};
pub use history::{HistoryManager, Message};
pub use llm::{AnthropicVertexProvider, LlmProvider, LocalProvider, OpenRouterProvider, ProviderRegistry};
pub use orchestrator::{ChatOutcome, Orchestrator, OrchestratorCallbacks};
pub use router::{KeywordRouter, RouteDecision, RouterEntry};
pub use tools::{SearchTool, Tool, ToolRegistry};
pub use workflow::registry::WorkflowRegistry;
pub use workflow::{WorkflowDefinition, WorkflowEngine, WorkflowOutcome};

/// Builds a dispatcher wired the way a default deployment wants it: the
/// three built-in workflows, one router entry per workflow (in registration
/// order), a tool registry containing whatever tools were set up by the
/// caller, and the provider to drive both the Workflow Engine and the
/// Orchestrator.
pub fn build_default_dispatcher(
    provider: std::sync::Arc<dyn LlmProvider>,
    tools: std::sync::Arc<ToolRegistry>,
    config: &Config,
) -> EntryDispatcher {
    let workflows = std::sync::Arc::new(WorkflowRegistry::with_builtin_workflows());
    let entries = workflows
        .all()
        .into_iter()
        .map(|def| std::sync::Arc::new(RouterEntry::new(def.id.clone(), def.trigger_patterns)))
        .collect();
    let router = KeywordRouter::new(entries);
    let engine = WorkflowEngine::new(
        provider.clone(),
        tools.clone(),
        config.snippet_char_cap,
        config.aggregate_char_cap,
        config.loop_delay,
    );
    let orchestrator = Orchestrator::new(provider, tools, config.max_tool_iterations, config.history_group_budget);
    EntryDispatcher::new(router, workflows, engine, orchestrator)
}

//! Entry Dispatcher (C8): the single front door an utterance passes through.
//! Routes via the Keyword Router to either the Workflow Engine or the
//! Orchestrator, and owns per-exchange cancellation.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::error::CoreError;
use crate::events::Observer;
use crate::history::HistoryManager;
use crate::orchestrator::{Orchestrator, OrchestratorCallbacks};
use crate::router::{KeywordRouter, RouteDecision};
use crate::workflow::registry::WorkflowRegistry;
use crate::workflow::{WorkflowEngine, WorkflowOutcome};

/// A handle a caller retains to cancel an in-flight exchange (§4.6/§8
/// scenario 6). Cloning shares the same underlying cancellation flag.
#[derive(Clone)]
pub struct SessionHandle {
    cancel: CancellationToken,
}

impl SessionHandle {
    pub fn new() -> Self {
        Self { cancel: CancellationToken::new() }
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

impl Default for SessionHandle {
    fn default() -> Self {
        Self::new()
    }
}

pub struct EntryDispatcher {
    router: KeywordRouter,
    workflows: Arc<WorkflowRegistry>,
    workflow_engine: WorkflowEngine,
    orchestrator: Orchestrator,
}

impl EntryDispatcher {
    pub fn new(
        router: KeywordRouter,
        workflows: Arc<WorkflowRegistry>,
        workflow_engine: WorkflowEngine,
        orchestrator: Orchestrator,
    ) -> Self {
        Self {
            router,
            workflows,
            workflow_engine,
            orchestrator,
        }
    }

    /// `dispatch(utterance, session_handle, observer) → final_text`. Routes
    /// the utterance; a workflow route drives the Workflow Engine (emitting
    /// the full Observation Protocol event stream), a simple route drives
    /// the Orchestrator directly (which has no workflow events to emit).
    pub async fn dispatch(
        &self,
        utterance: &str,
        history: &mut HistoryManager,
        session: &SessionHandle,
        observer: &dyn Observer,
    ) -> Result<String, CoreError> {
        if session.is_cancelled() {
            return Err(CoreError::Cancelled);
        }

        match self.router.route(utterance) {
            RouteDecision::Workflow(workflow_id) => {
                let definition = self
                    .workflows
                    .get(&workflow_id)
                    .ok_or_else(|| CoreError::Routing(format!("unknown workflow id '{workflow_id}'")))?;
                match self
                    .workflow_engine
                    .run(&definition, utterance, observer, session.cancel.clone())
                    .await
                {
                    WorkflowOutcome::Completed(text) => Ok(text),
                    WorkflowOutcome::Cancelled => Err(CoreError::Cancelled),
                    WorkflowOutcome::Error(e) => Err(CoreError::Workflow(e)),
                }
            }
            RouteDecision::Simple => {
                let callbacks = OrchestratorCallbacks::default();
                let outcome = self.orchestrator.chat(utterance, history, &callbacks).await?;
                Ok(outcome.final_text)
            }
        }
    }

    /// Cancels an in-flight exchange associated with `session`. Idempotent.
    pub fn cancel(&self, session: &SessionHandle) {
        session.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::NullObserver;
    use crate::router::RouterEntry;
    use crate::tools::ToolRegistry;
    use std::time::Duration;

    fn empty_dispatcher(provider: Arc<dyn crate::llm::LlmProvider>) -> EntryDispatcher {
        let workflows = Arc::new(WorkflowRegistry::with_builtin_workflows());
        let entries = workflows
            .all()
            .into_iter()
            .map(|def| Arc::new(RouterEntry::new(def.id.clone(), def.trigger_patterns)))
            .collect();
        let router = KeywordRouter::new(entries);
        let tools = Arc::new(ToolRegistry::new());
        let engine = WorkflowEngine::new(provider.clone(), tools.clone(), 150, 2500, Duration::from_millis(1500));
        let orchestrator = Orchestrator::new(provider, tools, 5, 10);
        EntryDispatcher::new(router, workflows, engine, orchestrator)
    }

    struct StubProvider;

    #[async_trait::async_trait]
    impl crate::llm::LlmProvider for StubProvider {
        fn name(&self) -> &str {
            "stub"
        }
        async fn generate(
            &self,
            _messages: &[crate::history::Message],
            _opts: &crate::llm::GenerateOptions,
        ) -> Result<crate::llm::LlmResult, crate::error::ProviderError> {
            Ok(crate::llm::LlmResult {
                text: "four".to_string(),
                ..Default::default()
            })
        }
    }

    #[tokio::test]
    async fn simple_utterance_routes_to_orchestrator() {
        let dispatcher = empty_dispatcher(Arc::new(StubProvider));
        let mut history = HistoryManager::new();
        let session = SessionHandle::new();
        let observer = NullObserver;
        let result = dispatcher.dispatch("what is two plus two", &mut history, &session, &observer).await.unwrap();
        assert_eq!(result, "four");
    }

    #[tokio::test]
    async fn cancelled_session_short_circuits() {
        let dispatcher = empty_dispatcher(Arc::new(StubProvider));
        let mut history = HistoryManager::new();
        let session = SessionHandle::new();
        session.cancel();
        let observer = NullObserver;
        let err = dispatcher
            .dispatch("what is two plus two", &mut history, &session, &observer)
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::Cancelled));
    }
}

//! End-to-end scenarios exercising the Entry Dispatcher across both routes
//! (simple and workflow), using scripted stub providers/tools rather than
//! live network calls.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex as AsyncMutex;

use sona::entry::{EntryDispatcher, SessionHandle};
use sona::error::{CoreError, ProviderError, ToolError};
use sona::events::{ExitReason, NullObserver, ObservationEvent, RecordingObserver, StepStatus};
use sona::history::{HistoryManager, Message};
use sona::llm::{GenerateOptions, LlmProvider, LlmResult, ToolCallRequest};
use sona::orchestrator::Orchestrator;
use sona::router::{KeywordRouter, RouterEntry};
use sona::tools::search::{SearchProvider, SearchResultItem, SearchTool};
use sona::tools::ToolRegistry;
use sona::workflow::registry::WorkflowRegistry;
use sona::workflow::WorkflowEngine;

fn text_result(text: &str) -> LlmResult {
    LlmResult {
        text: text.to_string(),
        ..Default::default()
    }
}

fn tool_call_result(call_id: &str, name: &str, args: serde_json::Value) -> LlmResult {
    LlmResult {
        tool_calls: vec![ToolCallRequest {
            call_id: call_id.to_string(),
            name: name.to_string(),
            arguments: args,
        }],
        ..Default::default()
    }
}

/// Replays a fixed queue of responses in call order; errors once exhausted.
struct ScriptedProvider {
    responses: AsyncMutex<VecDeque<LlmResult>>,
}

impl ScriptedProvider {
    fn new(responses: Vec<LlmResult>) -> Self {
        Self {
            responses: AsyncMutex::new(responses.into()),
        }
    }
}

#[async_trait]
impl LlmProvider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn generate(&self, _messages: &[Message], _opts: &GenerateOptions) -> Result<LlmResult, ProviderError> {
        self.responses
            .lock()
            .await
            .pop_front()
            .ok_or_else(|| ProviderError::Unavailable("scripted provider exhausted".to_string()))
    }
}

/// Returns one canned result per query, regardless of query content.
struct StubSearchProvider {
    result: SearchResultItem,
}

#[async_trait]
impl SearchProvider for StubSearchProvider {
    async fn search(&self, _query: &str, _max_results: usize) -> Result<Vec<SearchResultItem>, ToolError> {
        Ok(vec![self.result.clone()])
    }
}

fn tools_with_search(content: &str) -> Arc<ToolRegistry> {
    let mut tools = ToolRegistry::new();
    let provider = Arc::new(StubSearchProvider {
        result: SearchResultItem {
            title: "result".to_string(),
            url: "https://example.com".to_string(),
            content: content.to_string(),
        },
    });
    tools.register(Arc::new(SearchTool::new(provider)));
    Arc::new(tools)
}

fn dispatcher_with(provider: Arc<dyn LlmProvider>, tools: Arc<ToolRegistry>, loop_delay: Duration) -> EntryDispatcher {
    let workflows = Arc::new(WorkflowRegistry::with_builtin_workflows());
    let entries = workflows
        .all()
        .into_iter()
        .map(|def| Arc::new(RouterEntry::new(def.id.clone(), def.trigger_patterns)))
        .collect();
    let router = KeywordRouter::new(entries);
    let engine = WorkflowEngine::new(provider.clone(), tools.clone(), 150, 2500, loop_delay);
    let orchestrator = Orchestrator::new(provider, tools, 3, 10);
    EntryDispatcher::new(router, workflows, engine, orchestrator)
}

#[tokio::test]
async fn simple_question_no_tools() {
    let provider = Arc::new(ScriptedProvider::new(vec![text_result("4")]));
    let tools = Arc::new(ToolRegistry::new());
    let dispatcher = dispatcher_with(provider, tools, Duration::from_millis(10));
    let mut history = HistoryManager::new();
    let session = SessionHandle::new();
    let observer = NullObserver;

    let result = dispatcher.dispatch("what is two plus two", &mut history, &session, &observer).await.unwrap();
    assert_eq!(result, "4");
}

#[tokio::test]
async fn simple_question_with_search() {
    let provider = Arc::new(ScriptedProvider::new(vec![
        tool_call_result("c1", "web_search", serde_json::json!({"query": "weather in paris"})),
        text_result("It's sunny in Paris, 22C."),
    ]));
    let tools = tools_with_search("Sunny, 22C");
    let dispatcher = dispatcher_with(provider, tools, Duration::from_millis(10));
    let mut history = HistoryManager::new();
    let session = SessionHandle::new();
    let observer = NullObserver;

    let result = dispatcher
        .dispatch("what's the weather in paris right now", &mut history, &session, &observer)
        .await
        .unwrap();
    assert!(result.contains("sunny") || result.contains("Sunny"));
}

#[tokio::test]
async fn hedging_safety_net_regenerates() {
    let provider = Arc::new(ScriptedProvider::new(vec![
        text_result("I don't have real-time information about sports results."),
        text_result("Based on the search, the home team won yesterday's match."),
    ]));
    let tools = tools_with_search("home team won 3-1");
    let dispatcher = dispatcher_with(provider, tools, Duration::from_millis(10));
    let mut history = HistoryManager::new();
    let session = SessionHandle::new();
    let observer = NullObserver;

    let result = dispatcher
        .dispatch("who won the match yesterday", &mut history, &session, &observer)
        .await
        .unwrap();
    assert!(!result.to_lowercase().contains("i don't have real-time information"));
    assert!(result.contains("home team"));
}

#[tokio::test]
async fn research_compare_workflow_event_ordering() {
    let entities = vec!["Apple", "Microsoft", "Saudi Aramco", "Alphabet", "Amazon"];
    let entity_queries = serde_json::to_string(&entities).unwrap();

    let mut responses = vec![
        tool_call_result("c1", "web_search", serde_json::json!({"query": "top companies by market cap"})),
        text_result(&entity_queries),
    ];
    for entity in &entities {
        responses.push(tool_call_result("c2", "web_search", serde_json::json!({"query": entity})));
    }
    responses.push(text_result(
        "Ranked: 1. Apple 2. Microsoft 3. Saudi Aramco 4. Alphabet 5. Amazon",
    ));

    let provider = Arc::new(ScriptedProvider::new(responses));
    let tools = tools_with_search("market cap figure");
    let dispatcher = dispatcher_with(provider, tools, Duration::from_millis(5));
    let mut history = HistoryManager::new();
    let session = SessionHandle::new();
    let observer = RecordingObserver::new();

    let result = dispatcher
        .dispatch("what are the top 5 companies by market cap", &mut history, &session, &observer)
        .await
        .unwrap();

    for entity in &entities {
        assert!(result.contains(entity), "final text should mention {entity}");
    }

    let events = observer.events();
    assert!(matches!(events.first(), Some(ObservationEvent::WorkflowStart { states, .. }) if states.len() == 4));
    assert!(matches!(events.last(), Some(ObservationEvent::WorkflowExit { reason: ExitReason::Complete, .. })));

    let loop_updates: Vec<&ObservationEvent> = events
        .iter()
        .filter(|e| matches!(e, ObservationEvent::WorkflowLoopUpdate { .. }))
        .collect();
    // One announcement (active_index -1) plus one per entity.
    assert_eq!(loop_updates.len(), entities.len() + 1);

    let search_each_active = events.iter().position(|e| {
        matches!(e, ObservationEvent::WorkflowState { state_id, status: StepStatus::Active, .. } if state_id == "search_each")
    });
    let search_each_visited = events.iter().position(|e| {
        matches!(e, ObservationEvent::WorkflowState { state_id, status: StepStatus::Visited, .. } if state_id == "search_each")
    });
    assert!(search_each_active.unwrap() < search_each_visited.unwrap());
}

#[tokio::test]
async fn fact_check_workflow_with_partial_evidence() {
    let claim_queries = serde_json::to_string(&vec![
        "evidence the moon is hollow",
        "evidence against the moon being hollow",
    ])
    .unwrap();

    let provider = Arc::new(ScriptedProvider::new(vec![
        text_result(&claim_queries),
        tool_call_result("c1", "web_search", serde_json::json!({"query": "evidence the moon is hollow"})),
        tool_call_result("c2", "web_search", serde_json::json!({"query": "evidence against hollow moon"})),
        text_result("The claim is partly true in the sense that seismic data is debated, but the consensus is it is false."),
    ]));
    let tools = tools_with_search("seismic data shows a dense, not hollow, interior");
    let dispatcher = dispatcher_with(provider, tools, Duration::from_millis(5));
    let mut history = HistoryManager::new();
    let session = SessionHandle::new();
    let observer = NullObserver;

    let result = dispatcher
        .dispatch("is it true that the moon is hollow", &mut history, &session, &observer)
        .await
        .unwrap();

    let lowered = result.to_lowercase();
    assert!(lowered.contains("true") || lowered.contains("false") || lowered.contains("partly true"));
}

#[tokio::test]
async fn cancellation_mid_workflow_exits_cleanly() {
    let entities = vec!["A", "B", "C"];
    let entity_queries = serde_json::to_string(&entities).unwrap();
    let provider = Arc::new(ScriptedProvider::new(vec![
        tool_call_result("c1", "web_search", serde_json::json!({"query": "initial"})),
        text_result(&entity_queries),
        tool_call_result("c2", "web_search", serde_json::json!({"query": "A"})),
        tool_call_result("c2", "web_search", serde_json::json!({"query": "B"})),
        tool_call_result("c2", "web_search", serde_json::json!({"query": "C"})),
        text_result("final"),
    ]));
    let tools = tools_with_search("content");
    // Generous inter-iteration delay so cancellation lands mid-loop, before
    // all scripted responses are consumed.
    let dispatcher = dispatcher_with(provider, tools, Duration::from_millis(200));
    let mut history = HistoryManager::new();
    let session = SessionHandle::new();
    let observer = NullObserver;

    let session_clone = session.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        session_clone.cancel();
    });

    let result = dispatcher
        .dispatch("compare A, B, and C", &mut history, &session, &observer)
        .await;

    assert!(matches!(result, Err(CoreError::Cancelled)));
}

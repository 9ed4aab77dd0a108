//! Observation Protocol (C7): the structured event stream describing
//! workflow execution to an external observer.
//!
//! Ordering is enforced by construction: the interpreter (`workflow::run`)
//! only ever constructs these events in the sequence described by P4/P5.
//! `Observer::emit` is called synchronously from the interpreter's execution
//! context, so a slow observer back-pressures the interpreter directly.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowStateDescriptor {
    pub state_id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub has_tool: bool,
    pub tool_name: Option<String>,
    pub narration: Option<String>,
    pub next_step_id: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Active,
    Visited,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitReason {
    Complete,
    Cancelled,
    Error,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ObservationEvent {
    WorkflowStart {
        workflow_id: String,
        name: String,
        description: String,
        states: Vec<WorkflowStateDescriptor>,
    },
    WorkflowNarration {
        text: String,
    },
    WorkflowState {
        state_id: String,
        status: StepStatus,
        step_index: usize,
        total_steps: usize,
        step_name: String,
        detail: Option<String>,
    },
    WorkflowActivity {
        activity: String,
        timeout_secs: Option<u64>,
    },
    WorkflowDebug {
        step: String,
        model: String,
        eval_tokens: u32,
        tok_per_sec: f64,
        raw_chars: usize,
        prompt_tokens: u32,
        total_ms: u64,
        think_tokens: usize,
        think_detected: Option<String>,
    },
    WorkflowLoopUpdate {
        state_id: String,
        children: Vec<String>,
        active_index: i64,
    },
    WorkflowExit {
        reason: ExitReason,
        error: Option<String>,
    },
}

/// External observer interface consumed by C7. `emit` is called
/// synchronously from the interpreter thread; implementations that need to
/// forward to an async sink (e.g. an SSE channel) should use a bounded or
/// unbounded channel send, which blocking-back-pressures the interpreter if
/// the channel is bounded and full.
pub trait Observer: Send + Sync {
    fn emit(&self, event: ObservationEvent);
}

/// An observer that discards every event. Useful for the Orchestrator path,
/// which has no workflow events, and for tests that don't assert on events.
pub struct NullObserver;

impl Observer for NullObserver {
    fn emit(&self, _event: ObservationEvent) {}
}

/// An observer that records events in order, for assertions in tests.
#[derive(Default)]
pub struct RecordingObserver {
    events: std::sync::Mutex<Vec<ObservationEvent>>,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<ObservationEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl Observer for RecordingObserver {
    fn emit(&self, event: ObservationEvent) {
        self.events.lock().unwrap().push(event);
    }
}

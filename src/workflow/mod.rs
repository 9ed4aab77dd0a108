//! Workflow Engine (C6) — core of the core. Interprets a declarative
//! Workflow Definition against a user utterance, driving an LLM and tool
//! calls through a cursor-driven sequence of steps, emitting the
//! Observation Protocol event stream as it goes.
//!
//! A bespoke interpreter over the tagged `StepDefinition` sum, rather than a
//! `graph_flow::Graph`: the definitions here are declarative data, not
//! arbitrary `Task` implementations, so dispatching directly on the tag is
//! the right realization (see DESIGN.md).

pub mod definitions;
pub mod registry;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::error::{ProviderError, WorkflowError};
use crate::events::{ExitReason, ObservationEvent, Observer, StepStatus, WorkflowStateDescriptor};
use crate::history::Message;
use crate::llm::{GenerateOptions, LlmProvider};
use crate::tools::ToolRegistry;

pub type StateMap = HashMap<String, Value>;

#[derive(Debug, Clone)]
pub struct StepMeta {
    pub state_id: String,
    pub narration: Option<String>,
    pub timeout_secs: Option<u64>,
}

#[derive(Clone)]
pub enum StepDefinition {
    Llm {
        meta: StepMeta,
        prompt_template: String,
        tool_binding: Option<String>,
        output_key: String,
        next: Option<String>,
    },
    Loop {
        meta: StepMeta,
        source_key: String,
        child_prompt_template: String,
        child_item_placeholder: String,
        child_tool_binding: Option<String>,
        output_key: String,
        inter_iteration_delay: Duration,
        next: Option<String>,
    },
    Synthesize {
        meta: StepMeta,
        prompt_template: String,
        next: Option<String>,
    },
}

impl StepDefinition {
    pub fn meta(&self) -> &StepMeta {
        match self {
            StepDefinition::Llm { meta, .. } => meta,
            StepDefinition::Loop { meta, .. } => meta,
            StepDefinition::Synthesize { meta, .. } => meta,
        }
    }

    pub fn next(&self) -> Option<&str> {
        match self {
            StepDefinition::Llm { next, .. } => next.as_deref(),
            StepDefinition::Loop { next, .. } => next.as_deref(),
            StepDefinition::Synthesize { next, .. } => next.as_deref(),
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            StepDefinition::Llm { .. } => "llm",
            StepDefinition::Loop { .. } => "loop",
            StepDefinition::Synthesize { .. } => "synthesize",
        }
    }

    fn tool_name(&self) -> Option<&str> {
        match self {
            StepDefinition::Llm { tool_binding, .. } => tool_binding.as_deref(),
            StepDefinition::Loop { child_tool_binding, .. } => child_tool_binding.as_deref(),
            StepDefinition::Synthesize { .. } => None,
        }
    }
}

/// A named template: `id`, `description`, ordered trigger patterns (consumed
/// by the Keyword Router), and an ordered sequence of steps addressed by
/// `state_id`. The first step in `steps` is the entry point.
pub struct WorkflowDefinition {
    pub id: String,
    pub name: String,
    pub description: String,
    pub trigger_patterns: &'static [&'static str],
    pub steps: Vec<StepDefinition>,
}

impl WorkflowDefinition {
    fn step_by_id(&self, state_id: &str) -> Option<&StepDefinition> {
        self.steps.iter().find(|s| s.meta().state_id == state_id)
    }

    fn start_id(&self) -> Option<String> {
        self.steps.first().map(|s| s.meta().state_id.clone())
    }

    fn descriptors(&self) -> Vec<WorkflowStateDescriptor> {
        self.steps
            .iter()
            .map(|s| WorkflowStateDescriptor {
                state_id: s.meta().state_id.clone(),
                kind: s.kind().to_string(),
                has_tool: s.tool_name().is_some(),
                tool_name: s.tool_name().map(str::to_string),
                narration: s.meta().narration.clone(),
                next_step_id: s.next().map(str::to_string),
            })
            .collect()
    }
}

/// `run(workflow_id, utterance, observer) → final_text`'s result, collapsed
/// into an enum so cancellation is distinguished from failure at the
/// boundary without smuggling it through `Result`'s error channel (§7:
/// cancellation is not an error).
pub enum WorkflowOutcome {
    Completed(String),
    Cancelled,
    Error(WorkflowError),
}

enum StepOutcome {
    Advance,
    AdvanceWithFinal(String),
    Cancelled,
}

fn truncate_chars(text: &str, cap: usize) -> String {
    if text.chars().count() <= cap {
        text.to_string()
    } else {
        let mut truncated: String = text.chars().take(cap).collect();
        truncated.push('…');
        truncated
    }
}

/// Renders `template`'s `{name}` placeholders against `state`. String values
/// are capped at `snippet_cap` characters; non-string values are
/// JSON-serialized and capped at `aggregate_cap` characters. This is where
/// the "any LLM output used as input to a later LLM step is truncated"
/// policy (§4.8) is applied — at the point of reuse, not at storage, so the
/// final synthesize step (whose output is never substituted into another
/// template) is never truncated.
fn render_template(
    template: &str,
    state: &StateMap,
    snippet_cap: usize,
    aggregate_cap: usize,
) -> Result<String, WorkflowError> {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    loop {
        match rest.find('{') {
            None => {
                out.push_str(rest);
                break;
            }
            Some(idx) => {
                out.push_str(&rest[..idx]);
                let after = &rest[idx + 1..];
                match after.find('}') {
                    None => {
                        out.push_str(&rest[idx..]);
                        break;
                    }
                    Some(end) => {
                        let name = &after[..end];
                        let value = state
                            .get(name)
                            .ok_or_else(|| WorkflowError::TemplateVariableMissing(name.to_string()))?;
                        let rendered = match value {
                            Value::String(s) => truncate_chars(s, snippet_cap),
                            other => truncate_chars(&serde_json::to_string(other).unwrap_or_default(), aggregate_cap),
                        };
                        out.push_str(&rendered);
                        rest = &after[end + 1..];
                    }
                }
            }
        }
    }
    Ok(out)
}

/// An LLM step's raw text output is stored as a structured JSON value when
/// it parses as a JSON array or object (e.g. `decompose`'s per-entity query
/// list, consumed directly by a following Loop step's `source_key`), and as
/// a plain string otherwise.
fn parse_structured_or_text(text: &str) -> Value {
    match serde_json::from_str::<Value>(text.trim()) {
        Ok(v @ Value::Array(_)) | Ok(v @ Value::Object(_)) => v,
        _ => Value::String(text.to_string()),
    }
}

fn short_label(value: &Value) -> String {
    match value {
        Value::String(s) => truncate_chars(s, 60),
        other => truncate_chars(&serde_json::to_string(other).unwrap_or_default(), 60),
    }
}

pub struct WorkflowEngine {
    provider: Arc<dyn LlmProvider>,
    tools: Arc<ToolRegistry>,
    snippet_cap: usize,
    aggregate_cap: usize,
    default_loop_delay: Duration,
}

impl WorkflowEngine {
    pub fn new(
        provider: Arc<dyn LlmProvider>,
        tools: Arc<ToolRegistry>,
        snippet_cap: usize,
        aggregate_cap: usize,
        default_loop_delay: Duration,
    ) -> Self {
        Self {
            provider,
            tools,
            snippet_cap,
            aggregate_cap,
            default_loop_delay,
        }
    }

    pub async fn run(
        &self,
        def: &WorkflowDefinition,
        utterance: &str,
        observer: &dyn Observer,
        cancel: CancellationToken,
    ) -> WorkflowOutcome {
        let mut state: StateMap = HashMap::new();
        state.insert("utterance".to_string(), Value::String(utterance.to_string()));

        observer.emit(ObservationEvent::WorkflowStart {
            workflow_id: def.id.clone(),
            name: def.name.clone(),
            description: def.description.clone(),
            states: def.descriptors(),
        });

        let total_steps = def.steps.len();
        let mut cursor = def.start_id();
        let mut step_index = 0usize;
        let mut final_text: Option<String> = None;
        let mut exit_reason = ExitReason::Complete;
        let mut exit_error: Option<String> = None;

        while let Some(state_id) = cursor.take() {
            if cancel.is_cancelled() {
                exit_reason = ExitReason::Cancelled;
                break;
            }

            let step = match def.step_by_id(&state_id) {
                Some(s) => s,
                None => {
                    exit_reason = ExitReason::Error;
                    exit_error = Some(format!("unknown step id '{state_id}'"));
                    break;
                }
            };
            let meta = step.meta().clone();

            if let Some(narration) = &meta.narration {
                observer.emit(ObservationEvent::WorkflowNarration { text: narration.clone() });
            }

            observer.emit(ObservationEvent::WorkflowState {
                state_id: state_id.clone(),
                status: StepStatus::Active,
                step_index,
                total_steps,
                step_name: state_id.clone(),
                detail: None,
            });

            if let Some(timeout_secs) = meta.timeout_secs {
                observer.emit(ObservationEvent::WorkflowActivity {
                    activity: format!("running {state_id}"),
                    timeout_secs: Some(timeout_secs),
                });
            }

            let outcome = match step {
                StepDefinition::Llm { .. } => self.run_llm_step(step, &mut state, observer, &cancel).await,
                StepDefinition::Loop { .. } => self.run_loop_step(step, &mut state, observer, &cancel).await,
                StepDefinition::Synthesize { .. } => self.run_synthesize_step(step, &mut state, observer, &cancel).await,
            };

            match outcome {
                Ok(StepOutcome::Cancelled) => {
                    exit_reason = ExitReason::Cancelled;
                }
                Ok(StepOutcome::Advance) => {
                    observer.emit(ObservationEvent::WorkflowState {
                        state_id: state_id.clone(),
                        status: StepStatus::Visited,
                        step_index,
                        total_steps,
                        step_name: state_id.clone(),
                        detail: None,
                    });
                    cursor = step.next().map(str::to_string);
                    step_index += 1;
                }
                Ok(StepOutcome::AdvanceWithFinal(text)) => {
                    observer.emit(ObservationEvent::WorkflowState {
                        state_id: state_id.clone(),
                        status: StepStatus::Visited,
                        step_index,
                        total_steps,
                        step_name: state_id.clone(),
                        detail: None,
                    });
                    final_text = Some(text);
                    cursor = step.next().map(str::to_string);
                    step_index += 1;
                }
                Err(e) => {
                    observer.emit(ObservationEvent::WorkflowState {
                        state_id: state_id.clone(),
                        status: StepStatus::Error,
                        step_index,
                        total_steps,
                        step_name: state_id.clone(),
                        detail: Some(e.to_string()),
                    });
                    exit_reason = ExitReason::Error;
                    exit_error = Some(e.to_string());
                }
            }
        }

        observer.emit(ObservationEvent::WorkflowExit {
            reason: exit_reason,
            error: exit_error.clone(),
        });

        match exit_reason {
            ExitReason::Complete => WorkflowOutcome::Completed(final_text.unwrap_or_default()),
            ExitReason::Cancelled => WorkflowOutcome::Cancelled,
            ExitReason::Error => WorkflowOutcome::Error(WorkflowError::StepContractViolated(
                exit_error.unwrap_or_else(|| "unknown workflow error".to_string()),
            )),
        }
    }

    fn emit_debug(&self, observer: &dyn Observer, step: &str, model: &str, result: &crate::llm::LlmResult, elapsed: Duration) {
        let total_ms = elapsed.as_millis() as u64;
        let tok_per_sec = if elapsed.as_secs_f64() > 0.0 {
            result.output_tokens as f64 / elapsed.as_secs_f64()
        } else {
            0.0
        };
        observer.emit(ObservationEvent::WorkflowDebug {
            step: step.to_string(),
            model: model.to_string(),
            eval_tokens: result.output_tokens,
            tok_per_sec,
            raw_chars: result.raw_chars,
            prompt_tokens: result.prompt_tokens,
            total_ms,
            think_tokens: result.think_tokens,
            think_detected: result.think_detected.clone(),
        });
    }

    async fn run_llm_step(
        &self,
        step: &StepDefinition,
        state: &mut StateMap,
        observer: &dyn Observer,
        cancel: &CancellationToken,
    ) -> Result<StepOutcome, WorkflowError> {
        let StepDefinition::Llm { meta, prompt_template, tool_binding, output_key, .. } = step else {
            unreachable!("run_llm_step called with a non-Llm step");
        };

        if cancel.is_cancelled() {
            return Ok(StepOutcome::Cancelled);
        }

        let prompt = render_template(prompt_template, state, self.snippet_cap, self.aggregate_cap)?;
        let messages = vec![Message::user(prompt)];

        let mut opts = GenerateOptions::new().disable_thinking();
        if let Some(tool_name) = tool_binding {
            if let Some(schema) = self.tools.schema_for(tool_name) {
                opts = opts.with_tools(vec![schema]);
            }
        }

        if cancel.is_cancelled() {
            return Ok(StepOutcome::Cancelled);
        }

        let started = Instant::now();
        let result = self.provider.generate(&messages, &opts).await.map_err(provider_to_workflow_error)?;
        self.emit_debug(observer, &meta.state_id, self.provider.name(), &result, started.elapsed());

        let output = if let Some(tool_name) = tool_binding {
            match result.tool_calls.iter().find(|c| &c.name == tool_name) {
                Some(call) => {
                    if cancel.is_cancelled() {
                        return Ok(StepOutcome::Cancelled);
                    }
                    match self.tools.dispatch(tool_name, call.arguments.clone()).await {
                        Ok(text) => text,
                        Err(e) => e.to_string(),
                    }
                }
                None => result.text,
            }
        } else {
            result.text
        };

        state.insert(output_key.clone(), parse_structured_or_text(&output));
        Ok(StepOutcome::Advance)
    }

    async fn run_loop_step(
        &self,
        step: &StepDefinition,
        state: &mut StateMap,
        observer: &dyn Observer,
        cancel: &CancellationToken,
    ) -> Result<StepOutcome, WorkflowError> {
        let StepDefinition::Loop {
            meta,
            source_key,
            child_prompt_template,
            child_item_placeholder,
            child_tool_binding,
            output_key,
            inter_iteration_delay,
            ..
        } = step
        else {
            unreachable!("run_loop_step called with a non-Loop step");
        };

        let items = match state.get(source_key) {
            Some(Value::Array(arr)) => arr.clone(),
            _ => return Err(WorkflowError::LoopSourceMissing(source_key.clone())),
        };

        let labels: Vec<String> = items.iter().map(short_label).collect();
        observer.emit(ObservationEvent::WorkflowLoopUpdate {
            state_id: meta.state_id.clone(),
            children: labels.clone(),
            active_index: -1,
        });

        let mut outputs: Vec<Value> = Vec::with_capacity(items.len());
        let delay = if inter_iteration_delay.is_zero() {
            self.default_loop_delay
        } else {
            *inter_iteration_delay
        };

        for (idx, item) in items.iter().enumerate() {
            if cancel.is_cancelled() {
                return Ok(StepOutcome::Cancelled);
            }

            observer.emit(ObservationEvent::WorkflowLoopUpdate {
                state_id: meta.state_id.clone(),
                children: labels.clone(),
                active_index: idx as i64,
            });

            let mut child_state = state.clone();
            child_state.insert(child_item_placeholder.clone(), item.clone());

            let item_output = match render_template(child_prompt_template, &child_state, self.snippet_cap, self.aggregate_cap) {
                Ok(prompt) => {
                    let messages = vec![Message::user(prompt)];
                    let mut opts = GenerateOptions::new().disable_thinking();
                    if let Some(tool_name) = child_tool_binding {
                        if let Some(schema) = self.tools.schema_for(tool_name) {
                            opts = opts.with_tools(vec![schema]);
                        }
                    }

                    if cancel.is_cancelled() {
                        return Ok(StepOutcome::Cancelled);
                    }

                    let started = Instant::now();
                    match self.provider.generate(&messages, &opts).await {
                        Ok(result) => {
                            self.emit_debug(
                                observer,
                                &format!("{}[{idx}]", meta.state_id),
                                self.provider.name(),
                                &result,
                                started.elapsed(),
                            );
                            if let Some(tool_name) = child_tool_binding {
                                match result.tool_calls.iter().find(|c| &c.name == tool_name) {
                                    Some(call) => {
                                        if cancel.is_cancelled() {
                                            return Ok(StepOutcome::Cancelled);
                                        }
                                        match self.tools.dispatch(tool_name, call.arguments.clone()).await {
                                            Ok(text) => text,
                                            Err(e) => format!("error: {e}"),
                                        }
                                    }
                                    None => result.text,
                                }
                            } else {
                                result.text
                            }
                        }
                        Err(e) => {
                            warn!("loop child {idx} of {} failed: {e}", meta.state_id);
                            format!("error: {e}")
                        }
                    }
                }
                Err(e) => {
                    warn!("loop child {idx} of {} failed to render: {e}", meta.state_id);
                    format!("error: {e}")
                }
            };

            outputs.push(Value::String(item_output));

            if idx + 1 < items.len() {
                tokio::select! {
                    _ = tokio::time::sleep(delay) => {}
                    _ = cancel.cancelled() => return Ok(StepOutcome::Cancelled),
                }
            }
        }

        state.insert(output_key.clone(), Value::Array(outputs));
        Ok(StepOutcome::Advance)
    }

    async fn run_synthesize_step(
        &self,
        step: &StepDefinition,
        state: &mut StateMap,
        observer: &dyn Observer,
        cancel: &CancellationToken,
    ) -> Result<StepOutcome, WorkflowError> {
        let StepDefinition::Synthesize { meta, prompt_template, .. } = step else {
            unreachable!("run_synthesize_step called with a non-Synthesize step");
        };

        if cancel.is_cancelled() {
            return Ok(StepOutcome::Cancelled);
        }

        let prompt = render_template(prompt_template, state, self.snippet_cap, self.aggregate_cap)?;
        let messages = vec![Message::user(prompt)];
        let opts = GenerateOptions::new().disable_thinking();

        if cancel.is_cancelled() {
            return Ok(StepOutcome::Cancelled);
        }

        let started = Instant::now();
        let result = self.provider.generate(&messages, &opts).await.map_err(provider_to_workflow_error)?;
        self.emit_debug(observer, &meta.state_id, self.provider.name(), &result, started.elapsed());

        info!("workflow synthesize step '{}' produced final answer", meta.state_id);
        Ok(StepOutcome::AdvanceWithFinal(result.text))
    }
}

fn provider_to_workflow_error(e: ProviderError) -> WorkflowError {
    WorkflowError::Provider(e)
}

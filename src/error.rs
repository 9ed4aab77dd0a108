//! Crate-wide error taxonomy.
//!
//! Five kinds at the core boundary, matching the error handling design:
//! routing, provider, tool, workflow, and cancellation. Tool errors never
//! escape past a `tool_result`; provider errors propagate to the caller of
//! `dispatch`; workflow errors produce both an exit event and an `Err`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("provider unavailable: {0}")]
    Unavailable(String),

    #[error("rate limited")]
    RateLimited,

    #[error("invalid response from provider: {0}")]
    InvalidResponse(String),

    #[error("context window overflow")]
    ContextOverflow,
}

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("unknown tool: {0}")]
    UnknownTool(String),

    #[error("invalid arguments: {0}")]
    InvalidArguments(String),

    #[error("tool execution failed: {0}")]
    ExecutionError(String),
}

#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("loop source missing or not a list: {0}")]
    LoopSourceMissing(String),

    #[error("template variable missing: {0}")]
    TemplateVariableMissing(String),

    #[error("step contract violated: {0}")]
    StepContractViolated(String),

    #[error("provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("internal error: {0}")]
    Internal(String),
}

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("{0}")]
    Routing(String),

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    Tool(#[from] ToolError),

    #[error(transparent)]
    Workflow(#[from] WorkflowError),

    #[error("cancelled")]
    Cancelled,
}

impl CoreError {
    /// A bounded, canned user-facing message. Never mentions internal failure kinds.
    pub fn user_visible_fallback(&self) -> String {
        match self {
            CoreError::Routing(msg) => msg.clone(),
            CoreError::Cancelled => "That request was cancelled.".to_string(),
            _ => "Something went wrong on my end. Please try again.".to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;

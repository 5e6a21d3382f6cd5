use std::time::Duration;

use thiserror::Error;

/// Errors raised by the graph engine itself.
///
/// Domain failures belong in the workflow state (see [`crate::FlowState`]); these variants
/// describe a broken graph or an aborted run.
#[derive(Debug, Error)]
pub enum GraphError {
    #[error("task not found: {0}")]
    TaskNotFound(String),

    #[error("graph has no start task")]
    MissingStartTask,

    #[error("duplicate task id: {0}")]
    DuplicateTask(String),

    #[error("task {from} already has an outgoing transition")]
    DuplicateTransition { from: String },

    #[error("transition from {from} targets unknown task {to}")]
    UnknownTransitionTarget { from: String, to: String },

    #[error("router at {from} selected {route}, which is not in its route table")]
    InvalidRoute { from: String, route: String },

    #[error("run exceeded {0} steps")]
    StepLimitExceeded(usize),

    #[error("run timed out after {0:?}")]
    Timeout(Duration),

    #[error("task execution failed: {0}")]
    TaskExecutionFailed(String),
}

pub type Result<T> = std::result::Result<T, GraphError>;

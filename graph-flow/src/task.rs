use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{error::Result, state::FlowState};

/// Result of a task execution
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskResult {
    /// Next action to take
    pub next_action: NextAction,
    /// Short human-readable note about what the task did
    pub status_message: Option<String>,
}

impl TaskResult {
    pub fn new(next_action: NextAction) -> Self {
        Self {
            next_action,
            status_message: None,
        }
    }

    pub fn new_with_status(next_action: NextAction, status_message: Option<String>) -> Self {
        Self {
            next_action,
            status_message,
        }
    }

    /// Follow the outgoing transition of the task.
    pub fn proceed() -> Self {
        Self::new(NextAction::Continue)
    }

    /// Stop the run after this task.
    pub fn end() -> Self {
        Self::new(NextAction::End)
    }
}

/// Defines what should happen after a task completes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum NextAction {
    /// Follow the task's outgoing edge or router
    Continue,
    /// Jump to a specific task by ID
    GoTo(String),
    /// End the graph execution
    End,
}

/// Core trait that all tasks must implement
#[async_trait]
pub trait Task<S: FlowState>: Send + Sync {
    /// Unique identifier for this task
    fn id(&self) -> &str;

    /// Execute the task against the run state
    async fn run(&self, state: &mut S) -> Result<TaskResult>;
}

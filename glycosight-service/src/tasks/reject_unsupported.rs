use async_trait::async_trait;
use graph_flow::{NextAction, Result, Task, TaskResult};
use tracing::warn;

use super::node_ids;
use crate::state::WorkflowState;

pub const UNSUPPORTED_MESSAGE: &str =
    "The uploaded image is neither a recognized medical report nor a scan.";

/// Terminal node for uploads the workflow cannot diagnose.
pub struct RejectUnsupportedTask;

#[async_trait]
impl Task<WorkflowState> for RejectUnsupportedTask {
    fn id(&self) -> &str {
        node_ids::REJECT_UNSUPPORTED
    }

    async fn run(&self, state: &mut WorkflowState) -> Result<TaskResult> {
        warn!(
            user_id = %state.user_id(),
            input_type = %state.raw_input_type(),
            image_type = ?state.image_type(),
            "Rejecting unsupported upload"
        );
        state.fail(UNSUPPORTED_MESSAGE);
        Ok(TaskResult::new_with_status(
            NextAction::End,
            Some(UNSUPPORTED_MESSAGE.to_string()),
        ))
    }
}

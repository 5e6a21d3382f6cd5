use async_trait::async_trait;
use graph_flow::{Result, Task, TaskResult};
use tracing::info;

use super::node_ids;
use crate::state::WorkflowState;

/// Start node; routing on the input type happens on its outgoing router.
pub struct EntryTask;

#[async_trait]
impl Task<WorkflowState> for EntryTask {
    fn id(&self) -> &str {
        node_ids::ENTRY
    }

    async fn run(&self, state: &mut WorkflowState) -> Result<TaskResult> {
        info!(
            user_id = %state.user_id(),
            input_type = %state.raw_input_type(),
            file = %state.file_path().display(),
            "running task: {}",
            self.id()
        );
        Ok(TaskResult::proceed())
    }
}

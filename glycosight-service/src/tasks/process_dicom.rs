use async_trait::async_trait;
use graph_flow::{NextAction, Result, Task, TaskResult};
use tracing::info;

use super::{convert_file, node_ids, stage_failure};
use crate::collaborators::Collaborators;
use crate::state::WorkflowState;

pub const STAGE: &str = "Failed to convert DICOM file";

/// Converts a DICOM upload to JPEG and points the run at the converted file.
pub struct ProcessDicomTask {
    deps: Collaborators,
}

impl ProcessDicomTask {
    pub fn new(deps: Collaborators) -> Self {
        Self { deps }
    }
}

#[async_trait]
impl Task<WorkflowState> for ProcessDicomTask {
    fn id(&self) -> &str {
        node_ids::PROCESS_DICOM
    }

    async fn run(&self, state: &mut WorkflowState) -> Result<TaskResult> {
        info!(user_id = %state.user_id(), "running task: {}", self.id());

        match convert_file(self.deps.converter.clone(), state.file_path()).await {
            Ok(converted) => {
                state.set_file_path(converted);
                Ok(TaskResult::new_with_status(
                    NextAction::Continue,
                    Some("DICOM converted".to_string()),
                ))
            }
            Err(e) => Ok(stage_failure(state, STAGE, &e)),
        }
    }
}

use async_trait::async_trait;
use graph_flow::{NextAction, Result, Task, TaskResult};
use tracing::info;

use super::{node_ids, read_upload, stage_failure};
use crate::collaborators::Collaborators;
use crate::models::ClinicalDataRecord;
use crate::oracle::ExtractionMode;
use crate::state::WorkflowState;

pub const STAGE: &str = "Failed to extract data from image";

/// Extracts the clinical record from a photographed or scanned lab report.
pub struct ExtractFromImageTask {
    deps: Collaborators,
}

impl ExtractFromImageTask {
    pub fn new(deps: Collaborators) -> Self {
        Self { deps }
    }

    async fn extract(&self, state: &WorkflowState) -> anyhow::Result<ClinicalDataRecord> {
        let image = read_upload(state.file_path()).await?;
        self.deps
            .extractor
            .extract(&image, ExtractionMode::Image)
            .await
    }
}

#[async_trait]
impl Task<WorkflowState> for ExtractFromImageTask {
    fn id(&self) -> &str {
        node_ids::EXTRACT_FROM_IMAGE
    }

    async fn run(&self, state: &mut WorkflowState) -> Result<TaskResult> {
        info!(user_id = %state.user_id(), "running task: {}", self.id());

        match self.extract(state).await {
            Ok(record) => {
                state.set_structured_data(record);
                Ok(TaskResult::new_with_status(
                    NextAction::Continue,
                    Some("Clinical data extracted from image".to_string()),
                ))
            }
            Err(e) => Ok(stage_failure(state, STAGE, &e)),
        }
    }
}

use async_trait::async_trait;
use graph_flow::{NextAction, Result, Task, TaskResult};
use tracing::info;

use super::{node_ids, read_upload, stage_failure};
use crate::collaborators::Collaborators;
use crate::models::ImageType;
use crate::state::WorkflowState;

pub const STAGE: &str = "Failed to classify image";

/// Asks the classifier whether an image is a lab report, a scan, or neither.
pub struct ClassifyImageTask {
    deps: Collaborators,
}

impl ClassifyImageTask {
    pub fn new(deps: Collaborators) -> Self {
        Self { deps }
    }

    async fn classify(&self, state: &WorkflowState) -> anyhow::Result<String> {
        let image = read_upload(state.file_path()).await?;
        self.deps.classifier.classify(&image).await
    }
}

#[async_trait]
impl Task<WorkflowState> for ClassifyImageTask {
    fn id(&self) -> &str {
        node_ids::CLASSIFY_IMAGE
    }

    async fn run(&self, state: &mut WorkflowState) -> Result<TaskResult> {
        info!(user_id = %state.user_id(), "running task: {}", self.id());

        match self.classify(state).await {
            Ok(label) => {
                let image_type = ImageType::from_oracle_label(&label);
                info!(raw_label = %label.trim(), image_type = ?image_type, "Image classified");
                state.set_image_type(image_type);
                Ok(TaskResult::new_with_status(
                    NextAction::Continue,
                    Some(format!("Image classified as {:?}", image_type)),
                ))
            }
            Err(e) => Ok(stage_failure(state, STAGE, &e)),
        }
    }
}

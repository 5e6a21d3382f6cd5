use std::path::Path;

use async_trait::async_trait;
use graph_flow::{NextAction, Result, Task, TaskResult};
use tracing::info;

use super::{convert_file, fetch_history, node_ids, read_upload, stage_failure};
use crate::collaborators::{Collaborators, load_corpus};
use crate::models::DiagnosisRecord;
use crate::oracle::DiagnosisPayload;
use crate::state::WorkflowState;

pub const STAGE: &str = "Failed to generate scan-based diagnosis";

/// Diagnoses a scan image directly against the visual corpus.
///
/// The stored clinical record is written back unchanged next to the new diagnosis (an
/// all-null record when the user has no history); scans never contribute lab values.
pub struct DiagnoseFromScanTask {
    deps: Collaborators,
}

fn is_dicom_path(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("dcm"))
}

impl DiagnoseFromScanTask {
    pub fn new(deps: Collaborators) -> Self {
        Self { deps }
    }

    async fn scan_bytes(&self, path: &Path) -> anyhow::Result<Vec<u8>> {
        if is_dicom_path(path) {
            let converted = convert_file(self.deps.converter.clone(), path).await?;
            return read_upload(&converted).await;
        }
        read_upload(path).await
    }

    async fn diagnose(&self, state: &WorkflowState) -> anyhow::Result<DiagnosisRecord> {
        let user_id = state.user_id();
        let image = self.scan_bytes(state.file_path()).await?;
        let history = fetch_history(self.deps.profiles.as_ref(), user_id).await;
        let corpus = load_corpus(&self.deps.visual_corpus).await?;

        let diagnosis = self
            .deps
            .diagnostician
            .diagnose(DiagnosisPayload::Visual {
                image: &image,
                corpus: &corpus,
                prior: history.as_ref().map(|h| &h.latest_diagnostic_response),
            })
            .await?;

        let clinical = history
            .map(|h| h.structured_clinical_data)
            .unwrap_or_default();
        self.deps.profiles.put(user_id, &clinical, &diagnosis).await?;
        info!(user_id = %user_id, alert_color = ?diagnosis.alert_color, "Stored scan diagnosis");

        Ok(diagnosis)
    }
}

#[async_trait]
impl Task<WorkflowState> for DiagnoseFromScanTask {
    fn id(&self) -> &str {
        node_ids::DIAGNOSE_FROM_SCAN
    }

    async fn run(&self, state: &mut WorkflowState) -> Result<TaskResult> {
        info!(user_id = %state.user_id(), "running task: {}", self.id());

        match self.diagnose(state).await {
            Ok(diagnosis) => {
                state.succeed(diagnosis);
                Ok(TaskResult::new_with_status(
                    NextAction::End,
                    Some("Scan-based diagnosis generated".to_string()),
                ))
            }
            Err(e) => Ok(stage_failure(state, STAGE, &e)),
        }
    }
}

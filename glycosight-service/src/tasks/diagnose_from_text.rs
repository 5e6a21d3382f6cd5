use async_trait::async_trait;
use graph_flow::{NextAction, Result, Task, TaskResult};
use tracing::info;

use super::{fetch_history, node_ids, stage_failure};
use crate::collaborators::{Collaborators, load_corpus};
use crate::merge::merge_clinical_data;
use crate::models::DiagnosisRecord;
use crate::oracle::DiagnosisPayload;
use crate::state::WorkflowState;

pub const STAGE: &str = "Failed to generate text-based diagnosis";

/// Merges the extracted record into the user's history, diagnoses it against the text
/// corpus, and persists the merged record with the new diagnosis.
pub struct DiagnoseFromTextTask {
    deps: Collaborators,
}

impl DiagnoseFromTextTask {
    pub fn new(deps: Collaborators) -> Self {
        Self { deps }
    }

    async fn diagnose(&self, state: &WorkflowState) -> anyhow::Result<DiagnosisRecord> {
        let user_id = state.user_id();
        let history = fetch_history(self.deps.profiles.as_ref(), user_id).await;

        let merged = merge_clinical_data(
            history.as_ref().map(|h| &h.structured_clinical_data),
            state.structured_data(),
        );
        let prior = history.as_ref().map(|h| &h.latest_diagnostic_response);
        let corpus = load_corpus(&self.deps.text_corpus).await?;

        let diagnosis = self
            .deps
            .diagnostician
            .diagnose(DiagnosisPayload::Text {
                record: &merged,
                corpus: &corpus,
                prior,
            })
            .await?;

        self.deps.profiles.put(user_id, &merged, &diagnosis).await?;
        info!(user_id = %user_id, alert_color = ?diagnosis.alert_color, "Stored merged clinical record and diagnosis");

        Ok(diagnosis)
    }
}

#[async_trait]
impl Task<WorkflowState> for DiagnoseFromTextTask {
    fn id(&self) -> &str {
        node_ids::DIAGNOSE_FROM_TEXT
    }

    async fn run(&self, state: &mut WorkflowState) -> Result<TaskResult> {
        info!(user_id = %state.user_id(), "running task: {}", self.id());

        match self.diagnose(state).await {
            Ok(diagnosis) => {
                state.succeed(diagnosis);
                Ok(TaskResult::new_with_status(
                    NextAction::End,
                    Some("Text-based diagnosis generated".to_string()),
                ))
            }
            Err(e) => Ok(stage_failure(state, STAGE, &e)),
        }
    }
}

use std::path::{Path, PathBuf};

use graph_flow::FlowState;

use crate::models::{ClinicalDataRecord, DiagnosisRecord, ImageType, InputType};

/// Terminal result of a run. A run ends with a diagnosis or with a message, never both.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Success(DiagnosisRecord),
    Failure(String),
}

/// Context threaded through the diagnosis graph for a single upload.
#[derive(Debug, Clone)]
pub struct WorkflowState {
    user_id: String,
    file_path: PathBuf,
    input_type: Option<InputType>,
    raw_input_type: String,
    image_type: Option<ImageType>,
    structured_data: Option<ClinicalDataRecord>,
    outcome: Option<Outcome>,
}

impl WorkflowState {
    /// Fresh state for a run. An unrecognised `input_type` is kept (for logging) but routes
    /// the run to the unsupported-input branch.
    pub fn new(
        user_id: impl Into<String>,
        file_path: impl Into<PathBuf>,
        input_type: impl Into<String>,
    ) -> Self {
        let raw_input_type = input_type.into();
        Self {
            user_id: user_id.into(),
            file_path: file_path.into(),
            input_type: InputType::parse(&raw_input_type),
            raw_input_type,
            image_type: None,
            structured_data: None,
            outcome: None,
        }
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn file_path(&self) -> &Path {
        &self.file_path
    }

    pub fn input_type(&self) -> Option<InputType> {
        self.input_type
    }

    pub fn raw_input_type(&self) -> &str {
        &self.raw_input_type
    }

    pub fn image_type(&self) -> Option<ImageType> {
        self.image_type
    }

    pub fn structured_data(&self) -> Option<&ClinicalDataRecord> {
        self.structured_data.as_ref()
    }

    pub fn outcome(&self) -> Option<&Outcome> {
        self.outcome.as_ref()
    }

    pub fn final_response(&self) -> Option<&DiagnosisRecord> {
        match &self.outcome {
            Some(Outcome::Success(record)) => Some(record),
            _ => None,
        }
    }

    pub fn error_message(&self) -> Option<&str> {
        match &self.outcome {
            Some(Outcome::Failure(message)) => Some(message),
            _ => None,
        }
    }

    /// Point the run at a converted copy of the upload.
    pub fn set_file_path(&mut self, path: impl Into<PathBuf>) {
        self.file_path = path.into();
    }

    pub fn set_image_type(&mut self, image_type: ImageType) {
        self.image_type = Some(image_type);
    }

    pub fn set_structured_data(&mut self, record: ClinicalDataRecord) {
        self.structured_data = Some(record);
    }

    pub fn succeed(&mut self, diagnosis: DiagnosisRecord) {
        self.outcome = Some(Outcome::Success(diagnosis));
    }

    pub fn fail(&mut self, message: impl Into<String>) {
        self.outcome = Some(Outcome::Failure(message.into()));
    }

    pub fn into_outcome(self) -> Option<Outcome> {
        self.outcome
    }
}

impl FlowState for WorkflowState {
    fn failure(&self) -> Option<&str> {
        self.error_message()
    }
}

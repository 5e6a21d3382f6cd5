//! Boundary contracts for the language-model collaborators.
//!
//! The workflow only sees these traits; `OpenRouterClient` implements all three against a
//! hosted multimodal model, and tests substitute fakes.

pub mod openrouter;
pub mod prompts;

use async_trait::async_trait;

use crate::models::{ClinicalDataRecord, DiagnosisRecord};

pub use openrouter::OpenRouterClient;

/// How the extraction oracle should read the content it is given.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionMode {
    /// A PDF document
    Document,
    /// A raster image of a report
    Image,
}

/// Static reference document the diagnosis oracle grounds its citations in.
#[derive(Debug, Clone)]
pub struct ReferenceDocument {
    /// Citation tag the model must use, e.g. `ADA`
    pub tag: String,
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// Everything the diagnosis oracle receives for one run.
#[derive(Debug, Clone, Copy)]
pub enum DiagnosisPayload<'a> {
    /// Merged clinical record, reference corpus, prior diagnosis context
    Text {
        record: &'a ClinicalDataRecord,
        corpus: &'a ReferenceDocument,
        prior: Option<&'a DiagnosisRecord>,
    },
    /// Encoded scan image, reference corpus, prior diagnosis context
    Visual {
        image: &'a [u8],
        corpus: &'a ReferenceDocument,
        prior: Option<&'a DiagnosisRecord>,
    },
}

impl DiagnosisPayload<'_> {
    pub fn mode(&self) -> &'static str {
        match self {
            DiagnosisPayload::Text { .. } => "text",
            DiagnosisPayload::Visual { .. } => "visual",
        }
    }
}

#[async_trait]
pub trait ExtractionOracle: Send + Sync {
    async fn extract(
        &self,
        content: &[u8],
        mode: ExtractionMode,
    ) -> anyhow::Result<ClinicalDataRecord>;
}

#[async_trait]
pub trait ClassificationOracle: Send + Sync {
    /// Raw label as answered by the model; callers normalise it.
    async fn classify(&self, image: &[u8]) -> anyhow::Result<String>;
}

#[async_trait]
pub trait DiagnosisOracle: Send + Sync {
    async fn diagnose(&self, payload: DiagnosisPayload<'_>) -> anyhow::Result<DiagnosisRecord>;
}

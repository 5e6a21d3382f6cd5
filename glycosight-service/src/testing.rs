//! Fakes and fixtures shared by the unit tests.

use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::anyhow;
use async_trait::async_trait;
use tempfile::TempDir;

use crate::collaborators::Collaborators;
use crate::config::CorpusConfig;
use crate::convert::{ConversionError, FormatConverter};
use crate::models::{
    AlertColor, Citation, ClinicalDataRecord, ConfidenceScore, DiagnosisRecord, LabResultDetail,
    ParameterAnalysis, StatusFlag, StoredProfile,
};
use crate::oracle::{
    ClassificationOracle, DiagnosisOracle, DiagnosisPayload, ExtractionMode, ExtractionOracle,
};
use crate::store::{InMemoryProfileStore, ProfileStore, StoreError};

pub fn sample_diagnosis(color: AlertColor) -> DiagnosisRecord {
    DiagnosisRecord {
        summary: "HbA1c within the reference range.".to_string(),
        analysis: vec![ParameterAnalysis {
            parameter_name: "HbA1c".to_string(),
            analysis_text: "5.4 % is within the normal range [1]".to_string(),
        }],
        citations: vec![Citation {
            id: 1,
            reference: "ADA Standards of Care, section 2".to_string(),
            source: "ADA".to_string(),
        }],
        final_diagnosis: "No evidence of diabetes".to_string(),
        confidence_score: ConfidenceScore {
            score: 82,
            justification: "Single recent HbA1c measurement".to_string(),
        },
        alert_color: color,
    }
}

/// Record with an HbA1c value and a report date.
pub fn sample_record(hba1c: Option<f64>, report_date: &str) -> ClinicalDataRecord {
    let mut record = ClinicalDataRecord::default();
    record.patient_info.name = Some("Jane Doe".to_string());
    record.patient_info.report_date = Some(report_date.to_string());
    if let Some(value) = hba1c {
        record.lab_results.hba1c = LabResultDetail {
            value: Some(value),
            unit: Some("%".to_string()),
            status_flag: Some(StatusFlag::Normal),
        };
    }
    record
}

pub struct FakeExtractor {
    record: Option<ClinicalDataRecord>,
    pub calls: Mutex<Vec<ExtractionMode>>,
}

impl FakeExtractor {
    pub fn returning(record: ClinicalDataRecord) -> Self {
        Self {
            record: Some(record),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            record: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn modes(&self) -> Vec<ExtractionMode> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ExtractionOracle for FakeExtractor {
    async fn extract(
        &self,
        _content: &[u8],
        mode: ExtractionMode,
    ) -> anyhow::Result<ClinicalDataRecord> {
        self.calls.lock().unwrap().push(mode);
        self.record
            .clone()
            .ok_or_else(|| anyhow!("model returned malformed JSON"))
    }
}

pub struct FakeClassifier {
    label: Option<String>,
    pub calls: AtomicUsize,
}

impl FakeClassifier {
    pub fn answering(label: &str) -> Self {
        Self {
            label: Some(label.to_string()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            label: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ClassificationOracle for FakeClassifier {
    async fn classify(&self, _image: &[u8]) -> anyhow::Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.label
            .clone()
            .ok_or_else(|| anyhow!("classification request failed"))
    }
}

/// What the fake diagnostician was asked.
#[derive(Debug, Clone)]
pub struct DiagnosisCall {
    pub mode: &'static str,
    pub corpus_tag: String,
    pub record: Option<ClinicalDataRecord>,
    pub image: Option<Vec<u8>>,
    pub prior: Option<DiagnosisRecord>,
}

pub struct FakeDiagnostician {
    color: Option<AlertColor>,
    pub calls: Mutex<Vec<DiagnosisCall>>,
}

impl FakeDiagnostician {
    pub fn answering(color: AlertColor) -> Self {
        Self {
            color: Some(color),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            color: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn recorded(&self) -> Vec<DiagnosisCall> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl DiagnosisOracle for FakeDiagnostician {
    async fn diagnose(&self, payload: DiagnosisPayload<'_>) -> anyhow::Result<DiagnosisRecord> {
        let call = match payload {
            DiagnosisPayload::Text {
                record,
                corpus,
                prior,
            } => DiagnosisCall {
                mode: payload.mode(),
                corpus_tag: corpus.tag.clone(),
                record: Some(record.clone()),
                image: None,
                prior: prior.cloned(),
            },
            DiagnosisPayload::Visual {
                image,
                corpus,
                prior,
            } => DiagnosisCall {
                mode: payload.mode(),
                corpus_tag: corpus.tag.clone(),
                record: None,
                image: Some(image.to_vec()),
                prior: prior.cloned(),
            },
        };
        self.calls.lock().unwrap().push(call);
        self.color
            .map(sample_diagnosis)
            .ok_or_else(|| anyhow!("diagnosis request timed out"))
    }
}

pub const CONVERTED_BYTES: &[u8] = b"converted-jpeg";

pub struct FakeConverter {
    fail: bool,
    pub calls: AtomicUsize,
}

impl FakeConverter {
    pub fn working() -> Self {
        Self {
            fail: false,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl FormatConverter for FakeConverter {
    fn output_extension(&self) -> &'static str {
        "jpg"
    }

    fn convert(&self, _source: &[u8]) -> Result<Vec<u8>, ConversionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(ConversionError::NotDicom);
        }
        Ok(CONVERTED_BYTES.to_vec())
    }
}

/// Profile store whose reads and/or writes fail.
pub struct BrokenProfileStore {
    pub fail_get: bool,
    pub fail_put: bool,
    pub inner: InMemoryProfileStore,
}

#[async_trait]
impl ProfileStore for BrokenProfileStore {
    async fn get(&self, user_id: &str) -> Result<Option<StoredProfile>, StoreError> {
        if self.fail_get {
            return Err(StoreError::Malformed("connection reset".to_string()));
        }
        self.inner.get(user_id).await
    }

    async fn put(
        &self,
        user_id: &str,
        clinical: &ClinicalDataRecord,
        diagnosis: &DiagnosisRecord,
    ) -> Result<(), StoreError> {
        if self.fail_put {
            return Err(StoreError::Malformed("write rejected".to_string()));
        }
        self.inner.put(user_id, clinical, diagnosis).await
    }
}

/// Fakes wired into a `Collaborators` bundle, with a temp directory holding the corpora
/// and any uploads. Swap fields before calling [`Harness::collaborators`].
pub struct Harness {
    pub dir: TempDir,
    pub extractor: Arc<FakeExtractor>,
    pub classifier: Arc<FakeClassifier>,
    pub diagnostician: Arc<FakeDiagnostician>,
    pub converter: Arc<FakeConverter>,
    pub profiles: Arc<InMemoryProfileStore>,
}

impl Harness {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("ADA.pdf"), b"%PDF-1.4 text corpus").unwrap();
        std::fs::write(dir.path().join("VisualRAG.pdf"), b"%PDF-1.4 visual corpus").unwrap();

        Self {
            dir,
            extractor: Arc::new(FakeExtractor::returning(sample_record(
                Some(5.4),
                "2024-06-01",
            ))),
            classifier: Arc::new(FakeClassifier::answering("TRUE")),
            diagnostician: Arc::new(FakeDiagnostician::answering(AlertColor::Green)),
            converter: Arc::new(FakeConverter::working()),
            profiles: Arc::new(InMemoryProfileStore::new()),
        }
    }

    pub fn collaborators(&self) -> Collaborators {
        Collaborators {
            extractor: self.extractor.clone(),
            classifier: self.classifier.clone(),
            diagnostician: self.diagnostician.clone(),
            converter: self.converter.clone(),
            profiles: self.profiles.clone(),
            text_corpus: CorpusConfig {
                path: self.dir.path().join("ADA.pdf"),
                tag: "ADA".to_string(),
            },
            visual_corpus: CorpusConfig {
                path: self.dir.path().join("VisualRAG.pdf"),
                tag: "vRAG".to_string(),
            },
        }
    }

    /// Write an uploaded file into the harness directory.
    pub fn upload(&self, name: &str, bytes: &[u8]) -> PathBuf {
        let path = self.dir.path().join(name);
        std::fs::write(&path, bytes).unwrap();
        path
    }
}

use serde::{Deserialize, Serialize};

/// Kind of upload the caller declares.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputType {
    Pdf,
    Image,
    Dicom,
}

impl InputType {
    pub const ALL: [InputType; 3] = [InputType::Pdf, InputType::Image, InputType::Dicom];

    /// Exact, case-sensitive match on the wire values `pdf`, `image` and `dicom`.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "pdf" => Some(InputType::Pdf),
            "image" => Some(InputType::Image),
            "dicom" => Some(InputType::Dicom),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            InputType::Pdf => "pdf",
            InputType::Image => "image",
            InputType::Dicom => "dicom",
        }
    }
}

/// Content classification of an uploaded image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageType {
    /// A photographed or scanned lab report; the classifier answers `TRUE`
    Report,
    /// A medical scan (retina, foot, ...); the classifier answers `FALSE`
    Scan,
    /// Anything else, including `NEITHER` and unexpected answers
    Neither,
}

impl ImageType {
    pub const ALL: [ImageType; 3] = [ImageType::Report, ImageType::Scan, ImageType::Neither];

    /// Normalise a raw classifier answer (trim, uppercase) and map it to a label.
    pub fn from_oracle_label(raw: &str) -> Self {
        Self::from_normalized(&raw.trim().to_uppercase())
    }

    /// Map an already normalised label. Only the exact strings `TRUE` and `FALSE` are
    /// recognised; everything else is [`ImageType::Neither`].
    pub fn from_normalized(label: &str) -> Self {
        match label {
            "TRUE" => ImageType::Report,
            "FALSE" => ImageType::Scan,
            _ => ImageType::Neither,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusFlag {
    #[serde(alias = "Normal", alias = "NORMAL")]
    Normal,
    #[serde(alias = "High", alias = "HIGH")]
    High,
    #[serde(alias = "Low", alias = "LOW")]
    Low,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LabResultDetail {
    #[serde(default)]
    pub value: Option<f64>,
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default)]
    pub status_flag: Option<StatusFlag>,
}

impl LabResultDetail {
    pub fn is_empty(&self) -> bool {
        self.value.is_none() && self.unit.is_none() && self.status_flag.is_none()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PatientInfo {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub age_years: Option<u32>,
    #[serde(default)]
    pub gender: Option<String>,
    #[serde(default)]
    pub report_date: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LabResults {
    #[serde(default)]
    pub hba1c: LabResultDetail,
    #[serde(default)]
    pub fasting_plasma_glucose: LabResultDetail,
    #[serde(default)]
    pub two_hr_ogtt_glucose: LabResultDetail,
    #[serde(default)]
    pub random_plasma_glucose: LabResultDetail,
    #[serde(default)]
    pub bmi: LabResultDetail,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SymptomsHistory {
    #[serde(default)]
    pub polyuria: Option<bool>,
    #[serde(default)]
    pub polydipsia: Option<bool>,
    #[serde(default)]
    pub polyphagia: Option<bool>,
    #[serde(default)]
    pub unexplained_weight_loss: Option<bool>,
    #[serde(default)]
    pub fatigue: Option<bool>,
    #[serde(default)]
    pub blurred_vision: Option<bool>,
    #[serde(default)]
    pub slow_healing_sores_infections: Option<bool>,
    #[serde(default)]
    pub family_history_diabetes: Option<bool>,
    #[serde(default)]
    pub ethnicity: Option<String>,
    #[serde(default)]
    pub history_gestational_diabetes: Option<bool>,
    #[serde(default)]
    pub history_prediabetes: Option<bool>,
    #[serde(default)]
    pub history_hypertension: Option<bool>,
    #[serde(default)]
    pub history_dyslipidemia: Option<bool>,
    #[serde(default)]
    pub history_pcos: Option<bool>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub current_medications_keywords: Vec<String>,
    #[serde(default)]
    pub other_relevant_medical_history: Option<String>,
}

/// Clinical parameters extracted from one document. Every leaf is nullable and always
/// serialised, so an absent value reads as `null` rather than a missing key.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClinicalDataRecord {
    #[serde(default)]
    pub patient_info: PatientInfo,
    #[serde(default)]
    pub lab_results: LabResults,
    #[serde(default)]
    pub symptoms_history: SymptomsHistory,
}

impl ClinicalDataRecord {
    /// True when no field carries data.
    pub fn is_empty(&self) -> bool {
        *self == ClinicalDataRecord::default()
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<Vec<String>>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterAnalysis {
    pub parameter_name: String,
    pub analysis_text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Citation {
    pub id: u32,
    pub reference: String,
    /// Corpus tag, e.g. `ADA` or `vRAG`
    #[serde(rename = "url")]
    pub source: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceScore {
    pub score: u8,
    pub justification: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertColor {
    #[serde(alias = "Red", alias = "RED")]
    Red,
    #[serde(alias = "Yellow", alias = "YELLOW")]
    Yellow,
    #[serde(alias = "Green", alias = "GREEN")]
    Green,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiabetesStatus {
    Diabetic,
    Prediabetic,
    NonDiabetic,
}

impl AlertColor {
    pub fn status(&self) -> DiabetesStatus {
        match self {
            AlertColor::Red => DiabetesStatus::Diabetic,
            AlertColor::Yellow => DiabetesStatus::Prediabetic,
            AlertColor::Green => DiabetesStatus::NonDiabetic,
        }
    }
}

/// Structured diagnostic opinion returned by the diagnosis oracle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagnosisRecord {
    pub summary: String,
    #[serde(default)]
    pub analysis: Vec<ParameterAnalysis>,
    #[serde(default)]
    pub citations: Vec<Citation>,
    pub final_diagnosis: String,
    pub confidence_score: ConfidenceScore,
    pub alert_color: AlertColor,
}

impl DiagnosisRecord {
    pub fn validate(&self) -> Result<(), String> {
        if self.confidence_score.score > 100 {
            return Err(format!(
                "confidence score {} is outside 0-100",
                self.confidence_score.score
            ));
        }
        Ok(())
    }
}

/// Latest clinical snapshot and diagnosis persisted per user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredProfile {
    pub id: String,
    pub structured_clinical_data: ClinicalDataRecord,
    pub latest_diagnostic_response: DiagnosisRecord,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

pub const EXTRACTION_PROMPT: &str = r#"You are a clinical data analyst. The attached content is a medical report, prescription, history, summary or blood report.

Extract the patient parameters into a JSON object with exactly the structure of this template:

{template}

Rules:
- Use null for anything that is absent, not applicable, or present without a value.
- "status_flag" is "normal", "high" or "low" relative to the reference range, and null when the value is null.
- Every symptoms_history key except "ethnicity", "current_medications_keywords" and "other_relevant_medical_history" is a boolean or null.
- "current_medications_keywords" lists medication keywords; use [] when none are mentioned.
- "report_date" is YYYY-MM-DD, or null when no date is given.
- Reply with the JSON object only."#;

pub const CLASSIFICATION_PROMPT: &str = r#"Decide whether the attached image is a medical report or a medical scan.
Reply with exactly one word:
TRUE if it is a medical report,
FALSE if it is a medical scan,
NEITHER if it is neither.
Do not add any other text."#;

const DIAGNOSIS_FORMAT: &str = r#"Reply with a JSON object only, with this structure:

{
  "summary": "brief summary of the patient's condition (at most 100 words)",
  "analysis": [
    { "parameter_name": "name", "analysis_text": "at most two short sentences citing [1]" }
  ],
  "citations": [
    { "id": 1, "reference": "page, subsection, section and document title", "url": "{tag}" }
  ],
  "final_diagnosis": "diabetic, prediabetic or non-diabetic, with reasoning (at most 200 words)",
  "confidence_score": { "score": 0, "justification": "how the score was reached and what would raise it" },
  "alert_color": "red for diabetic, yellow for prediabetic, green for non-diabetic"
}

In "analysis_text" cite only by number, e.g. [1]. Every citation's "url" is exactly "{tag}". The score is an integer from 0 to 100."#;

pub const TEXT_DIAGNOSIS_PROMPT: &str = r#"You are a physician specialising in Type 2 diabetes. Compare the patient's parameters and their previous analysis with the attached guideline corpus and give a diagnosis of Type 2 diabetes status only.

Analyse only parameters that have a value, using their exact names from the patient JSON. If the previous analysis is empty, rely on the parameters alone. If the parameters are insufficient, say so in the summary and keep the analysis empty.

{format}

Patient parameters:
{record}

Previous analysis:
{prior}"#;

pub const VISUAL_DIAGNOSIS_PROMPT: &str = r#"You are a physician specialising in Type 2 diabetes. The first attachment is a patient scan (for example retina, foot, pancreas, MRI or DXA); the second is a reference corpus. Confirm the scan is relevant to diabetes, compare it with the corpus, take the previous analysis into account, and give a diagnosis of Type 2 diabetes status only.

Images inside the corpus are reference material and must not be diagnosed. A scan alone rarely supports a confident diagnosis; reflect that in the confidence score.

{format}

Previous analysis:
{prior}"#;

pub fn diagnosis_format(tag: &str) -> String {
    DIAGNOSIS_FORMAT.replace("{tag}", tag)
}

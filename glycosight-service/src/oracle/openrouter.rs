use std::io::{Cursor, Write};

use anyhow::{Context as _, anyhow};
use async_trait::async_trait;
use base64::{Engine as _, engine::general_purpose::STANDARD};
use image::{DynamicImage, ImageFormat};
use pdf2image::{PDF, Pages};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tracing::{debug, info};

use super::{
    ClassificationOracle, DiagnosisOracle, DiagnosisPayload, ExtractionMode, ExtractionOracle,
    ReferenceDocument, prompts,
};
use crate::config::LlmConfig;
use crate::models::{ClinicalDataRecord, DiagnosisRecord};

/// Chat-completions client for an OpenAI-compatible multimodal endpoint (OpenRouter by
/// default). Implements every oracle the workflow needs.
#[derive(Clone)]
pub struct OpenRouterClient {
    http: Client,
    config: LlmConfig,
}

impl OpenRouterClient {
    pub fn new(config: LlmConfig) -> anyhow::Result<Self> {
        let http = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self { http, config })
    }

    /// Send one user message made of `content` parts and return the reply text.
    async fn complete(&self, content: Vec<Value>, json_reply: bool) -> anyhow::Result<String> {
        let mut payload = json!({
            "model": self.config.model,
            "messages": [
                {
                    "role": "user",
                    "content": content
                }
            ],
            "max_tokens": self.config.max_tokens
        });
        if json_reply {
            payload["response_format"] = json!({ "type": "json_object" });
        }

        let url = format!(
            "{}/chat/completions",
            self.config.base_url.trim_end_matches('/')
        );
        let response = self
            .http
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .header("Content-Type", "application/json")
            .json(&payload)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(anyhow!("LLM API request failed: {}", response.status()));
        }

        let response_json: Value = response.json().await?;
        let reply = response_json["choices"][0]["message"]["content"]
            .as_str()
            .ok_or_else(|| anyhow!("Invalid response format from LLM"))?;

        debug!(model = %self.config.model, chars = reply.len(), "LLM reply received");
        Ok(reply.to_string())
    }

    async fn complete_json<T: DeserializeOwned>(&self, content: Vec<Value>) -> anyhow::Result<T> {
        let reply = self.complete(content, true).await?;
        parse_json_reply(&reply)
    }
}

#[async_trait]
impl ExtractionOracle for OpenRouterClient {
    async fn extract(
        &self,
        content: &[u8],
        mode: ExtractionMode,
    ) -> anyhow::Result<ClinicalDataRecord> {
        let template = serde_json::to_string_pretty(&ClinicalDataRecord::default())?;
        let mut parts = vec![text_part(
            &prompts::EXTRACTION_PROMPT.replace("{template}", &template),
        )];

        match mode {
            ExtractionMode::Document => {
                let pages = render_pdf_pages(content.to_vec()).await?;
                info!(pages = pages.len(), "Rendered PDF pages for extraction");
                for page in &pages {
                    parts.push(png_part(page)?);
                }
            }
            ExtractionMode::Image => parts.push(image_part(content)),
        }

        self.complete_json(parts).await
    }
}

#[async_trait]
impl ClassificationOracle for OpenRouterClient {
    async fn classify(&self, image: &[u8]) -> anyhow::Result<String> {
        let parts = vec![image_part(image), text_part(prompts::CLASSIFICATION_PROMPT)];
        self.complete(parts, false).await
    }
}

#[async_trait]
impl DiagnosisOracle for OpenRouterClient {
    async fn diagnose(&self, payload: DiagnosisPayload<'_>) -> anyhow::Result<DiagnosisRecord> {
        let parts = match payload {
            DiagnosisPayload::Text {
                record,
                corpus,
                prior,
            } => {
                let prompt = prompts::TEXT_DIAGNOSIS_PROMPT
                    .replace("{format}", &prompts::diagnosis_format(&corpus.tag))
                    .replace("{record}", &serde_json::to_string_pretty(record)?)
                    .replace("{prior}", &prior_json(prior)?);
                vec![file_part(corpus), text_part(&prompt)]
            }
            DiagnosisPayload::Visual {
                image,
                corpus,
                prior,
            } => {
                let prompt = prompts::VISUAL_DIAGNOSIS_PROMPT
                    .replace("{format}", &prompts::diagnosis_format(&corpus.tag))
                    .replace("{prior}", &prior_json(prior)?);
                vec![image_part(image), file_part(corpus), text_part(&prompt)]
            }
        };

        let record: DiagnosisRecord = self.complete_json(parts).await?;
        record.validate().map_err(|e| anyhow!("Invalid diagnosis: {}", e))?;
        Ok(record)
    }
}

fn prior_json(prior: Option<&DiagnosisRecord>) -> anyhow::Result<String> {
    Ok(match prior {
        Some(record) => serde_json::to_string_pretty(record)?,
        None => "{}".to_string(),
    })
}

fn text_part(text: &str) -> Value {
    json!({ "type": "text", "text": text })
}

fn image_part(bytes: &[u8]) -> Value {
    let mime = image::guess_format(bytes)
        .map(|format| format.to_mime_type())
        .unwrap_or("image/jpeg");
    json!({
        "type": "image_url",
        "image_url": {
            "url": format!("data:{};base64,{}", mime, STANDARD.encode(bytes))
        }
    })
}

fn png_part(page: &DynamicImage) -> anyhow::Result<Value> {
    let mut buffer = Vec::new();
    page.write_to(&mut Cursor::new(&mut buffer), ImageFormat::Png)
        .map_err(|e| anyhow!("Failed to encode image: {}", e))?;
    Ok(image_part(&buffer))
}

fn file_part(document: &ReferenceDocument) -> Value {
    json!({
        "type": "file",
        "file": {
            "filename": document.file_name,
            "file_data": format!("data:application/pdf;base64,{}", STANDARD.encode(&document.bytes))
        }
    })
}

/// Render every page of a PDF to an image.
async fn render_pdf_pages(pdf_bytes: Vec<u8>) -> anyhow::Result<Vec<DynamicImage>> {
    let pages = tokio::task::spawn_blocking(move || -> anyhow::Result<Vec<DynamicImage>> {
        let mut scratch = tempfile::Builder::new().suffix(".pdf").tempfile()?;
        scratch.write_all(&pdf_bytes)?;
        scratch.flush()?;

        let pdf = PDF::from_file(scratch.path()).map_err(|e| anyhow!("Failed to load PDF: {}", e))?;
        pdf.render(Pages::All, None)
            .map_err(|e| anyhow!("Failed to render PDF pages: {}", e))
    })
    .await??;

    if pages.is_empty() {
        return Err(anyhow!("No images generated from PDF"));
    }
    Ok(pages)
}

/// Cut the JSON object out of a model reply (which may wrap it in prose or a code fence)
/// and deserialize it.
pub(crate) fn parse_json_reply<T: DeserializeOwned>(reply: &str) -> anyhow::Result<T> {
    let start = reply
        .find('{')
        .ok_or_else(|| anyhow!("No JSON object found in LLM reply"))?;
    let end = reply
        .rfind('}')
        .filter(|end| *end > start)
        .ok_or_else(|| anyhow!("No closing brace found in LLM reply"))?;

    serde_json::from_str(&reply[start..=end])
        .map_err(|e| anyhow!("Failed to parse LLM reply as JSON: {}", e))
}

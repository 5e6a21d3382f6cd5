use std::sync::Arc;

use anyhow::Context as _;
use tracing::{info, warn};

use crate::config::{AppConfig, CorpusConfig};
use crate::convert::{DicomConverter, FormatConverter};
use crate::oracle::{
    ClassificationOracle, DiagnosisOracle, ExtractionOracle, OpenRouterClient, ReferenceDocument,
};
use crate::store::{InMemoryProfileStore, PostgresProfileStore, ProfileStore};

/// External collaborators injected into every workflow node.
#[derive(Clone)]
pub struct Collaborators {
    pub extractor: Arc<dyn ExtractionOracle>,
    pub classifier: Arc<dyn ClassificationOracle>,
    pub diagnostician: Arc<dyn DiagnosisOracle>,
    pub converter: Arc<dyn FormatConverter>,
    pub profiles: Arc<dyn ProfileStore>,
    pub text_corpus: CorpusConfig,
    pub visual_corpus: CorpusConfig,
}

impl Collaborators {
    /// Production wiring: one LLM client for all oracles, the DICOM converter, and the
    /// Postgres profile store when `DATABASE_URL` is set.
    pub async fn from_config(config: &AppConfig) -> anyhow::Result<Self> {
        let llm = Arc::new(OpenRouterClient::new(config.llm.clone())?);

        let profiles: Arc<dyn ProfileStore> = match &config.database_url {
            Some(database_url) => {
                info!("Using PostgreSQL profile store");
                Arc::new(
                    PostgresProfileStore::connect(database_url)
                        .await
                        .context("Failed to connect to PostgreSQL")?,
                )
            }
            None => {
                warn!("DATABASE_URL not set, profiles are kept in memory only");
                Arc::new(InMemoryProfileStore::new())
            }
        };

        for corpus in [&config.text_corpus, &config.visual_corpus] {
            if !corpus.path.exists() {
                warn!(path = %corpus.path.display(), "Reference corpus not found; diagnoses will fail until it is present");
            }
        }

        Ok(Self {
            extractor: llm.clone(),
            classifier: llm.clone(),
            diagnostician: llm,
            converter: Arc::new(DicomConverter),
            profiles,
            text_corpus: config.text_corpus.clone(),
            visual_corpus: config.visual_corpus.clone(),
        })
    }
}

/// Read a reference corpus from disk.
pub async fn load_corpus(corpus: &CorpusConfig) -> anyhow::Result<ReferenceDocument> {
    let bytes = tokio::fs::read(&corpus.path)
        .await
        .with_context(|| format!("reference corpus {} unavailable", corpus.path.display()))?;
    let file_name = corpus
        .path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| format!("{}.pdf", corpus.tag));

    Ok(ReferenceDocument {
        tag: corpus.tag.clone(),
        file_name,
        bytes,
    })
}

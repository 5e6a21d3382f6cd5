use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

pub const DEFAULT_LLM_BASE_URL: &str = "https://openrouter.ai/api/v1";
pub const DEFAULT_LLM_MODEL: &str = "google/gemini-2.5-flash";
/// 4.5 MiB, the largest upload the web client accepts.
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 4_718_592;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} environment variable is required")]
    Missing(&'static str),

    #[error("{key} has invalid value {value:?}")]
    Invalid { key: &'static str, value: String },
}

/// Connection settings for the hosted language model.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub max_tokens: u32,
    pub request_timeout: Duration,
}

impl LlmConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(&process_env)
    }

    /// Build from any key lookup; `from_env` passes the process environment.
    pub fn from_lookup(lookup: &impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let api_key = lookup("OPENROUTER_API_KEY")
            .filter(|key| !key.trim().is_empty())
            .ok_or(ConfigError::Missing("OPENROUTER_API_KEY"))?;

        Ok(Self {
            api_key,
            base_url: lookup_string(lookup, "LLM_BASE_URL", DEFAULT_LLM_BASE_URL),
            model: lookup_string(lookup, "LLM_MODEL", DEFAULT_LLM_MODEL),
            max_tokens: lookup_parse(lookup, "LLM_MAX_TOKENS", 4000)?,
            request_timeout: Duration::from_secs(lookup_parse(lookup, "LLM_TIMEOUT_SECS", 120)?),
        })
    }
}

/// Location and citation tag of a static reference corpus.
#[derive(Debug, Clone)]
pub struct CorpusConfig {
    pub path: PathBuf,
    pub tag: String,
}

/// Process-wide configuration, built once at startup and passed down explicitly.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    pub llm: LlmConfig,
    /// Postgres profile store when set, in-memory otherwise
    pub database_url: Option<String>,
    pub text_corpus: CorpusConfig,
    pub visual_corpus: CorpusConfig,
    pub run_timeout: Duration,
    pub max_upload_bytes: usize,
}

impl AppConfig {
    /// Read configuration from the environment, loading `.env` first when present.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(&process_env)
    }

    pub fn from_lookup(lookup: &impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        Ok(Self {
            port: lookup_parse(lookup, "PORT", 3000)?,
            llm: LlmConfig::from_lookup(lookup)?,
            database_url: lookup("DATABASE_URL").filter(|url| !url.trim().is_empty()),
            text_corpus: CorpusConfig {
                path: PathBuf::from(lookup_string(lookup, "TEXT_CORPUS_PATH", "assets/ADA.pdf")),
                tag: "ADA".to_string(),
            },
            visual_corpus: CorpusConfig {
                path: PathBuf::from(lookup_string(
                    lookup,
                    "VISUAL_CORPUS_PATH",
                    "assets/VisualRAG.pdf",
                )),
                tag: "vRAG".to_string(),
            },
            run_timeout: Duration::from_secs(lookup_parse(lookup, "RUN_TIMEOUT_SECS", 300)?),
            max_upload_bytes: lookup_parse(lookup, "MAX_UPLOAD_BYTES", DEFAULT_MAX_UPLOAD_BYTES)?,
        })
    }
}

fn process_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

fn lookup_string(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: &str) -> String {
    lookup(key).unwrap_or_else(|| default.to_string())
}

fn lookup_parse<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match lookup(key) {
        Some(value) => parse_value(key, &value),
        None => Ok(default),
    }
}

fn parse_value<T: FromStr>(key: &'static str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::Invalid {
        key,
        value: value.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn parses_numeric_values() {
        let port: u16 = parse_value("PORT", " 8080 ").unwrap();
        assert_eq!(port, 8080);
    }

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| vars.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_only_the_api_key_is_set() {
        let config = AppConfig::from_lookup(&lookup_from(&[("OPENROUTER_API_KEY", "sk-test")]))
            .unwrap();

        assert_eq!(config.port, 3000);
        assert_eq!(config.run_timeout, Duration::from_secs(300));
        assert_eq!(config.max_upload_bytes, 4_718_592);
        assert_eq!(config.database_url, None);
        assert_eq!(config.text_corpus.path, PathBuf::from("assets/ADA.pdf"));
        assert_eq!(config.text_corpus.tag, "ADA");
        assert_eq!(config.visual_corpus.path, PathBuf::from("assets/VisualRAG.pdf"));
        assert_eq!(config.visual_corpus.tag, "vRAG");
        assert_eq!(config.llm.base_url, DEFAULT_LLM_BASE_URL);
        assert_eq!(config.llm.model, DEFAULT_LLM_MODEL);
        assert_eq!(config.llm.max_tokens, 4000);
        assert_eq!(config.llm.request_timeout, Duration::from_secs(120));
    }

    #[test]
    fn overrides_are_read_from_the_lookup() {
        let config = AppConfig::from_lookup(&lookup_from(&[
            ("OPENROUTER_API_KEY", "sk-test"),
            ("PORT", "8080"),
            ("RUN_TIMEOUT_SECS", "45"),
            ("DATABASE_URL", "postgres://localhost/glyco"),
            ("TEXT_CORPUS_PATH", "/data/ada.pdf"),
        ]))
        .unwrap();

        assert_eq!(config.port, 8080);
        assert_eq!(config.run_timeout, Duration::from_secs(45));
        assert_eq!(config.database_url.as_deref(), Some("postgres://localhost/glyco"));
        assert_eq!(config.text_corpus.path, PathBuf::from("/data/ada.pdf"));
    }

    #[test]
    fn missing_api_key_and_bad_numbers_are_errors() {
        let err = AppConfig::from_lookup(&lookup_from(&[("PORT", "3000")])).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("OPENROUTER_API_KEY")));

        let err = AppConfig::from_lookup(&lookup_from(&[
            ("OPENROUTER_API_KEY", "sk-test"),
            ("MAX_UPLOAD_BYTES", "lots"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "MAX_UPLOAD_BYTES", .. }));
    }

    #[test]
    fn invalid_numbers_are_errors() {
        let err = parse_value::<u16>("PORT", "eighty").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "PORT", .. }));
        assert_eq!(err.to_string(), "PORT has invalid value \"eighty\"");
    }
}

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use sqlx::types::Json;
use sqlx::{PgPool, Row, postgres::PgPoolOptions};
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

use crate::models::{ClinicalDataRecord, DiagnosisRecord, StoredProfile};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("stored profile is malformed: {0}")]
    Malformed(String),
}

/// Latest clinical snapshot and diagnosis per user. Writes overwrite; the last one wins.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn get(&self, user_id: &str) -> Result<Option<StoredProfile>, StoreError>;

    async fn put(
        &self,
        user_id: &str,
        clinical: &ClinicalDataRecord,
        diagnosis: &DiagnosisRecord,
    ) -> Result<(), StoreError>;
}

/// In-memory implementation of ProfileStore
#[derive(Default)]
pub struct InMemoryProfileStore {
    profiles: Arc<DashMap<String, StoredProfile>>,
}

impl InMemoryProfileStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }
}

#[async_trait]
impl ProfileStore for InMemoryProfileStore {
    async fn get(&self, user_id: &str) -> Result<Option<StoredProfile>, StoreError> {
        Ok(self.profiles.get(user_id).map(|entry| entry.clone()))
    }

    async fn put(
        &self,
        user_id: &str,
        clinical: &ClinicalDataRecord,
        diagnosis: &DiagnosisRecord,
    ) -> Result<(), StoreError> {
        self.profiles.insert(
            user_id.to_string(),
            StoredProfile {
                id: user_id.to_string(),
                structured_clinical_data: clinical.clone(),
                latest_diagnostic_response: diagnosis.clone(),
                updated_at: Utc::now(),
            },
        );
        Ok(())
    }
}

const CREATE_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS user_health_profiles (
    id TEXT PRIMARY KEY,
    structured_clinical_data JSONB NOT NULL,
    latest_diagnostic_response JSONB NOT NULL,
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
)"#;

const UPSERT_PROFILE: &str = r#"
INSERT INTO user_health_profiles (id, structured_clinical_data, latest_diagnostic_response, updated_at)
VALUES ($1, $2, $3, now())
ON CONFLICT (id) DO UPDATE SET
    structured_clinical_data = EXCLUDED.structured_clinical_data,
    latest_diagnostic_response = EXCLUDED.latest_diagnostic_response,
    updated_at = EXCLUDED.updated_at"#;

const SELECT_PROFILE: &str = r#"
SELECT id, structured_clinical_data, latest_diagnostic_response, updated_at
FROM user_health_profiles
WHERE id = $1"#;

/// Postgres-backed ProfileStore; one row per user in `user_health_profiles`.
pub struct PostgresProfileStore {
    pool: PgPool,
}

impl PostgresProfileStore {
    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(database_url)
            .await?;
        sqlx::query(CREATE_TABLE).execute(&pool).await?;
        info!("Connected to PostgreSQL profile store");
        Ok(Self { pool })
    }
}

#[async_trait]
impl ProfileStore for PostgresProfileStore {
    async fn get(&self, user_id: &str) -> Result<Option<StoredProfile>, StoreError> {
        let Some(row) = sqlx::query(SELECT_PROFILE)
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?
        else {
            return Ok(None);
        };

        let clinical: Json<ClinicalDataRecord> = row
            .try_get("structured_clinical_data")
            .map_err(|e| StoreError::Malformed(e.to_string()))?;
        let diagnosis: Json<DiagnosisRecord> = row
            .try_get("latest_diagnostic_response")
            .map_err(|e| StoreError::Malformed(e.to_string()))?;
        let updated_at: DateTime<Utc> = row.try_get("updated_at")?;

        Ok(Some(StoredProfile {
            id: row.try_get("id")?,
            structured_clinical_data: clinical.0,
            latest_diagnostic_response: diagnosis.0,
            updated_at,
        }))
    }

    async fn put(
        &self,
        user_id: &str,
        clinical: &ClinicalDataRecord,
        diagnosis: &DiagnosisRecord,
    ) -> Result<(), StoreError> {
        sqlx::query(UPSERT_PROFILE)
            .bind(user_id)
            .bind(Json(clinical))
            .bind(Json(diagnosis))
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

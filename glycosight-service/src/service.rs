use std::path::{Path, PathBuf};
use std::sync::Arc;

use axum::{
    Router,
    extract::{
        DefaultBodyLimit, Multipart, Path as UrlPath, State,
        multipart::{Field, MultipartError},
    },
    http::{HeaderValue, Request, StatusCode},
    middleware::{Next, from_fn},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
};
use graph_flow::{FlowRunner, GraphError};
use serde_json::{Value, json};
use thiserror::Error;
use tower_http::{cors::CorsLayer, limit::RequestBodyLimitLayer, trace::TraceLayer};
use tracing::{Instrument, error, info, warn};
use uuid::Uuid;

use crate::collaborators::Collaborators;
use crate::config::AppConfig;
use crate::models::{DiagnosisRecord, StoredProfile};
use crate::state::{Outcome, WorkflowState};
use crate::store::{ProfileStore, StoreError};
use crate::workflow::create_flow_runner;

pub const CORRELATION_ID_HEADER: &str = "x-correlation-id";

/// Room for multipart boundaries and the text fields on top of the file itself.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

#[derive(Debug, Error)]
pub enum ServiceError {
    /// A workflow stage failed; the message is returned verbatim.
    #[error("{0}")]
    Diagnosis(String),

    #[error("Missing form field: {0}")]
    MissingField(&'static str),

    #[error("Invalid multipart request: {0}")]
    Multipart(#[from] MultipartError),

    #[error("No profile found for user {0}")]
    ProfileNotFound(String),

    #[error("Diagnosis timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("Workflow error: {0}")]
    Workflow(GraphError),

    #[error("Workflow did not produce a final response.")]
    NoOutcome,

    #[error("Storage error: {0}")]
    Store(#[from] StoreError),

    #[error("Upload could not be stored: {0}")]
    Upload(#[from] std::io::Error),
}

impl From<GraphError> for ServiceError {
    fn from(err: GraphError) -> Self {
        match err {
            GraphError::Timeout(limit) => ServiceError::Timeout(limit),
            other => ServiceError::Workflow(other),
        }
    }
}

impl ServiceError {
    pub fn status(&self) -> StatusCode {
        match self {
            ServiceError::Diagnosis(_) => StatusCode::BAD_REQUEST,
            ServiceError::MissingField(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ServiceError::Multipart(e) => e.status(),
            ServiceError::ProfileNotFound(_) => StatusCode::NOT_FOUND,
            ServiceError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
            ServiceError::Workflow(_)
            | ServiceError::NoOutcome
            | ServiceError::Store(_)
            | ServiceError::Upload(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status();
        let detail = self.to_string();
        if status.is_server_error() {
            error!(status = %status, detail = %detail, "Request failed");
        } else {
            warn!(status = %status, detail = %detail, "Request rejected");
        }
        (status, Json(json!({ "detail": detail }))).into_response()
    }
}

#[derive(Clone)]
pub struct AppState {
    pub flow_runner: FlowRunner<WorkflowState>,
    pub profiles: Arc<dyn ProfileStore>,
    pub max_upload_bytes: usize,
}

impl AppState {
    pub fn new(deps: Collaborators, config: &AppConfig) -> Result<Self, GraphError> {
        let profiles = deps.profiles.clone();
        Ok(Self {
            flow_runner: create_flow_runner(deps, config.run_timeout)?,
            profiles,
            max_upload_bytes: config.max_upload_bytes,
        })
    }
}

/// Wire production collaborators from `config` and build the router.
pub async fn create_app(config: &AppConfig) -> anyhow::Result<Router> {
    let deps = Collaborators::from_config(config).await?;
    let state = AppState::new(deps, config)?;
    Ok(build_router(state))
}

pub fn build_router(state: AppState) -> Router {
    let body_limit = state.max_upload_bytes + MULTIPART_OVERHEAD;

    Router::new()
        .route("/", get(root))
        .route("/health", get(health_check))
        .route("/diagnose", post(diagnose))
        .route("/profiles/{user_id}", get(get_profile))
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(body_limit))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .layer(from_fn(correlation_id_middleware))
        .with_state(state)
}

/// Reuse the caller's correlation id or mint one, and run the request inside a span
/// carrying it.
async fn correlation_id_middleware(mut request: Request<axum::body::Body>, next: Next) -> Response {
    let correlation_id = request
        .headers()
        .get(CORRELATION_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .filter(|value| !value.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    let header = HeaderValue::from_str(&correlation_id).ok();
    if let Some(value) = &header {
        request
            .headers_mut()
            .insert(CORRELATION_ID_HEADER, value.clone());
    }

    let span = tracing::info_span!("http_request", correlation_id = %correlation_id);
    let mut response = next.run(request).instrument(span).await;

    if let Some(value) = header {
        response.headers_mut().insert(CORRELATION_ID_HEADER, value);
    }
    response
}

async fn root() -> Json<Value> {
    Json(json!({
        "service": "GlycoSight diagnosis API",
        "status": "GlycoSight AI API is running",
        "endpoints": {
            "POST /diagnose": "Upload a PDF, image or DICOM file (multipart: user_id, input_type, file)",
            "GET /profiles/{user_id}": "Latest stored clinical record and diagnosis",
            "GET /health": "Health check"
        }
    }))
}

async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

/// Fields of a `POST /diagnose` form once the upload is on disk.
struct DiagnoseForm {
    user_id: String,
    input_type: String,
    file_path: PathBuf,
}

async fn diagnose(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<DiagnosisRecord>, ServiceError> {
    // Removed with everything in it when the handler returns.
    let upload_dir = tempfile::tempdir()?;
    let form = read_diagnose_form(&mut multipart, upload_dir.path()).await?;

    info!(
        user_id = %form.user_id,
        input_type = %form.input_type,
        file = %form.file_path.display(),
        "Invoking diagnosis workflow"
    );

    let initial = WorkflowState::new(form.user_id.clone(), form.file_path, form.input_type);
    let result = state.flow_runner.run(initial).await?;

    info!(user_id = %form.user_id, path = ?result.visited, "Diagnosis workflow finished");

    match result.state.into_outcome() {
        Some(Outcome::Success(diagnosis)) => Ok(Json(diagnosis)),
        Some(Outcome::Failure(message)) => Err(ServiceError::Diagnosis(message)),
        None => Err(ServiceError::NoOutcome),
    }
}

async fn read_diagnose_form(
    multipart: &mut Multipart,
    upload_dir: &Path,
) -> Result<DiagnoseForm, ServiceError> {
    let mut user_id = None;
    let mut input_type = None;
    let mut file_path = None;

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "user_id" => user_id = Some(field.text().await?),
            "input_type" => input_type = Some(field.text().await?),
            "file" => file_path = Some(store_upload(field, upload_dir).await?),
            other => warn!(field = %other, "Ignoring unexpected form field"),
        }
    }

    Ok(DiagnoseForm {
        user_id: user_id
            .filter(|id| !id.trim().is_empty())
            .ok_or(ServiceError::MissingField("user_id"))?,
        input_type: input_type.ok_or(ServiceError::MissingField("input_type"))?,
        file_path: file_path.ok_or(ServiceError::MissingField("file"))?,
    })
}

async fn store_upload(field: Field<'_>, upload_dir: &Path) -> Result<PathBuf, ServiceError> {
    let file_name = upload_file_name(field.file_name());
    let bytes = field.bytes().await?;
    let path = upload_dir.join(file_name);
    tokio::fs::write(&path, &bytes).await?;
    Ok(path)
}

/// Keep only the final component of the client-supplied name; the extension drives DICOM
/// detection later on.
fn upload_file_name(raw: Option<&str>) -> String {
    raw.and_then(|name| Path::new(name).file_name())
        .map(|name| name.to_string_lossy().into_owned())
        .filter(|name| !name.is_empty() && name != "..")
        .unwrap_or_else(|| "upload".to_string())
}

async fn get_profile(
    State(state): State<AppState>,
    UrlPath(user_id): UrlPath<String>,
) -> Result<Json<StoredProfile>, ServiceError> {
    state
        .profiles
        .get(&user_id)
        .await?
        .map(Json)
        .ok_or(ServiceError::ProfileNotFound(user_id))
}

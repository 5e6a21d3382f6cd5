pub mod classify_image;
pub mod diagnose_from_scan;
pub mod diagnose_from_text;
pub mod entry;
pub mod extract_from_image;
pub mod process_dicom;
pub mod process_pdf;
pub mod reject_unsupported;

pub use classify_image::ClassifyImageTask;
pub use diagnose_from_scan::DiagnoseFromScanTask;
pub use diagnose_from_text::DiagnoseFromTextTask;
pub use entry::EntryTask;
pub use extract_from_image::ExtractFromImageTask;
pub use process_dicom::ProcessDicomTask;
pub use process_pdf::ProcessPdfTask;
pub use reject_unsupported::{RejectUnsupportedTask, UNSUPPORTED_MESSAGE};

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context as _;
use graph_flow::{NextAction, TaskResult};
use tracing::{error, info, warn};

use crate::convert::FormatConverter;
use crate::models::StoredProfile;
use crate::state::WorkflowState;
use crate::store::ProfileStore;

/// Node identifiers of the diagnosis graph
pub mod node_ids {
    pub const ENTRY: &str = "entry";
    pub const PROCESS_PDF: &str = "process_pdf";
    pub const CLASSIFY_IMAGE: &str = "classify_image";
    pub const PROCESS_DICOM: &str = "process_dicom";
    pub const EXTRACT_FROM_IMAGE: &str = "extract_from_image";
    pub const DIAGNOSE_FROM_TEXT: &str = "diagnose_from_text";
    pub const DIAGNOSE_FROM_SCAN: &str = "diagnose_from_scan";
    pub const REJECT_UNSUPPORTED: &str = "reject_unsupported";

    pub const ALL: [&str; 8] = [
        ENTRY,
        PROCESS_PDF,
        CLASSIFY_IMAGE,
        PROCESS_DICOM,
        EXTRACT_FROM_IMAGE,
        DIAGNOSE_FROM_TEXT,
        DIAGNOSE_FROM_SCAN,
        REJECT_UNSUPPORTED,
    ];
}

/// Record a stage failure as `"<stage>: <cause>"` and let the engine short-circuit.
pub(crate) fn stage_failure(
    state: &mut WorkflowState,
    stage: &str,
    err: &anyhow::Error,
) -> TaskResult {
    let message = format!("{}: {:#}", stage, err);
    error!(user_id = %state.user_id(), error = %message, "Workflow stage failed");
    state.fail(message.clone());
    TaskResult::new_with_status(NextAction::End, Some(message))
}

pub(crate) async fn read_upload(path: &Path) -> anyhow::Result<Vec<u8>> {
    tokio::fs::read(path)
        .await
        .with_context(|| format!("cannot read {}", path.display()))
}

/// Convert `source` next to itself as `<source>.<ext>` and return the new path.
pub(crate) async fn convert_file(
    converter: Arc<dyn FormatConverter>,
    source: &Path,
) -> anyhow::Result<PathBuf> {
    let bytes = read_upload(source).await?;
    let mut target = source.as_os_str().to_owned();
    target.push(".");
    target.push(converter.output_extension());
    let target = PathBuf::from(target);

    let raster = tokio::task::spawn_blocking(move || converter.convert(&bytes)).await??;
    tokio::fs::write(&target, raster)
        .await
        .with_context(|| format!("cannot write {}", target.display()))?;

    info!(source = %source.display(), target = %target.display(), "Converted medical image");
    Ok(target)
}

/// Stored history for the user. Lookup failures are logged and read as "no history".
pub(crate) async fn fetch_history(
    profiles: &dyn ProfileStore,
    user_id: &str,
) -> Option<StoredProfile> {
    match profiles.get(user_id).await {
        Ok(Some(profile)) => {
            info!(user_id = %user_id, "Loaded past records");
            Some(profile)
        }
        Ok(None) => {
            info!(user_id = %user_id, "No past records found for this user");
            None
        }
        Err(e) => {
            warn!(user_id = %user_id, error = %e, "Profile lookup failed, continuing without history");
            None
        }
    }
}

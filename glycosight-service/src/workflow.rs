use std::sync::Arc;
use std::time::Duration;

use graph_flow::{FlowRunner, Graph, GraphBuilder};
use tracing::info;

use crate::collaborators::Collaborators;
use crate::models::{ImageType, InputType};
use crate::state::WorkflowState;
use crate::tasks::{
    ClassifyImageTask, DiagnoseFromScanTask, DiagnoseFromTextTask, EntryTask,
    ExtractFromImageTask, ProcessDicomTask, ProcessPdfTask, RejectUnsupportedTask, node_ids,
};

pub const WORKFLOW_ID: &str = "glycosight_diagnosis";

/// Initial router: upload format to first processing node.
pub fn route_initial_input(state: &WorkflowState) -> &'static str {
    match state.input_type() {
        Some(InputType::Pdf) => node_ids::PROCESS_PDF,
        Some(InputType::Image) => node_ids::CLASSIFY_IMAGE,
        Some(InputType::Dicom) => node_ids::PROCESS_DICOM,
        None => node_ids::REJECT_UNSUPPORTED,
    }
}

/// Image-type router: reports take the text path, scans go straight to visual diagnosis.
pub fn route_image_type(state: &WorkflowState) -> &'static str {
    match state.image_type() {
        Some(ImageType::Report) => node_ids::EXTRACT_FROM_IMAGE,
        Some(ImageType::Scan) => node_ids::DIAGNOSE_FROM_SCAN,
        Some(ImageType::Neither) | None => node_ids::REJECT_UNSUPPORTED,
    }
}

const INITIAL_TARGETS: [&str; 4] = [
    node_ids::PROCESS_PDF,
    node_ids::CLASSIFY_IMAGE,
    node_ids::PROCESS_DICOM,
    node_ids::REJECT_UNSUPPORTED,
];

const IMAGE_TYPE_TARGETS: [&str; 3] = [
    node_ids::EXTRACT_FROM_IMAGE,
    node_ids::DIAGNOSE_FROM_SCAN,
    node_ids::REJECT_UNSUPPORTED,
];

/// Wire the diagnosis graph. Terminal nodes have no outgoing transition and end the run.
pub fn build_diagnosis_workflow(deps: Collaborators) -> graph_flow::Result<Graph<WorkflowState>> {
    let graph = GraphBuilder::<WorkflowState>::new(WORKFLOW_ID)
        .add_task(Arc::new(EntryTask))
        .add_task(Arc::new(ProcessPdfTask::new(deps.clone())))
        .add_task(Arc::new(ClassifyImageTask::new(deps.clone())))
        .add_task(Arc::new(ProcessDicomTask::new(deps.clone())))
        .add_task(Arc::new(ExtractFromImageTask::new(deps.clone())))
        .add_task(Arc::new(DiagnoseFromTextTask::new(deps.clone())))
        .add_task(Arc::new(DiagnoseFromScanTask::new(deps)))
        .add_task(Arc::new(RejectUnsupportedTask))
        .set_start_task(node_ids::ENTRY)
        .add_router(node_ids::ENTRY, route_initial_input, INITIAL_TARGETS)
        .add_router(node_ids::CLASSIFY_IMAGE, route_image_type, IMAGE_TYPE_TARGETS)
        .add_edge(node_ids::PROCESS_PDF, node_ids::DIAGNOSE_FROM_TEXT)
        .add_edge(node_ids::EXTRACT_FROM_IMAGE, node_ids::DIAGNOSE_FROM_TEXT)
        .add_edge(node_ids::PROCESS_DICOM, node_ids::DIAGNOSE_FROM_SCAN)
        .build()?;

    info!(graph = WORKFLOW_ID, "Diagnosis workflow built");
    Ok(graph)
}

/// Build the graph once and wrap it in a runner with an overall deadline.
pub fn create_flow_runner(
    deps: Collaborators,
    run_timeout: Duration,
) -> graph_flow::Result<FlowRunner<WorkflowState>> {
    let graph = Arc::new(build_diagnosis_workflow(deps)?);
    Ok(FlowRunner::new(graph).with_timeout(run_timeout))
}

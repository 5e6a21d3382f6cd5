pub mod collaborators;
pub mod config;
pub mod convert;
pub mod merge;
pub mod models;
pub mod oracle;
pub mod service;
pub mod state;
pub mod store;
pub mod tasks;
pub mod workflow;

#[cfg(test)]
mod testing;

pub use collaborators::Collaborators;
pub use config::AppConfig;
pub use service::{AppState, build_router, create_app};
pub use state::{Outcome, WorkflowState};
pub use workflow::{build_diagnosis_workflow, create_flow_runner};

pub mod error;
pub mod graph;
pub mod runner;
pub mod state;
pub mod task;

// Re-export commonly used types
pub use error::{GraphError, Result};
pub use graph::{ExecutionResult, ExecutionStatus, Graph, GraphBuilder, Transition};
pub use runner::FlowRunner;
pub use state::FlowState;
pub use task::{NextAction, Task, TaskResult};

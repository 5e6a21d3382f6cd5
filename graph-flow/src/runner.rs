//! FlowRunner – convenience wrapper that runs a shared graph over one state, end to end.
//!
//! Services build the graph once at startup and keep a `FlowRunner` in their app state;
//! every request then hands the runner a freshly initialised state. Nothing is shared
//! between runs apart from the graph itself, so concurrent runs need no locking.
//!
//! A runner can carry an overall deadline. When it elapses the in-flight task future is
//! dropped, which cancels whatever I/O it was awaiting, and the caller gets
//! [`GraphError::Timeout`]. Dropping the future returned by [`FlowRunner::run`] cancels the
//! run the same way.

use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info};

use crate::{
    error::{GraphError, Result},
    graph::{ExecutionResult, Graph},
    state::FlowState,
};

/// Shared handle that executes complete runs of one graph.
pub struct FlowRunner<S: FlowState> {
    graph: Arc<Graph<S>>,
    timeout: Option<Duration>,
}

impl<S: FlowState> Clone for FlowRunner<S> {
    fn clone(&self) -> Self {
        Self {
            graph: self.graph.clone(),
            timeout: self.timeout,
        }
    }
}

impl<S: FlowState> FlowRunner<S> {
    pub fn new(graph: Arc<Graph<S>>) -> Self {
        Self {
            graph,
            timeout: None,
        }
    }

    /// Abort runs that take longer than `timeout`.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn graph(&self) -> &Graph<S> {
        &self.graph
    }

    /// Execute the graph from its start task to completion.
    pub async fn run(&self, state: S) -> Result<ExecutionResult<S>> {
        let result = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, self.graph.execute(state))
                .await
                .map_err(|_| {
                    error!(graph = %self.graph.id, timeout = ?limit, "Graph run timed out");
                    GraphError::Timeout(limit)
                })??,
            None => self.graph.execute(state).await?,
        };

        info!(
            graph = %self.graph.id,
            path = ?result.visited,
            status = ?result.status,
            "Graph run finished"
        );
        Ok(result)
    }
}

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::{
    error::{GraphError, Result},
    state::FlowState,
    task::{NextAction, Task},
};

/// Upper bound on executed tasks per run unless the builder overrides it.
pub const DEFAULT_MAX_STEPS: usize = 64;

/// Type alias for router functions: inspect the state, name the next task.
pub type RouteFn<S> = Arc<dyn Fn(&S) -> String + Send + Sync>;

/// Outgoing transition of a task
pub enum Transition<S> {
    /// Unconditional edge to the named task
    Edge(String),
    /// Router choosing among a fixed, declared set of targets
    Router {
        route: RouteFn<S>,
        targets: Vec<String>,
    },
}

impl<S> Clone for Transition<S> {
    fn clone(&self) -> Self {
        match self {
            Transition::Edge(to) => Transition::Edge(to.clone()),
            Transition::Router { route, targets } => Transition::Router {
                route: route.clone(),
                targets: targets.clone(),
            },
        }
    }
}

impl<S> Transition<S> {
    fn targets(&self) -> Vec<&str> {
        match self {
            Transition::Edge(to) => vec![to.as_str()],
            Transition::Router { targets, .. } => targets.iter().map(String::as_str).collect(),
        }
    }
}

/// A statically wired graph of tasks over a state type `S`
pub struct Graph<S: FlowState> {
    pub id: String,
    tasks: HashMap<String, Arc<dyn Task<S>>>,
    transitions: HashMap<String, Transition<S>>,
    start_task_id: String,
    max_steps: usize,
}

impl<S: FlowState> Graph<S> {
    /// Run the graph from its start task until a task ends the run, a task has no outgoing
    /// transition, or the state records a failure.
    ///
    /// A recorded failure is checked before every task, so nothing downstream of the
    /// failing task executes.
    pub async fn execute(&self, mut state: S) -> Result<ExecutionResult<S>> {
        let mut current = self.start_task_id.clone();
        let mut visited: Vec<String> = Vec::new();

        loop {
            if let Some(message) = state.failure() {
                info!(
                    graph = %self.id,
                    skipped = %current,
                    error = %message,
                    "State carries a failure, short-circuiting to end"
                );
                break;
            }

            if visited.len() >= self.max_steps {
                return Err(GraphError::StepLimitExceeded(self.max_steps));
            }

            let task = self
                .tasks
                .get(&current)
                .cloned()
                .ok_or_else(|| GraphError::TaskNotFound(current.clone()))?;

            debug!(graph = %self.id, task = %current, "Executing task");
            let result = task.run(&mut state).await?;
            if let Some(status) = &result.status_message {
                debug!(task = %current, status = %status, "Task finished");
            }
            visited.push(current.clone());

            match result.next_action {
                NextAction::End => break,
                NextAction::GoTo(target) => {
                    if !self.tasks.contains_key(&target) {
                        return Err(GraphError::TaskNotFound(target));
                    }
                    current = target;
                }
                NextAction::Continue => match self.find_next_task(&current, &state)? {
                    Some(next) => current = next,
                    None => {
                        warn!(task = %current, "Task continued but has no outgoing transition");
                        break;
                    }
                },
            }
        }

        let status = match state.failure() {
            Some(message) => ExecutionStatus::Failed(message.to_string()),
            None => ExecutionStatus::Completed,
        };

        Ok(ExecutionResult {
            state,
            visited,
            status,
        })
    }

    /// Resolve the transition leaving `current_task_id` against the state.
    pub fn find_next_task(&self, current_task_id: &str, state: &S) -> Result<Option<String>> {
        match self.transitions.get(current_task_id) {
            None => Ok(None),
            Some(Transition::Edge(to)) => Ok(Some(to.clone())),
            Some(Transition::Router { route, targets }) => {
                let selected = route(state);
                if !targets.iter().any(|t| *t == selected) {
                    return Err(GraphError::InvalidRoute {
                        from: current_task_id.to_string(),
                        route: selected,
                    });
                }
                info!(from = %current_task_id, route = %selected, "Router selected next task");
                Ok(Some(selected))
            }
        }
    }

    /// Get the start task ID
    pub fn start_task_id(&self) -> &str {
        &self.start_task_id
    }

    /// Get a task by ID
    pub fn get_task(&self, task_id: &str) -> Option<Arc<dyn Task<S>>> {
        self.tasks.get(task_id).cloned()
    }

    pub fn task_ids(&self) -> impl Iterator<Item = &str> {
        self.tasks.keys().map(String::as_str)
    }

    /// Every target the transition leaving `task_id` may select.
    pub fn successors(&self, task_id: &str) -> Vec<&str> {
        self.transitions
            .get(task_id)
            .map(Transition::targets)
            .unwrap_or_default()
    }
}

/// Builder for creating graphs
pub struct GraphBuilder<S: FlowState> {
    id: String,
    tasks: HashMap<String, Arc<dyn Task<S>>>,
    transitions: Vec<(String, Transition<S>)>,
    start_task_id: Option<String>,
    max_steps: usize,
    duplicate_task: Option<String>,
}

impl<S: FlowState> GraphBuilder<S> {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            tasks: HashMap::new(),
            transitions: Vec::new(),
            start_task_id: None,
            max_steps: DEFAULT_MAX_STEPS,
            duplicate_task: None,
        }
    }

    /// Add a task; the first task added becomes the start task unless overridden.
    pub fn add_task(mut self, task: Arc<dyn Task<S>>) -> Self {
        let task_id = task.id().to_string();
        if self.start_task_id.is_none() {
            self.start_task_id = Some(task_id.clone());
        }
        if self.tasks.insert(task_id.clone(), task).is_some() && self.duplicate_task.is_none() {
            self.duplicate_task = Some(task_id);
        }
        self
    }

    pub fn set_start_task(mut self, task_id: impl Into<String>) -> Self {
        self.start_task_id = Some(task_id.into());
        self
    }

    /// Add an unconditional edge between tasks
    pub fn add_edge(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.transitions
            .push((from.into(), Transition::Edge(to.into())));
        self
    }

    /// Add a router leaving `from`. The router may only select one of `targets`; any other
    /// selection fails the run with [`GraphError::InvalidRoute`].
    pub fn add_router<F, R, T>(mut self, from: impl Into<String>, route: F, targets: T) -> Self
    where
        F: Fn(&S) -> R + Send + Sync + 'static,
        R: Into<String>,
        T: IntoIterator,
        T::Item: Into<String>,
    {
        let route: RouteFn<S> = Arc::new(move |state: &S| route(state).into());
        self.transitions.push((
            from.into(),
            Transition::Router {
                route,
                targets: targets.into_iter().map(Into::into).collect(),
            },
        ));
        self
    }

    pub fn max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = max_steps;
        self
    }

    /// Validate the wiring and produce the graph.
    ///
    /// Every transition must leave a known task, every edge and router target must name a
    /// registered task, and each task has at most one outgoing transition.
    pub fn build(self) -> Result<Graph<S>> {
        if let Some(task_id) = self.duplicate_task {
            return Err(GraphError::DuplicateTask(task_id));
        }

        let start_task_id = self.start_task_id.ok_or(GraphError::MissingStartTask)?;
        if !self.tasks.contains_key(&start_task_id) {
            return Err(GraphError::TaskNotFound(start_task_id));
        }

        let mut transitions = HashMap::new();
        for (from, transition) in self.transitions {
            if !self.tasks.contains_key(&from) {
                return Err(GraphError::TaskNotFound(from));
            }
            if let Some(unknown) = transition
                .targets()
                .into_iter()
                .find(|to| !self.tasks.contains_key(*to))
            {
                return Err(GraphError::UnknownTransitionTarget {
                    from,
                    to: unknown.to_string(),
                });
            }
            if transitions.contains_key(&from) {
                return Err(GraphError::DuplicateTransition { from });
            }
            transitions.insert(from, transition);
        }

        Ok(Graph {
            id: self.id,
            tasks: self.tasks,
            transitions,
            start_task_id,
            max_steps: self.max_steps,
        })
    }
}

/// Outcome of a complete graph run
#[derive(Debug, Clone)]
pub struct ExecutionResult<S> {
    /// Final state, unchanged after the last executed task
    pub state: S,
    /// Executed task ids in order
    pub visited: Vec<String>,
    pub status: ExecutionStatus,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionStatus {
    /// Workflow ran to an end without recording a failure
    Completed,
    /// The state recorded a failure; carries its message
    Failed(String),
}

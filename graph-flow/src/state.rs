/// State threaded through every task of a graph run.
///
/// The engine owns the state for the duration of a run and hands each task a mutable
/// borrow. Once [`FlowState::failure`] reports a message the run is over: the engine
/// stops before the next task and returns the state as it is.
pub trait FlowState: Send + Sync + 'static {
    /// Message describing why the run failed, if it has.
    fn failure(&self) -> Option<&str>;

    fn is_failed(&self) -> bool {
        self.failure().is_some()
    }
}

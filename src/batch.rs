/// Lifecycle of one matcher or categorizer batch
use thiserror::Error;

use crate::executor::ExecutorError;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BatchError {
    #[error("a batch is already running")]
    AlreadyRunning,
}

/// `Idle -> Running -> {Completed, Failed}`.
///
/// A new invocation is rejected while one is `Running`; a settled batch may be
/// started again.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum BatchState<T> {
    #[default]
    Idle,
    Running,
    Completed(T),
    Failed(String),
}

impl<T> BatchState<T> {
    pub fn is_running(&self) -> bool {
        matches!(self, BatchState::Running)
    }

    pub fn start(&mut self) -> Result<(), BatchError> {
        if self.is_running() {
            return Err(BatchError::AlreadyRunning);
        }
        *self = BatchState::Running;
        Ok(())
    }

    /// Record the outcome of the running batch
    pub fn settle(&mut self, outcome: Result<T, ExecutorError>) {
        *self = match outcome {
            Ok(value) => BatchState::Completed(value),
            Err(e) => BatchState::Failed(e.to_string()),
        };
    }

    pub fn completed(&self) -> Option<&T> {
        match self {
            BatchState::Completed(value) => Some(value),
            _ => None,
        }
    }
}

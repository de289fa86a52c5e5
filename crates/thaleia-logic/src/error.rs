//! Errors returned by the production scheduler.

use crate::queue::TaskId;

/// Error raised by a colony while accepting finished buildings.
pub type CallbackError = Box<dyn std::error::Error + Send + Sync>;

pub type Result<T> = std::result::Result<T, ProductionError>;

/// Errors that can occur while scheduling production.
///
/// All variants except [`ProductionError::Colony`] are raised before any state
/// is touched, so the caller can correct the input and retry.
#[derive(Debug)]
pub enum ProductionError {
    /// Out-of-range or otherwise unusable input.
    InvalidArgument(String),
    /// The operation is illegal in the task's or queue's current state.
    InvalidState(String),
    /// The task is not in the collection the operation works on.
    NotFound(TaskId),
    /// The owning colony failed to accept a finished building.
    Colony(CallbackError),
}

impl ProductionError {
    pub(crate) fn invalid_argument(msg: impl Into<String>) -> Self {
        ProductionError::InvalidArgument(msg.into())
    }

    pub(crate) fn invalid_state(msg: impl Into<String>) -> Self {
        ProductionError::InvalidState(msg.into())
    }
}

impl From<CallbackError> for ProductionError {
    fn from(e: CallbackError) -> Self {
        ProductionError::Colony(e)
    }
}

impl std::fmt::Display for ProductionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProductionError::InvalidArgument(msg) => write!(f, "Invalid argument: {}", msg),
            ProductionError::InvalidState(msg) => write!(f, "Invalid state: {}", msg),
            ProductionError::NotFound(id) => write!(f, "Task {} is not in the queue", id),
            ProductionError::Colony(e) => write!(f, "Colony rejected finished building: {}", e),
        }
    }
}

impl std::error::Error for ProductionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ProductionError::Colony(e) => Some(e.as_ref()),
            _ => None,
        }
    }
}

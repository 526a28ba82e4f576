use thiserror::Error;

use crate::auth::error::AuthError;
use crate::retry::RetryAction;
use crate::transfer::error::TransferError;

/// Why a single task attempt did not finish.
///
/// [`TaskError::retry_action`] sorts these into "start the task over after the
/// retry wait" and "skip to the next task".
#[derive(Debug, Error)]
pub enum TaskError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Transfer(#[from] TransferError),

    #[error("Scratch file error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Shutdown requested before the remaining batches ran")]
    Cancelled,
}

impl TaskError {
    /// Rate limits and unclassified failures are retried. Password problems
    /// and anything that stops endpoint discovery are not, since a fresh
    /// attempt would fail the same way.
    pub fn retry_action(&self) -> RetryAction {
        match self {
            TaskError::Auth(e) if e.is_transient() => RetryAction::Retry,
            TaskError::Auth(_) => RetryAction::Abort,
            TaskError::Transfer(TransferError::ProfileLocked { .. }) => RetryAction::Abort,
            TaskError::Transfer(
                TransferError::Spawn { .. }
                | TransferError::ListFailed { .. }
                | TransferError::Write { .. },
            ) => RetryAction::Retry,
            TaskError::Io(_) => RetryAction::Retry,
            TaskError::Cancelled => RetryAction::Abort,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, TaskError::Cancelled)
    }

    pub fn is_rate_limit(&self) -> bool {
        matches!(self, TaskError::Auth(AuthError::RateLimited))
    }
}

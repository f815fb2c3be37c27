//! Executor errors.

use thiserror::Error;

use sitemind_protocols::{DriverError, StoreError};

/// Errors surfaced by the task executor.
///
/// Not-found variants are returned immediately. Resolution, execution and
/// challenge failures raised while performing an action are folded into a
/// failed [`ActionResult`](crate::ActionResult) instead.
#[derive(Debug, Error)]
pub enum ExecutorError {
    #[error("Session not found: {0}")]
    SessionNotFound(String),

    #[error("Action '{name}' not found. Available actions: {}", .available.join(", "))]
    ActionNotFound { name: String, available: Vec<String> },

    #[error("Form '{name}' not found. Available forms: {}", .available.join(", "))]
    FormNotFound { name: String, available: Vec<String> },

    #[error(
        "Action '{0}' has no execution hint and no learned selector; it must be executed once with explicit selectors before it can be resolved from memory"
    )]
    Unresolvable(String),

    #[error("Execution failed: {0}")]
    ExecutionFailed(String),

    #[error("CAPTCHA or anti-bot challenge detected at {0}")]
    ChallengeDetected(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Driver(#[from] DriverError),
}

//! Page driver errors.

use thiserror::Error;

/// Failures reported by a [`PageDriver`](crate::PageDriver).
#[derive(Debug, Error)]
pub enum DriverError {
    #[error("Session not found: {0}")]
    SessionNotFound(String),

    #[error("Navigation failed: {0}")]
    NavigationFailed(String),

    #[error("Element not found: {0}")]
    ElementNotFound(String),

    #[error("Action failed: {0}")]
    ActionFailed(String),

    #[error("Timed out: {0}")]
    Timeout(String),

    #[error("Driver error: {0}")]
    Other(String),
}

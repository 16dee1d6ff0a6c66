use thiserror::Error;

/// Failure reported across the backend boundary.
///
/// Every variant is transient from the session's point of view: it is logged
/// and the affected state stays at its last known good value.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BackendError {
    #[error("backend unreachable: {0}")]
    Transport(String),

    #[error("{command} rejected: {reason}")]
    Rejected {
        command: &'static str,
        reason: String,
    },

    #[error("item not found: {0}")]
    NotFound(String),
}

pub type BackendResult<T> = Result<T, BackendError>;

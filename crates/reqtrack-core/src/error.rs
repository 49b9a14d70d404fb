//! Error types for reqtrack
//!
//! Only lifecycle misuse of the registry/worker is reported through these.
//! Transport outcomes live in [`RequestStatus`](crate::RequestStatus).

use core::fmt;

/// Result type for registry and worker operations
pub type HttpResult<T> = Result<T, HttpError>;

/// Errors that can occur while managing the request lifecycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HttpError {
    /// Registry used before `initialize()`
    NotInitialized,

    /// `initialize()` called more than once
    AlreadyInitialized,

    /// Worker thread error
    Worker(WorkerError),

    /// Configuration rejected by validation
    InvalidConfig(&'static str),
}

impl fmt::Display for HttpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HttpError::NotInitialized => write!(f, "request registry not initialized"),
            HttpError::AlreadyInitialized => write!(f, "request registry already initialized"),
            HttpError::Worker(e) => write!(f, "worker error: {}", e),
            HttpError::InvalidConfig(msg) => write!(f, "invalid config: {}", msg),
        }
    }
}

impl std::error::Error for HttpError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            HttpError::Worker(e) => Some(e),
            _ => None,
        }
    }
}

/// Worker thread related errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkerError {
    /// Failed to spawn the worker thread
    SpawnFailed(String),

    /// `start()` called while the thread is running
    AlreadyRunning,

    /// Worker thread panicked
    Panicked,
}

impl fmt::Display for WorkerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkerError::SpawnFailed(reason) => {
                write!(f, "failed to spawn worker thread: {}", reason)
            }
            WorkerError::AlreadyRunning => write!(f, "worker thread already running"),
            WorkerError::Panicked => write!(f, "worker thread panicked"),
        }
    }
}

impl std::error::Error for WorkerError {}

impl From<WorkerError> for HttpError {
    fn from(e: WorkerError) -> Self {
        HttpError::Worker(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let e = HttpError::NotInitialized;
        assert_eq!(format!("{}", e), "request registry not initialized");

        let e = HttpError::Worker(WorkerError::AlreadyRunning);
        assert_eq!(format!("{}", e), "worker error: worker thread already running");
    }

    #[test]
    fn test_error_conversion() {
        let err: HttpError = WorkerError::Panicked.into();
        assert!(matches!(err, HttpError::Worker(WorkerError::Panicked)));
        assert!(std::error::Error::source(&err).is_some());
    }
}

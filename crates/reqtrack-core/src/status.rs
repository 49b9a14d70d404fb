//! Request status type

use core::fmt;

/// Current state of a request
///
/// For one processing attempt the status only moves forward:
/// `NotStarted` -> `Processing` -> exactly one terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum RequestStatus {
    /// Has not been started via `process_request()`
    #[default]
    NotStarted = 0,

    /// Currently being ticked and processed
    Processing = 1,

    /// Finished but failed
    Failed = 2,

    /// Failed because it was unable to connect (safe to retry)
    FailedConnectionError = 3,

    /// Finished and was successful
    Succeeded = 4,
}

impl RequestStatus {
    /// Check if this is a terminal state (finished one way or another)
    #[inline]
    pub const fn is_terminal(&self) -> bool {
        matches!(
            self,
            RequestStatus::Failed | RequestStatus::FailedConnectionError | RequestStatus::Succeeded
        )
    }

    /// Check if this is one of the failure states
    #[inline]
    pub const fn is_failure(&self) -> bool {
        matches!(self, RequestStatus::Failed | RequestStatus::FailedConnectionError)
    }

    /// Check if a failed request may be retried as-is
    #[inline]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, RequestStatus::FailedConnectionError)
    }

    /// Check if moving from `self` to `next` keeps the status monotonic
    ///
    /// A new attempt may begin from `NotStarted` or any terminal state.
    /// `Processing` may only end in a terminal state.
    #[inline]
    pub const fn can_transition_to(&self, next: RequestStatus) -> bool {
        match (*self, next) {
            (RequestStatus::Processing, RequestStatus::Processing) => false,
            (_, RequestStatus::Processing) => true,
            (RequestStatus::Processing, n) => n.is_terminal(),
            (_, RequestStatus::NotStarted) => true,
            _ => false,
        }
    }

    /// Name used in diagnostics output
    pub const fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::NotStarted => "NotStarted",
            RequestStatus::Processing => "Processing",
            RequestStatus::Failed => "Failed",
            RequestStatus::FailedConnectionError => "ConnectionError",
            RequestStatus::Succeeded => "Succeeded",
        }
    }
}

impl From<u8> for RequestStatus {
    fn from(v: u8) -> Self {
        match v {
            0 => RequestStatus::NotStarted,
            1 => RequestStatus::Processing,
            2 => RequestStatus::Failed,
            3 => RequestStatus::FailedConnectionError,
            4 => RequestStatus::Succeeded,
            _ => RequestStatus::NotStarted, // Default for invalid values
        }
    }
}

impl From<RequestStatus> for u8 {
    fn from(status: RequestStatus) -> u8 {
        status as u8
    }
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

use serde::Serialize;
use thiserror::Error;

/// How badly a failure affects the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ErrorSeverity {
    /// The session cannot proceed and the caller should replace the player UI
    Fatal,
    /// An isolated operation failed; the session keeps running
    NonFatal,
}

/// Error surfaced to the caller's error channel.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[error("{severity:?}: {message}")]
pub struct PlayerError {
    pub severity: ErrorSeverity,
    pub message: String,
}

impl PlayerError {
    pub fn fatal(message: impl Into<String>) -> Self {
        Self {
            severity: ErrorSeverity::Fatal,
            message: message.into(),
        }
    }

    pub fn non_fatal(message: impl Into<String>) -> Self {
        Self {
            severity: ErrorSeverity::NonFatal,
            message: message.into(),
        }
    }

    pub fn is_fatal(&self) -> bool {
        self.severity == ErrorSeverity::Fatal
    }
}

/// Rejection returned by a host media call.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HostError {
    #[error("Media not loaded")]
    NotLoaded,

    #[error("Command rejected: {0}")]
    Rejected(String),

    #[error("Host unavailable: {0}")]
    Unavailable(String),
}

/// Failure to reach the player controller.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ControllerError {
    #[error("Player controller disconnected")]
    SessionClosed,

    #[error("Failed to receive response from player controller")]
    NoResponse,
}

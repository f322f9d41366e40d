//! Error types for roster-client

use thiserror::Error;

/// Result type alias for client operations
pub type Result<T> = std::result::Result<T, ClientError>;

/// Errors surfaced to the caller of an import or roster operation.
///
/// The `Display` output is the message shown to the user.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Extraction or validation failed before any network call
    #[error(transparent)]
    Import(#[from] roster_core::Error),

    /// The backend rejected the request or could not be reached
    #[error("{message}")]
    SubmissionFailed {
        message: String,
        status: Option<u16>,
    },

    /// Another bulk import from the same controller is still in flight
    #[error("An import is already in progress")]
    Busy,

    /// No signed-in user to authorize the request
    #[error("You must be signed in to manage rosters")]
    Unauthenticated,

    /// Invalid client configuration
    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl ClientError {
    /// Create a SubmissionFailed error
    pub fn submission_failed(message: impl Into<String>, status: Option<u16>) -> Self {
        Self::SubmissionFailed {
            message: message.into(),
            status,
        }
    }

    /// True when the failure happened before anything was sent
    pub fn is_local(&self) -> bool {
        !matches!(self, Self::SubmissionFailed { .. })
    }
}

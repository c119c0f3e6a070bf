//! Error types for memento-core

use thiserror::Error;

use crate::auth::AuthError;
use crate::device::Capability;

/// Result type alias using memento-core's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in memento-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// The user refused a device permission; the action was aborted.
    #[error("Permission denied: {0}")]
    PermissionDenied(Capability),

    /// Capture, recording, or playback failed on the device.
    #[error("Device operation failed: {0}")]
    DeviceOperationFailed(String),

    /// A create/delete/set against the document store failed.
    #[error("Persistence failed: {0}")]
    PersistenceFailed(String),

    /// Identity provider failure
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// The requested action is not valid in the current transport state.
    #[error("Cannot {action} while {state}")]
    InvalidTransition {
        state: &'static str,
        action: &'static str,
    },

    /// The screen has no live session/subscription.
    #[error("Screen is not mounted")]
    NotMounted,

    /// Media screens require a verified email address.
    #[error("Email address has not been verified yet")]
    EmailNotVerified,

    /// Record not found
    #[error("Record not found: {0}")]
    NotFound(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// libSQL error
    #[error("libSQL error: {0}")]
    LibSql(#[from] libsql::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Whether the failure came from the document store rather than the device.
    pub const fn is_persistence(&self) -> bool {
        matches!(self, Self::PersistenceFailed(_) | Self::LibSql(_))
    }
}

use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] memento_core::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
    #[error("Record ID cannot be empty")]
    EmptyRecordId,
    #[error("Record not found for id/prefix: {0}")]
    RecordNotFound(String),
    #[error("{0}")]
    AmbiguousRecordId(String),
    #[error(transparent)]
    Profiles(#[from] crate::config_profiles::ProfilesError),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Authentication error: {0}")]
    Auth(String),
    #[error("Not signed in. Run `memento login --email <email> --password <password>` first.")]
    NotSignedIn,
    #[error(
        "Profile '{0}' has no Firebase config. Run `memento config init --backend-config <file>` or set MEMENTO_FIREBASE_API_KEY and MEMENTO_FIREBASE_PROJECT_ID."
    )]
    BackendNotConfigured(String),
    #[error(
        "No camera command configured. Run `memento config init --camera-command \"<command> {{output}}\"`."
    )]
    CameraNotConfigured,
    #[error(
        "Sync is not configured. Set TURSO_DATABASE_URL and TURSO_AUTH_TOKEN to enable `memento sync`."
    )]
    SyncNotConfigured,
}

impl From<memento_core::auth::AuthError> for CliError {
    fn from(error: memento_core::auth::AuthError) -> Self {
        Self::Auth(error.user_message())
    }
}

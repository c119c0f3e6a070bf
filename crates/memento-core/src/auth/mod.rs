//! Identity provider boundary and session handling.

mod firebase;

use std::fmt;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::OwnerId;
use crate::util::unix_timestamp_now;

pub use firebase::FirebaseIdentityClient;

const EXPIRY_SKEW_SECONDS: i64 = 60;

/// The authenticated owner.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub id: OwnerId,
    pub email: Option<String>,
    /// Last observed verification flag; refreshed by [`IdentityProvider::reload_session`].
    pub email_verified: bool,
    pub id_token: String,
    pub refresh_token: String,
    /// Token expiry (Unix seconds).
    pub expires_at: i64,
}

impl Session {
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.expires_at <= unix_timestamp_now() + EXPIRY_SKEW_SECONDS
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("Session")
            .field("id", &self.id)
            .field("email", &self.email)
            .field("email_verified", &self.email_verified)
            .field("id_token", &"[REDACTED]")
            .field("refresh_token", &"[REDACTED]")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("The password is too weak.")]
    WeakPassword,
    #[error("Wrong password.")]
    WrongPassword,
    /// Rejected locally before any provider call.
    #[error("{0}")]
    InvalidCredentials(String),
    #[error("{message}")]
    Provider { code: String, message: String },
    #[error("Identity backend is not configured.")]
    NotConfigured,
    #[error("Invalid auth configuration: {0}")]
    InvalidConfiguration(String),
    #[error("No signed-in session.")]
    NoSession,
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Failed to parse JSON payload: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Secure storage error: {0}")]
    SecureStorage(String),
}

impl AuthError {
    /// Map a provider error code to a known failure.
    ///
    /// Accepts both REST codes (`WEAK_PASSWORD`) and SDK codes
    /// (`auth/weak-password`). Unrecognized codes keep the provider text.
    pub fn classify(code: &str, message: Option<&str>) -> Self {
        let normalized = code
            .trim()
            .trim_start_matches("auth/")
            .replace('-', "_")
            .to_ascii_uppercase();

        match normalized.as_str() {
            "WEAK_PASSWORD" => Self::WeakPassword,
            "WRONG_PASSWORD" | "INVALID_PASSWORD" => Self::WrongPassword,
            _ => Self::Provider {
                message: message
                    .map(str::trim)
                    .filter(|text| !text.is_empty())
                    .map_or_else(|| humanize_code(&normalized), ToString::to_string),
                code: normalized,
            },
        }
    }

    /// Text to show the user.
    pub fn user_message(&self) -> String {
        self.to_string()
    }
}

fn humanize_code(code: &str) -> String {
    let lowered = code.replace('_', " ").to_lowercase();
    let mut chars = lowered.chars();
    chars.next().map_or_else(String::new, |first| {
        first.to_uppercase().chain(chars).collect::<String>() + "."
    })
}

pub type AuthResult<T> = Result<T, AuthError>;

/// Durable storage for the signed-in session.
pub trait SessionPersistence: Clone + Send + Sync + 'static {
    fn load_session(&self) -> AuthResult<Option<Session>>;
    fn save_session(&self, session: &Session) -> AuthResult<()>;
    fn clear_session(&self) -> AuthResult<()>;
}

/// Process-local session storage.
#[derive(Debug, Clone, Default)]
pub struct MemorySessionStore {
    session: Arc<Mutex<Option<Session>>>,
}

impl SessionPersistence for MemorySessionStore {
    fn load_session(&self) -> AuthResult<Option<Session>> {
        self.session
            .lock()
            .map(|guard| guard.clone())
            .map_err(|_| AuthError::SecureStorage("session lock poisoned".to_string()))
    }

    fn save_session(&self, session: &Session) -> AuthResult<()> {
        let mut guard = self
            .session
            .lock()
            .map_err(|_| AuthError::SecureStorage("session lock poisoned".to_string()))?;
        *guard = Some(session.clone());
        Ok(())
    }

    fn clear_session(&self) -> AuthResult<()> {
        let mut guard = self
            .session
            .lock()
            .map_err(|_| AuthError::SecureStorage("session lock poisoned".to_string()))?;
        *guard = None;
        Ok(())
    }
}

/// Issues and validates user credentials.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn register_with_password(&self, email: &str, password: &str) -> AuthResult<Session>;
    async fn sign_in(&self, email: &str, password: &str) -> AuthResult<Session>;
    async fn sign_out(&self) -> AuthResult<()>;
    async fn send_verification_email(&self, session: &Session) -> AuthResult<()>;
    /// Restore the persisted session, refreshing its tokens when expired.
    async fn current_session(&self) -> AuthResult<Option<Session>>;
    /// Re-read account state, including the verification flag.
    async fn reload_session(&self, session: &Session) -> AuthResult<Session>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> Session {
        Session {
            id: OwnerId::new("user").unwrap(),
            email: Some("user@example.com".to_string()),
            email_verified: false,
            id_token: "secret-id-token".to_string(),
            refresh_token: "secret-refresh-token".to_string(),
            expires_at: 1_700_000_000,
        }
    }

    #[test]
    fn session_debug_redacts_tokens() {
        let rendered = format!("{:?}", session());
        assert!(!rendered.contains("secret-id-token"));
        assert!(!rendered.contains("secret-refresh-token"));
        assert!(rendered.contains("[REDACTED]"));
    }

    #[test]
    fn old_sessions_are_expired() {
        assert!(session().is_expired());
        let fresh = Session {
            expires_at: unix_timestamp_now() + 3600,
            ..session()
        };
        assert!(!fresh.is_expired());
    }

    #[test]
    fn classify_known_codes() {
        assert!(matches!(
            AuthError::classify("auth/weak-password", None),
            AuthError::WeakPassword
        ));
        assert!(matches!(
            AuthError::classify("WEAK_PASSWORD", Some("Password should be at least 6 characters")),
            AuthError::WeakPassword
        ));
        assert!(matches!(
            AuthError::classify("auth/wrong-password", None),
            AuthError::WrongPassword
        ));
        assert_eq!(
            AuthError::WeakPassword.user_message(),
            "The password is too weak."
        );
        assert_eq!(AuthError::WrongPassword.user_message(), "Wrong password.");
    }

    #[test]
    fn classify_unknown_codes_keeps_provider_text() {
        let error = AuthError::classify("EMAIL_EXISTS", None);
        assert_eq!(error.user_message(), "Email exists.");
        match error {
            AuthError::Provider { code, .. } => assert_eq!(code, "EMAIL_EXISTS"),
            other => panic!("unexpected {other:?}"),
        }

        let error = AuthError::classify("TOO_MANY_ATTEMPTS_TRY_LATER", Some("Try again later"));
        assert_eq!(error.user_message(), "Try again later");
    }

    #[test]
    fn memory_store_round_trip() {
        let store = MemorySessionStore::default();
        assert!(store.load_session().unwrap().is_none());
        store.save_session(&session()).unwrap();
        assert_eq!(store.load_session().unwrap(), Some(session()));
        store.clear_session().unwrap();
        assert!(store.load_session().unwrap().is_none());
    }
}

//! CLI session persistence in the OS keychain.

#[cfg(test)]
use std::collections::HashMap;
#[cfg(test)]
use std::sync::{Mutex, MutexGuard, OnceLock};

use memento_core::auth::{AuthError, AuthResult, FirebaseIdentityClient, Session, SessionPersistence};
use memento_core::config::BackendConfig;

use crate::error::CliError;

#[cfg(not(test))]
const KEYCHAIN_SERVICE: &str = "memento-cli";

pub type IdentityClient = FirebaseIdentityClient<SessionStore>;

fn keychain_error(error: impl std::fmt::Display) -> AuthError {
    AuthError::SecureStorage(error.to_string())
}

/// Session JSON stored under one keychain entry per profile.
///
/// Test builds swap the keychain for a process-wide map so they never touch
/// the developer's real credentials.
#[derive(Clone)]
pub struct SessionStore {
    account: String,
}

impl SessionStore {
    pub fn new(profile_name: &str) -> Self {
        Self {
            account: format!("firebase_session:{profile_name}"),
        }
    }

    #[cfg(not(test))]
    fn keychain(&self) -> AuthResult<keyring::Entry> {
        keyring::Entry::new(KEYCHAIN_SERVICE, &self.account).map_err(keychain_error)
    }

    #[cfg(not(test))]
    fn read(&self) -> AuthResult<Option<String>> {
        match self.keychain()?.get_password() {
            Ok(raw) => Ok(Some(raw)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(error) => Err(keychain_error(error)),
        }
    }

    #[cfg(not(test))]
    fn write(&self, raw: &str) -> AuthResult<()> {
        self.keychain()?.set_password(raw).map_err(keychain_error)
    }

    #[cfg(not(test))]
    fn remove(&self) -> AuthResult<()> {
        match self.keychain()?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(error) => Err(keychain_error(error)),
        }
    }

    #[cfg(test)]
    fn memory() -> AuthResult<MutexGuard<'static, HashMap<String, String>>> {
        static ENTRIES: OnceLock<Mutex<HashMap<String, String>>> = OnceLock::new();
        ENTRIES
            .get_or_init(Mutex::default)
            .lock()
            .map_err(keychain_error)
    }

    #[cfg(test)]
    fn read(&self) -> AuthResult<Option<String>> {
        Ok(Self::memory()?.get(&self.account).cloned())
    }

    #[cfg(test)]
    fn write(&self, raw: &str) -> AuthResult<()> {
        Self::memory()?.insert(self.account.clone(), raw.to_string());
        Ok(())
    }

    #[cfg(test)]
    fn remove(&self) -> AuthResult<()> {
        Self::memory()?.remove(&self.account);
        Ok(())
    }
}

impl SessionPersistence for SessionStore {
    fn load_session(&self) -> AuthResult<Option<Session>> {
        match self.read()? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    fn save_session(&self, session: &Session) -> AuthResult<()> {
        self.write(&serde_json::to_string(session)?)
    }

    fn clear_session(&self) -> AuthResult<()> {
        self.remove()
    }
}

/// Identity client for a profile, or an error naming what is missing.
pub fn identity_for_profile(
    profile_name: &str,
    backend: &BackendConfig,
) -> Result<IdentityClient, CliError> {
    if !backend.is_configured() {
        return Err(CliError::BackendNotConfigured(profile_name.to_string()));
    }
    Ok(FirebaseIdentityClient::new(
        backend,
        SessionStore::new(profile_name),
    )?)
}

pub fn load_stored_session(profile_name: &str) -> AuthResult<Option<Session>> {
    SessionStore::new(profile_name).load_session()
}

pub fn clear_stored_session(profile_name: &str) -> AuthResult<()> {
    SessionStore::new(profile_name).clear_session()
}

#[cfg(test)]
mod tests {
    use memento_core::OwnerId;

    use super::*;

    fn session() -> Session {
        Session {
            id: OwnerId::new("uid-7").unwrap(),
            email: Some("kim@example.com".to_string()),
            email_verified: false,
            id_token: "secret-id-token".to_string(),
            refresh_token: "secret-refresh-token".to_string(),
            expires_at: 1_700_000_000,
        }
    }

    #[test]
    fn sessions_are_kept_per_profile() {
        let work = SessionStore::new("auth-test-work");
        work.save_session(&session()).unwrap();

        assert_eq!(load_stored_session("auth-test-work").unwrap(), Some(session()));
        assert_eq!(load_stored_session("auth-test-home").unwrap(), None);

        clear_stored_session("auth-test-work").unwrap();
        assert_eq!(load_stored_session("auth-test-work").unwrap(), None);
    }

    #[test]
    fn corrupt_entry_is_a_decode_error() {
        let store = SessionStore::new("auth-test-corrupt");
        store.write("{not json").unwrap();

        assert!(store.load_session().is_err());
        store.clear_session().unwrap();
        assert_eq!(store.load_session().unwrap(), None);
    }

    #[test]
    fn tokens_stay_out_of_debug_output() {
        let rendered = format!("{:?}", session());
        assert!(!rendered.contains("secret-id-token"));
        assert!(!rendered.contains("secret-refresh-token"));
        assert!(rendered.contains("[REDACTED]"));
    }

    #[test]
    fn unconfigured_backend_is_reported_by_profile() {
        let result = identity_for_profile("phone", &BackendConfig::default());
        assert!(matches!(result, Err(CliError::BackendNotConfigured(name)) if name == "phone"));
    }
}

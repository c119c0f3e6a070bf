//! Firebase identity toolkit REST client.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::config::BackendConfig;
use crate::models::OwnerId;
use crate::util::unix_timestamp_now;

use super::{AuthError, AuthResult, IdentityProvider, Session, SessionPersistence};

#[derive(Clone)]
pub struct FirebaseIdentityClient<S: SessionPersistence> {
    identity_url: String,
    token_url: String,
    api_key: String,
    client: Client,
    store: S,
}

impl<S: SessionPersistence> FirebaseIdentityClient<S> {
    pub fn new(config: &BackendConfig, store: S) -> AuthResult<Self> {
        config
            .validate()
            .map_err(AuthError::InvalidConfiguration)?;
        let api_key = crate::util::normalize_text_option(config.api_key.clone())
            .ok_or(AuthError::NotConfigured)?;

        Ok(Self {
            identity_url: config.identity_endpoint(),
            token_url: config.secure_token_endpoint(),
            api_key,
            client: Client::builder().build()?,
            store,
        })
    }

    pub const fn store(&self) -> &S {
        &self.store
    }

    async fn password_flow(&self, method: &str, email: &str, password: &str) -> AuthResult<Session> {
        validate_credentials(email, password)?;

        let payload = json!({
            "email": email.trim(),
            "password": password,
            "returnSecureToken": true,
        });
        let response: PasswordResponse = self.call(self.account_request(method).json(&payload)).await?;
        response.into_session()
    }

    async fn refresh(&self, session: &Session) -> AuthResult<Session> {
        if session.refresh_token.trim().is_empty() {
            return Err(AuthError::InvalidConfiguration(
                "Refresh token must not be empty".to_string(),
            ));
        }

        let payload = json!({
            "grant_type": "refresh_token",
            "refresh_token": session.refresh_token,
        });
        let request = self
            .client
            .post(format!("{}/token", self.token_url))
            .query(&[("key", self.api_key.as_str())])
            .json(&payload);
        let response: TokenResponse = self.call(request).await?;

        let refreshed = Session {
            id: owner_id(response.user_id)?,
            id_token: response.id_token,
            refresh_token: response.refresh_token,
            expires_at: expiry_from(&response.expires_in),
            ..session.clone()
        };
        self.store.save_session(&refreshed)?;
        Ok(refreshed)
    }

    async fn lookup(&self, session: &Session) -> AuthResult<Session> {
        let request = self
            .account_request("lookup")
            .json(&json!({ "idToken": session.id_token }));
        let response: LookupResponse = self.call(request).await?;
        let user = response
            .users
            .into_iter()
            .find(|user| user.local_id == session.id.as_str())
            .ok_or(AuthError::NoSession)?;

        Ok(Session {
            email: user.email.or_else(|| session.email.clone()),
            email_verified: user.email_verified,
            ..session.clone()
        })
    }

    fn account_request(&self, method: &str) -> RequestBuilder {
        self.client
            .post(format!("{}/accounts:{method}", self.identity_url))
            .query(&[("key", self.api_key.as_str())])
    }

    async fn call<T: DeserializeOwned>(&self, request: RequestBuilder) -> AuthResult<T> {
        let response = request.send().await?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(parse_api_error(status.as_u16(), &body));
        }
        Ok(response.json::<T>().await?)
    }
}

#[async_trait]
impl<S: SessionPersistence> IdentityProvider for FirebaseIdentityClient<S> {
    async fn register_with_password(&self, email: &str, password: &str) -> AuthResult<Session> {
        let session = self.password_flow("signUp", email, password).await?;
        self.store.save_session(&session)?;
        tracing::info!("Registered account {}", session.id);
        Ok(session)
    }

    async fn sign_in(&self, email: &str, password: &str) -> AuthResult<Session> {
        let session = self.password_flow("signInWithPassword", email, password).await?;
        // Sign-in responses omit the verification flag.
        let session = match self.lookup(&session).await {
            Ok(looked_up) => looked_up,
            Err(error) => {
                tracing::warn!("Failed to read account state after sign-in: {error}");
                session
            }
        };
        self.store.save_session(&session)?;
        tracing::info!("Signed in as {}", session.id);
        Ok(session)
    }

    async fn sign_out(&self) -> AuthResult<()> {
        self.store.clear_session()
    }

    async fn send_verification_email(&self, session: &Session) -> AuthResult<()> {
        let payload = json!({
            "requestType": "VERIFY_EMAIL",
            "idToken": session.id_token,
        });
        let _: Value = self.call(self.account_request("sendOobCode").json(&payload)).await?;
        tracing::info!("Verification email requested for {}", session.id);
        Ok(())
    }

    async fn current_session(&self) -> AuthResult<Option<Session>> {
        let Some(stored) = self.store.load_session()? else {
            return Ok(None);
        };

        if !stored.is_expired() {
            return Ok(Some(stored));
        }

        match self.refresh(&stored).await {
            Ok(refreshed) => Ok(Some(refreshed)),
            Err(error) => {
                tracing::warn!("Failed to refresh persisted session: {error}");
                self.store.clear_session()?;
                Ok(None)
            }
        }
    }

    async fn reload_session(&self, session: &Session) -> AuthResult<Session> {
        let current = if session.is_expired() {
            self.refresh(session).await?
        } else {
            session.clone()
        };
        let reloaded = self.lookup(&current).await?;
        self.store.save_session(&reloaded)?;
        Ok(reloaded)
    }
}

fn validate_credentials(email: &str, password: &str) -> AuthResult<()> {
    if email.trim().is_empty() {
        return Err(AuthError::InvalidCredentials("Email is required".to_string()));
    }
    if password.is_empty() {
        return Err(AuthError::InvalidCredentials(
            "Password is required".to_string(),
        ));
    }
    Ok(())
}

/// `expiresIn` arrives as a string of seconds.
fn expiry_from(expires_in: &str) -> i64 {
    let seconds = expires_in.trim().parse::<i64>().unwrap_or(0);
    unix_timestamp_now().saturating_add(seconds)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PasswordResponse {
    local_id: String,
    #[serde(default)]
    email: Option<String>,
    id_token: String,
    refresh_token: String,
    expires_in: String,
}

impl PasswordResponse {
    fn into_session(self) -> AuthResult<Session> {
        Ok(Session {
            id: owner_id(self.local_id)?,
            email: self.email,
            email_verified: false,
            expires_at: expiry_from(&self.expires_in),
            id_token: self.id_token,
            refresh_token: self.refresh_token,
        })
    }
}

fn owner_id(raw: String) -> AuthResult<OwnerId> {
    OwnerId::new(raw).map_err(|_| AuthError::Provider {
        code: "MISSING_LOCAL_ID".to_string(),
        message: "Identity response did not include a user id.".to_string(),
    })
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    id_token: String,
    refresh_token: String,
    expires_in: String,
    user_id: String,
}

#[derive(Debug, Deserialize)]
struct LookupResponse {
    #[serde(default)]
    users: Vec<LookupUser>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LookupUser {
    local_id: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    email_verified: bool,
}

/// Turn a provider error body into an [`AuthError`].
///
/// Identity toolkit bodies look like
/// `{"error":{"code":400,"message":"WEAK_PASSWORD : Password should be ..."}}`;
/// the token endpoint may answer `{"error":"invalid_grant","error_description":"..."}`.
fn parse_api_error(status: u16, body: &str) -> AuthError {
    let payload: Value = serde_json::from_str(body).unwrap_or(Value::Null);
    let raw = payload
        .pointer("/error/message")
        .and_then(Value::as_str)
        .or_else(|| payload.get("error").and_then(Value::as_str));

    let Some(raw) = raw else {
        let trimmed = crate::util::compact_text(body);
        return AuthError::Provider {
            code: format!("HTTP_{status}"),
            message: if trimmed.is_empty() {
                format!("HTTP {status}")
            } else {
                format!("{trimmed} ({status})")
            },
        };
    };

    let (code, detail) = match raw.split_once(" : ") {
        Some((code, detail)) => (code, Some(detail)),
        None => (
            raw,
            payload.get("error_description").and_then(Value::as_str),
        ),
    };
    AuthError::classify(code, detail)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::MemorySessionStore;

    fn config() -> BackendConfig {
        BackendConfig {
            api_key: Some("key".to_string()),
            project_id: Some("project".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn client_requires_valid_config() {
        let result = FirebaseIdentityClient::new(&BackendConfig::default(), MemorySessionStore::default());
        assert!(matches!(result, Err(AuthError::InvalidConfiguration(_))));
        assert!(FirebaseIdentityClient::new(&config(), MemorySessionStore::default()).is_ok());
    }

    #[test]
    fn parses_weak_password_body() {
        let body = r#"{"error":{"code":400,"message":"WEAK_PASSWORD : Password should be at least 6 characters","errors":[]}}"#;
        assert!(matches!(parse_api_error(400, body), AuthError::WeakPassword));
    }

    #[test]
    fn parses_invalid_password_body() {
        let body = r#"{"error":{"code":400,"message":"INVALID_PASSWORD"}}"#;
        assert!(matches!(parse_api_error(400, body), AuthError::WrongPassword));
    }

    #[test]
    fn parses_token_endpoint_body() {
        let body = r#"{"error":"invalid_grant","error_description":"Bad refresh token"}"#;
        let error = parse_api_error(400, body);
        assert_eq!(error.user_message(), "Bad refresh token");
    }

    #[test]
    fn non_json_body_keeps_status() {
        let error = parse_api_error(502, "");
        assert_eq!(error.user_message(), "HTTP 502");
    }

    #[test]
    fn password_response_builds_unverified_session() {
        let response: PasswordResponse = serde_json::from_value(json!({
            "kind": "identitytoolkit#SignupNewUserResponse",
            "localId": "uid-1",
            "email": "a@b.co",
            "idToken": "id",
            "refreshToken": "refresh",
            "expiresIn": "3600"
        }))
        .unwrap();
        let session = response.into_session().unwrap();
        assert_eq!(session.id.as_str(), "uid-1");
        assert!(!session.email_verified);
        assert!(!session.is_expired());
    }

    #[tokio::test]
    async fn current_session_returns_fresh_stored_session() {
        let store = MemorySessionStore::default();
        let session = Session {
            id: OwnerId::new("uid").unwrap(),
            email: None,
            email_verified: true,
            id_token: "id".to_string(),
            refresh_token: "refresh".to_string(),
            expires_at: unix_timestamp_now() + 3600,
        };
        store.save_session(&session).unwrap();

        let client = FirebaseIdentityClient::new(&config(), store).unwrap();
        assert_eq!(client.current_session().await.unwrap(), Some(session));

        client.sign_out().await.unwrap();
        assert_eq!(client.current_session().await.unwrap(), None);
    }

    #[tokio::test]
    async fn blank_credentials_never_reach_the_network() {
        let client = FirebaseIdentityClient::new(&config(), MemorySessionStore::default()).unwrap();
        let error = client.sign_in("  ", "secret").await.unwrap_err();
        assert!(matches!(error, AuthError::InvalidCredentials(_)));
    }

    #[tokio::test(flavor = "multi_thread")]
    #[ignore = "Requires MEMENTO_FIREBASE_* env vars plus network access"]
    async fn live_backend_rejects_wrong_password() {
        let _ = dotenvy::dotenv();

        let config = BackendConfig::from_env();
        let client = FirebaseIdentityClient::new(&config, MemorySessionStore::default())
            .expect("Firebase env config should be valid");

        let error = client
            .sign_in("nobody@example.invalid", "definitely-wrong")
            .await
            .expect_err("sign-in with a made-up account should fail");
        assert!(!error.user_message().is_empty());
    }
}

//! Backend configuration for client apps.
//!
//! `BackendConfig` mirrors the public web configuration a Firebase project
//! hands to its clients. These values are safe to ship; secret credentials
//! must never be stored here.

use serde::{Deserialize, Serialize};

use crate::util::{is_http_url, normalize_text_option};

const DEFAULT_IDENTITY_ENDPOINT: &str = "https://identitytoolkit.googleapis.com/v1";
const DEFAULT_SECURE_TOKEN_ENDPOINT: &str = "https://securetoken.googleapis.com/v1";
const ENV_PREFIX: &str = "MEMENTO_FIREBASE_";

/// Public Firebase project configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct BackendConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth_domain: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_bucket: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub messaging_sender_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub measurement_id: Option<String>,
    /// Identity toolkit base URL override (emulators).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identity_endpoint: Option<String>,
    /// Secure token base URL override (emulators).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secure_token_endpoint: Option<String>,
}

impl BackendConfig {
    /// Read `MEMENTO_FIREBASE_*` variables; unset or blank values stay `None`.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(format!("{ENV_PREFIX}{name}")).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let read = |name: &str| normalize_text_option(lookup(name));
        Self {
            api_key: read("API_KEY"),
            auth_domain: read("AUTH_DOMAIN"),
            project_id: read("PROJECT_ID"),
            storage_bucket: read("STORAGE_BUCKET"),
            messaging_sender_id: read("MESSAGING_SENDER_ID"),
            app_id: read("APP_ID"),
            measurement_id: read("MEASUREMENT_ID"),
            identity_endpoint: read("IDENTITY_ENDPOINT"),
            secure_token_endpoint: read("SECURE_TOKEN_ENDPOINT"),
        }
    }

    /// Values from `self`, falling back to `fallback` field by field.
    #[must_use]
    pub fn or(self, fallback: Self) -> Self {
        Self {
            api_key: self.api_key.or(fallback.api_key),
            auth_domain: self.auth_domain.or(fallback.auth_domain),
            project_id: self.project_id.or(fallback.project_id),
            storage_bucket: self.storage_bucket.or(fallback.storage_bucket),
            messaging_sender_id: self.messaging_sender_id.or(fallback.messaging_sender_id),
            app_id: self.app_id.or(fallback.app_id),
            measurement_id: self.measurement_id.or(fallback.measurement_id),
            identity_endpoint: self.identity_endpoint.or(fallback.identity_endpoint),
            secure_token_endpoint: self.secure_token_endpoint.or(fallback.secure_token_endpoint),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.validate().is_ok()
    }

    /// Check required fields and endpoint overrides.
    pub fn validate(&self) -> Result<(), String> {
        if normalize_text_option(self.api_key.clone()).is_none() {
            return Err("backend field 'apiKey' is required".to_string());
        }
        if normalize_text_option(self.project_id.clone()).is_none() {
            return Err("backend field 'projectId' is required".to_string());
        }
        for (field, value) in [
            ("identityEndpoint", &self.identity_endpoint),
            ("secureTokenEndpoint", &self.secure_token_endpoint),
        ] {
            if let Some(url) = normalize_text_option(value.clone()) {
                if !is_http_url(&url) {
                    return Err(format!(
                        "backend field '{field}' must include http:// or https://"
                    ));
                }
            }
        }
        Ok(())
    }

    /// Identity toolkit base URL without a trailing slash.
    pub fn identity_endpoint(&self) -> String {
        endpoint_or(self.identity_endpoint.as_ref(), DEFAULT_IDENTITY_ENDPOINT)
    }

    /// Secure token base URL without a trailing slash.
    pub fn secure_token_endpoint(&self) -> String {
        endpoint_or(
            self.secure_token_endpoint.as_ref(),
            DEFAULT_SECURE_TOKEN_ENDPOINT,
        )
    }
}

/// Parse and validate a backend config from a raw JSON payload.
pub fn parse_backend_config(payload: &str) -> Result<BackendConfig, String> {
    let config: BackendConfig = serde_json::from_str(payload)
        .map_err(|error| format!("invalid backend config JSON: {error}"))?;
    config.validate()?;
    Ok(config)
}

fn endpoint_or(value: Option<&String>, default: &str) -> String {
    normalize_text_option(value.cloned())
        .unwrap_or_else(|| default.to_string())
        .trim_end_matches('/')
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    const WEB_CONFIG: &str = r#"
    {
      "apiKey": "AIza-test",
      "authDomain": "memento-test.firebaseapp.com",
      "projectId": "memento-test",
      "storageBucket": "memento-test.appspot.com",
      "messagingSenderId": "1234",
      "appId": "1:1234:web:abcd",
      "measurementId": "G-TEST"
    }
    "#;

    #[test]
    fn parses_firebase_web_config() {
        let config = parse_backend_config(WEB_CONFIG).unwrap();
        assert_eq!(config.api_key.as_deref(), Some("AIza-test"));
        assert_eq!(config.project_id.as_deref(), Some("memento-test"));
        assert_eq!(
            config.identity_endpoint(),
            "https://identitytoolkit.googleapis.com/v1"
        );
    }

    #[test]
    fn rejects_unknown_fields() {
        let error = parse_backend_config(r#"{ "apiKey": "k", "projectId": "p", "extra": 1 }"#)
            .unwrap_err();
        assert!(error.contains("unknown field"));
    }

    #[test]
    fn requires_api_key_and_project() {
        let error = parse_backend_config(r#"{ "projectId": "p" }"#).unwrap_err();
        assert!(error.contains("apiKey"));

        let error = parse_backend_config(r#"{ "apiKey": "k", "projectId": "  " }"#).unwrap_err();
        assert!(error.contains("projectId"));
    }

    #[test]
    fn endpoint_overrides_must_be_http() {
        let config = BackendConfig {
            api_key: Some("k".to_string()),
            project_id: Some("p".to_string()),
            identity_endpoint: Some("localhost:9099".to_string()),
            ..Default::default()
        };
        assert!(config.validate().unwrap_err().contains("identityEndpoint"));
    }

    #[test]
    fn emulator_endpoint_override_drops_trailing_slash() {
        let config = BackendConfig {
            identity_endpoint: Some("http://localhost:9099/identitytoolkit.googleapis.com/v1/".into()),
            ..Default::default()
        };
        assert_eq!(
            config.identity_endpoint(),
            "http://localhost:9099/identitytoolkit.googleapis.com/v1"
        );
        assert_eq!(
            config.secure_token_endpoint(),
            "https://securetoken.googleapis.com/v1"
        );
    }

    #[test]
    fn env_values_fill_missing_fields_only() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("API_KEY", "env-key"),
            ("PROJECT_ID", "env-project"),
            ("APP_ID", "   "),
        ]);
        let from_env = BackendConfig::from_lookup(|name| env.get(name).map(ToString::to_string));
        assert_eq!(from_env.app_id, None);

        let profile = BackendConfig {
            api_key: Some("profile-key".to_string()),
            ..Default::default()
        };
        let merged = profile.or(from_env);
        assert_eq!(merged.api_key.as_deref(), Some("profile-key"));
        assert_eq!(merged.project_id.as_deref(), Some("env-project"));
        assert!(merged.is_configured());
    }
}

//! User profile document

use serde::{Deserialize, Serialize};

use crate::error::Result;

use super::record::Fields;

/// Collection holding one profile document per user, keyed by user id.
pub const PROFILES_COLLECTION: &str = "users";

/// Profile written once at registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    #[serde(rename = "FirstName")]
    pub first_name: String,
    #[serde(rename = "LastName")]
    pub last_name: String,
    #[serde(rename = "Email")]
    pub email: String,
}

impl UserProfile {
    pub fn to_fields(&self) -> Result<Fields> {
        match serde_json::to_value(self)? {
            serde_json::Value::Object(fields) => Ok(fields),
            _ => Ok(Fields::new()),
        }
    }

    pub fn from_fields(fields: &Fields) -> Result<Self> {
        Ok(serde_json::from_value(serde_json::Value::Object(
            fields.clone(),
        ))?)
    }

    pub fn welcome_message(&self) -> String {
        format!("Welcome, {}", self.first_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn profile_uses_capitalized_field_names() {
        let profile = UserProfile {
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            email: "ada@example.com".to_string(),
        };
        let fields = profile.to_fields().unwrap();
        assert_eq!(fields["FirstName"], "Ada");
        assert_eq!(fields["Email"], "ada@example.com");
        assert_eq!(UserProfile::from_fields(&fields).unwrap(), profile);
        assert_eq!(profile.welcome_message(), "Welcome, Ada");
    }
}

//! Media record model

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::{Error, Result};

use super::kind::Kind;

/// Field holding the owning session id on every media document.
pub const OWNER_FIELD: &str = "userId";
/// Creation timestamp field (Unix ms).
pub const CREATED_AT_FIELD: &str = "createdAt";
/// Display name field (photos only).
pub const NAME_FIELD: &str = "name";
/// Legacy creation field written by older clients as a date string.
const LEGACY_DATE_FIELD: &str = "date";

/// Raw document fields as stored in the document store.
pub type Fields = Map<String, Value>;

/// Store-assigned identifier of a record.
///
/// Opaque to clients; the libSQL store issues UUID v7 strings but any
/// non-empty string is accepted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(String);

impl RecordId {
    /// Issue a new time-sortable identifier.
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::now_v7().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for RecordId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(Error::InvalidInput("Record id cannot be empty".to_string()));
        }
        Ok(Self(trimmed.to_string()))
    }
}

/// Identifier of the session that owns a record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OwnerId(String);

impl OwnerId {
    pub fn new(id: impl Into<String>) -> Result<Self> {
        let id = id.into().trim().to_string();
        if id.is_empty() {
            return Err(Error::InvalidInput("Owner id cannot be empty".to_string()));
        }
        Ok(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OwnerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Location of a captured asset, device-local (`file://`) or remote.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AssetUri(String);

impl AssetUri {
    pub fn new(uri: impl Into<String>) -> Result<Self> {
        let uri = uri.into().trim().to_string();
        if uri.is_empty() {
            return Err(Error::InvalidInput("Asset URI cannot be empty".to_string()));
        }
        Ok(Self(uri))
    }

    /// Build a `file://` URI for a local path.
    pub fn from_path(path: &std::path::Path) -> Result<Self> {
        Self::new(format!("file://{}", path.display()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Local filesystem path when this is a `file://` URI or a bare path.
    pub fn to_local_path(&self) -> Option<std::path::PathBuf> {
        if let Some(path) = self.0.strip_prefix("file://") {
            return Some(std::path::PathBuf::from(path));
        }
        if self.0.contains("://") {
            None
        } else {
            Some(std::path::PathBuf::from(&self.0))
        }
    }

    /// Last path segment without query or fragment, if any.
    pub fn file_name(&self) -> Option<&str> {
        let without_query = self.0.split(['?', '#']).next().unwrap_or_default();
        without_query
            .rsplit('/')
            .next()
            .map(str::trim)
            .filter(|segment| !segment.is_empty() && !segment.contains(':'))
    }
}

impl fmt::Display for AssetUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A raw document returned by the store: its id plus stored fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: RecordId,
    pub fields: Fields,
}

impl Document {
    pub fn str_field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).and_then(Value::as_str)
    }
}

/// Persisted reference to a captured photo or audio clip.
///
/// Records are never mutated in place: they are created once and later
/// deleted by their owner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaRecord {
    pub id: RecordId,
    pub owner_id: OwnerId,
    pub media_url: AssetUri,
    /// Creation timestamp (Unix ms); absent on documents from older clients.
    pub created_at: Option<i64>,
    /// Display name (photos only).
    pub name: Option<String>,
}

impl MediaRecord {
    /// Fields for a new record of `kind`, owned by `owner`.
    pub fn new_fields(kind: Kind, owner: &OwnerId, media_url: &AssetUri, created_at: i64) -> Fields {
        let mut fields = Fields::new();
        fields.insert(OWNER_FIELD.to_string(), Value::from(owner.as_str()));
        fields.insert(kind.url_field().to_string(), Value::from(media_url.as_str()));
        fields.insert(CREATED_AT_FIELD.to_string(), Value::from(created_at));
        if kind.has_names() {
            if let Some(name) = media_url.file_name() {
                fields.insert(NAME_FIELD.to_string(), Value::from(name));
            }
        }
        fields
    }

    /// Decode a stored document of `kind`.
    pub fn from_document(kind: Kind, document: &Document) -> Result<Self> {
        let owner = document.str_field(OWNER_FIELD).ok_or_else(|| {
            Error::InvalidInput(format!("Document {} has no {OWNER_FIELD}", document.id))
        })?;
        let url = document.str_field(kind.url_field()).ok_or_else(|| {
            Error::InvalidInput(format!(
                "Document {} has no {}",
                document.id,
                kind.url_field()
            ))
        })?;

        let name = if kind.has_names() {
            crate::util::normalize_text_option(document.str_field(NAME_FIELD).map(str::to_string))
        } else {
            None
        };

        Ok(Self {
            id: document.id.clone(),
            owner_id: OwnerId::new(owner)?,
            media_url: AssetUri::new(url)?,
            created_at: created_at_of(document),
            name,
        })
    }
}

fn created_at_of(document: &Document) -> Option<i64> {
    if let Some(value) = document.fields.get(CREATED_AT_FIELD).and_then(Value::as_i64) {
        return Some(value);
    }

    match document.fields.get(LEGACY_DATE_FIELD)? {
        Value::Number(number) => number.as_i64(),
        Value::String(raw) => chrono::DateTime::parse_from_rfc3339(raw.trim())
            .ok()
            .map(|date| date.timestamp_millis()),
        _ => None,
    }
}

//! Data models for Memento

mod kind;
mod profile;
mod record;

pub use kind::{Audio, Kind, MediaKind, Photo};
pub use profile::{UserProfile, PROFILES_COLLECTION};
pub use record::{
    AssetUri, Document, Fields, MediaRecord, OwnerId, RecordId, CREATED_AT_FIELD, NAME_FIELD,
    OWNER_FIELD,
};

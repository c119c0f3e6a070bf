//! memento-core - Core library for Memento
//!
//! This crate contains the media record model, the device and backend
//! capability traits, and the screen state machines shared by every
//! Memento shell: the photo and audio galleries, the audio transport, and
//! the account flows.

pub mod auth;
pub mod capabilities;
pub mod clip;
pub mod config;
pub mod db;
pub mod device;
pub mod error;
pub mod models;
pub mod notice;
pub mod profile;
pub mod screen;
pub mod store;
pub mod util;

#[cfg(test)]
mod testing;

pub use capabilities::Capabilities;
pub use error::{Error, Result};
pub use models::{AssetUri, MediaRecord, OwnerId, RecordId};

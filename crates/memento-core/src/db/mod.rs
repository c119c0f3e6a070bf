//! Database layer backing the local document store

mod connection;
mod migrations;

pub use connection::{Database, StoreConfig, SyncConfig};

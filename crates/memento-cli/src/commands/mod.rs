pub mod audio;
pub mod auth_cmd;
pub mod common;
pub mod completions;
pub mod config;
pub mod photos;
pub mod sync;

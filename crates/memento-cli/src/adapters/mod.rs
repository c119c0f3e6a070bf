//! Terminal and file-system implementations of the device capabilities.

pub mod audio;
pub mod mail;
pub mod notices;
pub mod permissions;
pub mod picker;

pub use audio::TerminalAudio;
pub use mail::OutboxMailer;
pub use notices::StderrNotices;
pub use permissions::PromptPermissionGate;
pub use picker::TerminalPicker;

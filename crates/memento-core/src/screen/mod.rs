//! Screen controllers for the photo and audio galleries.
//!
//! Both screens sit on a [`MediaRepository`] that keeps the signed-in
//! owner's records in sync with the document store. The photo screen adds
//! capture and ordering; the audio screen adds the recorder/player
//! transport.

mod actions;
mod audio;
mod ordering;
mod photo;
mod repository;
mod transport;

pub use actions::{ActionOutcome, ActionPrompt, RecordAction, ShareOutcome};
pub use audio::{AudioScreen, UPLOAD_ERROR};
pub use ordering::SortOrder;
pub use photo::{CaptureResult, PhotoScreen};
pub use repository::{MediaRepository, PERMISSION_NOTICE};
pub use transport::{transition, PlaybackState, Progress, TransportEvent};

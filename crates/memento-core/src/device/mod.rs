//! Device capability adapters.
//!
//! The platform shell supplies implementations of these traits: permission
//! prompts, the photo picker/camera, the microphone recorder and sound
//! player, and the mail composer. Every capture-side operation is preceded
//! by a [`PermissionGate::acquire`] call made by the screen controllers.

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::models::AssetUri;
use crate::Result;

/// A runtime permission the user must grant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    Camera,
    MediaLibrary,
    Microphone,
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Camera => "camera",
            Self::MediaLibrary => "media library",
            Self::Microphone => "microphone",
        })
    }
}

/// Requests runtime permissions. Implementations may prompt the user.
#[async_trait]
pub trait PermissionGate: Send + Sync {
    /// Returns `true` only when the capability is granted.
    async fn acquire(&self, capability: Capability) -> bool;
}

/// Where a photo comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PhotoSource {
    Camera,
    Library,
}

impl PhotoSource {
    /// Permission that must be granted before using this source.
    pub const fn capability(self) -> Capability {
        match self {
            Self::Camera => Capability::Camera,
            Self::Library => Capability::MediaLibrary,
        }
    }
}

/// Picker options passed to the platform.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CaptureOptions {
    /// Compression quality in `0.0..=1.0`.
    pub quality: f32,
    /// Restrict the picker to still images.
    pub images_only: bool,
}

impl Default for CaptureOptions {
    fn default() -> Self {
        Self {
            quality: 0.5,
            images_only: true,
        }
    }
}

/// Result of a picker or camera session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureOutcome {
    Captured(AssetUri),
    /// The user dismissed the picker. Not an error.
    Cancelled,
}

/// Camera and library picker.
#[async_trait]
pub trait PhotoPicker: Send + Sync {
    async fn capture(&self, source: PhotoSource, options: CaptureOptions)
        -> Result<CaptureOutcome>;
}

/// Interruption policy for the shared audio session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterruptionMode {
    DoNotMix,
    DuckOthers,
    MixWithOthers,
}

/// Audio session configuration applied before recording or playback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(clippy::struct_excessive_bools)]
pub struct AudioMode {
    pub allows_recording: bool,
    pub interruption: InterruptionMode,
    pub plays_in_silent_mode: bool,
    pub duck_others: bool,
    pub play_through_earpiece: bool,
    pub stays_active_in_background: bool,
}

impl AudioMode {
    /// Session profile used while the microphone is live.
    pub const fn recording() -> Self {
        Self {
            allows_recording: true,
            interruption: InterruptionMode::DoNotMix,
            plays_in_silent_mode: true,
            duck_others: true,
            play_through_earpiece: false,
            stays_active_in_background: true,
        }
    }

    /// Session profile used for clip playback.
    pub const fn playback() -> Self {
        Self {
            allows_recording: false,
            ..Self::recording()
        }
    }
}

/// Recorder quality presets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RecordingPreset {
    #[default]
    HighQuality,
    LowQuality,
}

impl RecordingPreset {
    /// PCM sample rate used for this preset.
    pub const fn sample_rate_hz(self) -> u32 {
        match self {
            Self::HighQuality => 44_100,
            Self::LowQuality => 16_000,
        }
    }

    pub const fn channels(self) -> u16 {
        match self {
            Self::HighQuality => 2,
            Self::LowQuality => 1,
        }
    }
}

/// Status tick from a loaded sound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PlaybackStatus {
    pub position_ms: u64,
    /// Total length, when the transport knows it.
    pub duration_ms: Option<u64>,
    /// Set on the tick where the clip reached its end.
    pub did_just_finish: bool,
}

/// A loaded, playable sound resource.
///
/// Must be unloaded to release the underlying device resource.
#[async_trait]
pub trait Sound: Send {
    async fn play(&mut self) -> Result<()>;
    async fn pause(&mut self) -> Result<()>;
    async fn stop(&mut self) -> Result<()>;
    async fn unload(self: Box<Self>) -> Result<()>;
}

/// A sound plus the channel its status updates arrive on.
pub struct LoadedSound {
    pub sound: Box<dyn Sound>,
    pub status: mpsc::UnboundedReceiver<PlaybackStatus>,
}

impl fmt::Debug for LoadedSound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadedSound").finish_non_exhaustive()
    }
}

/// Microphone recorder and sound player sharing one audio session.
#[async_trait]
pub trait AudioBackend: Send + Sync {
    async fn set_mode(&self, mode: AudioMode) -> Result<()>;
    async fn start_recording(&self, preset: RecordingPreset) -> Result<()>;
    /// Finalize the clip and return where it was written.
    async fn stop_recording(&self) -> Result<AssetUri>;
    /// Abandon an in-progress recording without producing a clip.
    async fn discard_recording(&self) -> Result<()>;
    async fn load(&self, uri: &AssetUri) -> Result<LoadedSound>;
}

/// A message to compose in the platform mail client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailDraft {
    pub subject: String,
    pub body: String,
    pub attachments: Vec<AssetUri>,
}

/// Outcome reported by the mail composer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MailStatus {
    Sent,
    Saved,
    Cancelled,
}

/// Platform mail composer.
#[async_trait]
pub trait MailComposer: Send + Sync {
    async fn is_available(&self) -> bool;
    async fn compose(&self, draft: MailDraft) -> Result<MailStatus>;
}

/// Mailbox for status updates sent by a sound implementation.
pub fn playback_channel() -> (
    mpsc::UnboundedSender<PlaybackStatus>,
    mpsc::UnboundedReceiver<PlaybackStatus>,
) {
    mpsc::unbounded_channel()
}

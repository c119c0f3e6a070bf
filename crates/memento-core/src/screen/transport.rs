//! Audio transport state machine and playback progress.

use serde::Serialize;

use crate::device::PlaybackStatus;
use crate::util::format_clock;
use crate::{Error, Result};

/// Recorder/player state of one audio screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaybackState {
    #[default]
    Idle,
    Recording,
    /// A finished clip is waiting to be uploaded.
    StoppedPendingUpload,
    Playing,
    Paused,
}

impl PlaybackState {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Recording => "recording",
            Self::StoppedPendingUpload => "pending upload",
            Self::Playing => "playing",
            Self::Paused => "paused",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportEvent {
    StartRecording,
    StopRecording,
    Upload,
    Play,
    Pause,
    Resume,
    Stop,
    /// The clip reached its end on its own.
    Finish,
}

impl TransportEvent {
    pub const fn label(self) -> &'static str {
        match self {
            Self::StartRecording => "start recording",
            Self::StopRecording => "stop recording",
            Self::Upload => "upload",
            Self::Play => "play",
            Self::Pause => "pause",
            Self::Resume => "resume",
            Self::Stop => "stop",
            Self::Finish => "finish",
        }
    }
}

/// Deterministic transport transition.
///
/// `has_pending` says whether a recorded clip is waiting for upload; it is
/// what makes `Upload` legal while that clip is being previewed.
pub fn transition(
    state: PlaybackState,
    event: TransportEvent,
    has_pending: bool,
) -> Result<PlaybackState> {
    use PlaybackState as S;
    use TransportEvent as E;

    let next = match (state, event) {
        (S::Idle, E::StartRecording) => S::Recording,
        (S::Recording, E::StopRecording) => S::StoppedPendingUpload,
        (S::StoppedPendingUpload, E::Upload) => S::Idle,
        (S::Playing | S::Paused, E::Upload) if has_pending => state,
        (S::Idle | S::StoppedPendingUpload | S::Playing | S::Paused, E::Play)
        | (S::Paused, E::Resume) => S::Playing,
        (S::Playing, E::Pause) => S::Paused,
        (S::Playing | S::Paused, E::Stop) | (S::Playing, E::Finish) => S::Idle,
        _ => {
            return Err(Error::InvalidTransition {
                state: state.label(),
                action: event.label(),
            })
        }
    };
    Ok(next)
}

/// Elapsed and total time of the current clip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Progress {
    pub position_ms: u64,
    pub duration_ms: u64,
}

impl Progress {
    pub fn update(&mut self, status: &PlaybackStatus) {
        self.position_ms = status.position_ms;
        self.duration_ms = status.duration_ms.unwrap_or(0);
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Fraction played in `0.0..=1.0`; zero when the length is unknown.
    #[allow(clippy::cast_precision_loss)]
    pub fn ratio(&self) -> f64 {
        if self.duration_ms == 0 {
            return 0.0;
        }
        (self.position_ms as f64 / self.duration_ms as f64).clamp(0.0, 1.0)
    }

    #[allow(clippy::cast_precision_loss)]
    pub fn elapsed_secs(&self) -> f64 {
        self.position_ms as f64 / 1000.0
    }

    #[allow(clippy::cast_precision_loss)]
    pub fn total_secs(&self) -> f64 {
        self.duration_ms as f64 / 1000.0
    }

    /// `mm:ss / mm:ss`
    pub fn clock(&self) -> String {
        format!(
            "{} / {}",
            format_clock(self.elapsed_secs()),
            format_clock(self.total_secs())
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use PlaybackState as S;
    use TransportEvent as E;

    #[test]
    fn record_then_upload_returns_to_idle() {
        let recording = transition(S::Idle, E::StartRecording, false).unwrap();
        let pending = transition(recording, E::StopRecording, false).unwrap();
        assert_eq!(pending, S::StoppedPendingUpload);
        assert_eq!(transition(pending, E::Upload, true).unwrap(), S::Idle);
    }

    #[test]
    fn cannot_start_recording_twice() {
        assert!(matches!(
            transition(S::Recording, E::StartRecording, false),
            Err(Error::InvalidTransition { state: "recording", .. })
        ));
        assert!(transition(S::Playing, E::StartRecording, false).is_err());
    }

    #[test]
    fn play_pause_resume_stop() {
        let playing = transition(S::Idle, E::Play, false).unwrap();
        let paused = transition(playing, E::Pause, false).unwrap();
        assert_eq!(paused, S::Paused);
        assert_eq!(transition(paused, E::Resume, false).unwrap(), S::Playing);
        assert_eq!(transition(paused, E::Stop, false).unwrap(), S::Idle);
        assert_eq!(transition(playing, E::Finish, false).unwrap(), S::Idle);
    }

    #[test]
    fn cannot_play_while_recording() {
        assert!(transition(S::Recording, E::Play, false).is_err());
        assert!(transition(S::Idle, E::Pause, false).is_err());
        assert!(transition(S::Paused, E::Pause, false).is_err());
    }

    #[test]
    fn upload_needs_a_pending_clip() {
        assert!(transition(S::Idle, E::Upload, false).is_err());
        assert!(transition(S::Playing, E::Upload, false).is_err());
        assert_eq!(transition(S::Playing, E::Upload, true).unwrap(), S::Playing);
    }

    #[test]
    fn progress_ratio_and_clock() {
        let mut progress = Progress::default();
        assert!(progress.ratio().abs() < f64::EPSILON);

        progress.update(&PlaybackStatus {
            position_ms: 65_500,
            duration_ms: Some(131_000),
            did_just_finish: false,
        });
        assert!((progress.ratio() - 0.5).abs() < 1e-9);
        assert_eq!(progress.clock(), "01:05 / 02:11");

        progress.update(&PlaybackStatus {
            position_ms: 900,
            duration_ms: None,
            did_just_finish: false,
        });
        assert!(progress.ratio().abs() < f64::EPSILON);

        progress.reset();
        assert_eq!(progress, Progress::default());
    }
}

//! Audio recorder and gallery controller.

use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use tokio::sync::mpsc;

use crate::capabilities::Capabilities;
use crate::device::{AudioBackend, AudioMode, Capability, PlaybackStatus, RecordingPreset, Sound};
use crate::models::{AssetUri, Audio, RecordId};
use crate::notice::Notice;
use crate::{Error, Result};

use super::actions::{ActionOutcome, RecordAction};
use super::repository::MediaRepository;
use super::transport::{transition, PlaybackState, Progress, TransportEvent};

/// Error flag shown after a failed clip upload.
pub const UPLOAD_ERROR: &str = "Error uploading audio";

struct ActivePlayback {
    uri: AssetUri,
    /// Record being played, or `None` for the pending clip.
    target: Option<RecordId>,
    sound: Box<dyn Sound>,
    status: mpsc::UnboundedReceiver<PlaybackStatus>,
}

/// Audio screen: one recorder, one player, and the owner's clip list.
///
/// Holds at most one recording, one loaded sound, and one pending clip.
/// Call [`AudioScreen::teardown`] before dropping to release them.
pub struct AudioScreen {
    repo: MediaRepository<Audio>,
    backend: Arc<dyn AudioBackend>,
    state: PlaybackState,
    pending: Option<AssetUri>,
    active: Option<ActivePlayback>,
    progress: Progress,
    upload_error: Option<&'static str>,
}

impl AudioScreen {
    pub fn new(caps: Capabilities, backend: Arc<dyn AudioBackend>) -> Self {
        Self {
            repo: MediaRepository::new(caps),
            backend,
            state: PlaybackState::Idle,
            pending: None,
            active: None,
            progress: Progress::default(),
            upload_error: None,
        }
    }

    pub const fn state(&self) -> PlaybackState {
        self.state
    }

    /// Recorded clip waiting for upload.
    pub const fn pending_clip(&self) -> Option<&AssetUri> {
        self.pending.as_ref()
    }

    pub const fn progress(&self) -> &Progress {
        &self.progress
    }

    pub const fn upload_error(&self) -> Option<&'static str> {
        self.upload_error
    }

    pub fn playback_target(&self) -> Option<&RecordId> {
        self.active.as_ref().and_then(|active| active.target.as_ref())
    }

    fn next_state(&self, event: TransportEvent) -> Result<PlaybackState> {
        transition(self.state, event, self.pending.is_some())
    }

    fn device_failure(&self, message: &'static str, error: Error) -> Error {
        tracing::warn!("{message}: {error}");
        self.repo
            .capabilities()
            .notices
            .present(Notice::error("Error", message));
        match error {
            Error::DeviceOperationFailed(_) => error,
            other => Error::DeviceOperationFailed(other.to_string()),
        }
    }

    pub async fn start_recording(&mut self) -> Result<()> {
        self.repo.owner()?;
        let next = self.next_state(TransportEvent::StartRecording)?;

        self.repo.acquire(Capability::Microphone).await?;

        if let Err(error) = self.backend.set_mode(AudioMode::recording()).await {
            return Err(self.device_failure("Failed to start recording", error));
        }
        if let Err(error) = self
            .backend
            .start_recording(RecordingPreset::HighQuality)
            .await
        {
            return Err(self.device_failure("Failed to start recording", error));
        }

        self.state = next;
        tracing::info!("Recording started");
        Ok(())
    }

    /// Finalize the recording into a pending clip. Nothing is stored yet.
    pub async fn stop_recording(&mut self) -> Result<&AssetUri> {
        let next = self.next_state(TransportEvent::StopRecording)?;

        match self.backend.stop_recording().await {
            Ok(uri) => {
                tracing::info!("Recording stopped and saved at {uri}");
                self.state = next;
                Ok(self.pending.insert(uri))
            }
            Err(error) => {
                self.backend.discard_recording().await.ok();
                self.state = PlaybackState::Idle;
                Err(self.device_failure("Failed to stop recording", error))
            }
        }
    }

    /// Store the pending clip as a record.
    ///
    /// The pending clip is cleared whether or not the store accepts it.
    pub async fn upload(&mut self) -> Result<RecordId> {
        let next = self.next_state(TransportEvent::Upload)?;
        let uri = self.pending.take().ok_or(Error::InvalidTransition {
            state: self.state.label(),
            action: TransportEvent::Upload.label(),
        })?;
        self.state = next;

        match self.repo.persist(&uri).await {
            Ok(id) => {
                self.upload_error = None;
                Ok(id)
            }
            Err(error) => {
                tracing::warn!("An error occurred during upload: {error}");
                self.upload_error = Some(UPLOAD_ERROR);
                Err(error)
            }
        }
    }

    /// Play a stored record, replacing whatever is loaded.
    pub async fn play_record(&mut self, id: &RecordId) -> Result<()> {
        let uri = self.repo.record(id)?.media_url.clone();
        self.play(uri, Some(id.clone())).await
    }

    /// Preview the pending clip before uploading it.
    pub async fn play_pending(&mut self) -> Result<()> {
        let uri = self.pending.clone().ok_or(Error::InvalidTransition {
            state: self.state.label(),
            action: "preview",
        })?;
        self.play(uri, None).await
    }

    async fn play(&mut self, uri: AssetUri, target: Option<RecordId>) -> Result<()> {
        let next = self.next_state(TransportEvent::Play)?;
        self.release_active().await;
        self.progress.reset();

        let loaded = match self.backend.set_mode(AudioMode::playback()).await {
            Ok(()) => self.backend.load(&uri).await,
            Err(error) => Err(error),
        };
        let mut loaded = match loaded {
            Ok(loaded) => loaded,
            Err(error) => {
                self.settle_without_sound();
                return Err(self.device_failure("Failed to play audio", error));
            }
        };

        if let Err(error) = loaded.sound.play().await {
            loaded.sound.unload().await.ok();
            self.settle_without_sound();
            return Err(self.device_failure("Failed to play audio", error));
        }

        tracing::info!("Playing {uri}");
        self.active = Some(ActivePlayback {
            uri,
            target,
            sound: loaded.sound,
            status: loaded.status,
        });
        self.state = next;
        Ok(())
    }

    pub async fn pause(&mut self) -> Result<()> {
        let next = self.next_state(TransportEvent::Pause)?;
        let Some(active) = self.active.as_mut() else {
            return Err(Error::InvalidTransition {
                state: self.state.label(),
                action: TransportEvent::Pause.label(),
            });
        };
        if let Err(error) = active.sound.pause().await {
            return Err(self.device_failure("Failed to pause audio", error));
        }
        self.state = next;
        tracing::info!("Playback paused");
        Ok(())
    }

    /// Resume by re-issuing a full play of the same clip.
    ///
    /// Playback restarts from the beginning unless the transport itself
    /// keeps the position.
    pub async fn resume(&mut self) -> Result<()> {
        self.next_state(TransportEvent::Resume)?;
        let Some(active) = self.active.as_ref() else {
            return Err(Error::InvalidTransition {
                state: self.state.label(),
                action: TransportEvent::Resume.label(),
            });
        };
        let (uri, target) = (active.uri.clone(), active.target.clone());
        self.play(uri, target).await
    }

    /// Stop playback, release the sound, and return to idle.
    pub async fn stop(&mut self) -> Result<()> {
        let next = self.next_state(TransportEvent::Stop)?;
        self.finish_playback(next).await;
        tracing::info!("Playback stopped");
        Ok(())
    }

    /// Feed one status tick from the loaded sound.
    pub async fn handle_status(&mut self, status: PlaybackStatus) -> Result<()> {
        if self.active.is_none() {
            return Ok(());
        }
        self.progress.update(&status);
        tracing::debug!("Playback at {}", self.progress.clock());

        if status.did_just_finish {
            let next = self.next_state(TransportEvent::Finish)?;
            self.finish_playback(next).await;
            tracing::info!("Playback finished");
        }
        Ok(())
    }

    /// Wait for the loaded sound's next status tick and apply it.
    ///
    /// Returns `None` when nothing is loaded or the sound stopped reporting.
    pub async fn next_status(&mut self) -> Result<Option<PlaybackStatus>> {
        let Some(active) = self.active.as_mut() else {
            return Ok(None);
        };
        let Some(status) = active.status.recv().await else {
            return Ok(None);
        };
        self.handle_status(status).await?;
        Ok(Some(status))
    }

    /// Run a prompt action. Deleting the clip that is playing stops it first.
    pub async fn handle_action(
        &mut self,
        id: &RecordId,
        action: RecordAction,
    ) -> Result<ActionOutcome> {
        if action == RecordAction::Delete && self.playback_target() == Some(id) {
            self.finish_playback(PlaybackState::Idle).await;
        }
        self.repo.handle_action(id, action).await
    }

    /// Release the recorder, the sound, and the subscription.
    pub async fn teardown(&mut self) {
        if self.state == PlaybackState::Recording {
            if let Err(error) = self.backend.discard_recording().await {
                tracing::warn!("Failed to discard recording: {error}");
            }
        }
        self.release_active().await;
        self.pending = None;
        self.progress.reset();
        self.state = PlaybackState::Idle;
        self.repo.unmount();
    }

    async fn finish_playback(&mut self, next: PlaybackState) {
        self.release_active().await;
        self.progress.reset();
        self.pending = None;
        self.state = next;
    }

    fn settle_without_sound(&mut self) {
        self.state = if self.pending.is_some() {
            PlaybackState::StoppedPendingUpload
        } else {
            PlaybackState::Idle
        };
    }

    async fn release_active(&mut self) {
        let Some(mut active) = self.active.take() else {
            return;
        };
        if let Err(error) = active.sound.stop().await {
            tracing::warn!("Failed to stop {}: {error}", active.uri);
        }
        if let Err(error) = active.sound.unload().await {
            tracing::warn!("Failed to unload {}: {error}", active.uri);
        }
    }
}

impl Deref for AudioScreen {
    type Target = MediaRepository<Audio>;

    fn deref(&self) -> &Self::Target {
        &self.repo
    }
}

impl DerefMut for AudioScreen {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.repo
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notice::NoticeLevel;
    use crate::testing::{verified_session, Harness, ScriptedAudio};
    use pretty_assertions::assert_eq;
    use std::sync::atomic::Ordering;

    const CLIP: &str = "file:///tmp/take-1.wav";

    async fn mounted(harness: &Harness, audio: &Arc<ScriptedAudio>) -> AudioScreen {
        let mut screen = AudioScreen::new(harness.capabilities(), audio.clone());
        screen.mount(&verified_session("u1")).await.unwrap();
        screen.next_snapshot().await.unwrap();
        screen
    }

    async fn with_uploaded_clip(screen: &mut AudioScreen) -> RecordId {
        screen.start_recording().await.unwrap();
        screen.stop_recording().await.unwrap();
        let id = screen.upload().await.unwrap();
        screen.next_snapshot().await.unwrap();
        id
    }

    fn tick(position_ms: u64, did_just_finish: bool) -> PlaybackStatus {
        PlaybackStatus {
            position_ms,
            duration_ms: Some(4_000),
            did_just_finish,
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn record_stop_upload_creates_one_record() {
        let harness = Harness::granting(&[Capability::Microphone]).await;
        let audio = ScriptedAudio::recording_to(CLIP);
        let mut screen = mounted(&harness, &audio).await;

        screen.start_recording().await.unwrap();
        assert_eq!(screen.state(), PlaybackState::Recording);

        let clip = screen.stop_recording().await.unwrap().clone();
        assert_eq!(clip.as_str(), CLIP);
        assert_eq!(screen.state(), PlaybackState::StoppedPendingUpload);
        screen.upload().await.unwrap();
        assert_eq!(screen.state(), PlaybackState::Idle);
        assert_eq!(screen.pending_clip(), None);

        screen.next_snapshot().await.unwrap();
        assert_eq!(screen.records().len(), 1);
        assert_eq!(screen.records()[0].media_url.as_str(), CLIP);
        assert_eq!(
            audio.calls(),
            vec!["mode recording", "record", "finalize"]
        );
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn cannot_start_recording_twice() {
        let harness = Harness::granting(&[Capability::Microphone]).await;
        let audio = ScriptedAudio::recording_to(CLIP);
        let mut screen = mounted(&harness, &audio).await;

        screen.start_recording().await.unwrap();
        let error = screen.start_recording().await.unwrap_err();
        assert!(matches!(error, Error::InvalidTransition { .. }));
        assert_eq!(
            audio.calls().iter().filter(|call| *call == "record").count(),
            1
        );
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn denied_microphone_leaves_recorder_untouched() {
        let harness = Harness::granting(&[]).await;
        let audio = ScriptedAudio::recording_to(CLIP);
        let mut screen = mounted(&harness, &audio).await;

        let error = screen.start_recording().await.unwrap_err();
        assert!(matches!(error, Error::PermissionDenied(Capability::Microphone)));
        assert_eq!(screen.state(), PlaybackState::Idle);
        assert!(audio.calls().is_empty());
        assert_eq!(harness.notices.all()[0].level, NoticeLevel::Blocking);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn recorder_failure_stays_idle() {
        let harness = Harness::granting(&[Capability::Microphone]).await;
        let audio = ScriptedAudio::recording_to(CLIP);
        audio.fail_start.store(true, Ordering::SeqCst);
        let mut screen = mounted(&harness, &audio).await;

        let error = screen.start_recording().await.unwrap_err();
        assert!(matches!(error, Error::DeviceOperationFailed(_)));
        assert_eq!(screen.state(), PlaybackState::Idle);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn failed_upload_sets_flag_and_clears_pending() {
        let harness = Harness::granting(&[Capability::Microphone]).await;
        let audio = ScriptedAudio::recording_to(CLIP);
        let mut screen = mounted(&harness, &audio).await;

        harness.store.fail_create.store(true, Ordering::SeqCst);
        screen.start_recording().await.unwrap();
        screen.stop_recording().await.unwrap();
        let error = screen.upload().await.unwrap_err();

        assert!(error.is_persistence());
        assert_eq!(screen.upload_error(), Some(UPLOAD_ERROR));
        assert_eq!(screen.pending_clip(), None);
        assert_eq!(screen.state(), PlaybackState::Idle);

        harness.store.fail_create.store(false, Ordering::SeqCst);
        screen.start_recording().await.unwrap();
        screen.stop_recording().await.unwrap();
        screen.upload().await.unwrap();
        assert_eq!(screen.upload_error(), None);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn natural_completion_returns_to_idle_and_releases_sound() {
        let harness = Harness::granting(&[Capability::Microphone]).await;
        let audio = ScriptedAudio::recording_to(CLIP);
        let mut screen = mounted(&harness, &audio).await;
        let id = with_uploaded_clip(&mut screen).await;

        screen.play_record(&id).await.unwrap();
        assert_eq!(screen.state(), PlaybackState::Playing);
        assert_eq!(screen.playback_target(), Some(&id));

        audio.tick(tick(2_000, false));
        screen.next_status().await.unwrap();
        assert!((screen.progress().ratio() - 0.5).abs() < 1e-9);

        audio.tick(tick(4_000, true));
        screen.next_status().await.unwrap();
        assert_eq!(screen.state(), PlaybackState::Idle);
        assert_eq!(*screen.progress(), Progress::default());
        assert!(audio.calls().ends_with(&[
            format!("stop {CLIP}"),
            format!("unload {CLIP}"),
        ]));
        assert_eq!(screen.next_status().await.unwrap(), None);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn playing_again_unloads_the_previous_sound_first() {
        let harness = Harness::granting(&[Capability::Microphone]).await;
        let audio = ScriptedAudio::recording_to(CLIP);
        let mut screen = mounted(&harness, &audio).await;
        let id = with_uploaded_clip(&mut screen).await;

        screen.play_record(&id).await.unwrap();
        screen.play_record(&id).await.unwrap();

        let playback: Vec<String> = audio.calls().into_iter().skip(3).collect();
        let expected: Vec<String> = [
            "mode playback",
            "load {}",
            "play {}",
            "stop {}",
            "unload {}",
            "mode playback",
            "load {}",
            "play {}",
        ]
        .iter()
        .map(|call| call.replace("{}", CLIP))
        .collect();
        assert_eq!(playback, expected);
        assert_eq!(screen.state(), PlaybackState::Playing);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn resume_reissues_a_full_play() {
        let harness = Harness::granting(&[Capability::Microphone]).await;
        let audio = ScriptedAudio::recording_to(CLIP);
        let mut screen = mounted(&harness, &audio).await;
        let id = with_uploaded_clip(&mut screen).await;

        screen.play_record(&id).await.unwrap();
        screen.pause().await.unwrap();
        assert_eq!(screen.state(), PlaybackState::Paused);
        assert!(screen.pause().await.is_err());

        screen.resume().await.unwrap();
        assert_eq!(screen.state(), PlaybackState::Playing);
        let loads = audio
            .calls()
            .iter()
            .filter(|call| call.starts_with("load"))
            .count();
        assert_eq!(loads, 2);

        screen.stop().await.unwrap();
        assert_eq!(screen.state(), PlaybackState::Idle);
        assert!(screen.resume().await.is_err());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn cannot_play_while_recording() {
        let harness = Harness::granting(&[Capability::Microphone]).await;
        let audio = ScriptedAudio::recording_to(CLIP);
        let mut screen = mounted(&harness, &audio).await;
        let id = with_uploaded_clip(&mut screen).await;

        screen.start_recording().await.unwrap();
        assert!(matches!(
            screen.play_record(&id).await,
            Err(Error::InvalidTransition { .. })
        ));
        assert_eq!(screen.state(), PlaybackState::Recording);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn pending_clip_can_be_previewed_then_uploaded() {
        let harness = Harness::granting(&[Capability::Microphone]).await;
        let audio = ScriptedAudio::recording_to(CLIP);
        let mut screen = mounted(&harness, &audio).await;

        screen.start_recording().await.unwrap();
        screen.stop_recording().await.unwrap();
        screen.play_pending().await.unwrap();
        assert_eq!(screen.state(), PlaybackState::Playing);
        assert_eq!(screen.playback_target(), None);

        screen.upload().await.unwrap();
        assert_eq!(screen.state(), PlaybackState::Playing);
        assert_eq!(screen.pending_clip(), None);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn load_failure_keeps_pending_clip() {
        let harness = Harness::granting(&[Capability::Microphone]).await;
        let audio = ScriptedAudio::recording_to(CLIP);
        audio.fail_load.store(true, Ordering::SeqCst);
        let mut screen = mounted(&harness, &audio).await;

        screen.start_recording().await.unwrap();
        screen.stop_recording().await.unwrap();
        let error = screen.play_pending().await.unwrap_err();

        assert!(matches!(error, Error::DeviceOperationFailed(_)));
        assert_eq!(screen.state(), PlaybackState::StoppedPendingUpload);
        assert!(screen.pending_clip().is_some());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn deleting_the_playing_record_stops_it_first() {
        let harness = Harness::granting(&[Capability::Microphone]).await;
        let audio = ScriptedAudio::recording_to(CLIP);
        let mut screen = mounted(&harness, &audio).await;
        let id = with_uploaded_clip(&mut screen).await;

        screen.play_record(&id).await.unwrap();
        let outcome = screen.handle_action(&id, RecordAction::Delete).await.unwrap();

        assert_eq!(outcome, ActionOutcome::Deleted);
        assert_eq!(screen.state(), PlaybackState::Idle);
        assert!(screen.records().is_empty());
        assert!(audio.calls().contains(&format!("unload {CLIP}")));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn teardown_releases_recorder_and_subscription() {
        let harness = Harness::granting(&[Capability::Microphone]).await;
        let audio = ScriptedAudio::recording_to(CLIP);
        let mut screen = mounted(&harness, &audio).await;

        screen.start_recording().await.unwrap();
        screen.teardown().await;

        assert_eq!(screen.state(), PlaybackState::Idle);
        assert!(!screen.is_mounted());
        assert_eq!(audio.calls().last().map(String::as_str), Some("discard"));
    }
}

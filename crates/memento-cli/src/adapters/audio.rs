use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use memento_core::clip::{wav_duration_ms, ClipFormat, ClipWriter};
use memento_core::device::{
    playback_channel, AudioBackend, AudioMode, LoadedSound, PlaybackStatus, RecordingPreset, Sound,
};
use memento_core::{AssetUri, Error, Result};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::sync::{mpsc, oneshot, Mutex, Notify};
use tokio::task::JoinHandle;
use tokio::time::Instant;

use super::picker::command_line;

/// How often a playing clip reports its position.
pub const STATUS_INTERVAL: Duration = Duration::from_millis(500);

struct ActiveRecording {
    path: PathBuf,
    stop: oneshot::Sender<()>,
    task: JoinHandle<Result<u64>>,
}

/// Records PCM16 from stdin into WAV clips and plays clips on a wall clock.
///
/// When a player command is configured it is spawned alongside the clock so
/// the clip is audible.
pub struct TerminalAudio {
    clips_dir: PathBuf,
    player_command: Option<String>,
    recording: Mutex<Option<ActiveRecording>>,
    input_closed: Arc<Notify>,
}

impl TerminalAudio {
    pub fn new(clips_dir: PathBuf, player_command: Option<String>) -> Self {
        Self {
            clips_dir,
            player_command,
            recording: Mutex::new(None),
            input_closed: Arc::new(Notify::new()),
        }
    }

    /// Resolves once the recorder has read stdin to its end.
    pub async fn input_closed(&self) {
        self.input_closed.notified().await;
    }

    async fn finish_recording(&self) -> Result<Option<(PathBuf, u64)>> {
        let Some(recording) = self.recording.lock().await.take() else {
            return Ok(None);
        };
        recording.stop.send(()).ok();
        let duration = recording
            .task
            .await
            .map_err(|error| Error::DeviceOperationFailed(format!("recorder stopped: {error}")))??;
        Ok(Some((recording.path, duration)))
    }
}

#[async_trait]
impl AudioBackend for TerminalAudio {
    async fn set_mode(&self, mode: AudioMode) -> Result<()> {
        tracing::debug!("Audio mode set: {mode:?}");
        Ok(())
    }

    async fn start_recording(&self, preset: RecordingPreset) -> Result<()> {
        let mut slot = self.recording.lock().await;
        if slot.is_some() {
            return Err(Error::DeviceOperationFailed(
                "a recording is already in progress".to_string(),
            ));
        }

        let path = self.clips_dir.join(format!(
            "recording-{}.wav",
            Utc::now().format("%Y%m%d-%H%M%S%3f")
        ));
        let writer = ClipWriter::create(&path, ClipFormat::from(preset))?;
        let (stop, stopped) = oneshot::channel();
        let task = tokio::spawn(record_pcm16(
            tokio::io::stdin(),
            writer,
            stopped,
            Arc::clone(&self.input_closed),
        ));

        tracing::debug!("Recording into {}", path.display());
        *slot = Some(ActiveRecording { path, stop, task });
        Ok(())
    }

    async fn stop_recording(&self) -> Result<AssetUri> {
        let Some((path, duration_ms)) = self.finish_recording().await? else {
            return Err(Error::DeviceOperationFailed(
                "no recording in progress".to_string(),
            ));
        };
        tracing::info!("Recorded {duration_ms} ms into {}", path.display());
        AssetUri::from_path(&path)
    }

    async fn discard_recording(&self) -> Result<()> {
        let finished = self.finish_recording().await;
        if let Ok(Some((path, _))) = &finished {
            tokio::fs::remove_file(path).await.ok();
        }
        finished.map(|_| ())
    }

    async fn load(&self, uri: &AssetUri) -> Result<LoadedSound> {
        let Some(path) = uri.to_local_path() else {
            return Err(Error::DeviceOperationFailed(format!(
                "{uri} is not a local clip"
            )));
        };
        let duration_ms = wav_duration_ms(&path)?;
        let (status_tx, status_rx) = playback_channel();

        Ok(LoadedSound {
            sound: Box::new(ClockSound {
                path,
                duration_ms,
                player_command: self.player_command.clone(),
                status: status_tx,
                ticker: None,
                player: None,
            }),
            status: status_rx,
        })
    }
}

/// Stream PCM16 from `input` into `writer` until told to stop.
///
/// `input_closed` fires when the input ends or fails, so the controller
/// never waits on a recording that can no longer make progress.
pub async fn record_pcm16<R: AsyncRead + Unpin>(
    mut input: R,
    mut writer: ClipWriter,
    mut stopped: oneshot::Receiver<()>,
    input_closed: Arc<Notify>,
) -> Result<u64> {
    let mut buffer = vec![0_u8; 8192];
    let mut carry = None;

    loop {
        tokio::select! {
            _ = &mut stopped => break,
            read = input.read(&mut buffer) => {
                let written = match read {
                    Ok(0) => {
                        input_closed.notify_one();
                        // Wait for the controller to collect the clip.
                        stopped.await.ok();
                        break;
                    }
                    Ok(count) => writer.write_samples(&decode_pcm16(&mut carry, &buffer[..count])),
                    Err(error) => Err(error.into()),
                };
                if let Err(error) = written {
                    tracing::warn!("Recording input failed: {error}");
                    input_closed.notify_one();
                    return Err(error);
                }
            }
        }
    }

    writer.finish()
}

/// Decode little-endian PCM16, holding back a trailing odd byte for the next read.
pub fn decode_pcm16(carry: &mut Option<u8>, bytes: &[u8]) -> Vec<i16> {
    let mut samples = Vec::with_capacity(bytes.len() / 2 + 1);
    let mut rest = bytes;

    if let Some(low) = carry.take() {
        let Some((&high, tail)) = rest.split_first() else {
            *carry = Some(low);
            return samples;
        };
        samples.push(i16::from_le_bytes([low, high]));
        rest = tail;
    }

    let mut pairs = rest.chunks_exact(2);
    samples.extend(pairs.by_ref().map(|pair| i16::from_le_bytes([pair[0], pair[1]])));
    *carry = pairs.remainder().first().copied();
    samples
}

struct ClockSound {
    path: PathBuf,
    duration_ms: u64,
    player_command: Option<String>,
    status: mpsc::UnboundedSender<PlaybackStatus>,
    ticker: Option<JoinHandle<()>>,
    player: Option<tokio::process::Child>,
}

impl ClockSound {
    async fn halt(&mut self) {
        if let Some(ticker) = self.ticker.take() {
            ticker.abort();
        }
        if let Some(mut player) = self.player.take() {
            player.kill().await.ok();
        }
    }

    fn spawn_player(&self) -> Option<tokio::process::Child> {
        let command = self.player_command.as_deref()?;
        let (program, args) = command_line(command, &self.path)?;
        match tokio::process::Command::new(&program)
            .args(&args)
            .stdout(std::process::Stdio::null())
            .stderr(std::process::Stdio::null())
            .kill_on_drop(true)
            .spawn()
        {
            Ok(child) => Some(child),
            Err(error) => {
                tracing::warn!("Failed to start player `{program}`: {error}");
                None
            }
        }
    }
}

#[async_trait]
impl Sound for ClockSound {
    async fn play(&mut self) -> Result<()> {
        self.halt().await;
        self.player = self.spawn_player();

        let status = self.status.clone();
        let duration_ms = self.duration_ms;
        self.ticker = Some(tokio::spawn(async move {
            let started = Instant::now();
            let mut interval = tokio::time::interval(STATUS_INTERVAL);
            loop {
                interval.tick().await;
                let elapsed = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
                let position_ms = elapsed.min(duration_ms);
                let finished = position_ms >= duration_ms;
                let tick = PlaybackStatus {
                    position_ms,
                    duration_ms: Some(duration_ms),
                    did_just_finish: finished,
                };
                if status.send(tick).is_err() || finished {
                    break;
                }
            }
        }));
        Ok(())
    }

    async fn pause(&mut self) -> Result<()> {
        self.halt().await;
        Ok(())
    }

    async fn stop(&mut self) -> Result<()> {
        self.halt().await;
        Ok(())
    }

    async fn unload(mut self: Box<Self>) -> Result<()> {
        self.halt().await;
        Ok(())
    }
}

//! Scriptable fakes for the capability traits.

use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::capabilities::Capabilities;
use crate::device::{
    playback_channel, AudioBackend, AudioMode, Capability, CaptureOptions, CaptureOutcome,
    LoadedSound, MailComposer, MailDraft, MailStatus, PermissionGate, PhotoPicker, PhotoSource,
    PlaybackStatus, RecordingPreset, Sound,
};
use crate::models::{AssetUri, Document, Fields, OwnerId, RecordId};
use crate::notice::{Notice, NoticeSink};
use crate::store::{DocumentStore, LibSqlDocumentStore, Subscription};
use crate::{Error, Result};

#[derive(Default)]
pub struct ScriptedPermissions {
    granted: Mutex<HashSet<Capability>>,
    pub requests: Mutex<Vec<Capability>>,
}

impl ScriptedPermissions {
    pub fn granting(capabilities: &[Capability]) -> Arc<Self> {
        Arc::new(Self {
            granted: Mutex::new(capabilities.iter().copied().collect()),
            requests: Mutex::default(),
        })
    }

    pub fn requested(&self) -> Vec<Capability> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl PermissionGate for ScriptedPermissions {
    async fn acquire(&self, capability: Capability) -> bool {
        self.requests.lock().unwrap().push(capability);
        self.granted.lock().unwrap().contains(&capability)
    }
}

#[derive(Default)]
pub struct ScriptedPicker {
    outcomes: Mutex<VecDeque<Result<CaptureOutcome>>>,
    pub calls: Mutex<Vec<PhotoSource>>,
}

impl ScriptedPicker {
    pub fn returning(outcomes: Vec<Result<CaptureOutcome>>) -> Arc<Self> {
        Arc::new(Self {
            outcomes: Mutex::new(outcomes.into()),
            calls: Mutex::default(),
        })
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl PhotoPicker for ScriptedPicker {
    async fn capture(&self, source: PhotoSource, _options: CaptureOptions) -> Result<CaptureOutcome> {
        self.calls.lock().unwrap().push(source);
        self.outcomes
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Ok(CaptureOutcome::Cancelled))
    }
}

#[derive(Default)]
pub struct RecordingNotices {
    notices: Mutex<Vec<Notice>>,
}

impl RecordingNotices {
    pub fn all(&self) -> Vec<Notice> {
        self.notices.lock().unwrap().clone()
    }

    pub fn messages(&self) -> Vec<String> {
        self.all()
            .into_iter()
            .map(|notice| format!("{}: {}", notice.title, notice.message))
            .collect()
    }
}

impl NoticeSink for RecordingNotices {
    fn present(&self, notice: Notice) {
        self.notices.lock().unwrap().push(notice);
    }
}

pub struct FakeMail {
    pub available: AtomicBool,
    pub fail: AtomicBool,
    pub drafts: Mutex<Vec<MailDraft>>,
}

impl Default for FakeMail {
    fn default() -> Self {
        Self {
            available: AtomicBool::new(true),
            fail: AtomicBool::new(false),
            drafts: Mutex::default(),
        }
    }
}

#[async_trait]
impl MailComposer for FakeMail {
    async fn is_available(&self) -> bool {
        self.available.load(Ordering::SeqCst)
    }

    async fn compose(&self, draft: MailDraft) -> Result<MailStatus> {
        self.drafts.lock().unwrap().push(draft);
        if self.fail.load(Ordering::SeqCst) {
            return Err(Error::DeviceOperationFailed("composer crashed".to_string()));
        }
        Ok(MailStatus::Sent)
    }
}

/// Store wrapper that fails selected operations on demand.
pub struct FlakyStore {
    inner: LibSqlDocumentStore,
    pub fail_create: AtomicBool,
    pub fail_delete: AtomicBool,
    pub fail_set: AtomicBool,
}

impl FlakyStore {
    pub async fn in_memory() -> Arc<Self> {
        Arc::new(Self {
            inner: LibSqlDocumentStore::open_in_memory().await.unwrap(),
            fail_create: AtomicBool::new(false),
            fail_delete: AtomicBool::new(false),
            fail_set: AtomicBool::new(false),
        })
    }

    fn check(flag: &AtomicBool, operation: &str) -> Result<()> {
        if flag.load(Ordering::SeqCst) {
            return Err(Error::PersistenceFailed(format!("{operation} rejected")));
        }
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for FlakyStore {
    async fn create(&self, collection: &str, fields: Fields) -> Result<RecordId> {
        Self::check(&self.fail_create, "create")?;
        self.inner.create(collection, fields).await
    }

    async fn delete(&self, collection: &str, owner: &OwnerId, id: &RecordId) -> Result<()> {
        Self::check(&self.fail_delete, "delete")?;
        self.inner.delete(collection, owner, id).await
    }

    async fn set_document(&self, collection: &str, id: &RecordId, fields: Fields) -> Result<()> {
        Self::check(&self.fail_set, "set")?;
        self.inner.set_document(collection, id, fields).await
    }

    async fn get_document(&self, collection: &str, id: &RecordId) -> Result<Option<Document>> {
        self.inner.get_document(collection, id).await
    }

    async fn subscribe(&self, collection: &str, owner: &OwnerId) -> Result<Subscription> {
        self.inner.subscribe(collection, owner).await
    }
}

/// Shared call log for the fake audio backend and its sounds.
pub type CallLog = Arc<Mutex<Vec<String>>>;

struct FakeSound {
    uri: AssetUri,
    log: CallLog,
}

#[async_trait]
impl Sound for FakeSound {
    async fn play(&mut self) -> Result<()> {
        self.log.lock().unwrap().push(format!("play {}", self.uri));
        Ok(())
    }

    async fn pause(&mut self) -> Result<()> {
        self.log.lock().unwrap().push(format!("pause {}", self.uri));
        Ok(())
    }

    async fn stop(&mut self) -> Result<()> {
        self.log.lock().unwrap().push(format!("stop {}", self.uri));
        Ok(())
    }

    async fn unload(self: Box<Self>) -> Result<()> {
        self.log.lock().unwrap().push(format!("unload {}", self.uri));
        Ok(())
    }
}

pub struct ScriptedAudio {
    pub log: CallLog,
    pub fail_start: AtomicBool,
    pub fail_load: AtomicBool,
    clip: AssetUri,
    status: Mutex<Option<mpsc::UnboundedSender<PlaybackStatus>>>,
}

impl ScriptedAudio {
    pub fn recording_to(clip: &str) -> Arc<Self> {
        Arc::new(Self {
            log: CallLog::default(),
            fail_start: AtomicBool::new(false),
            fail_load: AtomicBool::new(false),
            clip: AssetUri::new(clip).unwrap(),
            status: Mutex::default(),
        })
    }

    pub fn calls(&self) -> Vec<String> {
        self.log.lock().unwrap().clone()
    }

    /// Push a status tick into the most recently loaded sound.
    pub fn tick(&self, status: PlaybackStatus) {
        if let Some(sender) = self.status.lock().unwrap().as_ref() {
            sender.send(status).ok();
        }
    }
}

#[async_trait]
impl AudioBackend for ScriptedAudio {
    async fn set_mode(&self, mode: AudioMode) -> Result<()> {
        let label = if mode.allows_recording { "recording" } else { "playback" };
        self.log.lock().unwrap().push(format!("mode {label}"));
        Ok(())
    }

    async fn start_recording(&self, _preset: RecordingPreset) -> Result<()> {
        if self.fail_start.load(Ordering::SeqCst) {
            return Err(Error::DeviceOperationFailed("microphone busy".to_string()));
        }
        self.log.lock().unwrap().push("record".to_string());
        Ok(())
    }

    async fn stop_recording(&self) -> Result<AssetUri> {
        self.log.lock().unwrap().push("finalize".to_string());
        Ok(self.clip.clone())
    }

    async fn discard_recording(&self) -> Result<()> {
        self.log.lock().unwrap().push("discard".to_string());
        Ok(())
    }

    async fn load(&self, uri: &AssetUri) -> Result<LoadedSound> {
        if self.fail_load.load(Ordering::SeqCst) {
            return Err(Error::DeviceOperationFailed("unsupported clip".to_string()));
        }
        self.log.lock().unwrap().push(format!("load {uri}"));
        let (sender, receiver) = playback_channel();
        *self.status.lock().unwrap() = Some(sender);
        Ok(LoadedSound {
            sound: Box::new(FakeSound {
                uri: uri.clone(),
                log: Arc::clone(&self.log),
            }),
            status: receiver,
        })
    }
}

/// Everything a screen test needs, with handles kept for assertions.
pub struct Harness {
    pub store: Arc<FlakyStore>,
    pub permissions: Arc<ScriptedPermissions>,
    pub mail: Arc<FakeMail>,
    pub notices: Arc<RecordingNotices>,
}

impl Harness {
    pub async fn granting(capabilities: &[Capability]) -> Self {
        Self {
            store: FlakyStore::in_memory().await,
            permissions: ScriptedPermissions::granting(capabilities),
            mail: Arc::new(FakeMail::default()),
            notices: Arc::new(RecordingNotices::default()),
        }
    }

    pub fn capabilities(&self) -> Capabilities {
        Capabilities {
            store: self.store.clone(),
            permissions: self.permissions.clone(),
            mail: self.mail.clone(),
            notices: self.notices.clone(),
        }
    }
}

pub fn verified_session(owner: &str) -> crate::auth::Session {
    crate::auth::Session {
        id: OwnerId::new(owner).unwrap(),
        email: Some(format!("{owner}@example.com")),
        email_verified: true,
        id_token: "id".to_string(),
        refresh_token: "refresh".to_string(),
        expires_at: i64::MAX,
    }
}

use std::env;
use std::io::{self, BufRead, IsTerminal, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;
use memento_core::auth::{IdentityProvider, Session};
use memento_core::db::{StoreConfig, SyncConfig};
use memento_core::models::{Kind, MediaKind};
use memento_core::screen::{ActionOutcome, ActionPrompt, MediaRepository, RecordAction, ShareOutcome};
use memento_core::store::LibSqlDocumentStore;
use memento_core::{Capabilities, MediaRecord, RecordId};
use serde::Serialize;

use crate::adapters::{OutboxMailer, PromptPermissionGate, StderrNotices};
use crate::auth::{identity_for_profile, IdentityClient};
use crate::config_profiles::{CliProfile, CliProfilesConfig};
use crate::error::CliError;

/// Resolved profile plus the paths a command works with.
pub struct Context {
    pub profile_name: String,
    pub profile: CliProfile,
    pub db_path: PathBuf,
}

impl Context {
    pub fn load(global_profile: Option<&str>, db_path: Option<PathBuf>) -> Result<Self, CliError> {
        let config = CliProfilesConfig::load()?;
        let profile_name = config.resolve_profile_name(global_profile);
        let profile = config.profile(&profile_name).cloned().unwrap_or_default();
        let db_path = resolve_db_path(db_path, &profile);
        Ok(Self {
            profile_name,
            profile,
            db_path,
        })
    }

    pub fn identity(&self) -> Result<IdentityClient, CliError> {
        identity_for_profile(&self.profile_name, &self.profile.backend_config())
    }

    pub async fn open_store(&self) -> Result<LibSqlDocumentStore, CliError> {
        open_store(&self.db_path, SyncConfig::from_env()).await
    }

    pub fn capabilities(&self, store: LibSqlDocumentStore) -> Capabilities {
        Capabilities {
            store: Arc::new(store),
            permissions: Arc::new(PromptPermissionGate::new(
                self.profile.permissions,
                io::stdin().is_terminal(),
            )),
            mail: Arc::new(OutboxMailer::new(self.profile.outbox_dir())),
            notices: Arc::new(StderrNotices),
        }
    }

    /// Session for the media screens.
    ///
    /// A stored session that is not yet verified is re-read once, since the
    /// user may have clicked the link since signing in.
    pub async fn media_session(&self) -> Result<Session, CliError> {
        let identity = self.identity()?;
        let session = signed_in(&identity).await?;
        if session.email_verified {
            return Ok(session);
        }
        Ok(identity.reload_session(&session).await?)
    }
}

pub async fn signed_in(identity: &IdentityClient) -> Result<Session, CliError> {
    identity
        .current_session()
        .await?
        .ok_or(CliError::NotSignedIn)
}

pub fn resolve_db_path(cli_db_path: Option<PathBuf>, profile: &CliProfile) -> PathBuf {
    cli_db_path
        .or_else(|| env::var_os("MEMENTO_DB_PATH").map(PathBuf::from))
        .unwrap_or_else(|| profile.db_path())
}

pub async fn open_store(
    path: &Path,
    sync: Option<SyncConfig>,
) -> Result<LibSqlDocumentStore, CliError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let config = StoreConfig {
        path: Some(path.to_path_buf()),
        sync,
    };
    Ok(LibSqlDocumentStore::open(&config).await?)
}

/// Match a full id or a unique id prefix against the listed records.
pub fn resolve_record_id(records: &[MediaRecord], query: &str) -> Result<RecordId, CliError> {
    let query = query.trim();
    if query.is_empty() {
        return Err(CliError::EmptyRecordId);
    }

    if let Some(record) = records.iter().find(|record| record.id.as_str() == query) {
        return Ok(record.id.clone());
    }

    let matching = records
        .iter()
        .filter(|record| record.id.as_str().starts_with(query))
        .collect::<Vec<_>>();

    match matching.as_slice() {
        [] => Err(CliError::RecordNotFound(query.to_string())),
        [record] => Ok(record.id.clone()),
        _ => {
            let options = matching
                .iter()
                .take(3)
                .map(|record| short_id(&record.id))
                .collect::<Vec<_>>()
                .join(", ");
            Err(CliError::AmbiguousRecordId(format!(
                "ID prefix '{query}' is ambiguous; matches: {options}"
            )))
        }
    }
}

#[derive(Debug, Serialize)]
pub struct RecordListItem {
    pub id: String,
    pub name: Option<String>,
    pub url: String,
    pub created_at: Option<i64>,
    pub relative_time: Option<String>,
}

pub fn record_to_list_item(record: &MediaRecord, now_ms: i64) -> RecordListItem {
    RecordListItem {
        id: record.id.to_string(),
        name: record.name.clone(),
        url: record.media_url.to_string(),
        created_at: record.created_at,
        relative_time: record
            .created_at
            .map(|created_at| format_relative_time(created_at, now_ms)),
    }
}

fn short_id(id: &RecordId) -> String {
    id.as_str().chars().take(13).collect()
}

fn record_label(record: &MediaRecord) -> &str {
    record
        .name
        .as_deref()
        .or_else(|| record.media_url.file_name())
        .unwrap_or_else(|| record.media_url.as_str())
}

pub fn format_record_lines(records: &[MediaRecord], now_ms: i64) -> Vec<String> {
    records
        .iter()
        .map(|record| {
            let label = truncate(record_label(record), 40);
            let relative_time = record
                .created_at
                .map_or_else(|| "-".to_string(), |at| format_relative_time(at, now_ms));
            format!("{:<13}  {label:<40}  {relative_time}", short_id(&record.id))
        })
        .collect()
}

pub fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        let take_len = max_chars.saturating_sub(3);
        let mut truncated = text.chars().take(take_len).collect::<String>();
        truncated.push_str("...");
        truncated
    }
}

pub fn format_relative_time(timestamp_ms: i64, now_ms: i64) -> String {
    let diff = now_ms.saturating_sub(timestamp_ms);
    let minute = 60_000;
    let hour = 60 * minute;
    let day = 24 * hour;
    let week = 7 * day;
    let month = 30 * day;
    let year = 365 * day;

    if diff < minute {
        "just now".to_string()
    } else if diff < hour {
        format!("{}m ago", diff / minute)
    } else if diff < day {
        format!("{}h ago", diff / hour)
    } else if diff < week {
        format!("{}d ago", diff / day)
    } else if diff < month {
        format!("{}w ago", diff / week)
    } else if diff < year {
        format!("{}mo ago", diff / month)
    } else {
        format!("{}y ago", diff / year)
    }
}

pub fn print_records(kind: Kind, records: &[MediaRecord], as_json: bool) -> Result<(), CliError> {
    let now_ms = Utc::now().timestamp_millis();
    if as_json {
        let items = records
            .iter()
            .map(|record| record_to_list_item(record, now_ms))
            .collect::<Vec<_>>();
        println!("{}", serde_json::to_string_pretty(&items)?);
    } else if records.is_empty() {
        println!("No {} records yet.", kind.noun());
    } else {
        for line in format_record_lines(records, now_ms) {
            println!("{line}");
        }
    }
    Ok(())
}

/// Print the list, then reprint on every snapshot until Ctrl-C.
pub async fn watch_records<K: MediaKind>(
    repo: &mut MediaRepository<K>,
    as_json: bool,
) -> Result<(), CliError> {
    print_records(K::KIND, repo.records(), as_json)?;
    loop {
        tokio::select! {
            next = repo.next_snapshot() => {
                if !next? {
                    break;
                }
                println!();
                print_records(K::KIND, repo.records(), as_json)?;
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }
    Ok(())
}

/// Show the prompt on stderr and read the choice from stdin.
pub fn prompt_action(prompt: &ActionPrompt) -> Result<RecordAction, CliError> {
    let mut stderr = io::stderr();
    writeln!(stderr, "{}", prompt.title)?;
    writeln!(stderr, "{}", prompt.message)?;
    for (index, action) in prompt.actions.iter().enumerate() {
        writeln!(stderr, "  {}) {}", index + 1, action.label())?;
    }
    write!(stderr, "> ")?;
    stderr.flush()?;

    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(parse_action_choice(&line))
}

/// Anything unrecognised cancels.
pub fn parse_action_choice(line: &str) -> RecordAction {
    match line.trim().to_ascii_lowercase().as_str() {
        "1" | "s" | "share" => RecordAction::Share,
        "2" | "d" | "delete" => RecordAction::Delete,
        _ => RecordAction::Cancel,
    }
}

pub fn describe_outcome(kind: Kind, outcome: ActionOutcome) -> String {
    match outcome {
        ActionOutcome::Shared(ShareOutcome::Unavailable) => "Email is not available".to_string(),
        ActionOutcome::Shared(ShareOutcome::Composed(status)) => {
            format!("Shared {} ({status:?})", kind.noun())
        }
        ActionOutcome::Shared(ShareOutcome::Failed) => "Failed to send email".to_string(),
        ActionOutcome::Deleted => format!("Deleted {}", kind.noun()),
        ActionOutcome::Cancelled => "Cancelled".to_string(),
    }
}

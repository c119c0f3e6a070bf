//! Opening the libSQL file (or replica) behind the document store

use crate::error::{Error, Result};
use libsql::{Builder, Connection, Database as LibSqlDatabase};
use std::path::PathBuf;
use std::time::Duration;

use super::migrations;

/// Configuration for a remote replica
#[derive(Debug, Clone, Default)]
pub struct SyncConfig {
    /// Remote database URL (e.g., `libsql://your-db.turso.io`)
    pub url: Option<String>,
    /// Authentication token for remote database
    pub auth_token: Option<String>,
    /// Automatic sync interval
    pub sync_interval: Option<Duration>,
}

impl SyncConfig {
    /// Replica settings that pull every minute.
    pub fn new(url: impl Into<String>, auth_token: impl Into<String>) -> Self {
        Self {
            url: Some(url.into()),
            auth_token: Some(auth_token.into()),
            sync_interval: Some(Duration::from_secs(60)),
        }
    }

    /// Build from `TURSO_DATABASE_URL` / `TURSO_AUTH_TOKEN` when both are set.
    pub fn from_env() -> Option<Self> {
        let url = crate::util::normalize_text_option(std::env::var("TURSO_DATABASE_URL").ok())?;
        let token = crate::util::normalize_text_option(std::env::var("TURSO_AUTH_TOKEN").ok())?;
        Some(Self::new(url, token))
    }

    /// Only sync when asked to, as `memento sync` does.
    #[must_use]
    pub const fn without_auto_sync(mut self) -> Self {
        self.sync_interval = None;
        self
    }

    pub const fn is_configured(&self) -> bool {
        self.url.is_some() && self.auth_token.is_some()
    }
}

/// Where the document store lives.
#[derive(Debug, Clone, Default)]
pub struct StoreConfig {
    /// Local database file; `None` keeps everything in memory.
    pub path: Option<PathBuf>,
    /// Optional remote replica.
    pub sync: Option<SyncConfig>,
}

/// Pragmas applied after open. Remote replicas reject some of them.
const PRAGMAS: [&str; 2] = ["PRAGMA journal_mode = WAL;", "PRAGMA synchronous = NORMAL;"];

/// The libSQL database backing the document store, with one shared connection.
pub struct Database {
    db: LibSqlDatabase,
    conn: Connection,
    replica: Option<SyncConfig>,
}

impl Database {
    /// Open according to `config`, creating parent directories as needed.
    ///
    /// A configured replica wins over a plain local file; no path at all
    /// means an in-memory store.
    pub async fn open_with_config(config: &StoreConfig) -> Result<Self> {
        let Some(path) = config.path.as_deref() else {
            return Self::open_in_memory().await;
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let location = path.to_string_lossy().into_owned();
        match config.sync.as_ref().filter(|sync| sync.is_configured()) {
            Some(sync) => Self::open_replica(location, sync.clone()).await,
            None => {
                tracing::info!(path = %location, "Opening local document store");
                let db = Builder::new_local(&location).build().await?;
                Self::prepare(db, None).await
            }
        }
    }

    /// Open an empty store that lives only as long as this value.
    pub async fn open_in_memory() -> Result<Self> {
        let db = Builder::new_local(":memory:").build().await?;
        Self::prepare(db, None).await
    }

    async fn open_replica(location: String, replica: SyncConfig) -> Result<Self> {
        let (Some(url), Some(token)) = (replica.url.clone(), replica.auth_token.clone()) else {
            return Err(Error::InvalidInput(
                "A replica needs both a URL and an auth token".into(),
            ));
        };

        tracing::info!(%url, path = %location, "Opening embedded replica");
        let mut builder = Builder::new_remote_replica(location, url, token);
        if let Some(interval) = replica.sync_interval {
            builder = builder.sync_interval(interval);
        }
        let db = builder.build().await?;
        Self::prepare(db, Some(replica)).await
    }

    async fn prepare(db: LibSqlDatabase, replica: Option<SyncConfig>) -> Result<Self> {
        let conn = db.connect()?;
        let database = Self { db, conn, replica };

        // Pull first so the schema check sees what the remote already has.
        database.sync().await?;
        for pragma in PRAGMAS {
            if let Err(error) = database.conn.execute(pragma, ()).await {
                tracing::debug!(pragma, %error, "Pragma not applied");
            }
        }
        migrations::run(&database.conn).await?;
        Ok(database)
    }

    /// Pull remote changes into the replica. Local-only stores do nothing.
    pub async fn sync(&self) -> Result<()> {
        if self.replica.is_none() {
            return Ok(());
        }
        self.db.sync().await?;
        tracing::debug!("Replica synced");
        Ok(())
    }

    pub const fn is_sync_enabled(&self) -> bool {
        self.replica.is_some()
    }

    pub const fn connection(&self) -> &Connection {
        &self.conn
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test(flavor = "multi_thread")]
    async fn in_memory_store_is_local_and_migrated() {
        let db = Database::open_in_memory().await.unwrap();
        assert!(!db.is_sync_enabled());
        db.sync().await.unwrap();

        let mut rows = db
            .connection()
            .query("SELECT COUNT(*) FROM documents", ())
            .await
            .unwrap();
        let count: i64 = rows.next().await.unwrap().unwrap().get(0).unwrap();
        assert_eq!(count, 0);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn unconfigured_replica_falls_back_to_local_file() {
        let tmp = tempdir().unwrap();
        let config = StoreConfig {
            path: Some(tmp.path().join("memento.db")),
            sync: Some(SyncConfig {
                url: Some("libsql://example.turso.io".into()),
                auth_token: None,
                sync_interval: None,
            }),
        };

        let db = Database::open_with_config(&config).await.unwrap();
        assert!(!db.is_sync_enabled());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn open_creates_parent_dirs() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("nested").join("memento.db");
        let config = StoreConfig {
            path: Some(path.clone()),
            sync: None,
        };

        let db = Database::open_with_config(&config).await.unwrap();
        assert!(!db.is_sync_enabled());
        assert!(path.exists());
    }

    #[test]
    fn replica_pulls_every_minute_unless_manual() {
        let config = SyncConfig::new("libsql://test.turso.io", "test-token");
        assert!(config.is_configured());
        assert_eq!(config.sync_interval, Some(Duration::from_secs(60)));
        assert_eq!(config.without_auto_sync().sync_interval, None);
    }

    #[test]
    fn default_replica_is_not_configured() {
        assert!(!SyncConfig::default().is_configured());
    }
}

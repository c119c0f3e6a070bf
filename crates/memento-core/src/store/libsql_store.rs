//! libSQL-backed document store with in-process change notifications.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::{broadcast, mpsc, Mutex};

use crate::db::{Database, StoreConfig};
use crate::models::{Document, Fields, OwnerId, RecordId, CREATED_AT_FIELD, OWNER_FIELD};
use crate::Result;

use super::{DocumentStore, Snapshot, Subscription};

/// Change notification meaning "every collection may have changed".
const ALL_COLLECTIONS: &str = "*";
const CHANGE_BUFFER: usize = 64;
const SNAPSHOT_BUFFER: usize = 16;

/// Document store over a local (optionally replicated) libSQL database.
///
/// Writes made through this handle, or any clone of it, wake the matching
/// subscriptions. Remote changes arrive on [`LibSqlDocumentStore::sync`].
#[derive(Clone)]
pub struct LibSqlDocumentStore {
    db: Arc<Mutex<Database>>,
    changes: broadcast::Sender<String>,
}

impl LibSqlDocumentStore {
    pub async fn open(config: &StoreConfig) -> Result<Self> {
        let db = Database::open_with_config(config).await?;
        Ok(Self::with_database(db))
    }

    /// Open an in-memory store (useful for testing)
    pub async fn open_in_memory() -> Result<Self> {
        let db = Database::open_in_memory().await?;
        Ok(Self::with_database(db))
    }

    fn with_database(db: Database) -> Self {
        let (changes, _) = broadcast::channel(CHANGE_BUFFER);
        Self {
            db: Arc::new(Mutex::new(db)),
            changes,
        }
    }

    /// Pull from the remote replica and refresh every live subscription.
    pub async fn sync(&self) -> Result<()> {
        self.db.lock().await.sync().await?;
        self.notify(ALL_COLLECTIONS);
        Ok(())
    }

    pub async fn is_sync_enabled(&self) -> bool {
        self.db.lock().await.is_sync_enabled()
    }

    fn notify(&self, collection: &str) {
        // No receivers just means nobody is subscribed.
        self.changes.send(collection.to_string()).ok();
    }
}

async fn query_owned(db: &Mutex<Database>, collection: &str, owner: &OwnerId) -> Result<Snapshot> {
    let db = db.lock().await;
    let mut rows = db
        .connection()
        .query(
            "SELECT id, fields FROM documents
             WHERE collection = ? AND owner_id = ?
             ORDER BY created_at, rowid",
            [collection, owner.as_str()],
        )
        .await?;

    let mut documents = Vec::new();
    while let Some(row) = rows.next().await? {
        let id: String = row.get(0)?;
        let raw: String = row.get(1)?;
        documents.push(Document {
            id: id.parse()?,
            fields: serde_json::from_str(&raw)?,
        });
    }
    Ok(Snapshot { documents })
}

fn owner_column(fields: &Fields) -> String {
    fields
        .get(OWNER_FIELD)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

fn created_at_column(fields: &Fields) -> i64 {
    fields
        .get(CREATED_AT_FIELD)
        .and_then(Value::as_i64)
        .unwrap_or_else(crate::util::unix_timestamp_millis_now)
}

#[async_trait]
impl DocumentStore for LibSqlDocumentStore {
    async fn create(&self, collection: &str, fields: Fields) -> Result<RecordId> {
        let id = RecordId::generate();
        self.set_document(collection, &id, fields).await?;
        Ok(id)
    }

    async fn delete(&self, collection: &str, owner: &OwnerId, id: &RecordId) -> Result<()> {
        let removed = self
            .db
            .lock()
            .await
            .connection()
            .execute(
                "DELETE FROM documents WHERE collection = ? AND id = ? AND owner_id = ?",
                [collection, id.as_str(), owner.as_str()],
            )
            .await?;

        tracing::debug!("Deleted {collection}/{id} ({removed} row(s))");
        self.notify(collection);
        Ok(())
    }

    async fn set_document(&self, collection: &str, id: &RecordId, fields: Fields) -> Result<()> {
        let raw = serde_json::to_string(&fields)?;
        self.db
            .lock()
            .await
            .connection()
            .execute(
                "INSERT INTO documents (collection, id, owner_id, fields, created_at)
                 VALUES (?, ?, ?, ?, ?)
                 ON CONFLICT(collection, id) DO UPDATE SET
                    owner_id = excluded.owner_id,
                    fields = excluded.fields",
                libsql::params![
                    collection,
                    id.as_str(),
                    owner_column(&fields),
                    raw,
                    created_at_column(&fields)
                ],
            )
            .await?;

        tracing::debug!("Stored {collection}/{id}");
        self.notify(collection);
        Ok(())
    }

    async fn get_document(&self, collection: &str, id: &RecordId) -> Result<Option<Document>> {
        let db = self.db.lock().await;
        let mut rows = db
            .connection()
            .query(
                "SELECT fields FROM documents WHERE collection = ? AND id = ?",
                [collection, id.as_str()],
            )
            .await?;

        let Some(row) = rows.next().await? else {
            return Ok(None);
        };
        let raw: String = row.get(0)?;
        Ok(Some(Document {
            id: id.clone(),
            fields: serde_json::from_str(&raw)?,
        }))
    }

    async fn subscribe(&self, collection: &str, owner: &OwnerId) -> Result<Subscription> {
        // Listen before the first query so no write can fall in between.
        let mut changes = self.changes.subscribe();
        let initial = query_owned(&self.db, collection, owner).await?;

        let (tx, rx) = mpsc::channel(SNAPSHOT_BUFFER);
        tx.send(Ok(initial)).await.ok();

        let db = Arc::clone(&self.db);
        let collection = collection.to_string();
        let owner = owner.clone();
        let listener = tokio::spawn(async move {
            loop {
                let refresh = tokio::select! {
                    () = tx.closed() => break,
                    change = changes.recv() => match change {
                        Ok(changed) => changed == collection || changed == ALL_COLLECTIONS,
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            tracing::debug!("Subscription on {collection} skipped {skipped} change(s)");
                            true
                        }
                        Err(broadcast::error::RecvError::Closed) => break,
                    },
                };

                if refresh {
                    let snapshot = query_owned(&db, &collection, &owner).await;
                    if tx.send(snapshot).await.is_err() {
                        break;
                    }
                }
            }
        });

        let abort = listener.abort_handle();
        Ok(Subscription::from_channel(rx, move || abort.abort()))
    }
}

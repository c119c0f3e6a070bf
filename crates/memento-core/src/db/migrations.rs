//! Schema versioning for the document store

use crate::error::Result;
use libsql::Connection;

/// Each entry upgrades the schema by one version, starting at 1.
const MIGRATIONS: &[&[&str]] = &[DOCUMENTS_V1];

/// Documents keyed by (collection, id). The owner is lifted into its own
/// column so subscriptions can filter without parsing JSON.
const DOCUMENTS_V1: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS schema_version (
        version INTEGER PRIMARY KEY
    )",
    "CREATE TABLE IF NOT EXISTS documents (
        collection TEXT NOT NULL,
        id TEXT NOT NULL,
        owner_id TEXT,
        fields TEXT NOT NULL,
        created_at INTEGER NOT NULL,
        PRIMARY KEY (collection, id)
    )",
    "CREATE INDEX IF NOT EXISTS idx_documents_owner
        ON documents(collection, owner_id, created_at)",
    "CREATE INDEX IF NOT EXISTS idx_documents_created ON documents(created_at DESC)",
];

/// Latest schema version this build knows about.
const LATEST_VERSION: i64 = 1;

/// Bring the schema up to [`LATEST_VERSION`].
pub(crate) async fn run(conn: &Connection) -> Result<()> {
    let current = schema_version(conn).await?;
    debug_assert_eq!(usize::try_from(LATEST_VERSION).ok(), Some(MIGRATIONS.len()));
    for (version, statements) in (1..).zip(MIGRATIONS) {
        if version > current {
            upgrade(conn, version, statements).await?;
        }
    }
    Ok(())
}

/// Version recorded in `schema_version`, or 0 on a fresh file.
async fn schema_version(conn: &Connection) -> Result<i64> {
    let mut tables = conn
        .query(
            "SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = 'schema_version'",
            (),
        )
        .await?;
    if tables.next().await?.is_none() {
        return Ok(0);
    }

    let mut rows = conn
        .query("SELECT COALESCE(MAX(version), 0) FROM schema_version", ())
        .await?;
    match rows.next().await? {
        Some(row) => Ok(row.get(0)?),
        None => Ok(0),
    }
}

async fn upgrade(conn: &Connection, version: i64, statements: &[&str]) -> Result<()> {
    let tx = conn.transaction().await?;
    for statement in statements {
        tx.execute(statement, ()).await?;
    }
    tx.execute("INSERT INTO schema_version (version) VALUES (?1)", [version])
        .await?;
    tx.commit().await?;

    tracing::info!(version, "Upgraded document store schema");
    Ok(())
}

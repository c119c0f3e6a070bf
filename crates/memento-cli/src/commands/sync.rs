use std::path::Path;

use memento_core::db::SyncConfig;

use crate::commands::common::open_store;
use crate::error::CliError;

pub async fn run_sync(db_path: &Path) -> Result<(), CliError> {
    let sync = SyncConfig::from_env().ok_or(CliError::SyncNotConfigured)?;
    let store = open_store(db_path, Some(sync.without_auto_sync())).await?;
    if !store.is_sync_enabled().await {
        return Err(CliError::SyncNotConfigured);
    }

    store.sync().await?;
    println!("Sync completed");
    Ok(())
}

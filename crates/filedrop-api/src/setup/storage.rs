//! Storage setup and initialization

use anyhow::{Context, Result};
use filedrop_core::Config;
use filedrop_storage::LocalStorage;

/// Create (if needed) and open the storage root.
pub async fn setup_storage(config: &Config) -> Result<LocalStorage> {
    tracing::info!(upload_dir = %config.upload_dir().display(), "Initializing storage...");

    let storage = LocalStorage::new(config.upload_dir())
        .await
        .with_context(|| {
            format!(
                "Failed to initialize storage at {}",
                config.upload_dir().display()
            )
        })?;

    if !storage.is_writable().await {
        tracing::warn!(root = %storage.root().display(), "Storage root is not writable");
    }

    tracing::info!(root = %storage.root().display(), "Storage initialized successfully");
    Ok(storage)
}

//! Shared application state

use std::sync::Arc;

use filedrop_core::Config;
use filedrop_services::{ArchiveService, CatalogService, IngestService};
use filedrop_storage::LocalStorage;
use filedrop_worker::PostProcessingQueue;

/// Everything a handler can reach. Built once at startup and shared behind an `Arc`.
pub struct AppState {
    pub config: Config,
    pub storage: LocalStorage,
    pub ingest: IngestService,
    pub archive: ArchiveService,
    pub catalog: CatalogService,
    /// `None` when post-processing is disabled
    pub post_processing: Option<Arc<PostProcessingQueue>>,
}

impl AppState {
    /// Stop accepting post-processing work and wait for queued tasks to finish.
    pub async fn drain_post_processing(&self) {
        if let Some(queue) = &self.post_processing {
            tracing::info!("Draining post-processing queue");
            queue.shutdown().await;
            tracing::info!("Post-processing queue drained");
        }
    }
}

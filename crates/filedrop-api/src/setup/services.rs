//! Service initialization

use std::sync::Arc;

use filedrop_core::Config;
use filedrop_services::{ArchiveService, CatalogService, ConversionHandler, IngestService};
use filedrop_storage::LocalStorage;
use filedrop_worker::{PostProcessingQueue, QueueConfig};

use crate::state::AppState;

/// Wire services over one storage handle and start the post-processing workers.
pub fn initialize_services(config: &Config, storage: LocalStorage) -> Arc<AppState> {
    let post_processing = if config.post_processing_enabled() {
        let handler = ConversionHandler::new(storage.clone(), config.jpeg_quality());
        let queue_config = QueueConfig::from_config(config);
        tracing::info!(
            workers = queue_config.max_workers,
            queue_size = queue_config.queue_size,
            jpeg_quality = config.jpeg_quality(),
            "Post-processing enabled"
        );
        Some(Arc::new(PostProcessingQueue::new(
            Arc::new(handler),
            queue_config,
        )))
    } else {
        tracing::info!("Post-processing disabled");
        None
    };

    Arc::new(AppState {
        config: config.clone(),
        ingest: IngestService::new(storage.clone(), config.clone(), post_processing.clone()),
        archive: ArchiveService::new(storage.clone()),
        catalog: CatalogService::new(storage.clone(), config.clone()),
        storage,
        post_processing,
    })
}

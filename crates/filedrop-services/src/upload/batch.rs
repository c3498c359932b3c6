use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;

use futures::FutureExt;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use filedrop_core::{AppError, BatchResult, Config, PostProcessingTask, StoredFile, Transform};
use filedrop_storage::LocalStorage;
use filedrop_worker::PostProcessingQueue;

use super::persist::PersistenceUnit;
use super::types::{IncomingFile, SaveOutcome};

/// Batch coordinator
///
/// Enforces the per-request file ceiling, saves every file concurrently (bounded
/// by a semaphore shared across requests), aggregates outcomes in input order and
/// hands eligible files to post-processing without waiting on it.
#[derive(Clone)]
pub struct IngestService {
    unit: PersistenceUnit,
    max_files: usize,
    save_permits: Arc<Semaphore>,
    post_processing: Option<Arc<PostProcessingQueue>>,
}

impl IngestService {
    pub fn new(
        storage: LocalStorage,
        config: Config,
        post_processing: Option<Arc<PostProcessingQueue>>,
    ) -> Self {
        Self {
            max_files: config.max_files_per_request(),
            save_permits: Arc::new(Semaphore::new(config.max_concurrent_saves().max(1))),
            unit: PersistenceUnit::new(storage, config),
            post_processing,
        }
    }

    pub fn max_files(&self) -> usize {
        self.max_files
    }

    /// Request-level ceiling check, usable before any file content is read.
    pub fn check_batch_size(&self, count: usize) -> Result<(), AppError> {
        if count > self.max_files {
            return Err(AppError::TooManyFiles {
                count,
                max: self.max_files,
            });
        }
        Ok(())
    }

    #[tracing::instrument(skip(self, files), fields(operation = "ingest_batch", batch_size = files.len()))]
    pub async fn ingest(&self, files: Vec<IncomingFile>) -> Result<BatchResult, AppError> {
        self.check_batch_size(files.len())?;

        let start = Instant::now();
        let outcomes = self.save_all(files).await;

        let mut result = BatchResult {
            successful: 0,
            failed: 0,
            errors: Vec::new(),
        };
        let mut saved = Vec::new();
        for outcome in outcomes {
            if outcome.success {
                result.successful += 1;
                saved.extend(outcome.stored);
            } else {
                result.failed += 1;
                result.errors.push(outcome.message);
            }
        }

        self.schedule_post_processing(&saved);

        tracing::info!(
            successful = result.successful,
            failed = result.failed,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Batch ingested"
        );

        Ok(result)
    }

    /// One outcome per input, in input order.
    async fn save_all(&self, files: Vec<IncomingFile>) -> Vec<SaveOutcome> {
        let names: Vec<String> = files.iter().map(|f| f.declared_name.clone()).collect();
        let mut slots: Vec<Option<SaveOutcome>> = names.iter().map(|_| None).collect();
        let mut set = JoinSet::new();

        for (index, file) in files.into_iter().enumerate() {
            let unit = self.unit.clone();
            let permits = self.save_permits.clone();
            let name = file.declared_name.clone();

            set.spawn(async move {
                let saving = async move {
                    let _permit = permits.acquire_owned().await;
                    unit.save(file).await
                };
                let outcome = AssertUnwindSafe(saving)
                    .catch_unwind()
                    .await
                    .unwrap_or_else(|_| {
                        tracing::error!(file_name = %name, "Save task panicked");
                        SaveOutcome::failed(&name, "internal error while saving")
                    });
                (index, outcome)
            });
        }

        while let Some(joined) = set.join_next().await {
            match joined {
                Ok((index, outcome)) => {
                    if let Some(slot) = slots.get_mut(index) {
                        *slot = Some(outcome);
                    }
                }
                Err(e) => tracing::error!(error = %e, "Save task did not complete"),
            }
        }

        slots
            .into_iter()
            .zip(names)
            .map(|(slot, name)| {
                slot.unwrap_or_else(|| SaveOutcome::failed(&name, "save task did not complete"))
            })
            .collect()
    }

    fn schedule_post_processing(&self, saved: &[StoredFile]) {
        let Some(queue) = &self.post_processing else {
            return;
        };

        for stored in saved {
            let Some(transform) = Transform::for_name(&stored.name) else {
                continue;
            };
            let task = PostProcessingTask::new(stored.path.clone(), transform);
            if let Err(e) = queue.schedule(task) {
                tracing::warn!(
                    file_name = %stored.name,
                    error = %e,
                    "Post-processing not scheduled"
                );
            }
        }
    }
}

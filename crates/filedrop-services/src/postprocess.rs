//! Post-processing task handler
//!
//! Replaces a stored file by its converted form. The output is written under a
//! fresh collision-free name and synced before the source is removed; any failure
//! before that point leaves the source exactly as it was.

use anyhow::{Context, Result};
use async_trait::async_trait;

use filedrop_core::PostProcessingTask;
use filedrop_processing::converter_for;
use filedrop_storage::{sanitize, LocalStorage};
use filedrop_worker::TaskHandler;

pub struct ConversionHandler {
    storage: LocalStorage,
    jpeg_quality: u8,
}

impl ConversionHandler {
    pub fn new(storage: LocalStorage, jpeg_quality: u8) -> Self {
        Self {
            storage,
            jpeg_quality,
        }
    }
}

#[async_trait]
impl TaskHandler for ConversionHandler {
    #[tracing::instrument(skip(self, task), fields(path = %task.target_path.display(), transform = %task.transform))]
    async fn handle(&self, task: &PostProcessingTask) -> Result<()> {
        let name = task
            .file_name()
            .context("Task path has no file name")?
            .to_string();
        if task.target_path.parent() != Some(self.storage.root()) {
            anyhow::bail!(
                "{} is outside the storage root",
                task.target_path.display()
            );
        }

        let input = self
            .storage
            .read(&name)
            .await
            .with_context(|| format!("Failed to read {}", name))?;

        let converter = converter_for(task.transform, self.jpeg_quality);
        let output_extension = converter.output_extension();
        let output = tokio::task::spawn_blocking(move || converter.convert(&input))
            .await
            .context("Conversion task failed")?
            .with_context(|| format!("Failed to convert {}", name))?;

        let target = sanitize(&name).with_extension(output_extension);
        let mut reservation = self.storage.reserve_sanitized(&target).await?;
        reservation.write_all(&output).await?;
        let output_name = reservation.name().to_string();
        reservation.commit().await?;

        self.storage.delete(&name).await.with_context(|| {
            format!("Converted to {} but failed to remove {}", output_name, name)
        })?;

        tracing::info!(
            source = %name,
            output = %output_name,
            output_bytes = output.len(),
            "Converted stored file"
        );
        Ok(())
    }
}

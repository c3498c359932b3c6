use std::time::Instant;

use chrono::Utc;
use tokio::io::AsyncReadExt;

use filedrop_core::{extension_of, Config, FileCategory, StoredFile};
use filedrop_processing::{FileValidator, ValidationError};
use filedrop_storage::LocalStorage;

use super::types::{IncomingFile, SaveError, SaveOutcome};

/// Saves a single file into storage
///
/// Never panics on I/O trouble and never returns an error: every failure is
/// folded into a [`SaveOutcome`] so the rest of a batch keeps going.
#[derive(Clone)]
pub struct PersistenceUnit {
    storage: LocalStorage,
    validator: FileValidator,
    config: Config,
}

impl PersistenceUnit {
    pub fn new(storage: LocalStorage, config: Config) -> Self {
        Self {
            storage,
            validator: FileValidator::from_config(config.as_service()),
            config,
        }
    }

    #[tracing::instrument(
        skip(self, file),
        fields(
            operation = "save_file",
            file_name = %file.declared_name,
            size_bytes = file.declared_size
        )
    )]
    pub async fn save(&self, mut file: IncomingFile) -> SaveOutcome {
        if let Err(rejection) = self
            .validator
            .check(&file.declared_name, file.declared_size)
        {
            match &rejection {
                ValidationError::UnsupportedExtension { extension } => tracing::debug!(
                    reason = %rejection,
                    extension = extension.as_deref().unwrap_or(""),
                    "File rejected by policy"
                ),
                ValidationError::FileTooLarge { .. } => {
                    tracing::debug!(reason = %rejection, "File rejected by policy")
                }
            }
            return SaveOutcome::failed(&file.declared_name, rejection.to_string());
        }

        let start = Instant::now();
        match self.write(&mut file).await {
            Ok(stored) => {
                tracing::info!(
                    stored_name = %stored.name,
                    category = %stored.category,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "File saved"
                );
                SaveOutcome::saved(stored)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to save file");
                SaveOutcome::failed(&file.declared_name, e)
            }
        }
    }

    async fn write(&self, file: &mut IncomingFile) -> Result<StoredFile, SaveError> {
        let expected = file.declared_size;
        let mut reservation = self.storage.reserve(&file.declared_name).await?;

        // One extra byte lets an overlong stream show itself.
        let mut limited = (&mut file.content).take(expected.saturating_add(1));
        let received = reservation.copy_from(&mut limited).await?;

        if received < expected {
            return Err(SaveError::Truncated { expected, received });
        }
        if received > expected {
            return Err(SaveError::Overlong { expected });
        }

        let name = reservation.name().to_string();
        let path = reservation.commit().await?;
        let category = extension_of(&name)
            .map(|ext| self.config.as_service().category_for_extension(&ext))
            .unwrap_or(FileCategory::Other);

        Ok(StoredFile {
            name,
            path,
            category,
            size_bytes: received,
            modified_at: Some(Utc::now()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use filedrop_core::FileServiceConfig;
    use std::io;
    use std::pin::Pin;
    use std::task::{Context, Poll};
    use tempfile::TempDir;
    use tokio::io::{AsyncRead, ReadBuf};

    /// Yields some bytes, then fails like a dropped connection.
    struct BrokenReader {
        sent: bool,
    }

    impl AsyncRead for BrokenReader {
        fn poll_read(
            mut self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            buf: &mut ReadBuf<'_>,
        ) -> Poll<io::Result<()>> {
            if self.sent {
                return Poll::Ready(Err(io::Error::new(
                    io::ErrorKind::ConnectionReset,
                    "client went away",
                )));
            }
            self.sent = true;
            buf.put_slice(b"partial");
            Poll::Ready(Ok(()))
        }
    }

    async fn unit(max_file_size: u64) -> (TempDir, PersistenceUnit) {
        let dir = TempDir::new().unwrap();
        let storage = LocalStorage::new(dir.path()).await.unwrap();
        let config = Config::new(FileServiceConfig {
            max_file_size_bytes: max_file_size,
            ..FileServiceConfig::default()
        });
        (dir, PersistenceUnit::new(storage, config))
    }

    fn stored_names(dir: &TempDir) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[tokio::test]
    async fn test_save_success() {
        let (dir, unit) = unit(1024).await;

        let outcome = unit
            .save(IncomingFile::from_bytes("report.pdf", Bytes::from_static(b"%PDF-1.4")))
            .await;

        assert!(outcome.success);
        let stored = outcome.stored.unwrap();
        assert_eq!(stored.name, "report.pdf");
        assert_eq!(stored.category, FileCategory::Document);
        assert_eq!(stored.size_bytes, 8);
        assert_eq!(std::fs::read(dir.path().join("report.pdf")).unwrap(), b"%PDF-1.4");
    }

    #[tokio::test]
    async fn test_rejected_extension_writes_nothing() {
        let (dir, unit) = unit(1024).await;

        let outcome = unit
            .save(IncomingFile::from_bytes("virus.exe", Bytes::from_static(b"MZ")))
            .await;

        assert!(!outcome.success);
        assert_eq!(outcome.message, "virus.exe: extension not supported");
        assert!(stored_names(&dir).is_empty());
    }

    #[tokio::test]
    async fn test_oversized_writes_nothing() {
        let (dir, unit) = unit(4).await;

        let outcome = unit
            .save(IncomingFile::from_bytes("big.png", Bytes::from_static(b"12345")))
            .await;

        assert!(!outcome.success);
        assert_eq!(
            outcome.message,
            "big.png: file size 5 exceeds maximum allowed size 4"
        );
        assert!(stored_names(&dir).is_empty());
    }

    #[tokio::test]
    async fn test_sanitized_and_deduplicated_names() {
        let (dir, unit) = unit(1024).await;

        for _ in 0..3 {
            let outcome = unit
                .save(IncomingFile::from_bytes("../my file!.txt", Bytes::from_static(b"x")))
                .await;
            assert!(outcome.success);
        }

        assert_eq!(
            stored_names(&dir),
            vec!["my file.txt", "my file_1.txt", "my file_2.txt"]
        );
    }

    #[tokio::test]
    async fn test_truncated_stream_removes_partial_file() {
        let (dir, unit) = unit(1024).await;

        let file = IncomingFile::new("short.txt", 100, Box::new(&b"only ten b"[..]));
        let outcome = unit.save(file).await;

        assert!(!outcome.success);
        assert!(outcome.message.contains("stream truncated"));
        assert!(stored_names(&dir).is_empty());
    }

    #[tokio::test]
    async fn test_overlong_stream_removes_partial_file() {
        let (dir, unit) = unit(1024).await;

        let file = IncomingFile::new("long.txt", 2, Box::new(&b"too many bytes"[..]));
        let outcome = unit.save(file).await;

        assert!(!outcome.success);
        assert!(outcome.message.contains("longer than declared"));
        assert!(stored_names(&dir).is_empty());
    }

    #[tokio::test]
    async fn test_read_error_is_reported_not_propagated() {
        let (dir, unit) = unit(1024).await;

        let file = IncomingFile::new("flaky.txt", 50, Box::new(BrokenReader { sent: false }));
        let outcome = unit.save(file).await;

        assert!(!outcome.success);
        assert!(outcome.message.starts_with("flaky.txt: "));
        assert!(stored_names(&dir).is_empty());
    }
}

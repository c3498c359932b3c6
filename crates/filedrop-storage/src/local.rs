use std::collections::HashSet;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use tokio::fs;
use tokio::io::{AsyncRead, AsyncWriteExt};
use walkdir::WalkDir;

use crate::error::{StorageError, StorageResult};
use crate::naming::{sanitize, SanitizedName};

/// Upper bound on suffixes tried before a reservation gives up
const MAX_NAME_ATTEMPTS: u32 = 10_000;

/// A regular file found under the storage root
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    /// Path relative to the root, `/`-separated
    pub name: String,
    pub path: PathBuf,
    pub size_bytes: u64,
    pub modified_at: Option<DateTime<Utc>>,
}

/// Local filesystem storage root
///
/// Cloning is cheap; clones share the set of names that are still being written
/// so those files stay invisible to listings until committed.
#[derive(Clone, Debug)]
pub struct LocalStorage {
    root: PathBuf,
    in_flight: Arc<Mutex<HashSet<String>>>,
}

impl LocalStorage {
    /// Open (and create if needed) the storage root.
    pub async fn new(root: impl Into<PathBuf>) -> StorageResult<Self> {
        let root = root.into();

        fs::create_dir_all(&root).await.map_err(|e| {
            StorageError::ConfigError(format!(
                "Failed to create storage directory {}: {}",
                root.display(),
                e
            ))
        })?;

        let root = fs::canonicalize(&root).await.map_err(|e| {
            StorageError::ConfigError(format!(
                "Failed to canonicalize storage directory {}: {}",
                root.display(),
                e
            ))
        })?;

        Ok(LocalStorage {
            root,
            in_flight: Arc::new(Mutex::new(HashSet::new())),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Absolute path for a stored name after rejecting anything that is not a
    /// single plain path component.
    pub fn path_for(&self, name: &str) -> StorageResult<PathBuf> {
        if name.is_empty()
            || name == "."
            || name == ".."
            || name.contains(['/', '\\', '\0'])
        {
            return Err(StorageError::InvalidName(name.to_string()));
        }
        Ok(self.root.join(name))
    }

    /// Names of the entries directly under the root.
    pub async fn snapshot_names(&self) -> StorageResult<HashSet<String>> {
        let mut names = HashSet::new();
        let mut dir = fs::read_dir(&self.root).await?;
        while let Some(entry) = dir.next_entry().await? {
            if let Some(name) = entry.file_name().to_str() {
                names.insert(name.to_string());
            }
        }
        Ok(names)
    }

    /// Claim a collision-free name for `raw_name` and open it for writing.
    ///
    /// The directory snapshot picks the starting suffix; the claim itself is a
    /// `create_new` open, so two concurrent reservations can never end up with the
    /// same file. Losing a race just moves on to the next suffix.
    pub async fn reserve(&self, raw_name: &str) -> StorageResult<Reservation> {
        self.reserve_sanitized(&sanitize(raw_name)).await
    }

    pub async fn reserve_sanitized(&self, name: &SanitizedName) -> StorageResult<Reservation> {
        let taken = self.snapshot_names().await?;
        let start = name.first_free(&taken);

        for n in start..start.saturating_add(MAX_NAME_ATTEMPTS) {
            let candidate = name.candidate(n);
            let path = self.path_for(&candidate)?;

            match fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
                .await
            {
                Ok(file) => {
                    self.mark_in_flight(&candidate);
                    tracing::debug!(name = %candidate, path = %path.display(), "Reserved file name");
                    return Ok(Reservation {
                        name: candidate,
                        path,
                        file: Some(file),
                        bytes_written: 0,
                        committed: false,
                        in_flight: Arc::clone(&self.in_flight),
                    });
                }
                Err(e) if e.kind() == ErrorKind::AlreadyExists => continue,
                Err(e) => {
                    return Err(StorageError::WriteFailed(format!(
                        "Failed to create file {}: {}",
                        path.display(),
                        e
                    )))
                }
            }
        }

        Err(StorageError::NamesExhausted {
            base: name.base().to_string(),
            attempts: MAX_NAME_ATTEMPTS,
        })
    }

    fn mark_in_flight(&self, name: &str) {
        if let Ok(mut set) = self.in_flight.lock() {
            set.insert(name.to_string());
        }
    }

    fn is_in_flight(&self, name: &str) -> bool {
        self.in_flight
            .lock()
            .map(|set| set.contains(name))
            .unwrap_or(false)
    }

    /// Every committed regular file under the root, recursively, sorted by name.
    ///
    /// Blocking; call from `spawn_blocking` or use [`LocalStorage::list`].
    pub fn regular_files_blocking(&self) -> StorageResult<Vec<FileEntry>> {
        let mut entries = Vec::new();

        for entry in WalkDir::new(&self.root).min_depth(1).follow_links(false) {
            let entry = entry.map_err(|e| {
                StorageError::ReadFailed(format!("Failed to walk {}: {}", self.root.display(), e))
            })?;
            if !entry.file_type().is_file() {
                continue;
            }

            let Ok(relative) = entry.path().strip_prefix(&self.root) else {
                continue;
            };
            let name = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");
            if self.is_in_flight(&name) {
                continue;
            }

            let metadata = entry.metadata().map_err(|e| {
                StorageError::ReadFailed(format!(
                    "Failed to stat {}: {}",
                    entry.path().display(),
                    e
                ))
            })?;

            entries.push(FileEntry {
                name,
                path: entry.path().to_path_buf(),
                size_bytes: metadata.len(),
                modified_at: metadata.modified().ok().map(DateTime::<Utc>::from),
            });
        }

        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }

    /// Async wrapper around [`LocalStorage::regular_files_blocking`].
    pub async fn list(&self) -> StorageResult<Vec<FileEntry>> {
        let storage = self.clone();
        tokio::task::spawn_blocking(move || storage.regular_files_blocking())
            .await
            .map_err(|e| StorageError::ReadFailed(format!("Listing task failed: {}", e)))?
    }

    /// Committed regular files directly under the root, sorted by name.
    ///
    /// Every returned name is accepted by [`LocalStorage::delete`]; nested
    /// files and symlinks are skipped.
    pub async fn list_top_level(&self) -> StorageResult<Vec<FileEntry>> {
        let mut entries = Vec::new();
        let mut dir = fs::read_dir(&self.root).await.map_err(|e| {
            StorageError::ReadFailed(format!("Failed to read {}: {}", self.root.display(), e))
        })?;

        while let Some(entry) = dir.next_entry().await? {
            let Some(name) = entry.file_name().to_str().map(str::to_string) else {
                continue;
            };
            if self.is_in_flight(&name) {
                continue;
            }
            // DirEntry::metadata does not follow symlinks
            let metadata = match entry.metadata().await {
                Ok(meta) if meta.is_file() => meta,
                Ok(_) => continue,
                Err(e) if e.kind() == ErrorKind::NotFound => continue,
                Err(e) => {
                    return Err(StorageError::ReadFailed(format!(
                        "Failed to stat {}: {}",
                        entry.path().display(),
                        e
                    )))
                }
            };

            entries.push(FileEntry {
                name,
                path: entry.path(),
                size_bytes: metadata.len(),
                modified_at: metadata.modified().ok().map(DateTime::<Utc>::from),
            });
        }

        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }

    pub async fn exists(&self, name: &str) -> StorageResult<bool> {
        let path = self.path_for(name)?;
        if self.is_in_flight(name) {
            return Ok(false);
        }
        Ok(fs::metadata(&path)
            .await
            .map(|m| m.is_file())
            .unwrap_or(false))
    }

    pub async fn read(&self, name: &str) -> StorageResult<Vec<u8>> {
        let path = self.path_for(name)?;
        fs::read(&path).await.map_err(|e| match e.kind() {
            ErrorKind::NotFound => StorageError::NotFound(name.to_string()),
            _ => StorageError::ReadFailed(format!("Failed to read {}: {}", path.display(), e)),
        })
    }

    /// Remove one committed file by its exact stored name.
    pub async fn delete(&self, name: &str) -> StorageResult<()> {
        let path = self.path_for(name)?;
        let start = std::time::Instant::now();

        if self.is_in_flight(name) {
            return Err(StorageError::NotFound(name.to_string()));
        }

        match fs::symlink_metadata(&path).await {
            Ok(meta) if meta.is_file() => {}
            Ok(_) => return Err(StorageError::NotFound(name.to_string())),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(StorageError::NotFound(name.to_string()))
            }
            Err(e) => {
                return Err(StorageError::DeleteFailed(format!(
                    "Failed to stat file {}: {}",
                    path.display(),
                    e
                )))
            }
        }

        fs::remove_file(&path).await.map_err(|e| match e.kind() {
            ErrorKind::NotFound => StorageError::NotFound(name.to_string()),
            _ => StorageError::DeleteFailed(format!(
                "Failed to delete file {}: {}",
                path.display(),
                e
            )),
        })?;

        tracing::info!(
            path = %path.display(),
            name = %name,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Local storage delete successful"
        );

        Ok(())
    }

    /// Root exists, is a directory and is not read-only.
    pub async fn is_writable(&self) -> bool {
        match fs::metadata(&self.root).await {
            Ok(meta) => meta.is_dir() && !meta.permissions().readonly(),
            Err(_) => false,
        }
    }
}

/// Exclusive claim on a freshly created file
///
/// Bytes are written through the reservation and become visible to listings
/// only after [`Reservation::commit`]. Dropping an uncommitted reservation (error,
/// truncated input, cancelled request) removes the partial file.
#[derive(Debug)]
pub struct Reservation {
    name: String,
    path: PathBuf,
    file: Option<fs::File>,
    bytes_written: u64,
    committed: bool,
    in_flight: Arc<Mutex<HashSet<String>>>,
}

impl Reservation {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    pub async fn write_all(&mut self, buf: &[u8]) -> StorageResult<()> {
        let file = self.file_mut()?;
        file.write_all(buf).await.map_err(|e| {
            StorageError::WriteFailed(format!("Failed to write {}: {}", self.path.display(), e))
        })?;
        self.bytes_written += buf.len() as u64;
        Ok(())
    }

    /// Copy everything from `reader` into the file and return the byte count.
    pub async fn copy_from<R>(&mut self, reader: &mut R) -> StorageResult<u64>
    where
        R: AsyncRead + Unpin + ?Sized,
    {
        let file = self.file_mut()?;
        let copied = tokio::io::copy(reader, file).await.map_err(|e| {
            StorageError::WriteFailed(format!("Failed to write {}: {}", self.path.display(), e))
        })?;
        self.bytes_written += copied;
        Ok(copied)
    }

    /// Flush to disk and make the file visible.
    pub async fn commit(mut self) -> StorageResult<PathBuf> {
        if let Some(mut file) = self.file.take() {
            file.flush().await.map_err(|e| {
                StorageError::WriteFailed(format!("Failed to flush {}: {}", self.path.display(), e))
            })?;
            file.sync_all().await.map_err(|e| {
                StorageError::WriteFailed(format!("Failed to sync {}: {}", self.path.display(), e))
            })?;
        }

        self.committed = true;
        self.release_name();
        Ok(self.path.clone())
    }

    fn file_mut(&mut self) -> StorageResult<&mut fs::File> {
        self.file
            .as_mut()
            .ok_or_else(|| StorageError::WriteFailed(format!("{} is already closed", self.name)))
    }

    fn release_name(&self) {
        if let Ok(mut set) = self.in_flight.lock() {
            set.remove(&self.name);
        }
    }
}

impl Drop for Reservation {
    fn drop(&mut self) {
        if self.committed {
            return;
        }
        drop(self.file.take());
        if let Err(e) = std::fs::remove_file(&self.path) {
            if e.kind() != ErrorKind::NotFound {
                tracing::warn!(path = %self.path.display(), error = %e, "Failed to remove partial file");
            }
        } else {
            tracing::debug!(path = %self.path.display(), "Removed partial file");
        }
        self.release_name();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    async fn storage() -> (tempfile::TempDir, LocalStorage) {
        let dir = tempdir().unwrap();
        let storage = LocalStorage::new(dir.path()).await.unwrap();
        (dir, storage)
    }

    #[tokio::test]
    async fn test_new_creates_directory() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("nested").join("uploads");
        let storage = LocalStorage::new(&root).await.unwrap();
        assert!(storage.root().is_dir());
    }

    #[tokio::test]
    async fn test_reserve_write_commit() {
        let (_dir, storage) = storage().await;

        let mut reservation = storage.reserve("hello.txt").await.unwrap();
        assert_eq!(reservation.name(), "hello.txt");
        reservation.write_all(b"Hello, World!").await.unwrap();
        let path = reservation.commit().await.unwrap();

        assert_eq!(std::fs::read(&path).unwrap(), b"Hello, World!");
        assert_eq!(storage.read("hello.txt").await.unwrap(), b"Hello, World!");
    }

    #[tokio::test]
    async fn test_reserve_never_overwrites() {
        let (_dir, storage) = storage().await;
        std::fs::write(storage.root().join("photo.png"), b"original").unwrap();

        let mut reservation = storage.reserve("photo.png").await.unwrap();
        assert_eq!(reservation.name(), "photo_1.png");
        reservation.write_all(b"second").await.unwrap();
        reservation.commit().await.unwrap();

        assert_eq!(storage.read("photo.png").await.unwrap(), b"original");
        assert_eq!(storage.read("photo_1.png").await.unwrap(), b"second");
    }

    #[tokio::test]
    async fn test_concurrent_reservations_get_distinct_names() {
        let (_dir, storage) = storage().await;

        let mut handles = Vec::new();
        for _ in 0..8 {
            let storage = storage.clone();
            handles.push(tokio::spawn(async move {
                let mut r = storage.reserve("same.txt").await.unwrap();
                r.write_all(b"x").await.unwrap();
                r.commit().await.unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let names: HashSet<String> = storage
            .list()
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.name)
            .collect();
        assert_eq!(names.len(), 8);
        assert!(names.contains("same.txt"));
        assert!(names.contains("same_7.txt"));
    }

    #[tokio::test]
    async fn test_dropped_reservation_removes_partial_file() {
        let (_dir, storage) = storage().await;

        let path = {
            let mut reservation = storage.reserve("partial.bin").await.unwrap();
            reservation.write_all(b"half").await.unwrap();
            reservation.path().to_path_buf()
        };

        assert!(!path.exists());
        assert!(storage.list().await.unwrap().is_empty());
        assert_eq!(storage.reserve("partial.bin").await.unwrap().name(), "partial.bin");
    }

    #[tokio::test]
    async fn test_in_flight_files_are_hidden() {
        let (_dir, storage) = storage().await;

        let mut reservation = storage.reserve("pending.txt").await.unwrap();
        reservation.write_all(b"data").await.unwrap();

        assert!(storage.list().await.unwrap().is_empty());
        assert!(!storage.exists("pending.txt").await.unwrap());

        reservation.commit().await.unwrap();
        assert!(storage.exists("pending.txt").await.unwrap());
        assert_eq!(storage.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_copy_from_reader() {
        let (_dir, storage) = storage().await;

        let mut reservation = storage.reserve("copy.txt").await.unwrap();
        let mut reader: &[u8] = b"streamed content";
        let copied = reservation.copy_from(&mut reader).await.unwrap();
        assert_eq!(copied, 16);
        assert_eq!(reservation.bytes_written(), 16);
        reservation.commit().await.unwrap();
    }

    #[tokio::test]
    async fn test_list_includes_nested_files_with_relative_names() {
        let (_dir, storage) = storage().await;
        std::fs::create_dir(storage.root().join("sub")).unwrap();
        std::fs::write(storage.root().join("sub").join("inner.txt"), b"in").unwrap();
        std::fs::write(storage.root().join("top.txt"), b"top").unwrap();

        let names: Vec<String> = storage.list().await.unwrap().into_iter().map(|e| e.name).collect();
        assert_eq!(names, vec!["sub/inner.txt".to_string(), "top.txt".to_string()]);
    }

    #[tokio::test]
    async fn test_list_top_level_names_are_deletable() {
        let (_dir, storage) = storage().await;
        std::fs::create_dir(storage.root().join("sub")).unwrap();
        std::fs::write(storage.root().join("sub").join("inner.txt"), b"in").unwrap();
        std::fs::write(storage.root().join("top.txt"), b"top").unwrap();
        let pending = storage.reserve("pending.txt").await.unwrap();

        let names: Vec<String> = storage
            .list_top_level()
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.name)
            .collect();
        assert_eq!(names, vec!["top.txt".to_string()]);

        for name in &names {
            storage.delete(name).await.unwrap();
        }
        assert!(storage.list_top_level().await.unwrap().is_empty());
        drop(pending);
    }

    #[tokio::test]
    async fn test_delete_file() {
        let (_dir, storage) = storage().await;
        std::fs::write(storage.root().join("gone.txt"), b"bye").unwrap();

        storage.delete("gone.txt").await.unwrap();
        assert!(!storage.exists("gone.txt").await.unwrap());
    }

    #[tokio::test]
    async fn test_delete_missing_is_not_found() {
        let (_dir, storage) = storage().await;
        let result = storage.delete("missing.txt").await;
        assert!(matches!(result, Err(StorageError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_delete_directory_is_not_found() {
        let (_dir, storage) = storage().await;
        std::fs::create_dir(storage.root().join("folder")).unwrap();
        let result = storage.delete("folder").await;
        assert!(matches!(result, Err(StorageError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_path_traversal_rejected() {
        let (_dir, storage) = storage().await;
        for name in ["../etc/passwd", "..", "a/b.txt", "a\\b.txt", ""] {
            assert!(
                matches!(storage.delete(name).await, Err(StorageError::InvalidName(_))),
                "{name} should be rejected"
            );
        }
    }

    #[tokio::test]
    async fn test_is_writable() {
        let (_dir, storage) = storage().await;
        assert!(storage.is_writable().await);
    }
}

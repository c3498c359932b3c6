//! Read and delete access to what is currently stored

use filedrop_core::{extension_of, Config, FileCategory, FilesByCategory, StoredFile};
use filedrop_storage::{LocalStorage, StorageResult};

#[derive(Clone)]
pub struct CatalogService {
    storage: LocalStorage,
    config: Config,
}

impl CatalogService {
    pub fn new(storage: LocalStorage, config: Config) -> Self {
        Self { storage, config }
    }

    fn category_of(&self, name: &str) -> FileCategory {
        extension_of(name)
            .map(|ext| self.config.as_service().category_for_extension(&ext))
            .unwrap_or(FileCategory::Other)
    }

    /// Files directly under the upload directory, each deletable by its name.
    pub async fn list(&self) -> StorageResult<Vec<StoredFile>> {
        let entries = self.storage.list_top_level().await?;
        Ok(entries
            .into_iter()
            .map(|entry| StoredFile {
                category: self.category_of(&entry.name),
                name: entry.name,
                path: entry.path,
                size_bytes: entry.size_bytes,
                modified_at: entry.modified_at,
            })
            .collect())
    }

    #[tracing::instrument(skip(self), fields(operation = "list_files"))]
    pub async fn list_by_category(&self) -> StorageResult<FilesByCategory> {
        let mut grouped = FilesByCategory::default();
        for file in self.list().await? {
            grouped.push(file.category, file.name);
        }
        tracing::debug!(total = grouped.len(), "Listed stored files");
        Ok(grouped)
    }

    #[tracing::instrument(skip(self), fields(operation = "delete_file"))]
    pub async fn delete(&self, name: &str) -> StorageResult<()> {
        self.storage.delete(name).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use filedrop_core::FileServiceConfig;
    use filedrop_storage::StorageError;
    use tempfile::TempDir;

    async fn catalog() -> (TempDir, CatalogService) {
        let dir = TempDir::new().unwrap();
        let storage = LocalStorage::new(dir.path()).await.unwrap();
        let config = Config::new(FileServiceConfig::default());
        (dir, CatalogService::new(storage, config))
    }

    #[tokio::test]
    async fn test_list_by_category() {
        let (dir, catalog) = catalog().await;
        for name in [
            "b.png", "a.JPG", "doc.pdf", "notes.txt", "song.mp3", "bundle.zip", "misc",
        ] {
            std::fs::write(dir.path().join(name), b"x").unwrap();
        }

        let grouped = catalog.list_by_category().await.unwrap();
        assert_eq!(grouped.images, vec!["a.JPG", "b.png"]);
        assert_eq!(grouped.documents, vec!["doc.pdf", "notes.txt"]);
        assert_eq!(grouped.media, vec!["song.mp3"]);
        assert_eq!(grouped.other, vec!["bundle.zip", "misc"]);
    }

    #[tokio::test]
    async fn test_empty_storage() {
        let (_dir, catalog) = catalog().await;
        assert!(catalog.list_by_category().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete_removes_from_listing() {
        let (dir, catalog) = catalog().await;
        std::fs::write(dir.path().join("gone.pdf"), b"x").unwrap();

        catalog.delete("gone.pdf").await.unwrap();
        assert!(catalog.list_by_category().await.unwrap().documents.is_empty());
        assert!(matches!(
            catalog.delete("gone.pdf").await,
            Err(StorageError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_every_listed_name_can_be_deleted() {
        let (dir, catalog) = catalog().await;
        std::fs::create_dir(dir.path().join("sub")).unwrap();
        std::fs::write(dir.path().join("sub").join("inner.txt"), b"x").unwrap();
        std::fs::write(dir.path().join("report.pdf"), b"x").unwrap();
        std::fs::write(dir.path().join("photo.jpg"), b"x").unwrap();

        let listed = catalog.list().await.unwrap();
        assert_eq!(listed.len(), 2);
        for file in listed {
            catalog.delete(&file.name).await.unwrap();
        }
        assert!(catalog.list_by_category().await.unwrap().is_empty());
        assert!(dir.path().join("sub").join("inner.txt").exists());
    }
}

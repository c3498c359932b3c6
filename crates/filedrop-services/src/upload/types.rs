//! Types used by the ingestion pipeline

use std::fmt;
use std::io::Cursor;

use bytes::Bytes;
use tokio::io::AsyncRead;

use filedrop_core::StoredFile;
use filedrop_storage::StorageError;

/// Byte source for one upload
pub type FileContent = Box<dyn AsyncRead + Send + Unpin>;

/// One file of a batch, owned by the persistence unit that saves it
pub struct IncomingFile {
    /// Client-supplied name, untrusted
    pub declared_name: String,
    /// Byte count the content is expected to produce
    pub declared_size: u64,
    pub content: FileContent,
}

impl IncomingFile {
    pub fn new(declared_name: impl Into<String>, declared_size: u64, content: FileContent) -> Self {
        Self {
            declared_name: declared_name.into(),
            declared_size,
            content,
        }
    }

    /// In-memory upload; the declared size is the buffer length.
    pub fn from_bytes(declared_name: impl Into<String>, data: Bytes) -> Self {
        let declared_size = data.len() as u64;
        Self::new(declared_name, declared_size, Box::new(Cursor::new(data)))
    }
}

impl fmt::Debug for IncomingFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IncomingFile")
            .field("declared_name", &self.declared_name)
            .field("declared_size", &self.declared_size)
            .finish_non_exhaustive()
    }
}

/// I/O failures while persisting one file
#[derive(Debug, thiserror::Error)]
pub enum SaveError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("stream truncated: expected {expected} bytes, received {received}")]
    Truncated { expected: u64, received: u64 },

    #[error("stream longer than declared size {expected}")]
    Overlong { expected: u64 },
}

/// Result of one persistence unit call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveOutcome {
    pub success: bool,
    /// On failure, `"{declared name}: {reason}"`
    pub message: String,
    pub stored: Option<StoredFile>,
}

impl SaveOutcome {
    pub fn saved(stored: StoredFile) -> Self {
        Self {
            success: true,
            message: format!("Saved as {}", stored.name),
            stored: Some(stored),
        }
    }

    pub fn failed(declared_name: &str, reason: impl fmt::Display) -> Self {
        Self {
            success: false,
            message: format!("{}: {}", declared_name, reason),
            stored: None,
        }
    }
}

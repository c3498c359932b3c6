//! Shared domain models

use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Coarse display grouping derived from a file's extension
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum FileCategory {
    Image,
    Document,
    Media,
    Other,
}

impl fmt::Display for FileCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileCategory::Image => write!(f, "image"),
            FileCategory::Document => write!(f, "document"),
            FileCategory::Media => write!(f, "media"),
            FileCategory::Other => write!(f, "other"),
        }
    }
}

/// A file that lives in the storage directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct StoredFile {
    /// Name on disk, relative to the storage root
    pub name: String,
    #[schema(value_type = String)]
    pub path: PathBuf,
    pub category: FileCategory,
    pub size_bytes: u64,
    pub modified_at: Option<DateTime<Utc>>,
}

impl StoredFile {
    /// Extension of the stored name, lower-cased and without the dot.
    pub fn extension(&self) -> Option<String> {
        extension_of(&self.name)
    }
}

/// Splits the last path component of a client-supplied name into stem and
/// extension. Both `/` and `\\` count as separators. A leading dot (`.env`) or a
/// trailing dot (`name.`) does not start an extension.
pub fn split_file_name(raw: &str) -> (&str, Option<&str>) {
    let last = raw.rsplit(['/', '\\']).next().unwrap_or(raw);
    match last.rfind('.') {
        Some(idx) if idx > 0 && idx + 1 < last.len() => (&last[..idx], Some(&last[idx + 1..])),
        _ => (last, None),
    }
}

/// Lower-cased extension of a file name, if it has one.
pub fn extension_of(name: &str) -> Option<String> {
    split_file_name(name).1.map(|e| e.to_lowercase())
}

/// Validator verdict for a single file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationOutcome {
    pub accepted: bool,
    /// Human-readable; never empty when `accepted` is false
    pub reason: String,
}

impl ValidationOutcome {
    pub fn accept() -> Self {
        Self {
            accepted: true,
            reason: String::new(),
        }
    }

    pub fn reject(reason: impl Into<String>) -> Self {
        let reason = reason.into();
        let reason = if reason.trim().is_empty() {
            "rejected".to_string()
        } else {
            reason
        };
        Self {
            accepted: false,
            reason,
        }
    }
}

/// Aggregated outcome of one upload batch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct BatchResult {
    pub successful: usize,
    pub failed: usize,
    /// Per-file errors in input order
    pub errors: Vec<String>,
}

/// Transform applied by the post-processing workers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Transform {
    PngToJpeg,
}

impl Transform {
    /// Transform that applies to a stored file name, if any.
    pub fn for_name(name: &str) -> Option<Self> {
        match extension_of(name).as_deref() {
            Some("png") => Some(Transform::PngToJpeg),
            _ => None,
        }
    }

    /// Extension written by the transform.
    pub fn output_extension(&self) -> &'static str {
        match self {
            Transform::PngToJpeg => "jpg",
        }
    }
}

impl fmt::Display for Transform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Transform::PngToJpeg => write!(f, "png_to_jpeg"),
        }
    }
}

/// Work item handed to the post-processing queue
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostProcessingTask {
    pub target_path: PathBuf,
    pub transform: Transform,
}

impl PostProcessingTask {
    pub fn new(target_path: impl Into<PathBuf>, transform: Transform) -> Self {
        Self {
            target_path: target_path.into(),
            transform,
        }
    }

    /// File name component of the target path.
    pub fn file_name(&self) -> Option<&str> {
        self.target_path.file_name().and_then(|n| n.to_str())
    }
}

/// Storage contents grouped for display
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct FilesByCategory {
    pub images: Vec<String>,
    pub documents: Vec<String>,
    pub media: Vec<String>,
    pub other: Vec<String>,
}

impl FilesByCategory {
    pub fn push(&mut self, category: FileCategory, name: String) {
        match category {
            FileCategory::Image => self.images.push(name),
            FileCategory::Document => self.documents.push(name),
            FileCategory::Media => self.media.push(name),
            FileCategory::Other => self.other.push(name),
        }
    }

    pub fn len(&self) -> usize {
        self.images.len() + self.documents.len() + self.media.len() + self.other.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

//! Defaults shared by configuration and tests.

pub const DEFAULT_PORT: u16 = 8010;
pub const DEFAULT_UPLOAD_DIR: &str = "uploads";
pub const DEFAULT_STATIC_DIR: &str = "static";

pub const MAX_FILE_SIZE_MB: usize = 100;
pub const MAX_FILES_PER_REQUEST: usize = 100;
pub const MAX_CONCURRENT_SAVES: usize = 16;

/// Longest base name kept by the safe namer, in characters.
pub const MAX_BASE_NAME_CHARS: usize = 50;
/// Base name used when sanitizing leaves nothing behind.
pub const FALLBACK_BASE_NAME: &str = "unnamed";

pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "bmp", "tiff", "webp"];
pub const DOCUMENT_EXTENSIONS: &[&str] = &["pdf", "txt", "docx", "xlsx"];
pub const ARCHIVE_EXTENSIONS: &[&str] = &["zip"];
pub const MEDIA_EXTENSIONS: &[&str] = &["mp4", "mp3"];

pub const POST_PROCESSING_WORKERS: usize = 2;
pub const POST_PROCESSING_QUEUE_SIZE: usize = 256;
pub const JPEG_QUALITY: u8 = 75;

pub const HTTP_CONCURRENCY_LIMIT: usize = 256;
/// Upper bound for the derived request body limit (16 GiB).
pub const MAX_REQUEST_BODY_CAP: usize = 16 * 1024 * 1024 * 1024;

pub const ARCHIVE_FILE_NAME: &str = "uploaded_files.zip";

//! Configuration module
//!
//! Static settings for the HTTP layer and the ingestion pipeline. Values come from
//! the process environment (optionally seeded from a `.env` file).

use std::env;
use std::path::PathBuf;

use crate::constants::*;
use crate::models::FileCategory;

/// Settings shared by any HTTP-facing binary
#[derive(Clone, Debug)]
pub struct BaseConfig {
    pub server_port: u16,
    pub cors_origins: Vec<String>,
    pub environment: String,
    pub http_concurrency_limit: usize,
    pub max_request_body_bytes: usize,
    pub static_dir: Option<PathBuf>,
}

/// Ingestion, storage and post-processing settings
#[derive(Clone, Debug)]
pub struct FileServiceConfig {
    pub base: BaseConfig,
    pub upload_dir: PathBuf,
    pub max_file_size_bytes: u64,
    pub max_files_per_request: usize,
    pub max_concurrent_saves: usize,
    pub image_extensions: Vec<String>,
    pub document_extensions: Vec<String>,
    pub archive_extensions: Vec<String>,
    pub media_extensions: Vec<String>,
    pub post_processing_enabled: bool,
    pub post_processing_workers: usize,
    pub post_processing_queue_size: usize,
    pub jpeg_quality: u8,
}

impl Default for FileServiceConfig {
    fn default() -> Self {
        let max_file_size_bytes = (MAX_FILE_SIZE_MB * 1024 * 1024) as u64;
        Self {
            base: BaseConfig {
                server_port: DEFAULT_PORT,
                cors_origins: vec!["*".to_string()],
                environment: "development".to_string(),
                http_concurrency_limit: HTTP_CONCURRENCY_LIMIT,
                max_request_body_bytes: derived_body_limit(
                    max_file_size_bytes,
                    MAX_FILES_PER_REQUEST,
                ),
                static_dir: None,
            },
            upload_dir: PathBuf::from(DEFAULT_UPLOAD_DIR),
            max_file_size_bytes,
            max_files_per_request: MAX_FILES_PER_REQUEST,
            max_concurrent_saves: MAX_CONCURRENT_SAVES,
            image_extensions: to_owned_list(IMAGE_EXTENSIONS),
            document_extensions: to_owned_list(DOCUMENT_EXTENSIONS),
            archive_extensions: to_owned_list(ARCHIVE_EXTENSIONS),
            media_extensions: to_owned_list(MEDIA_EXTENSIONS),
            post_processing_enabled: true,
            post_processing_workers: POST_PROCESSING_WORKERS,
            post_processing_queue_size: POST_PROCESSING_QUEUE_SIZE,
            jpeg_quality: JPEG_QUALITY,
        }
    }
}

impl FileServiceConfig {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        let environment = env::var("ENVIRONMENT")
            .or_else(|_| env::var("APP_ENV"))
            .unwrap_or_else(|_| "development".to_string());

        let cors_origins: Vec<String> = env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "*".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let max_file_size_mb = env::var("MAX_FILE_SIZE_MB")
            .unwrap_or_else(|_| MAX_FILE_SIZE_MB.to_string())
            .parse::<usize>()
            .unwrap_or(MAX_FILE_SIZE_MB);
        let max_file_size_bytes = (max_file_size_mb as u64) * 1024 * 1024;

        let max_files_per_request = env::var("MAX_FILES_PER_REQUEST")
            .unwrap_or_else(|_| MAX_FILES_PER_REQUEST.to_string())
            .parse::<usize>()
            .unwrap_or(MAX_FILES_PER_REQUEST);

        let max_request_body_bytes = env::var("MAX_REQUEST_BODY_MB")
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
            .map(|mb| mb.saturating_mul(1024 * 1024))
            .unwrap_or_else(|| derived_body_limit(max_file_size_bytes, max_files_per_request));

        let static_dir = PathBuf::from(
            env::var("STATIC_DIR").unwrap_or_else(|_| DEFAULT_STATIC_DIR.to_string()),
        );

        let base = BaseConfig {
            server_port: env::var("PORT")
                .unwrap_or_else(|_| DEFAULT_PORT.to_string())
                .parse()
                .unwrap_or(DEFAULT_PORT),
            cors_origins,
            environment,
            http_concurrency_limit: env::var("HTTP_CONCURRENCY_LIMIT")
                .unwrap_or_else(|_| HTTP_CONCURRENCY_LIMIT.to_string())
                .parse()
                .unwrap_or(HTTP_CONCURRENCY_LIMIT),
            max_request_body_bytes,
            static_dir: static_dir.is_dir().then_some(static_dir),
        };

        Ok(Self {
            base,
            upload_dir: PathBuf::from(
                env::var("UPLOAD_DIR").unwrap_or_else(|_| DEFAULT_UPLOAD_DIR.to_string()),
            ),
            max_file_size_bytes,
            max_files_per_request,
            max_concurrent_saves: env::var("MAX_CONCURRENT_SAVES")
                .unwrap_or_else(|_| MAX_CONCURRENT_SAVES.to_string())
                .parse()
                .unwrap_or(MAX_CONCURRENT_SAVES),
            image_extensions: extension_list("IMAGE_EXTENSIONS", IMAGE_EXTENSIONS),
            document_extensions: extension_list("DOCUMENT_EXTENSIONS", DOCUMENT_EXTENSIONS),
            archive_extensions: extension_list("ARCHIVE_EXTENSIONS", ARCHIVE_EXTENSIONS),
            media_extensions: extension_list("MEDIA_EXTENSIONS", MEDIA_EXTENSIONS),
            post_processing_enabled: env::var("POST_PROCESSING_ENABLED")
                .map(|v| parse_bool(&v))
                .unwrap_or(true),
            post_processing_workers: env::var("POST_PROCESSING_WORKERS")
                .unwrap_or_else(|_| POST_PROCESSING_WORKERS.to_string())
                .parse()
                .unwrap_or(POST_PROCESSING_WORKERS),
            post_processing_queue_size: env::var("POST_PROCESSING_QUEUE_SIZE")
                .unwrap_or_else(|_| POST_PROCESSING_QUEUE_SIZE.to_string())
                .parse()
                .unwrap_or(POST_PROCESSING_QUEUE_SIZE),
            jpeg_quality: env::var("JPEG_QUALITY")
                .unwrap_or_else(|_| JPEG_QUALITY.to_string())
                .parse()
                .unwrap_or(JPEG_QUALITY),
        })
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.max_file_size_bytes == 0 {
            return Err(anyhow::anyhow!("MAX_FILE_SIZE_MB must be greater than 0"));
        }

        if self.max_files_per_request == 0 {
            return Err(anyhow::anyhow!(
                "MAX_FILES_PER_REQUEST must be greater than 0"
            ));
        }

        if self.max_concurrent_saves == 0 {
            return Err(anyhow::anyhow!("MAX_CONCURRENT_SAVES must be greater than 0"));
        }

        if self.supported_extensions().next().is_none() {
            return Err(anyhow::anyhow!(
                "At least one supported file extension must be configured"
            ));
        }

        if self.post_processing_enabled {
            if self.post_processing_workers == 0 {
                return Err(anyhow::anyhow!(
                    "POST_PROCESSING_WORKERS must be greater than 0 when post-processing is enabled"
                ));
            }
            if self.post_processing_queue_size == 0 {
                return Err(anyhow::anyhow!(
                    "POST_PROCESSING_QUEUE_SIZE must be greater than 0 when post-processing is enabled"
                ));
            }
        }

        if !(1..=100).contains(&self.jpeg_quality) {
            return Err(anyhow::anyhow!(
                "JPEG_QUALITY must be between 1 and 100, got {}",
                self.jpeg_quality
            ));
        }

        Ok(())
    }

    /// Every accepted extension across all groups, lower-case and without a dot.
    pub fn supported_extensions(&self) -> impl Iterator<Item = &str> {
        self.image_extensions
            .iter()
            .chain(&self.document_extensions)
            .chain(&self.archive_extensions)
            .chain(&self.media_extensions)
            .map(String::as_str)
    }

    /// Display category for an extension (case-insensitive, dot optional).
    pub fn category_for_extension(&self, extension: &str) -> FileCategory {
        let ext = normalize_extension(extension);
        if self.image_extensions.contains(&ext) {
            FileCategory::Image
        } else if self.document_extensions.contains(&ext) {
            FileCategory::Document
        } else if self.media_extensions.contains(&ext) {
            FileCategory::Media
        } else {
            FileCategory::Other
        }
    }
}

/// Application configuration.
#[derive(Clone, Debug)]
pub struct Config(pub Box<FileServiceConfig>);

impl Config {
    pub fn new(inner: FileServiceConfig) -> Self {
        Config(Box::new(inner))
    }

    pub fn as_service(&self) -> &FileServiceConfig {
        &self.0
    }

    /// Check if the application is running in production mode
    pub fn is_production(&self) -> bool {
        let env = self.environment().to_lowercase();
        env == "production" || env == "prod"
    }

    pub fn from_env() -> Result<Self, anyhow::Error> {
        let config = FileServiceConfig::from_env()?;
        Ok(Config::new(config))
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        self.as_service().validate()
    }

    // Convenience getters for common fields
    pub fn server_port(&self) -> u16 {
        self.as_service().base.server_port
    }

    pub fn cors_origins(&self) -> &[String] {
        &self.as_service().base.cors_origins
    }

    pub fn environment(&self) -> &str {
        &self.as_service().base.environment
    }

    pub fn http_concurrency_limit(&self) -> usize {
        self.as_service().base.http_concurrency_limit
    }

    pub fn max_request_body_bytes(&self) -> usize {
        self.as_service().base.max_request_body_bytes
    }

    pub fn static_dir(&self) -> Option<&PathBuf> {
        self.as_service().base.static_dir.as_ref()
    }

    pub fn upload_dir(&self) -> &PathBuf {
        &self.as_service().upload_dir
    }

    pub fn max_file_size_bytes(&self) -> u64 {
        self.as_service().max_file_size_bytes
    }

    pub fn max_files_per_request(&self) -> usize {
        self.as_service().max_files_per_request
    }

    pub fn max_concurrent_saves(&self) -> usize {
        self.as_service().max_concurrent_saves
    }

    pub fn post_processing_enabled(&self) -> bool {
        self.as_service().post_processing_enabled
    }

    pub fn post_processing_workers(&self) -> usize {
        self.as_service().post_processing_workers
    }

    pub fn post_processing_queue_size(&self) -> usize {
        self.as_service().post_processing_queue_size
    }

    pub fn jpeg_quality(&self) -> u8 {
        self.as_service().jpeg_quality
    }
}

fn to_owned_list(values: &[&str]) -> Vec<String> {
    values.iter().map(|s| s.to_string()).collect()
}

fn extension_list(var: &str, default: &[&str]) -> Vec<String> {
    match env::var(var) {
        Ok(raw) => raw
            .split(',')
            .map(normalize_extension)
            .filter(|s| !s.is_empty())
            .collect(),
        Err(_) => to_owned_list(default),
    }
}

fn normalize_extension(raw: &str) -> String {
    raw.trim().trim_start_matches('.').to_lowercase()
}

fn parse_bool(raw: &str) -> bool {
    matches!(
        raw.trim().to_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

fn derived_body_limit(max_file_size_bytes: u64, max_files: usize) -> usize {
    let per_file = usize::try_from(max_file_size_bytes).unwrap_or(MAX_REQUEST_BODY_CAP);
    per_file
        .saturating_mul(max_files)
        .saturating_add(1024 * 1024)
        .min(MAX_REQUEST_BODY_CAP)
}

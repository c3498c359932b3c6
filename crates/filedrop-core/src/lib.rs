//! Filedrop Core Library
//!
//! Configuration, the application error taxonomy and the shared models used by
//! every Filedrop component.

pub mod config;
pub mod constants;
pub mod error;
pub mod models;

pub use config::{BaseConfig, Config, FileServiceConfig};
pub use error::{AppError, ErrorMetadata, LogLevel};
pub use models::{
    extension_of, split_file_name, BatchResult, FileCategory, FilesByCategory, PostProcessingTask,
    StoredFile, Transform, ValidationOutcome,
};

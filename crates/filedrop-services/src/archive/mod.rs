pub mod service;

pub use service::{ArchiveService, ArchiveStream};

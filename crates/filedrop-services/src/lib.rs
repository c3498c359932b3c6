//! Filedrop Services
//!
//! The ingestion pipeline (persistence unit and batch coordinator), the archive
//! builder, the storage catalog and the post-processing task handler.

pub mod archive;
pub mod catalog;
pub mod postprocess;
pub mod upload;

pub use archive::{ArchiveService, ArchiveStream};
pub use catalog::CatalogService;
pub use postprocess::ConversionHandler;
pub use upload::{IncomingFile, IngestService, PersistenceUnit, SaveError, SaveOutcome};

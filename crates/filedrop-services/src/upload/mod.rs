//! Upload ingestion
//!
//! [`PersistenceUnit`] saves one file: validate → reserve name → stream bytes →
//! verify length → sync. [`IngestService`] fans a batch out over persistence units
//! and hands qualifying results to post-processing.

pub mod batch;
pub mod persist;
pub mod types;

pub use batch::IngestService;
pub use persist::PersistenceUnit;
pub use types::{IncomingFile, SaveError, SaveOutcome};

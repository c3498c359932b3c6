//! Filedrop Storage Library
//!
//! The storage root handle shared by every component. All stored files live
//! directly under one local directory; names are produced by the safe namer in
//! [`naming`] and claimed atomically through [`LocalStorage::reserve`].
//!
//! Names handed to lookup operations must be a single path component: no `/`,
//! no `\`, no `..`.

pub mod error;
pub mod local;
pub mod naming;

pub use error::{StorageError, StorageResult};
pub use local::{FileEntry, LocalStorage, Reservation};
pub use naming::{resolve, sanitize, SanitizedName};

//! Image conversion module
//!
//! Converters are pure byte-to-byte functions; reading and replacing stored files
//! is the caller's job.

pub mod converter;

pub use converter::{converter_for, ConversionError, ImageConverter, PngToJpegConverter};

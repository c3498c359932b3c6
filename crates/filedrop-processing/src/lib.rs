//! Filedrop Processing Library
//!
//! Upload policy checks and the image conversion used by post-processing.

pub mod image;
pub mod validator;

pub use crate::image::{converter_for, ConversionError, ImageConverter, PngToJpegConverter};
pub use validator::{FileValidator, ValidationError};

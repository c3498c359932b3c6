//! Filedrop API Library
//!
//! This crate provides the HTTP handlers, middleware and application setup for
//! the upload service.

mod api_doc;
mod handlers;
mod middleware;
mod telemetry;

pub mod error;
pub mod setup;
pub mod state;

pub use error::{ErrorResponse, HttpAppError};
pub use state::AppState;

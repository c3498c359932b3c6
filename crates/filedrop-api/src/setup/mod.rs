//! Application setup and initialization

pub mod routes;
pub mod server;
pub mod services;
pub mod storage;
pub mod validation;

use crate::state::AppState;
use anyhow::{Context, Result};
use filedrop_core::Config;
use std::sync::Arc;

/// Initialize the entire application
pub async fn initialize_app(config: Config) -> Result<(Arc<AppState>, axum::Router)> {
    crate::telemetry::init_telemetry()?;

    validation::validate_config(&config).context("Configuration validation failed")?;
    tracing::info!("Configuration loaded and validated successfully");

    build_app(config).await
}

/// Storage, services and routes, without touching global telemetry.
pub async fn build_app(config: Config) -> Result<(Arc<AppState>, axum::Router)> {
    let storage = storage::setup_storage(&config).await?;

    let state = services::initialize_services(&config, storage);

    let router = routes::setup_routes(&config, state.clone())?;

    Ok((state, router))
}

//! Configuration validation
//!
//! Catches misconfiguration at startup instead of on the first request.

use anyhow::Result;
use filedrop_core::Config;

pub fn validate_config(config: &Config) -> Result<()> {
    config.validate()?;

    if config.is_production() && config.cors_origins().iter().any(|o| o == "*") {
        tracing::warn!(
            "CORS allows all origins in production; set CORS_ORIGINS to restrict it"
        );
    }

    if let Some(dir) = config.static_dir() {
        if !dir.is_dir() {
            tracing::info!(
                static_dir = %dir.display(),
                "Static directory not found, /static will not be served"
            );
        }
    }

    let body_floor = config.max_file_size_bytes();
    if (config.max_request_body_bytes() as u64) < body_floor {
        tracing::warn!(
            max_request_body_bytes = config.max_request_body_bytes(),
            max_file_size_bytes = body_floor,
            "Request body limit is smaller than the per-file limit"
        );
    }

    Ok(())
}

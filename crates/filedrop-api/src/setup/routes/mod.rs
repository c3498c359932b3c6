//! Route configuration and setup.

pub mod health;

use crate::api_doc::ApiDoc;
use crate::handlers;
use crate::middleware::{request_id::RequestId, request_id_middleware};
use crate::state::AppState;
use axum::{
    body::Body,
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method, Request},
    routing::{delete, get, post},
    Json, Router,
};
use filedrop_core::Config;
use std::sync::Arc;
use tower::limit::ConcurrencyLimitLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;

/// Setup all application routes
pub fn setup_routes(config: &Config, state: Arc<AppState>) -> Result<Router<()>, anyhow::Error> {
    let cors = setup_cors(config)?;

    let http_concurrency_limit = config.http_concurrency_limit().max(1);
    tracing::info!(
        http_concurrency_limit,
        max_request_body_bytes = config.max_request_body_bytes(),
        "HTTP limits configured"
    );

    let trace_layer = TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
        let request_id = request
            .extensions()
            .get::<RequestId>()
            .map(|id| id.0.as_str())
            .unwrap_or("-");
        tracing::debug_span!(
            "http_request",
            method = %request.method(),
            uri = %request.uri(),
            request_id = %request_id,
        )
    });

    let app = Router::new()
        .route("/upload", post(handlers::upload::upload_files))
        .route("/download", get(handlers::download::download_archive))
        .route("/files", get(handlers::files::list_files))
        .route("/files/{name}", delete(handlers::files::delete_file))
        .route("/health", get(health::health_check))
        .route("/live", get(health::health_check))
        .route("/ready", get(health::readiness_check))
        .route("/api/openapi.json", get(openapi_json))
        .with_state(state);

    let app = match config.static_dir() {
        Some(dir) if dir.is_dir() => {
            tracing::info!(static_dir = %dir.display(), "Serving static files at /static");
            app.nest_service("/static", ServeDir::new(dir))
        }
        _ => app,
    };

    let app = app
        .layer(ConcurrencyLimitLayer::new(http_concurrency_limit))
        .layer(RequestBodyLimitLayer::new(config.max_request_body_bytes()))
        .layer(DefaultBodyLimit::disable())
        .layer(cors)
        .layer(trace_layer)
        .layer(axum::middleware::from_fn(request_id_middleware));

    Ok(app)
}

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

fn setup_cors(config: &Config) -> Result<CorsLayer, anyhow::Error> {
    let methods = [Method::GET, Method::POST, Method::DELETE, Method::OPTIONS];
    let cors = if config.cors_origins().iter().any(|o| o == "*") {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(methods)
            .allow_headers(Any)
    } else {
        let origins = config
            .cors_origins()
            .iter()
            .map(|o| {
                o.parse::<HeaderValue>()
                    .map_err(|e| anyhow::anyhow!("Invalid CORS origin '{}': {}", o, e))
            })
            .collect::<Result<Vec<_>, _>>()?;
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(methods)
            .allow_headers(Any)
    };
    Ok(cors)
}

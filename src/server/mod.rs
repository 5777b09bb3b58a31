//! Axum HTTP server for the wrapper API.
//!
//! Serves the REST API and, when a built frontend is present, the
//! single-page console with `index.html` as the fallback for unknown
//! paths.

pub mod error;
pub mod routes;

use anyhow::{Context, Result};
use axum::{
    extract::Request,
    http::{header, HeaderValue},
    middleware::{self, Next},
    response::Response,
    routing::{get, post},
    Router,
};
use std::path::Path;
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::config::ServerConfig;
use routes::AppState;

const STATIC_ASSET_CACHE: &str = "public, max-age=604800";
const HTML_CACHE: &str = "public, max-age=600";
const STATIC_EXTENSIONS: [&str; 8] = ["js", "css", "jpg", "png", "svg", "ico", "woff", "woff2"];

/// Bind and serve until `shutdown` resolves.
pub async fn serve(
    state: AppState,
    cfg: &ServerConfig,
    shutdown: impl std::future::Future<Output = ()> + Send + 'static,
) -> Result<()> {
    let app = build_router(state, cfg);
    let addr = format!("{}:{}", cfg.host, cfg.port);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!(addr = %addr, "API server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .context("API server error")
}

/// Build the Axum router with all routes and middleware.
pub fn build_router(state: AppState, cfg: &ServerConfig) -> Router {
    let api = Router::new()
        .route("/api", get(routes::api_root))
        .route("/models", get(routes::list_models))
        .route("/model-defaults", get(routes::model_defaults))
        .route("/prepare-json", post(routes::prepare_json))
        .route("/generate", post(routes::generate))
        .route("/generate-all", post(routes::generate_all))
        .route("/health", get(routes::health))
        .route("/test-models", get(routes::test_models))
        .route("/fixtures/generate", post(routes::generate_fixture))
        .route("/fixtures/analyze", post(routes::analyze_fixture))
        .with_state(state);

    let api = match frontend(&cfg.frontend_dir) {
        Some(spa) => api.fallback_service(spa),
        None => api,
    };

    api.layer(cors_layer(&cfg.cors_origins))
        .layer(TraceLayer::new_for_http())
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match o.parse::<HeaderValue>() {
            Ok(v) => Some(v),
            Err(_) => {
                warn!(origin = %o, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_credentials(true)
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
}

/// Router serving the built console, or `None` when it is not there.
fn frontend(dir: &str) -> Option<Router> {
    let root = Path::new(dir);
    let index = root.join("index.html");
    if !index.is_file() {
        info!(dir, "No frontend build found, serving API only");
        return None;
    }

    info!(dir, "Serving frontend build");
    let spa = ServeDir::new(root).fallback(ServeFile::new(index));
    Some(
        Router::new()
            .fallback_service(spa)
            .layer(middleware::from_fn(frontend_cache_control)),
    )
}

fn is_static_asset(path: &str) -> bool {
    Path::new(path)
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| STATIC_EXTENSIONS.contains(&ext))
}

async fn frontend_cache_control(req: Request, next: Next) -> Response {
    let value = if is_static_asset(req.uri().path()) {
        STATIC_ASSET_CACHE
    } else {
        HTML_CACHE
    };
    let mut resp = next.run(req).await;
    if resp.status().is_success() {
        resp.headers_mut()
            .insert(header::CACHE_CONTROL, HeaderValue::from_static(value));
    }
    resp
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

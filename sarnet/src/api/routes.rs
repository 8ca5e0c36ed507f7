use axum::extract::DefaultBodyLimit;
use axum::http::HeaderValue;
use axum::Router;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use super::router::api_router;
use super::AppState;
use crate::config::ServerConfig;

/// Headroom on top of the largest accepted file for multipart boundaries and text fields.
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

fn cors_layer(config: &ServerConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .cors_allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    let allow_origin = if origins.is_empty() {
        AllowOrigin::from(Any)
    } else {
        AllowOrigin::list(origins)
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods(Any)
        .allow_headers(Any)
}

pub fn create_router(state: AppState) -> Router {
    let cors = cors_layer(&state.config.server);
    let body_limit = state.config.media.max_upload_bytes + MULTIPART_OVERHEAD_BYTES;
    let media = ServeDir::new(state.media.root());

    Router::new()
        .nest("/api", api_router())
        .nest_service("/media", media)
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(body_limit))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

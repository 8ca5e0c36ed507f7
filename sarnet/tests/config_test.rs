use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use tower::ServiceExt;

mod common;
use common::{serial, tempfile::TempDir, test_config};

use sarnet::api::{create_router, AppState};
use sarnet::colorize::ColorizerProvider;
use sarnet::config::Config;
use sarnet::db::{Database, DatabaseBackend, LibSqlBackend};

#[test]
#[serial]
fn test_env_overrides_are_applied() {
    std::env::set_var("SARNET_PORT", "9100");
    std::env::set_var("MEDIA_ROOT", "/srv/sarnet/media");
    std::env::set_var("COLORIZER_PRELOAD", "true");
    std::env::set_var("MAX_UPLOAD_BYTES", "not-a-number");

    let config = Config::from_env();

    std::env::remove_var("SARNET_PORT");
    std::env::remove_var("MEDIA_ROOT");
    std::env::remove_var("COLORIZER_PRELOAD");
    std::env::remove_var("MAX_UPLOAD_BYTES");

    assert_eq!(config.server.port, 9100);
    assert_eq!(config.media.root.to_str(), Some("/srv/sarnet/media"));
    assert!(config.colorizer.preload);
    // Invalid values fall back to the default.
    assert_eq!(config.media.max_upload_bytes, 10 * 1024 * 1024);
}

#[test]
#[serial]
fn test_database_path_strips_file_prefix() {
    std::env::set_var("DATABASE_URL", "file:/tmp/sarnet-test.db");
    let config = Config::from_env();
    std::env::remove_var("DATABASE_URL");

    assert_eq!(config.database_path(), "/tmp/sarnet-test.db");
}

async fn router_with_origins(dir: &TempDir, origins: Vec<String>) -> axum::Router {
    let mut config = test_config(dir);
    config.server.cors_allowed_origins = origins;

    let raw_db = Database::new(&config.database)
        .await
        .expect("Failed to create database");
    let db: Arc<dyn DatabaseBackend> = Arc::new(LibSqlBackend::new(raw_db));
    create_router(AppState::new(
        config,
        db,
        ColorizerProvider::unavailable("not needed"),
    ))
}

fn preflight(origin: &str) -> Request<Body> {
    Request::builder()
        .method(Method::OPTIONS)
        .uri("/api/sessions/")
        .header(header::ORIGIN, origin)
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "GET")
        .body(Body::empty())
        .unwrap()
}

#[tokio::test]
#[serial]
async fn test_cors_allows_only_configured_origins() {
    let dir = TempDir::new().unwrap();
    let app = router_with_origins(&dir, vec!["http://localhost:3000".to_string()]).await;

    let response = app
        .clone()
        .oneshot(preflight("http://localhost:3000"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
        "http://localhost:3000"
    );

    let response = app.oneshot(preflight("http://evil.example")).await.unwrap();
    assert!(response
        .headers()
        .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
        .is_none());
}

#[tokio::test]
#[serial]
async fn test_cors_defaults_to_any_origin() {
    let dir = TempDir::new().unwrap();
    let app = router_with_origins(&dir, Vec::new()).await;

    let response = app
        .oneshot(preflight("http://anywhere.example"))
        .await
        .unwrap();
    assert_eq!(response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
}

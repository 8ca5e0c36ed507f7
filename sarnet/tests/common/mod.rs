// Common test utilities for integration tests
#![allow(dead_code)]

use std::sync::{Arc, Once};

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use serde_json::Value;
use tempfile::TempDir;
use tower::ServiceExt;

use sarnet::api::{create_router, AppState};
use sarnet::colorize::ColorizerProvider;
use sarnet::config::{
    AuthConfig, ColorizerConfig, Config, DatabaseConfig, MediaConfig, PaginationConfig,
    ServerConfig,
};
use sarnet::db::{Database, DatabaseBackend, LibSqlBackend, UserStore};

static INIT: Once = Once::new();

/// Initialize tracing subscriber once for tests
pub fn init_test_logger() {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .try_init();
    });
}

// Re-export commonly used crates for convenience
pub use serial_test::serial;
pub use tempfile;

pub const PASSWORD: &str = "correct-horse-battery";
const MULTIPART_BOUNDARY: &str = "sarnet-test-boundary";

pub fn test_config(dir: &TempDir) -> Config {
    let db_path = dir.path().join("sarnet_test.db");
    Config {
        server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
            cors_allowed_origins: Vec::new(),
        },
        database: DatabaseConfig {
            url: format!("file:{}", db_path.display()),
            busy_timeout_ms: 5000,
            journal_mode: "WAL".to_string(),
            synchronous: "NORMAL".to_string(),
        },
        auth: AuthConfig {
            jwt_secret: "integration-test-secret".to_string(),
            ephemeral_secret: false,
            access_ttl_minutes: 5,
            refresh_ttl_days: 1,
        },
        media: MediaConfig {
            root: dir.path().join("media"),
            max_upload_bytes: 1024 * 1024,
        },
        pagination: PaginationConfig::default(),
        colorizer: ColorizerConfig {
            checkpoint_path: dir.path().join("missing.pth"),
            ..ColorizerConfig::default()
        },
    }
}

/// A router over a throwaway database and media directory.
pub struct TestApp {
    pub router: Router,
    pub config: Config,
    pub db: Arc<dyn DatabaseBackend>,
    // Held so the directory outlives the router.
    pub dir: TempDir,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_colorizer(|_| ColorizerProvider::unavailable("no checkpoint in tests")).await
    }

    pub async fn with_colorizer(make: impl FnOnce(&Config) -> ColorizerProvider) -> Self {
        init_test_logger();
        let dir = TempDir::new().expect("Failed to create temp dir");
        let config = test_config(&dir);

        let raw_db = Database::new(&config.database)
            .await
            .expect("Failed to create database");
        let db: Arc<dyn DatabaseBackend> = Arc::new(LibSqlBackend::new(raw_db));
        let colorizer = make(&config);

        let state = AppState::new(config.clone(), db.clone(), colorizer);
        Self {
            router: create_router(state),
            config,
            db,
            dir,
        }
    }

    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible");
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                Value::String(String::from_utf8_lossy(&bytes).into_owned())
            })
        };
        (status, json)
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.send(request("GET", uri, token, Body::empty(), None))
            .await
    }

    pub async fn delete(&self, uri: &str, token: &str) -> (StatusCode, Value) {
        self.send(request("DELETE", uri, Some(token), Body::empty(), None))
            .await
    }

    pub async fn json(
        &self,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Value,
    ) -> (StatusCode, Value) {
        self.send(request(
            method,
            uri,
            token,
            Body::from(body.to_string()),
            Some("application/json".to_string()),
        ))
        .await
    }

    pub async fn multipart(
        &self,
        uri: &str,
        token: Option<&str>,
        parts: &[Part<'_>],
    ) -> (StatusCode, Value) {
        self.send(request(
            "POST",
            uri,
            token,
            Body::from(multipart_body(parts)),
            Some(format!(
                "multipart/form-data; boundary={MULTIPART_BOUNDARY}"
            )),
        ))
        .await
    }

    /// Grant superuser rights directly in the store.
    pub async fn promote_to_superuser(&self, id: i64) {
        let mut user = self
            .db
            .get_user(id)
            .await
            .unwrap()
            .expect("user should exist");
        user.is_superuser = true;
        self.db.update_user(&user).await.unwrap();
    }

    /// Register an account and return its access token and user id.
    pub async fn register(&self, email: &str) -> (String, i64) {
        let (status, body) = self
            .json(
                "POST",
                "/api/auth/registration/",
                None,
                serde_json::json!({
                    "email": email,
                    "password1": PASSWORD,
                    "password2": PASSWORD,
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "registration failed: {body}");
        let access = body["access"].as_str().unwrap().to_string();
        let id = body["user"]["id"].as_i64().unwrap();
        (access, id)
    }
}

fn request(
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Body,
    content_type: Option<String>,
) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    if let Some(content_type) = content_type {
        builder = builder.header(header::CONTENT_TYPE, content_type);
    }
    builder.body(body).unwrap()
}

pub enum Part<'a> {
    Text(&'a str, &'a str),
    File {
        name: &'a str,
        file_name: &'a str,
        bytes: &'a [u8],
    },
}

fn multipart_body(parts: &[Part<'_>]) -> Vec<u8> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{MULTIPART_BOUNDARY}\r\n").as_bytes());
        match part {
            Part::Text(name, value) => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n")
                        .as_bytes(),
                );
            }
            Part::File {
                name,
                file_name,
                bytes,
            } => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{name}\"; filename=\"{file_name}\"\r\n\
                         Content-Type: application/octet-stream\r\n\r\n"
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(bytes);
                body.extend_from_slice(b"\r\n");
            }
        }
    }
    body.extend_from_slice(format!("--{MULTIPART_BOUNDARY}--\r\n").as_bytes());
    body
}

/// A small grayscale PNG, the shape of a SAR tile.
pub fn gray_png(width: u32, height: u32) -> Vec<u8> {
    let img = image::GrayImage::from_fn(width, height, |x, y| image::Luma([((x * 7 + y) % 256) as u8]));
    let mut buf = Vec::new();
    image::DynamicImage::ImageLuma8(img)
        .write_to(&mut std::io::Cursor::new(&mut buf), image::ImageFormat::Png)
        .unwrap();
    buf
}

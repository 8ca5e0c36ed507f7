use axum::http::StatusCode;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use burn::backend::ndarray::{NdArray, NdArrayDevice};
use pretty_assertions::assert_eq;

mod common;
use common::{gray_png, Part, TestApp};

use sarnet::colorize::{ColorizerProvider, UnetGeneratorConfig};

fn tiny_colorizer() -> ColorizerProvider {
    let model = UnetGeneratorConfig::new()
        .with_base_channels(2)
        .init::<NdArray>(&NdArrayDevice::default());
    ColorizerProvider::from_model(model, 256)
}

#[tokio::test]
async fn test_health_is_public() {
    let app = TestApp::new().await;

    let (status, body) = app.get("/api/health/", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["database"]["status"], "ok");
    assert_eq!(body["colorizer"]["status"], "unavailable");
    assert!(body["colorizer"]["reason"].is_string());
}

#[tokio::test]
async fn test_openapi_json_is_public_and_valid() {
    let app = TestApp::new().await;

    let (status, body) = app.get("/api/openapi.json", None).await;
    assert_eq!(status, StatusCode::OK);
    let version = body["openapi"]
        .as_str()
        .expect("openapi field should be a string");
    assert!(version.starts_with('3'), "got OpenAPI version {version}");
    assert!(body["paths"]["/api/predict/"].is_object());
    assert!(body["components"]["securitySchemes"]["bearer_auth"].is_object());
}

#[tokio::test]
async fn test_docs_page_is_served() {
    let app = TestApp::new().await;

    let (status, body) = app.get("/api/docs", None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.as_str().unwrap().contains("redoc"));
}

#[tokio::test]
async fn test_predict_requires_auth() {
    let app = TestApp::new().await;
    let png = gray_png(16, 16);

    let (status, _) = app
        .multipart(
            "/api/predict/",
            None,
            &[Part::File {
                name: "image",
                file_name: "sar.png",
                bytes: &png,
            }],
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_predict_without_image_is_bad_request() {
    let app = TestApp::with_colorizer(|_| tiny_colorizer()).await;
    let (token, _) = app.register("pred@example.com").await;

    let (status, body) = app
        .multipart("/api/predict/", Some(&token), &[Part::Text("note", "hi")])
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "No image provided");
}

#[tokio::test]
async fn test_predict_unavailable_model_is_503() {
    let app = TestApp::new().await;
    let (token, _) = app.register("pred@example.com").await;
    let png = gray_png(16, 16);

    let (status, body) = app
        .multipart(
            "/api/predict/",
            Some(&token),
            &[Part::File {
                name: "image",
                file_name: "sar.png",
                bytes: &png,
            }],
        )
        .await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["code"], "service_unavailable");
}

#[tokio::test]
async fn test_predict_returns_base64_png() {
    let app = TestApp::with_colorizer(|_| tiny_colorizer()).await;
    let (token, _) = app.register("pred@example.com").await;
    let png = gray_png(64, 40);

    let (status, body) = app
        .multipart(
            "/api/predict/",
            Some(&token),
            &[Part::File {
                name: "image",
                file_name: "sar.png",
                bytes: &png,
            }],
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");

    let encoded = body["colorized_image"].as_str().unwrap();
    let decoded = STANDARD.decode(encoded).unwrap();
    let img = image::load_from_memory(&decoded).unwrap();
    assert_eq!((img.width(), img.height()), (256, 256));
    assert_eq!(img.color(), image::ColorType::Rgb8);
}

#[tokio::test]
async fn test_predict_rejects_undecodable_upload() {
    let app = TestApp::with_colorizer(|_| tiny_colorizer()).await;
    let (token, _) = app.register("pred@example.com").await;

    let (status, body) = app
        .multipart(
            "/api/predict/",
            Some(&token),
            &[Part::File {
                name: "image",
                file_name: "sar.png",
                bytes: b"definitely not an image",
            }],
        )
        .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["code"], "internal_error");
}

#[tokio::test]
async fn test_avatar_upload_is_served_under_media() {
    let app = TestApp::new().await;
    let (token, _) = app.register("face@example.com").await;
    let png = gray_png(12, 12);

    let (status, user) = app
        .multipart(
            "/api/users/avatar/",
            Some(&token),
            &[Part::File {
                name: "avatar",
                file_name: "me.png",
                bytes: &png,
            }],
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{user}");
    let avatar = user["avatar"].as_str().unwrap();
    assert!(avatar.starts_with("avatars/"));

    let (status, _) = app.get(&format!("/media/{avatar}"), None).await;
    assert_eq!(status, StatusCode::OK);
}

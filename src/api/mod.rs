//! HTTP API for traffic sign classification
//!
//! ## Endpoints
//!
//! - `GET /health` - Liveness check, always `{"status": "ok"}`
//! - `POST /predict` - Classify the image in multipart field `file`

pub mod error;
pub mod handlers;

use crate::config::{AppConfig, CorsConfig};
use crate::metrics::ServiceMetrics;
use crate::models::InferenceEngine;
use axum::{
    extract::DefaultBodyLimit,
    http::HeaderValue,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::warn;

/// Shared application state; read-only after startup
pub struct AppState {
    pub engine: Arc<InferenceEngine>,
    pub metrics: Arc<ServiceMetrics>,
}

impl AppState {
    pub fn new(engine: Arc<InferenceEngine>, metrics: Arc<ServiceMetrics>) -> Self {
        Self { engine, metrics }
    }
}

pub type SharedState = Arc<AppState>;

/// Build the service router with tracing, CORS and upload limits applied
pub fn router(state: SharedState, config: &AppConfig) -> Router {
    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/predict", post(handlers::predict))
        .layer(DefaultBodyLimit::max(config.server.max_upload_bytes))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(&config.cors))
}

/// CORS policy for the configured front-end origins.
///
/// A `*` entry opens the API to any origin without credentials.
pub fn cors_layer(config: &CorsConfig) -> CorsLayer {
    let base = CorsLayer::new()
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request());

    if config.allowed_origins.iter().any(|o| o == "*") {
        return base.allow_origin(AllowOrigin::any());
    }

    let origins: Vec<HeaderValue> = config
        .allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(origin = %origin, error = %e, "Skipping invalid CORS origin");
                None
            }
        })
        .collect();

    base.allow_origin(AllowOrigin::list(origins))
        .allow_credentials(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preprocess::InputShape;
    use crate::test_support::{encode_as, encode_png, png_with_declared_size, rgb_image, StubClassifier};
    use crate::types::ClassRegistry;
    use axum::body::Body;
    use axum::http::{header, Method, Request, StatusCode};
    use http_body_util::BodyExt;
    use image::{DynamicImage, ImageFormat};
    use serde_json::Value;
    use tower::ServiceExt;

    const BOUNDARY: &str = "X-TRAFFIC-SIGN-BOUNDARY";

    fn app_with(stub: StubClassifier) -> Router {
        let metrics = Arc::new(ServiceMetrics::new());
        let engine = Arc::new(InferenceEngine::with_classifier(
            Arc::new(stub),
            ClassRegistry::builtin(),
            metrics.clone(),
        ));
        router(Arc::new(AppState::new(engine, metrics)), &AppConfig::default())
    }

    fn app() -> Router {
        app_with(StubClassifier::peaked(InputShape::new(32, 32, 3), 58, 14, 0.87))
    }

    fn multipart_body(field: &str, file_name: &str, content_type: &str, data: &[u8]) -> Vec<u8> {
        let mut body = Vec::new();
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        body.extend_from_slice(
            format!(
                "Content-Disposition: form-data; name=\"{field}\"; filename=\"{file_name}\"\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(format!("Content-Type: {content_type}\r\n\r\n").as_bytes());
        body.extend_from_slice(data);
        body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
        body
    }

    fn predict_request(body: Vec<u8>) -> Request<Body> {
        Request::builder()
            .method(Method::POST)
            .uri("/predict")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap()
    }

    async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    #[tokio::test]
    async fn test_health() {
        let request = Request::builder().uri("/health").body(Body::empty()).unwrap();
        let (status, body) = send(app(), request).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, serde_json::json!({"status": "ok"}));
    }

    #[tokio::test]
    async fn test_predict_valid_png() {
        let png = encode_png(&DynamicImage::ImageRgb8(rgb_image(64, 64)));
        let request = predict_request(multipart_body("file", "sign.png", "image/png", &png));

        let (status, body) = send(app(), request).await;

        assert_eq!(status, StatusCode::OK);
        let class_index = body["class_index"].as_u64().unwrap() as usize;
        let confidence = body["confidence"].as_f64().unwrap();
        assert!(class_index < 58);
        assert!((0.0..=1.0).contains(&confidence));

        let record = ClassRegistry::builtin().lookup(class_index);
        assert_eq!(body["title"], &*record.title);
        assert_eq!(body["description"], &*record.description);
        assert_eq!(class_index, 14);
    }

    #[tokio::test]
    async fn test_predict_rejects_non_image() {
        let request = predict_request(multipart_body("file", "notes.txt", "text/plain", b"hello"));
        let (status, body) = send(app(), request).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["detail"], "File must be an image.");
    }

    #[tokio::test]
    async fn test_predict_rejects_corrupt_image() {
        let mut png = encode_png(&DynamicImage::ImageRgb8(rgb_image(64, 64)));
        png.truncate(50);
        let request = predict_request(multipart_body("file", "sign.png", "image/png", &png));

        let (status, body) = send(app(), request).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["detail"]
            .as_str()
            .unwrap()
            .starts_with("Invalid image file:"));
    }

    #[tokio::test]
    async fn test_predict_rejects_oversized_dimensions() {
        let png = png_with_declared_size(30_000, 30_000);
        let request = predict_request(multipart_body("file", "bomb.png", "image/png", &png));

        let (status, body) = send(app(), request).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["detail"]
            .as_str()
            .unwrap()
            .starts_with("Invalid image file:"));
    }

    #[tokio::test]
    async fn test_predict_accepts_tiff() {
        let tiff = encode_as(&DynamicImage::ImageRgb8(rgb_image(40, 30)), ImageFormat::Tiff);
        let request = predict_request(multipart_body("file", "sign.tiff", "image/tiff", &tiff));

        let (status, body) = send(app(), request).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["class_index"], 14);
    }

    #[tokio::test]
    async fn test_predict_model_failure_is_500() {
        let app = app_with(StubClassifier::failing(InputShape::new(32, 32, 3), "session crashed"));
        let png = encode_png(&DynamicImage::ImageRgb8(rgb_image(64, 64)));
        let request = predict_request(multipart_body("file", "sign.png", "image/png", &png));

        let (status, body) = send(app, request).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        let detail = body["detail"].as_str().unwrap();
        assert!(detail.starts_with("Model prediction error:"));
        assert!(detail.contains("session crashed"));
    }

    #[tokio::test]
    async fn test_predict_without_file_field() {
        let request = predict_request(multipart_body("image", "sign.png", "image/png", b"x"));
        let (status, body) = send(app(), request).await;

        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["detail"], "Field 'file' is required.");
    }

    #[tokio::test]
    async fn test_predict_requires_multipart() {
        let request = Request::builder()
            .method(Method::POST)
            .uri("/predict")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{}"))
            .unwrap();

        let (status, body) = send(app(), request).await;

        assert!(status.is_client_error());
        assert!(body["detail"].is_string());
    }

    #[tokio::test]
    async fn test_cors_preflight_allows_frontend_origin() {
        let request = Request::builder()
            .method(Method::OPTIONS)
            .uri("/predict")
            .header(header::ORIGIN, "http://localhost:5173")
            .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
            .body(Body::empty())
            .unwrap();

        let response = app().oneshot(request).await.unwrap();

        assert_eq!(
            response.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
            "http://localhost:5173"
        );
        assert_eq!(
            response
                .headers()
                .get(header::ACCESS_CONTROL_ALLOW_CREDENTIALS)
                .unwrap(),
            "true"
        );
    }

    #[tokio::test]
    async fn test_cors_ignores_unknown_origin() {
        let request = Request::builder()
            .uri("/health")
            .header(header::ORIGIN, "http://evil.example")
            .body(Body::empty())
            .unwrap();

        let response = app().oneshot(request).await.unwrap();

        assert!(response
            .headers()
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .is_none());
    }
}

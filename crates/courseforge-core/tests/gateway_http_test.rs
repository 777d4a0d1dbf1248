//! Integration tests for the HTTP gateway against an in-process server.
//!
//! Each test binds an axum router on an ephemeral port and points an
//! [`HttpGenerationGateway`] at it, so the full reqwest round trip and
//! envelope handling are exercised without touching the real service.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};

use courseforge_core::gateway::{
    DetailRequest, GatewayConfig, GatewayError, GenerationGateway, HttpGenerationGateway,
    OutlineRequest,
};
use courseforge_core::model::{DetailLevel, TextbookSubmission};
use courseforge_test_utils::{sample_detail, sample_module, sample_outline};

// ---------------------------------------------------------------------------
// Server harness
// ---------------------------------------------------------------------------

/// Serve `app` on an ephemeral local port, returning its base URL.
async fn spawn_server(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind ephemeral port");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("serve stub");
    });
    format!("http://{addr}")
}

fn gateway_for(base_url: &str) -> HttpGenerationGateway {
    HttpGenerationGateway::new(GatewayConfig::new(base_url)).expect("build gateway")
}

fn outline_request() -> OutlineRequest {
    let mut submission = TextbookSubmission::new("Lesson 1: Water Cycle");
    submission.module_count = 3;
    OutlineRequest::from(&submission)
}

fn detail_request() -> DetailRequest {
    DetailRequest {
        module_info: sample_module(2),
        textbook_content: "Lesson 1: Water Cycle".into(),
        detail_level: DetailLevel::Standard,
        exercise_count: 5,
    }
}

// ---------------------------------------------------------------------------
// Success paths
// ---------------------------------------------------------------------------

#[tokio::test]
async fn outline_success_unwraps_the_envelope() {
    let expected = sample_outline(3);
    let payload = serde_json::to_value(&expected).unwrap();
    let app = Router::new().route(
        "/api/generate-outline",
        post(move || async move {
            Json(json!({
                "success": true,
                "message": "Course outline generated successfully",
                "data": payload,
            }))
        }),
    );
    let base_url = spawn_server(app).await;

    let outline = gateway_for(&base_url)
        .generate_outline(&outline_request())
        .await
        .unwrap();
    assert_eq!(outline.course_title, expected.course_title);
    assert_eq!(outline.modules.len(), 3);
    assert_eq!(outline.modules[1].module_id, "m2");
}

#[tokio::test]
async fn detail_request_body_matches_the_wire_contract() {
    let received: Arc<Mutex<Option<Value>>> = Arc::default();
    let captured = Arc::clone(&received);
    let payload = serde_json::to_value(sample_detail("m2")).unwrap();
    let app = Router::new().route(
        "/api/generate-detail",
        post(move |Json(body): Json<Value>| async move {
            *captured.lock().unwrap() = Some(body);
            Json(json!({"success": true, "data": payload}))
        }),
    );
    let base_url = spawn_server(app).await;

    let detail = gateway_for(&base_url)
        .generate_detail(&detail_request())
        .await
        .unwrap();
    assert_eq!(detail.module_id, "m2");
    assert_eq!(detail.exercises.len(), 2);

    let body = received.lock().unwrap().take().expect("request captured");
    assert_eq!(body["module_info"]["module_id"], "m2");
    assert_eq!(body["textbook_content"], "Lesson 1: Water Cycle");
    assert_eq!(body["detail_level"], "standard");
    assert_eq!(body["exercise_count"], 5);
}

#[tokio::test]
async fn health_reports_the_service_status() {
    let app = Router::new().route(
        "/health",
        get(|| async {
            Json(json!({
                "status": "healthy",
                "service": "course-generator",
                "config_valid": true,
            }))
        }),
    );
    let base_url = spawn_server(app).await;

    let health = gateway_for(&base_url).health().await.unwrap();
    assert_eq!(health.status, "healthy");
    assert_eq!(health.service, "course-generator");
    assert!(health.config_valid);
}

// ---------------------------------------------------------------------------
// Failure taxonomy
// ---------------------------------------------------------------------------

#[tokio::test]
async fn envelope_failure_surfaces_the_error_text() {
    let app = Router::new().route(
        "/api/generate-outline",
        post(|| async {
            Json(json!({
                "success": false,
                "message": "outline generation failed",
                "error": "generation failed upstream",
            }))
        }),
    );
    let base_url = spawn_server(app).await;

    let error = gateway_for(&base_url)
        .generate_outline(&outline_request())
        .await
        .unwrap_err();
    assert_eq!(error, GatewayError::Remote("generation failed upstream".into()));
}

#[tokio::test]
async fn http_error_prefers_the_detail_field() {
    // FastAPI-style error body: {"detail": "..."} with a 5xx status.
    let app = Router::new().route(
        "/api/generate-detail",
        post(|| async {
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"detail": "workflow call failed"})),
            )
        }),
    );
    let base_url = spawn_server(app).await;

    let error = gateway_for(&base_url)
        .generate_detail(&detail_request())
        .await
        .unwrap_err();
    assert_eq!(error, GatewayError::Remote("workflow call failed".into()));
}

#[tokio::test]
async fn http_error_without_detail_falls_back_to_the_status() {
    let app = Router::new().route(
        "/api/generate-outline",
        post(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "boom") }),
    );
    let base_url = spawn_server(app).await;

    let error = gateway_for(&base_url)
        .generate_outline(&outline_request())
        .await
        .unwrap_err();
    match error {
        GatewayError::Remote(message) => {
            assert!(message.contains("500"), "message: {message}")
        }
        other => panic!("expected Remote error, got {other:?}"),
    }
}

#[tokio::test]
async fn malformed_success_body_is_a_transport_error() {
    let app = Router::new().route(
        "/api/generate-outline",
        post(|| async { "not json at all" }),
    );
    let base_url = spawn_server(app).await;

    let error = gateway_for(&base_url)
        .generate_outline(&outline_request())
        .await
        .unwrap_err();
    assert!(matches!(error, GatewayError::Transport(_)));
}

#[tokio::test]
async fn unreachable_service_is_a_transport_error() {
    // Bind and immediately drop the listener so the port refuses
    // connections.
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let error = gateway_for(&format!("http://{addr}"))
        .generate_outline(&outline_request())
        .await
        .unwrap_err();
    assert!(matches!(error, GatewayError::Transport(_)));
}

#[tokio::test]
async fn slow_service_times_out_at_the_configured_bound() {
    let app = Router::new().route(
        "/api/generate-detail",
        post(|| async {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Json(json!({"success": true}))
        }),
    );
    let base_url = spawn_server(app).await;

    let mut config = GatewayConfig::new(&base_url);
    config.timeout = Duration::from_millis(200);
    let gateway = HttpGenerationGateway::new(config).unwrap();

    let error = gateway.generate_detail(&detail_request()).await.unwrap_err();
    assert_eq!(error, GatewayError::Timeout(Duration::from_millis(200)));
}

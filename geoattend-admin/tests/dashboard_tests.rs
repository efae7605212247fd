//! Dashboard operations against an in-process mock attendance backend

use axum::extract::Path;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use geoattend_admin::events::EventForm;
use geoattend_admin::{AdminError, Dashboard};
use geoattend_common::api::ApiError;
use geoattend_common::config::TomlConfig;
use serde_json::{json, Value};

async fn create_event(Json(body): Json<Value>) -> impl IntoResponse {
    if body["title"] == "Duplicate" {
        return (
            StatusCode::OK,
            Json(json!({"status": "error", "message": "An event with this title already exists"})),
        );
    }
    assert_eq!(body["radius_meters"], 150.0);
    assert_eq!(body["start_time"], "2025-03-04T09:00:00Z");
    (
        StatusCode::OK,
        Json(json!({"status": "success", "event_id": 42, "message": "Event created"})),
    )
}

async fn failed_attempts(Path(event_id): Path<String>) -> impl IntoResponse {
    if event_id != "42" {
        return (StatusCode::NOT_FOUND, Json(json!({"detail": "Event not found"})));
    }
    (
        StatusCode::OK,
        Json(json!({"attempts": [{
            "attempt_id": 7,
            "registration_id": "FAC123",
            "failure_reason": "Outside geofence",
            "distance": 212.4
        }]})),
    )
}

async fn approve(Json(body): Json<Value>) -> Json<Value> {
    if body["attempt_id"] == "missing" {
        return Json(json!({"status": "error", "message": "Attempt not found"}));
    }
    Json(json!({"status": "success"}))
}

async fn download(Path(event_id): Path<String>) -> impl IntoResponse {
    (
        [
            (header::CONTENT_TYPE, "text/csv".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"attendance_{}.csv\"", event_id),
            ),
        ],
        "reg_no,name\nFAC123,A. Kumar\n",
    )
}

async fn dashboard() -> Dashboard {
    let app = Router::new()
        .route("/create_event", post(create_event))
        .route("/event/:event_id/failed_attempts", get(failed_attempts))
        .route("/event/:event_id/attendance/download", get(download))
        .route("/admin/approve_attendance", post(approve));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let mut config = TomlConfig::default();
    config.api.base_url = format!("http://{}", addr);
    Dashboard::new(&config).unwrap()
}

fn form(title: &str) -> EventForm {
    EventForm {
        title: title.to_string(),
        description: None,
        start_time: "2025-03-04T09:00:00Z".to_string(),
        end_time: "2025-03-04T12:00:00Z".to_string(),
        latitude: 13.0827,
        longitude: 80.2707,
        radius_meters: 150.0,
        location_name: Some("Main hall".to_string()),
    }
}

#[tokio::test]
async fn test_create_event_returns_id() {
    let dashboard = dashboard().await;
    assert_eq!(
        dashboard.create_event(&form("Convocation")).await.unwrap(),
        Some("42".to_string())
    );
}

#[tokio::test]
async fn test_create_event_rejected_by_backend() {
    let dashboard = dashboard().await;
    match dashboard.create_event(&form("Duplicate")).await {
        Err(AdminError::Rejected(message)) => {
            assert_eq!(message, "An event with this title already exists")
        }
        other => panic!("expected Rejected, got {:?}", other),
    }
}

#[tokio::test]
async fn test_invalid_event_not_sent() {
    // No route would accept this; validation must fail first
    let dashboard = dashboard().await;
    let mut bad = form("Convocation");
    bad.latitude = 91.0;
    assert!(matches!(
        dashboard.create_event(&bad).await,
        Err(AdminError::Validation(_))
    ));
}

#[tokio::test]
async fn test_failed_attempts_and_review() {
    let dashboard = dashboard().await;

    let attempts = dashboard.failed_attempts("42").await.unwrap();
    assert_eq!(attempts.len(), 1);
    assert_eq!(attempts[0].id, "7");
    assert_eq!(attempts[0].reg_no, "FAC123");
    assert_eq!(attempts[0].distance_meters, Some(212.4));

    assert_eq!(
        dashboard.review_attempt("7", true).await.unwrap(),
        "Attendance approved"
    );
    assert!(matches!(
        dashboard.review_attempt("missing", false).await,
        Err(AdminError::Rejected(_))
    ));
}

#[tokio::test]
async fn test_failed_attempts_unknown_event() {
    let dashboard = dashboard().await;
    match dashboard.failed_attempts("99").await {
        Err(AdminError::Api(ApiError::Status { status, message })) => {
            assert_eq!(status, 404);
            assert_eq!(message, "Event not found");
        }
        other => panic!("expected 404, got {:?}", other),
    }
}

#[tokio::test]
async fn test_download_writes_report() {
    let dashboard = dashboard().await;
    let dir = tempfile::tempdir().unwrap();

    let path = dashboard
        .download_attendance("42", dir.path(), false)
        .await
        .unwrap();

    assert_eq!(path, dir.path().join("attendance_42.csv"));
    assert!(std::fs::read_to_string(&path).unwrap().contains("A. Kumar"));
    assert!(dashboard
        .download_attendance("42", dir.path(), false)
        .await
        .is_err());
}

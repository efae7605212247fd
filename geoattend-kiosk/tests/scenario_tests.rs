//! End-to-end registration against an in-process mock attendance backend
//!
//! Real `ApiClient`, real file store, still-image camera; only the backend
//! is simulated.

use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use geoattend_common::config::TomlConfig;
use geoattend_common::GeoCoordinate;
use geoattend_kiosk::capture::{FixedPositionSource, StillImageCamera};
use geoattend_kiosk::confirmation::ConfirmationView;
use geoattend_kiosk::flow::FlowOutcome;
use geoattend_kiosk::Kiosk;
use serde_json::json;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

#[derive(Default)]
struct Counters {
    registrations: AtomicU32,
    status_queries: AtomicU32,
}

async fn register(State(counters): State<Arc<Counters>>, mut multipart: Multipart) -> impl IntoResponse {
    counters.registrations.fetch_add(1, Ordering::SeqCst);
    let mut reg_no = String::new();
    let mut has_image = false;
    while let Ok(Some(field)) = multipart.next_field().await {
        match field.name().unwrap_or_default() {
            "reg_no" => reg_no = field.text().await.unwrap_or_default(),
            "image" => has_image = field.bytes().await.map(|b| !b.is_empty()).unwrap_or(false),
            _ => {}
        }
    }
    if !has_image {
        return (StatusCode::BAD_REQUEST, Json(json!({"message": "Image missing"})));
    }
    (
        StatusCode::OK,
        Json(json!({
            "status": "success",
            "message": "Attendance marked",
            "data": {"name": "A. Kumar", "reg_no": reg_no}
        })),
    )
}

async fn status(
    State(counters): State<Arc<Counters>>,
    Path((event_id, reg_no)): Path<(String, String)>,
) -> impl IntoResponse {
    let n = counters.status_queries.fetch_add(1, Ordering::SeqCst) + 1;
    if event_id != "42" {
        return (StatusCode::NOT_FOUND, Json(json!({"detail": "Event not found"})));
    }
    if n == 1 {
        return (StatusCode::OK, Json(json!({"status": "pending"})));
    }
    (
        StatusCode::OK,
        Json(json!({
            "status": "registered",
            "data": {"name": "A. Kumar", "reg_no": reg_no, "timestamp": "2025-03-04T09:12:00Z"}
        })),
    )
}

struct Fixture {
    kiosk: Kiosk,
    counters: Arc<Counters>,
    photo: std::path::PathBuf,
    _dir: tempfile::TempDir,
}

async fn fixture() -> Fixture {
    let counters = Arc::new(Counters::default());
    let app = Router::new()
        .route("/register_attendance", post(register))
        .route("/attendance_status/:event_id/:reg_no", get(status))
        .with_state(Arc::clone(&counters));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let dir = tempfile::tempdir().unwrap();
    let photo = dir.path().join("selfie.png");
    image::RgbImage::from_pixel(64, 48, image::Rgb([180, 140, 120]))
        .save(&photo)
        .unwrap();

    let mut config = TomlConfig::default();
    config.api.base_url = format!("http://{}", addr);
    config.poll.interval_ms = 50;
    config.storage.dir = Some(dir.path().join("store"));

    Fixture {
        kiosk: Kiosk::open(config).unwrap(),
        counters,
        photo,
        _dir: dir,
    }
}

async fn register_fac123(fx: &Fixture) -> FlowOutcome {
    let mut flow = fx.kiosk.registration_flow(
        "42",
        StillImageCamera::new(&fx.photo),
        FixedPositionSource::new(GeoCoordinate::new(13.0827, 80.2707).unwrap()),
    );
    let wizard = flow.wizard_mut();
    wizard.set_registration_id("FAC123");
    assert!(!wizard.next().await.is_blocked());
    assert!(!wizard.capture_photo().is_blocked());
    assert!(!wizard.next().await.is_blocked());
    assert!(!wizard.locate().await.is_blocked());
    assert!(!wizard.next().await.is_blocked());
    flow.submit().await.unwrap()
}

#[tokio::test]
async fn test_fac123_registers_and_confirms() {
    let fx = fixture().await;

    let outcome = register_fac123(&fx).await;
    assert!(matches!(outcome, FlowOutcome::Confirmed(_)));
    assert_eq!(fx.counters.registrations.load(Ordering::SeqCst), 1);

    let view = fx
        .kiosk
        .confirmation_screen()
        .load("42", &CancellationToken::new())
        .await
        .unwrap()
        .unwrap();

    assert_eq!(
        view,
        ConfirmationView::Registered {
            name: Some("A. Kumar".to_string()),
            registration_id: "FAC123".to_string(),
            timestamp: None,
            already_registered: false,
        }
    );
    assert_eq!(
        fx.counters.status_queries.load(Ordering::SeqCst),
        0,
        "handed-over result needs no status query"
    );
}

#[tokio::test]
async fn test_revisit_polls_remembered_registration() {
    let fx = fixture().await;
    register_fac123(&fx).await;

    let cancel = CancellationToken::new();
    let mut screen = fx.kiosk.confirmation_screen();
    screen.load("42", &cancel).await.unwrap();

    // Second visit: the record was taken, so the screen polls
    let view = fx
        .kiosk
        .confirmation_screen()
        .load("42", &cancel)
        .await
        .unwrap()
        .unwrap();

    match view {
        ConfirmationView::Registered {
            name,
            registration_id,
            timestamp,
            ..
        } => {
            assert_eq!(name.as_deref(), Some("A. Kumar"));
            assert_eq!(registration_id, "FAC123");
            assert_eq!(timestamp.as_deref(), Some("2025-03-04T09:12:00Z"));
        }
        other => panic!("expected Registered, got {:?}", other),
    }
    assert_eq!(fx.counters.status_queries.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_unknown_event_status_is_error_without_retry() {
    let fx = fixture().await;
    register_fac123(&fx).await;
    fx.kiosk
        .confirmation_screen()
        .load("42", &CancellationToken::new())
        .await
        .unwrap();

    let view = fx
        .kiosk
        .confirmation_screen()
        .load("99", &CancellationToken::new())
        .await
        .unwrap()
        .unwrap();

    assert_eq!(view, ConfirmationView::Error("Event not found".to_string()));
    assert_eq!(fx.counters.status_queries.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_fresh_device_has_no_registration() {
    let fx = fixture().await;

    let view = fx
        .kiosk
        .confirmation_screen()
        .load("42", &CancellationToken::new())
        .await
        .unwrap()
        .unwrap();

    assert_eq!(view, ConfirmationView::NoRegistration);
}

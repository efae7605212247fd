//! Test doubles shared by the kiosk integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use geoattend_common::api::{ApiError, RawReply, RegistrationForm};
use geoattend_common::store::{KeyValueStore, MemoryStore};
use geoattend_common::GeoCoordinate;
use geoattend_kiosk::backend::AttendanceBackend;
use geoattend_kiosk::capture::{
    CameraDevice, CaptureError, FixedPositionSource, Frame, PositionOptions, VideoStream,
};
use geoattend_kiosk::wizard::RegistrationWizard;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

// ============================================================================
// Camera
// ============================================================================

/// Counts stream opens and stops across clones
#[derive(Debug, Clone, Default)]
pub struct CameraProbe {
    opens: Arc<AtomicU32>,
    stops: Arc<AtomicU32>,
}

impl CameraProbe {
    pub fn opens(&self) -> u32 {
        self.opens.load(Ordering::SeqCst)
    }

    pub fn stops(&self) -> u32 {
        self.stops.load(Ordering::SeqCst)
    }
}

pub struct FakeCamera {
    probe: CameraProbe,
    width: u32,
    height: u32,
    denied: bool,
}

impl FakeCamera {
    pub fn new(probe: &CameraProbe) -> Self {
        Self {
            probe: probe.clone(),
            width: 64,
            height: 48,
            denied: false,
        }
    }

    /// Stream that never reports dimensions
    pub fn warming_up(probe: &CameraProbe) -> Self {
        Self {
            width: 0,
            height: 0,
            ..Self::new(probe)
        }
    }

    pub fn denied(probe: &CameraProbe) -> Self {
        Self {
            denied: true,
            ..Self::new(probe)
        }
    }
}

struct FakeStream {
    probe: CameraProbe,
    width: u32,
    height: u32,
}

impl VideoStream for FakeStream {
    fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn current_frame(&mut self) -> Option<Frame> {
        Some(Frame {
            width: self.width,
            height: self.height,
            rgb: vec![200; (self.width * self.height * 3) as usize],
        })
    }

    fn stop(&mut self) {
        self.probe.stops.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl CameraDevice for FakeCamera {
    async fn open_stream(&self) -> Result<Box<dyn VideoStream>, CaptureError> {
        if self.denied {
            return Err(CaptureError::CaptureUnavailable("permission denied".to_string()));
        }
        self.probe.opens.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakeStream {
            probe: self.probe.clone(),
            width: self.width,
            height: self.height,
        }))
    }
}

// ============================================================================
// Backend
// ============================================================================

type Reply = Result<RawReply, ApiError>;

pub fn reply(status: u16, body: &str) -> Reply {
    Ok(RawReply {
        status,
        body: body.to_string(),
    })
}

pub fn pending() -> Reply {
    reply(200, r#"{"status":"pending"}"#)
}

pub fn registered(name: &str, reg_no: &str) -> Reply {
    reply(
        200,
        &serde_json::json!({
            "status": "registered",
            "data": {"name": name, "reg_no": reg_no, "timestamp": "2025-03-04T09:12:00Z"}
        })
        .to_string(),
    )
}

/// Backend answering from queued replies
///
/// An empty status queue answers `pending`; an empty registration queue
/// answers 500.
#[derive(Default)]
pub struct ScriptedBackend {
    registrations: Mutex<VecDeque<Reply>>,
    statuses: Mutex<VecDeque<Reply>>,
    delay: Duration,
    register_calls: AtomicU32,
    status_calls: AtomicU32,
    in_flight: AtomicU32,
    max_in_flight: AtomicU32,
    last_form: Mutex<Option<RegistrationForm>>,
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every call takes `delay` before answering
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn with_registration(self, reply: Reply) -> Self {
        self.registrations.lock().unwrap().push_back(reply);
        self
    }

    pub fn with_statuses(self, replies: impl IntoIterator<Item = Reply>) -> Self {
        self.statuses.lock().unwrap().extend(replies);
        self
    }

    pub fn register_calls(&self) -> u32 {
        self.register_calls.load(Ordering::SeqCst)
    }

    pub fn status_calls(&self) -> u32 {
        self.status_calls.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> u32 {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn last_form(&self) -> Option<RegistrationForm> {
        self.last_form.lock().unwrap().clone()
    }

    async fn answer(&self, next: Reply) -> Reply {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        next
    }
}

#[async_trait]
impl AttendanceBackend for ScriptedBackend {
    async fn register_attendance(&self, form: &RegistrationForm) -> Result<RawReply, ApiError> {
        self.register_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_form.lock().unwrap() = Some(form.clone());
        let next = self
            .registrations
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| reply(500, "{}"));
        self.answer(next).await
    }

    async fn attendance_status(&self, _event_id: &str, _reg_no: &str) -> Result<RawReply, ApiError> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        let next = self
            .statuses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(pending);
        self.answer(next).await
    }
}

// ============================================================================
// Wizard
// ============================================================================

pub fn venue() -> GeoCoordinate {
    GeoCoordinate::new(13.0827, 80.2707).unwrap()
}

pub fn memory_store() -> Arc<dyn KeyValueStore> {
    Arc::new(MemoryStore::new())
}

pub fn wizard(
    camera: FakeCamera,
    store: &Arc<dyn KeyValueStore>,
) -> RegistrationWizard<FakeCamera, FixedPositionSource> {
    RegistrationWizard::new(
        camera,
        FixedPositionSource::new(venue()),
        PositionOptions::default(),
        Arc::clone(store),
    )
}

/// Drive a wizard to the submit step with registration number `reg_no`
pub async fn complete<P: geoattend_kiosk::capture::PositionSource>(
    wizard: &mut RegistrationWizard<FakeCamera, P>,
    reg_no: &str,
) {
    assert!(!wizard.set_registration_id(reg_no).is_blocked());
    assert!(!wizard.next().await.is_blocked());
    assert!(!wizard.capture_photo().is_blocked());
    assert!(!wizard.next().await.is_blocked());
    assert!(!wizard.locate().await.is_blocked());
    assert!(!wizard.next().await.is_blocked());
}

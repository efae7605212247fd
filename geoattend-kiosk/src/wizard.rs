//! Registration wizard
//!
//! Identify → Capture → Locate → Submit, with backward moves
//! Capture → Identify and Locate → Capture (Submit → Locate when the user
//! wants to change the location before sending).
//!
//! The wizard owns the camera for its whole lifetime. Leaving Capture in
//! either direction releases the stream before the next step's entry logic
//! runs. Guard failures leave the step unchanged and set an inline message.

use crate::capture::{
    CameraAdapter, CameraDevice, CaptureError, CapturedImage, GeolocationAdapter,
    GeolocationError, PositionOptions, PositionSource,
};
use geoattend_common::geo::CoordinateError;
use geoattend_common::store::{KeyValueStore, PersistentKey, REGISTRATION_ID_KEY};
use geoattend_common::GeoCoordinate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Last registration identifier, kept across visits
pub const REGISTRATION_ID: PersistentKey<String> = PersistentKey::new(REGISTRATION_ID_KEY);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WizardStep {
    #[default]
    Identify,
    Capture,
    Locate,
    Submit,
}

impl fmt::Display for WizardStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            WizardStep::Identify => "identify",
            WizardStep::Capture => "capture",
            WizardStep::Locate => "locate",
            WizardStep::Submit => "submit",
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RegistrationDraft {
    pub registration_id: String,
    pub captured_image: Option<CapturedImage>,
    pub coordinates: Option<GeoCoordinate>,
    pub current_step: WizardStep,
}

impl RegistrationDraft {
    pub fn is_complete(&self) -> bool {
        !self.registration_id.trim().is_empty()
            && self.captured_image.is_some()
            && self.coordinates.is_some()
    }
}

/// Result of one user action
#[derive(Debug, Clone, PartialEq)]
pub enum StepResult {
    Moved { from: WizardStep, to: WizardStep },
    /// Draft changed, step unchanged
    Updated,
    /// Guard failed; the message is also shown inline
    Blocked(String),
}

impl StepResult {
    pub fn is_blocked(&self) -> bool {
        matches!(self, StepResult::Blocked(_))
    }
}

pub struct RegistrationWizard<C, P> {
    draft: RegistrationDraft,
    camera: CameraAdapter<C>,
    geolocation: GeolocationAdapter<P>,
    position_options: PositionOptions,
    store: Arc<dyn KeyValueStore>,
    message: Option<String>,
    geolocation_failed: bool,
}

impl<C: CameraDevice, P: PositionSource> RegistrationWizard<C, P> {
    /// Start at Identify, pre-filling the identifier remembered from a
    /// previous visit
    pub fn new(
        camera: C,
        position_source: P,
        position_options: PositionOptions,
        store: Arc<dyn KeyValueStore>,
    ) -> Self {
        let registration_id = match REGISTRATION_ID.load(store.as_ref()) {
            Ok(saved) => saved.unwrap_or_default(),
            Err(e) => {
                warn!("Could not read saved registration number: {}", e);
                String::new()
            }
        };

        Self {
            draft: RegistrationDraft {
                registration_id,
                ..RegistrationDraft::default()
            },
            camera: CameraAdapter::new(camera),
            geolocation: GeolocationAdapter::new(position_source),
            position_options,
            store,
            message: None,
            geolocation_failed: false,
        }
    }

    pub fn draft(&self) -> &RegistrationDraft {
        &self.draft
    }

    pub fn step(&self) -> WizardStep {
        self.draft.current_step
    }

    /// Inline message for the current step
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn set_message(&mut self, message: impl Into<String>) {
        self.message = Some(message.into());
    }

    pub fn camera(&self) -> &CameraAdapter<C> {
        &self.camera
    }

    /// Whether the last location request failed, so manual entry should be offered
    pub fn manual_entry_suggested(&self) -> bool {
        self.geolocation_failed
    }

    pub fn set_registration_id(&mut self, registration_id: impl Into<String>) -> StepResult {
        if self.step() != WizardStep::Identify {
            return self.block("The registration number can only be changed on the first step");
        }
        self.draft.registration_id = registration_id.into();
        self.message = None;
        StepResult::Updated
    }

    /// Advance one step if the current step's guard holds
    pub async fn next(&mut self) -> StepResult {
        match self.step() {
            WizardStep::Identify => {
                let registration_id = self.draft.registration_id.trim().to_string();
                if registration_id.is_empty() {
                    return self.block("Please enter your registration number");
                }
                self.draft.registration_id = registration_id;
                if let Err(e) = REGISTRATION_ID.save(self.store.as_ref(), &self.draft.registration_id) {
                    warn!("Could not remember registration number: {}", e);
                }
                let moved = self.move_to(WizardStep::Capture);
                self.enter_capture().await;
                moved
            }
            WizardStep::Capture => {
                if self.draft.captured_image.is_none() {
                    return self.block("Please capture your photo first");
                }
                self.camera.release();
                self.move_to(WizardStep::Locate)
            }
            WizardStep::Locate => {
                if self.draft.coordinates.is_none() {
                    return self.block("Please share your location or enter it manually");
                }
                self.move_to(WizardStep::Submit)
            }
            WizardStep::Submit => self.block("Registration is ready to submit"),
        }
    }

    /// Step back if the current step allows it
    pub async fn back(&mut self) -> StepResult {
        match self.step() {
            WizardStep::Identify => self.block("Already at the first step"),
            WizardStep::Capture => {
                self.camera.release();
                self.move_to(WizardStep::Identify)
            }
            WizardStep::Locate => {
                self.draft.captured_image = None;
                let moved = self.move_to(WizardStep::Capture);
                self.enter_capture().await;
                moved
            }
            WizardStep::Submit => self.move_to(WizardStep::Locate),
        }
    }

    /// Take the still from the live stream
    pub fn capture_photo(&mut self) -> StepResult {
        if self.step() != WizardStep::Capture {
            return self.block("Photos can only be taken on the capture step");
        }
        match self.camera.capture_frame() {
            Ok(image) => {
                debug!(bytes = image.bytes.len(), "Photo accepted");
                self.draft.captured_image = Some(image);
                self.message = None;
                StepResult::Updated
            }
            Err(e) => self.block(e.to_string()),
        }
    }

    /// Discard the photo and reopen the camera
    pub async fn retake(&mut self) -> StepResult {
        if self.step() != WizardStep::Capture {
            return self.block("Photos can only be retaken on the capture step");
        }
        self.draft.captured_image = None;
        self.message = None;
        match self.acquire_camera().await {
            Ok(()) => StepResult::Updated,
            Err(message) => StepResult::Blocked(message),
        }
    }

    /// Ask the device for the current position
    pub async fn locate(&mut self) -> StepResult {
        if self.step() != WizardStep::Locate {
            return self.block("Location can only be requested on the location step");
        }
        match self
            .geolocation
            .current_coordinate(&self.position_options)
            .await
        {
            Ok(coordinate) => {
                info!(%coordinate, "Location acquired");
                self.accept_coordinate(coordinate)
            }
            Err(e) => {
                self.geolocation_failed = true;
                warn!("Location request failed: {}", e);
                self.block(location_hint(&e))
            }
        }
    }

    /// Manual fallback when geolocation fails
    pub fn set_manual_coordinates(&mut self, lat: f64, lng: f64) -> StepResult {
        if self.step() != WizardStep::Locate {
            return self.block("Location can only be entered on the location step");
        }
        match GeoCoordinate::new(lat, lng) {
            Ok(coordinate) => {
                info!(%coordinate, "Location entered manually");
                self.accept_coordinate(coordinate)
            }
            Err(e) => self.block(coordinate_hint(&e)),
        }
    }

    /// Move back to Capture after a failed verification
    pub async fn return_to_capture(&mut self) -> StepResult {
        if self.step() == WizardStep::Identify {
            return self.block("Enter your registration number first");
        }
        let from = self.step();
        self.draft.captured_image = None;
        self.draft.current_step = WizardStep::Capture;
        self.message = None;
        self.enter_capture().await;
        StepResult::Moved {
            from,
            to: WizardStep::Capture,
        }
    }

    /// Release the camera; the wizard may be dropped afterwards
    pub fn teardown(&mut self) {
        if self.camera.release() {
            debug!("Wizard torn down with camera held");
        }
    }

    fn accept_coordinate(&mut self, coordinate: GeoCoordinate) -> StepResult {
        self.draft.coordinates = Some(coordinate);
        self.geolocation_failed = false;
        self.message = None;
        StepResult::Updated
    }

    fn move_to(&mut self, to: WizardStep) -> StepResult {
        let from = self.draft.current_step;
        self.draft.current_step = to;
        self.message = None;
        debug!(%from, %to, "Wizard step changed");
        StepResult::Moved { from, to }
    }

    async fn enter_capture(&mut self) {
        if self.draft.captured_image.is_none() {
            // Failure is already shown inline
            let _ = self.acquire_camera().await;
        }
    }

    async fn acquire_camera(&mut self) -> Result<(), String> {
        self.camera.acquire().await.map_err(|e| {
            warn!("Camera acquisition failed: {}", e);
            let message = camera_hint(&e);
            self.message = Some(message.clone());
            message
        })
    }

    fn block(&mut self, message: impl Into<String>) -> StepResult {
        let message = message.into();
        self.message = Some(message.clone());
        StepResult::Blocked(message)
    }
}

fn camera_hint(error: &CaptureError) -> String {
    match error {
        CaptureError::CaptureUnavailable(_) => format!(
            "{}. Allow camera access and press retake to try again.",
            error
        ),
        other => other.to_string(),
    }
}

fn location_hint(error: &GeolocationError) -> String {
    format!("{}. You can enter your coordinates manually.", error)
}

fn coordinate_hint(error: &CoordinateError) -> String {
    format!("Invalid coordinates: {}", error)
}

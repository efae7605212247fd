//! Registration submission
//!
//! Validates a draft, sends exactly one multipart request, classifies the
//! reply into a [`SubmissionResult`] and hands that result to the
//! confirmation screen through the one-shot transfer slot.

use crate::backend::AttendanceBackend;
use crate::models::{ErrorCategory, SubmissionOutcome, SubmissionResult};
use crate::wizard::RegistrationDraft;
use geoattend_common::api::{ApiError, ImagePart, RawReply, RegisterAttendanceResponse, RegistrationForm};
use geoattend_common::store::{KeyValueStore, TransferSlot, SUBMISSION_RESULT_KEY};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

/// File name given to the selfie part
pub const IMAGE_FILE_NAME: &str = "selfie.jpg";

/// Part of a draft that must be present before submitting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DraftPart {
    RegistrationId,
    Photo,
    Location,
}

impl fmt::Display for DraftPart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DraftPart::RegistrationId => "registration number",
            DraftPart::Photo => "photo",
            DraftPart::Location => "location",
        })
    }
}

/// Client-side submission errors; raised before any network activity
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SubmissionError {
    #[error("Cannot submit yet, missing {}", join_parts(.missing))]
    IncompleteDraft { missing: Vec<DraftPart> },

    #[error("A submission is already in progress")]
    InFlight,
}

fn join_parts(parts: &[DraftPart]) -> String {
    parts
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Submission result as handed to the confirmation screen
///
/// Carries the event it was submitted for; a confirmation screen for any
/// other event treats the record as absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HandedOverResult {
    pub event_id: String,
    pub result: SubmissionResult,
}

/// Slot the submission result is handed over in
pub fn result_slot(ttl: Duration) -> TransferSlot<HandedOverResult> {
    TransferSlot::new(SUBMISSION_RESULT_KEY, ttl)
}

/// Build the multipart form, or list what the draft is missing
pub fn build_form(event_id: &str, draft: &RegistrationDraft) -> Result<RegistrationForm, SubmissionError> {
    let reg_no = draft.registration_id.trim();

    let mut missing = Vec::new();
    if reg_no.is_empty() {
        missing.push(DraftPart::RegistrationId);
    }
    if draft.captured_image.is_none() {
        missing.push(DraftPart::Photo);
    }
    if draft.coordinates.is_none() {
        missing.push(DraftPart::Location);
    }

    match (&draft.captured_image, draft.coordinates) {
        (Some(image), Some(coordinate)) if missing.is_empty() => Ok(RegistrationForm {
            event_id: event_id.to_string(),
            reg_no: reg_no.to_string(),
            coordinate,
            image: ImagePart {
                bytes: image.bytes.clone(),
                content_type: image.content_type.clone(),
                file_name: IMAGE_FILE_NAME.to_string(),
            },
        }),
        _ => Err(SubmissionError::IncompleteDraft { missing }),
    }
}

/// Classify an answered registration request
pub fn interpret_reply(reply: &RawReply, reg_no: &str) -> SubmissionResult {
    let backend_message = reply.message();

    let result = match reply.status {
        200..=299 => return interpret_success_body(&reply.body, reg_no),
        400 => SubmissionResult::failed(
            Some(ErrorCategory::InvalidInput),
            backend_message.unwrap_or_else(|| "Invalid registration details".to_string()),
        ),
        403 => SubmissionResult::failed(
            Some(ErrorCategory::VerificationFailed),
            backend_message.unwrap_or_else(|| "Verification failed, please retake your photo".to_string()),
        ),
        404 => SubmissionResult::failed(
            Some(ErrorCategory::NotFound),
            backend_message.unwrap_or_else(|| "Event or registration not found".to_string()),
        ),
        401..=499 => SubmissionResult::failed(
            Some(ErrorCategory::InvalidInput),
            backend_message.unwrap_or_else(|| format!("Request rejected ({})", reply.status)),
        ),
        500..=599 => SubmissionResult::failed(
            Some(ErrorCategory::ServerError),
            "Server error, please try again",
        ),
        other => SubmissionResult::failed(
            Some(ErrorCategory::ServerError),
            format!("Unexpected response status {}", other),
        ),
    };

    result.with_registration_id(reg_no)
}

fn interpret_success_body(body: &str, reg_no: &str) -> SubmissionResult {
    let response: RegisterAttendanceResponse = match serde_json::from_str(body) {
        Ok(response) => response,
        Err(e) => {
            warn!("Unreadable registration response: {}", e);
            return SubmissionResult::failed(None, "unexpected status").with_registration_id(reg_no);
        }
    };

    let status = response
        .status
        .as_deref()
        .map(|s| s.trim().to_ascii_lowercase());
    let outcome = match status.as_deref() {
        Some("success") => SubmissionOutcome::Success,
        Some("already_registered") => SubmissionOutcome::AlreadyRegistered,
        other => {
            warn!(status = ?other, "Unrecognized registration outcome");
            return SubmissionResult::failed(None, "unexpected status").with_registration_id(reg_no);
        }
    };

    let data = response.data.unwrap_or_default();
    let default_message = match outcome {
        SubmissionOutcome::AlreadyRegistered => "Attendance already registered",
        _ => "Attendance registered",
    };

    SubmissionResult {
        outcome,
        message: response
            .message
            .unwrap_or_else(|| default_message.to_string()),
        attendee_name: data.name,
        registration_id: Some(data.reg_no.unwrap_or_else(|| reg_no.to_string())),
        error_category: None,
    }
}

/// Classify a request that never got an answer
pub fn interpret_transport_error(error: &ApiError, reg_no: &str) -> SubmissionResult {
    match error {
        ApiError::Status { status, message } => interpret_reply(
            &RawReply {
                status: *status,
                body: serde_json::json!({ "message": message }).to_string(),
            },
            reg_no,
        ),
        other => SubmissionResult::failed(
            Some(ErrorCategory::NetworkError),
            format!("Could not reach the attendance service ({})", other),
        )
        .with_registration_id(reg_no),
    }
}

/// Releases the in-flight flag on every exit path
struct InFlightGuard<'a>(&'a AtomicBool);

impl<'a> InFlightGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Result<Self, SubmissionError> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| SubmissionError::InFlight)?;
        Ok(Self(flag))
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Sends registrations, one at a time
pub struct SubmissionClient {
    backend: Arc<dyn AttendanceBackend>,
    store: Arc<dyn KeyValueStore>,
    slot: TransferSlot<HandedOverResult>,
    in_flight: AtomicBool,
}

impl SubmissionClient {
    pub fn new(
        backend: Arc<dyn AttendanceBackend>,
        store: Arc<dyn KeyValueStore>,
        result_ttl: Duration,
    ) -> Self {
        Self {
            backend,
            store,
            slot: result_slot(result_ttl),
            in_flight: AtomicBool::new(false),
        }
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Submit a completed draft
    ///
    /// Returns the terminal result of the single request, also written to the
    /// transfer slot. A slot write failure is logged and does not change the
    /// returned result.
    pub async fn submit(
        &self,
        event_id: &str,
        draft: &RegistrationDraft,
    ) -> Result<SubmissionResult, SubmissionError> {
        let form = build_form(event_id, draft)?;
        let _guard = InFlightGuard::acquire(&self.in_flight)?;

        let attempt_id = Uuid::new_v4();
        info!(%attempt_id, event_id, reg_no = %form.reg_no, "Submitting attendance");

        let result = match self.backend.register_attendance(&form).await {
            Ok(reply) => interpret_reply(&reply, &form.reg_no),
            Err(e) => interpret_transport_error(&e, &form.reg_no),
        };

        match (result.outcome, result.error_category) {
            (SubmissionOutcome::Failed, category) => warn!(
                %attempt_id,
                ?category,
                message = %result.message,
                "Attendance submission failed"
            ),
            (outcome, _) => info!(%attempt_id, ?outcome, "Attendance submission accepted"),
        }

        let handed_over = HandedOverResult {
            event_id: event_id.to_string(),
            result,
        };
        if let Err(e) = self.slot.put(self.store.as_ref(), &handed_over) {
            warn!(%attempt_id, "Could not store submission result: {}", e);
        }

        Ok(handed_over.result)
    }
}

//! Attendance API request/response types
//!
//! Shapes follow the JSON the attendance backend returns. Optional fields are
//! tolerated everywhere the backend is known to omit them, and identifiers are
//! accepted as either JSON strings or integers.

use crate::geo::GeoCoordinate;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

// ========================================
// Attendee-facing types
// ========================================

/// Attendee detail attached to registration and status responses
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AttendeeData {
    #[serde(default)]
    pub name: Option<String>,

    #[serde(default, alias = "registration_id")]
    pub reg_no: Option<String>,

    #[serde(default)]
    pub timestamp: Option<String>,
}

/// Body of `POST /register_attendance`
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RegisterAttendanceResponse {
    /// Outcome string (`success`, `already_registered`, ...)
    #[serde(default)]
    pub status: Option<String>,

    #[serde(default)]
    pub message: Option<String>,

    #[serde(default)]
    pub data: Option<AttendeeData>,
}

/// Body of `GET /attendance_status/{event_id}/{reg_no}`
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AttendanceStatusResponse {
    /// `registered`, `pending` or `error`
    pub status: String,

    #[serde(default)]
    pub message: Option<String>,

    #[serde(default)]
    pub data: Option<AttendeeData>,
}

/// Event metadata for display (`GET /event/{event_id}`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventDetails {
    #[serde(alias = "event_id", deserialize_with = "string_or_number")]
    pub id: String,

    pub title: String,

    #[serde(default)]
    pub description: Option<String>,

    pub start_time: String,

    pub end_time: String,

    pub latitude: f64,

    pub longitude: f64,

    #[serde(default, alias = "radius")]
    pub radius_meters: Option<f64>,

    #[serde(default, alias = "location")]
    pub location_name: Option<String>,
}

/// Selfie attached to a registration request
#[derive(Debug, Clone, PartialEq)]
pub struct ImagePart {
    pub bytes: Vec<u8>,
    pub content_type: String,
    pub file_name: String,
}

/// Multipart fields of `POST /register_attendance`
#[derive(Debug, Clone, PartialEq)]
pub struct RegistrationForm {
    pub event_id: String,
    pub reg_no: String,
    pub coordinate: GeoCoordinate,
    pub image: ImagePart,
}

// ========================================
// Administrator-facing types
// ========================================

/// Body of `POST /create_event`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewEvent {
    pub title: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    pub start_time: DateTime<Utc>,

    pub end_time: DateTime<Utc>,

    pub latitude: f64,

    pub longitude: f64,

    pub radius_meters: f64,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub location_name: Option<String>,
}

/// Response to `POST /create_event`
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CreateEventResponse {
    #[serde(default)]
    pub status: Option<String>,

    #[serde(default)]
    pub message: Option<String>,

    #[serde(default, deserialize_with = "optional_string_or_number")]
    pub event_id: Option<String>,
}

/// Row of `GET /active_events` and `GET /past_events`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventSummary {
    #[serde(alias = "event_id", deserialize_with = "string_or_number")]
    pub id: String,

    pub title: String,

    #[serde(default)]
    pub start_time: Option<String>,

    #[serde(default)]
    pub end_time: Option<String>,

    #[serde(default, alias = "location")]
    pub location_name: Option<String>,

    #[serde(default)]
    pub attendee_count: Option<u32>,
}

/// Row of `GET /event/{event_id}/failed_attempts`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailedAttempt {
    #[serde(alias = "attempt_id", deserialize_with = "string_or_number")]
    pub id: String,

    #[serde(alias = "registration_id")]
    pub reg_no: String,

    #[serde(default)]
    pub name: Option<String>,

    #[serde(default, alias = "failure_reason")]
    pub reason: Option<String>,

    #[serde(default)]
    pub latitude: Option<f64>,

    #[serde(default)]
    pub longitude: Option<f64>,

    #[serde(default, alias = "distance")]
    pub distance_meters: Option<f64>,

    #[serde(default, alias = "timestamp")]
    pub attempted_at: Option<String>,

    #[serde(default)]
    pub status: Option<String>,
}

/// Body of `POST /admin/approve_attendance`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApprovalRequest {
    pub attempt_id: String,
    pub approved: bool,
}

/// Response to `POST /admin/approve_attendance`
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ApprovalResponse {
    #[serde(default)]
    pub status: Option<String>,

    #[serde(default)]
    pub message: Option<String>,
}

/// Downloaded attendance report
#[derive(Debug, Clone, PartialEq)]
pub struct AttendanceExport {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// List endpoints answer either a bare array or an object wrapping one
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum ListEnvelope<T> {
    Bare(Vec<T>),
    Wrapped {
        #[serde(alias = "events", alias = "attempts", alias = "results")]
        data: Vec<T>,
    },
}

impl<T> ListEnvelope<T> {
    pub(crate) fn into_vec(self) -> Vec<T> {
        match self {
            ListEnvelope::Bare(items) => items,
            ListEnvelope::Wrapped { data } => data,
        }
    }
}

// ========================================
// Error bodies
// ========================================

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    detail: Option<serde_json::Value>,
    #[serde(default)]
    error: Option<serde_json::Value>,
}

/// Pull a human-readable message out of an error body
///
/// Looks at `message`, then `detail`, then `error`; falls back to the raw
/// body when it is short plain text.
pub fn extract_message(body: &str) -> Option<String> {
    fn as_text(value: &serde_json::Value) -> Option<String> {
        match value {
            serde_json::Value::String(s) => Some(s.clone()),
            serde_json::Value::Object(map) => map
                .get("message")
                .and_then(|m| m.as_str())
                .map(str::to_string),
            serde_json::Value::Null => None,
            other => Some(other.to_string()),
        }
    }

    if let Ok(parsed) = serde_json::from_str::<ErrorBody>(body) {
        return parsed
            .message
            .or_else(|| parsed.detail.as_ref().and_then(as_text))
            .or_else(|| parsed.error.as_ref().and_then(as_text))
            .filter(|m| !m.trim().is_empty());
    }

    let trimmed = body.trim();
    if !trimmed.is_empty() && trimmed.len() <= 200 && !trimmed.starts_with('<') {
        Some(trimmed.to_string())
    } else {
        None
    }
}

// ========================================
// Serde helpers
// ========================================

#[derive(Deserialize)]
#[serde(untagged)]
enum StringOrNumber {
    String(String),
    Int(i64),
    Float(f64),
}

impl From<StringOrNumber> for String {
    fn from(value: StringOrNumber) -> Self {
        match value {
            StringOrNumber::String(s) => s,
            StringOrNumber::Int(n) => n.to_string(),
            StringOrNumber::Float(n) => n.to_string(),
        }
    }
}

fn string_or_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    StringOrNumber::deserialize(deserializer).map(String::from)
}

fn optional_string_or_number<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<String>, D::Error> {
    Option::<StringOrNumber>::deserialize(deserializer).map(|v| v.map(String::from))
}

// ========================================
// Tests
// ========================================

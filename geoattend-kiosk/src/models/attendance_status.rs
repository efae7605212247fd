//! Attendance status as reported by the backend

use geoattend_common::api::{AttendanceStatusResponse, AttendeeData};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttendanceState {
    Pending,
    Registered,
    Error,
}

impl AttendanceState {
    /// Case-insensitive backend status string; `None` when unrecognized
    pub fn parse(status: &str) -> Option<Self> {
        match status.trim().to_ascii_lowercase().as_str() {
            "pending" => Some(AttendanceState::Pending),
            "registered" => Some(AttendanceState::Registered),
            "error" => Some(AttendanceState::Error),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttendeeInfo {
    pub name: String,
    pub registration_id: String,
    pub timestamp: Option<String>,
}

impl AttendeeInfo {
    /// Fill gaps in backend data with the identifier that was queried
    pub fn from_data(data: Option<&AttendeeData>, queried_reg_no: &str) -> Self {
        let data = data.cloned().unwrap_or_default();
        Self {
            name: data.name.unwrap_or_default(),
            registration_id: data
                .reg_no
                .filter(|r| !r.trim().is_empty())
                .unwrap_or_else(|| queried_reg_no.to_string()),
            timestamp: data.timestamp,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AttendanceStatus {
    pub state: AttendanceState,
    pub attendee: Option<AttendeeInfo>,
    pub message: Option<String>,
}

impl AttendanceStatus {
    /// Interpret a status body; `None` for an unrecognized status string
    pub fn from_response(response: &AttendanceStatusResponse, queried_reg_no: &str) -> Option<Self> {
        let state = AttendanceState::parse(&response.status)?;
        let attendee = match state {
            AttendanceState::Registered => {
                Some(AttendeeInfo::from_data(response.data.as_ref(), queried_reg_no))
            }
            _ => None,
        };
        Some(Self {
            state,
            attendee,
            message: response.message.clone(),
        })
    }
}

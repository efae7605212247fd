//! Attendance API access shared by the kiosk and the dashboard
//!
//! # Design Principle
//!
//! This module contains ONLY:
//! - Wire types for the backend's JSON and multipart contracts
//! - A thin `reqwest` client that performs one request per call
//!
//! Interpreting outcomes (retake, poll again, show error) belongs to the
//! front-end crates.

pub mod client;
pub mod types;

pub use client::{ApiClient, ApiError, RawReply};
pub use types::{
    extract_message, ApprovalRequest, ApprovalResponse, AttendanceExport,
    AttendanceStatusResponse, AttendeeData, CreateEventResponse, EventDetails, EventSummary,
    FailedAttempt, ImagePart, NewEvent, RegisterAttendanceResponse, RegistrationForm,
};

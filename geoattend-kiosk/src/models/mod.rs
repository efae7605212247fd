//! Data models for geoattend-kiosk

pub mod attendance_status;
pub mod submission_result;

pub use attendance_status::{AttendanceState, AttendanceStatus, AttendeeInfo};
pub use submission_result::{ErrorCategory, SubmissionOutcome, SubmissionResult};

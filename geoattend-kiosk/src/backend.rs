//! Attendee-facing backend calls
//!
//! The submission client and status poller talk to the backend through this
//! trait so they can be driven by scripted replies in tests.

use async_trait::async_trait;
use geoattend_common::api::{ApiClient, ApiError, RawReply, RegistrationForm};

#[async_trait]
pub trait AttendanceBackend: Send + Sync {
    /// One multipart registration request; the reply is returned unread
    async fn register_attendance(&self, form: &RegistrationForm) -> Result<RawReply, ApiError>;

    async fn attendance_status(&self, event_id: &str, reg_no: &str) -> Result<RawReply, ApiError>;
}

#[async_trait]
impl AttendanceBackend for ApiClient {
    async fn register_attendance(&self, form: &RegistrationForm) -> Result<RawReply, ApiError> {
        ApiClient::register_attendance(self, form).await
    }

    async fn attendance_status(&self, event_id: &str, reg_no: &str) -> Result<RawReply, ApiError> {
        ApiClient::attendance_status(self, event_id, reg_no).await
    }
}

//! HTTP client for the attendance API
//!
//! One `reqwest::Client` per front end. The attendee-facing calls that need
//! status-code interpretation (`register_attendance`, `attendance_status`)
//! return the raw reply; everything else decodes JSON and turns non-2xx
//! answers into [`ApiError::Status`].

use super::types::{
    extract_message, ApprovalRequest, ApprovalResponse, AttendanceExport, CreateEventResponse,
    EventDetails, EventSummary, FailedAttempt, ListEnvelope, NewEvent, RegistrationForm,
};
use crate::config::ApiConfig;
use reqwest::multipart::{Form, Part};
use reqwest::{StatusCode, Url};
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::debug;

const USER_AGENT: &str = concat!("geoattend/", env!("CARGO_PKG_VERSION"));

/// Attendance API client errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ApiError {
    /// Connection refused, DNS failure, timeout, body read failure
    #[error("Network error: {0}")]
    Network(String),

    /// Backend answered with a non-success status
    #[error("API error {status}: {message}")]
    Status { status: u16, message: String },

    /// Success status but the body did not match the expected shape
    #[error("Parse error: {0}")]
    Decode(String),

    #[error("Invalid API URL: {0}")]
    InvalidUrl(String),
}

impl ApiError {
    /// HTTP status, when the backend answered at all
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Status code and body of an answered request
#[derive(Debug, Clone, PartialEq)]
pub struct RawReply {
    pub status: u16,
    pub body: String,
}

impl RawReply {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Backend message from the body, if any
    pub fn message(&self) -> Option<String> {
        extract_message(&self.body)
    }
}

/// Attendance API client
#[derive(Debug, Clone)]
pub struct ApiClient {
    http_client: reqwest::Client,
    base_url: Url,
}

impl ApiClient {
    pub fn new(config: &ApiConfig) -> Result<Self, ApiError> {
        let base_url = Url::parse(config.base_url.trim())
            .map_err(|e| ApiError::InvalidUrl(format!("{}: {}", config.base_url, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(ApiError::InvalidUrl(config.base_url.clone()));
        }

        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| ApiError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            base_url,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Join percent-encoded path segments onto the base URL
    pub fn endpoint(&self, segments: &[&str]) -> Result<Url, ApiError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ApiError::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    // ========================================
    // Attendee endpoints
    // ========================================

    /// `POST /register_attendance` (multipart)
    ///
    /// Exactly one request; never retried here.
    pub async fn register_attendance(&self, form: &RegistrationForm) -> Result<RawReply, ApiError> {
        let url = self.endpoint(&["register_attendance"])?;

        let image = Part::bytes(form.image.bytes.clone())
            .file_name(form.image.file_name.clone())
            .mime_str(&form.image.content_type)
            .map_err(|e| ApiError::Decode(format!("Invalid image content type: {}", e)))?;

        let multipart = Form::new()
            .text("event_id", form.event_id.clone())
            .text("reg_no", form.reg_no.clone())
            .text("latitude", form.coordinate.lat().to_string())
            .text("longitude", form.coordinate.lng().to_string())
            .part("image", image);

        debug!(
            event_id = %form.event_id,
            reg_no = %form.reg_no,
            image_bytes = form.image.bytes.len(),
            "Submitting attendance registration"
        );

        let response = self
            .http_client
            .post(url)
            .multipart(multipart)
            .send()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;

        read_raw(response).await
    }

    /// `GET /attendance_status/{event_id}/{reg_no}`
    pub async fn attendance_status(&self, event_id: &str, reg_no: &str) -> Result<RawReply, ApiError> {
        let url = self.endpoint(&["attendance_status", event_id, reg_no])?;
        debug!(event_id, reg_no, "Querying attendance status");

        let response = self
            .http_client
            .get(url)
            .send()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;

        read_raw(response).await
    }

    /// `GET /event/{event_id}`
    pub async fn event(&self, event_id: &str) -> Result<EventDetails, ApiError> {
        self.get_json(&["event", event_id]).await
    }

    // ========================================
    // Administrator endpoints
    // ========================================

    /// `POST /create_event`
    pub async fn create_event(&self, event: &NewEvent) -> Result<CreateEventResponse, ApiError> {
        let url = self.endpoint(&["create_event"])?;
        let response = self
            .http_client
            .post(url)
            .json(event)
            .send()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;
        decode_json(response).await
    }

    /// `GET /active_events`
    pub async fn active_events(&self) -> Result<Vec<EventSummary>, ApiError> {
        let envelope: ListEnvelope<EventSummary> = self.get_json(&["active_events"]).await?;
        Ok(envelope.into_vec())
    }

    /// `GET /past_events`
    pub async fn past_events(&self) -> Result<Vec<EventSummary>, ApiError> {
        let envelope: ListEnvelope<EventSummary> = self.get_json(&["past_events"]).await?;
        Ok(envelope.into_vec())
    }

    /// `GET /event/{event_id}/failed_attempts`
    pub async fn failed_attempts(&self, event_id: &str) -> Result<Vec<FailedAttempt>, ApiError> {
        let envelope: ListEnvelope<FailedAttempt> =
            self.get_json(&["event", event_id, "failed_attempts"]).await?;
        Ok(envelope.into_vec())
    }

    /// `POST /admin/approve_attendance`
    pub async fn approve_attendance(
        &self,
        request: &ApprovalRequest,
    ) -> Result<ApprovalResponse, ApiError> {
        let url = self.endpoint(&["admin", "approve_attendance"])?;
        let response = self
            .http_client
            .post(url)
            .json(request)
            .send()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;
        decode_json(response).await
    }

    /// `GET /event/{event_id}/attendance/download`
    pub async fn download_attendance(&self, event_id: &str) -> Result<AttendanceExport, ApiError> {
        let url = self.endpoint(&["event", event_id, "attendance", "download"])?;
        let response = self
            .http_client
            .get(url)
            .send()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(status_error(status, response).await);
        }

        let headers = response.headers().clone();
        let content_type = headers
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("text/csv")
            .to_string();
        let file_name = headers
            .get(reqwest::header::CONTENT_DISPOSITION)
            .and_then(|v| v.to_str().ok())
            .and_then(attachment_file_name)
            .unwrap_or_else(|| format!("attendance_{}.csv", event_id));

        let bytes = response
            .bytes()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;

        Ok(AttendanceExport {
            file_name,
            content_type,
            bytes: bytes.to_vec(),
        })
    }

    async fn get_json<T: DeserializeOwned>(&self, segments: &[&str]) -> Result<T, ApiError> {
        let url = self.endpoint(segments)?;
        debug!(%url, "GET");
        let response = self
            .http_client
            .get(url)
            .send()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;
        decode_json(response).await
    }
}

async fn read_raw(response: reqwest::Response) -> Result<RawReply, ApiError> {
    let status = response.status().as_u16();
    let body = response
        .text()
        .await
        .map_err(|e| ApiError::Network(e.to_string()))?;
    Ok(RawReply { status, body })
}

async fn status_error(status: StatusCode, response: reqwest::Response) -> ApiError {
    let body = response.text().await.unwrap_or_default();
    let message = extract_message(&body).unwrap_or_else(|| {
        status
            .canonical_reason()
            .unwrap_or("Unexpected status")
            .to_string()
    });
    ApiError::Status {
        status: status.as_u16(),
        message,
    }
}

async fn decode_json<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ApiError> {
    let status = response.status();
    if !status.is_success() {
        return Err(status_error(status, response).await);
    }
    let body = response
        .text()
        .await
        .map_err(|e| ApiError::Network(e.to_string()))?;
    serde_json::from_str(&body).map_err(|e| ApiError::Decode(e.to_string()))
}

/// File name from a `Content-Disposition: attachment; filename=...` header
fn attachment_file_name(header: &str) -> Option<String> {
    header
        .split(';')
        .map(str::trim)
        .find_map(|part| part.strip_prefix("filename="))
        .map(|name| name.trim_matches('"').to_string())
        .filter(|name| !name.is_empty() && !name.contains(['/', '\\']))
}

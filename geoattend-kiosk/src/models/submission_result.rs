//! Terminal result of one registration submission
//!
//! Serialized into the one-shot transfer slot so the confirmation screen can
//! show it without another request.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionOutcome {
    Success,
    AlreadyRegistered,
    Failed,
}

/// Why a submission failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// 400 or other 4xx
    InvalidInput,
    /// 403: face or location check rejected
    VerificationFailed,
    /// 404: event or registration unknown
    NotFound,
    /// 5xx
    ServerError,
    /// No answer from the backend
    NetworkError,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ErrorCategory::InvalidInput => "invalid input",
            ErrorCategory::VerificationFailed => "verification failed",
            ErrorCategory::NotFound => "not found",
            ErrorCategory::ServerError => "server error",
            ErrorCategory::NetworkError => "network error",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmissionResult {
    pub outcome: SubmissionOutcome,
    pub message: String,
    #[serde(default)]
    pub attendee_name: Option<String>,
    #[serde(default)]
    pub registration_id: Option<String>,
    #[serde(default)]
    pub error_category: Option<ErrorCategory>,
}

impl SubmissionResult {
    pub fn failed(category: Option<ErrorCategory>, message: impl Into<String>) -> Self {
        Self {
            outcome: SubmissionOutcome::Failed,
            message: message.into(),
            attendee_name: None,
            registration_id: None,
            error_category: category,
        }
    }

    /// Success or already registered
    pub fn is_registered(&self) -> bool {
        matches!(
            self.outcome,
            SubmissionOutcome::Success | SubmissionOutcome::AlreadyRegistered
        )
    }

    pub fn with_registration_id(mut self, registration_id: impl Into<String>) -> Self {
        self.registration_id = Some(registration_id.into());
        self
    }
}

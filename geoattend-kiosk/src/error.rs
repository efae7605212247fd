//! Error types for geoattend-kiosk

use crate::capture::{CaptureError, GeolocationError};
use crate::submission::SubmissionError;
use geoattend_common::api::ApiError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum KioskError {
    /// Configuration, store or other shared failure
    #[error("Common error: {0}")]
    Common(#[from] geoattend_common::Error),

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Capture(#[from] CaptureError),

    #[error(transparent)]
    Geolocation(#[from] GeolocationError),

    #[error(transparent)]
    Submission(#[from] SubmissionError),
}

pub type KioskResult<T> = Result<T, KioskError>;

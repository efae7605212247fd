//! Error types for geoattend-admin

use geoattend_common::api::ApiError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AdminError {
    /// Input rejected before contacting the backend
    #[error("Invalid event: {0}")]
    Validation(String),

    /// Backend answered but reported failure in the body
    #[error("Request rejected: {0}")]
    Rejected(String),

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Common error: {0}")]
    Common(#[from] geoattend_common::Error),
}

pub type AdminResult<T> = Result<T, AdminError>;

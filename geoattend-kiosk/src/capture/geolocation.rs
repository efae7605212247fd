//! Geolocation adapter
//!
//! One position request per call. The adapter enforces the timeout itself
//! and rejects cached fixes older than the requested maximum age, so a
//! source only has to report what the device knows.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use geoattend_common::config::GeolocationConfig;
use geoattend_common::GeoCoordinate;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

const MAX_AGE_CAP_DAYS: i64 = 365;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum GeolocationError {
    #[error("Location permission denied")]
    PermissionDenied,

    #[error("Location unavailable: {0}")]
    PositionUnavailable(String),

    #[error("Location request timed out")]
    Timeout,
}

/// Parameters of one position request
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PositionOptions {
    pub high_accuracy: bool,
    pub timeout: Duration,
    /// Oldest cached fix accepted; zero demands a fix taken during the request
    pub max_age: Duration,
}

impl Default for PositionOptions {
    fn default() -> Self {
        Self {
            high_accuracy: true,
            timeout: Duration::from_secs(10),
            max_age: Duration::ZERO,
        }
    }
}

impl From<&GeolocationConfig> for PositionOptions {
    fn from(config: &GeolocationConfig) -> Self {
        Self {
            high_accuracy: true,
            timeout: config.timeout(),
            max_age: config.max_age(),
        }
    }
}

/// A fix as reported by the device
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Position {
    pub coordinate: GeoCoordinate,
    pub accuracy_m: Option<f64>,
    pub timestamp: DateTime<Utc>,
}

/// Device positioning service
#[async_trait]
pub trait PositionSource: Send + Sync {
    async fn current_position(&self, options: &PositionOptions) -> Result<Position, GeolocationError>;
}

#[async_trait]
impl<T: PositionSource + ?Sized> PositionSource for Box<T> {
    async fn current_position(&self, options: &PositionOptions) -> Result<Position, GeolocationError> {
        (**self).current_position(options).await
    }
}

#[derive(Debug)]
pub struct GeolocationAdapter<S> {
    source: S,
}

impl<S: PositionSource> GeolocationAdapter<S> {
    pub fn new(source: S) -> Self {
        Self { source }
    }

    /// Request the current coordinate
    pub async fn current_coordinate(
        &self,
        options: &PositionOptions,
    ) -> Result<GeoCoordinate, GeolocationError> {
        let requested_at = Utc::now();

        let position = tokio::time::timeout(options.timeout, self.source.current_position(options))
            .await
            .map_err(|_| {
                warn!(timeout_ms = options.timeout.as_millis() as u64, "Position request timed out");
                GeolocationError::Timeout
            })??;

        let max_age = chrono::Duration::from_std(options.max_age)
            .unwrap_or_else(|_| chrono::Duration::days(MAX_AGE_CAP_DAYS));
        let oldest_accepted = requested_at - max_age.min(chrono::Duration::days(MAX_AGE_CAP_DAYS));
        if position.timestamp < oldest_accepted {
            return Err(GeolocationError::PositionUnavailable(format!(
                "cached position from {} is older than allowed",
                position.timestamp.to_rfc3339()
            )));
        }

        debug!(
            coordinate = %position.coordinate,
            accuracy_m = position.accuracy_m,
            "Position acquired"
        );
        Ok(position.coordinate)
    }
}

// ============================================================================
// Sources
// ============================================================================

/// Reports a fixed coordinate as a fresh fix
#[derive(Debug, Clone, Copy)]
pub struct FixedPositionSource {
    coordinate: GeoCoordinate,
    accuracy_m: Option<f64>,
}

impl FixedPositionSource {
    pub fn new(coordinate: GeoCoordinate) -> Self {
        Self {
            coordinate,
            accuracy_m: None,
        }
    }

    pub fn with_accuracy(mut self, meters: f64) -> Self {
        self.accuracy_m = Some(meters);
        self
    }
}

#[async_trait]
impl PositionSource for FixedPositionSource {
    async fn current_position(&self, _options: &PositionOptions) -> Result<Position, GeolocationError> {
        Ok(Position {
            coordinate: self.coordinate,
            accuracy_m: self.accuracy_m,
            timestamp: Utc::now(),
        })
    }
}

/// Device without positioning, or with location permission withheld
#[derive(Debug, Clone)]
pub struct UnavailablePositionSource {
    error: GeolocationError,
}

impl UnavailablePositionSource {
    pub fn new(error: GeolocationError) -> Self {
        Self { error }
    }
}

#[async_trait]
impl PositionSource for UnavailablePositionSource {
    async fn current_position(&self, _options: &PositionOptions) -> Result<Position, GeolocationError> {
        Err(self.error.clone())
    }
}

//! Geographic coordinates
//!
//! A [`GeoCoordinate`] can only be constructed through validation, so any
//! value in hand is finite and within range. Produced by the geolocation
//! adapter or by manual entry.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Latitude bound in degrees
pub const MAX_LATITUDE: f64 = 90.0;

/// Longitude bound in degrees
pub const MAX_LONGITUDE: f64 = 180.0;

/// Coordinate validation errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CoordinateError {
    #[error("Latitude must be a finite number, got {0}")]
    LatitudeNotFinite(f64),

    #[error("Latitude {0} is outside [-90, 90]")]
    LatitudeOutOfRange(f64),

    #[error("Longitude must be a finite number, got {0}")]
    LongitudeNotFinite(f64),

    #[error("Longitude {0} is outside [-180, 180]")]
    LongitudeOutOfRange(f64),

    #[error("Expected \"lat,lng\", got {0:?}")]
    Malformed(String),
}

/// Validated latitude/longitude pair in decimal degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawCoordinate")]
pub struct GeoCoordinate {
    lat: f64,
    lng: f64,
}

#[derive(Deserialize)]
struct RawCoordinate {
    lat: f64,
    lng: f64,
}

impl TryFrom<RawCoordinate> for GeoCoordinate {
    type Error = CoordinateError;

    fn try_from(raw: RawCoordinate) -> Result<Self, Self::Error> {
        GeoCoordinate::new(raw.lat, raw.lng)
    }
}

impl GeoCoordinate {
    /// Validate and build a coordinate
    pub fn new(lat: f64, lng: f64) -> Result<Self, CoordinateError> {
        if !lat.is_finite() {
            return Err(CoordinateError::LatitudeNotFinite(lat));
        }
        if !(-MAX_LATITUDE..=MAX_LATITUDE).contains(&lat) {
            return Err(CoordinateError::LatitudeOutOfRange(lat));
        }
        if !lng.is_finite() {
            return Err(CoordinateError::LongitudeNotFinite(lng));
        }
        if !(-MAX_LONGITUDE..=MAX_LONGITUDE).contains(&lng) {
            return Err(CoordinateError::LongitudeOutOfRange(lng));
        }
        Ok(Self { lat, lng })
    }

    pub fn lat(&self) -> f64 {
        self.lat
    }

    pub fn lng(&self) -> f64 {
        self.lng
    }
}

impl fmt::Display for GeoCoordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.6}, {:.6}", self.lat, self.lng)
    }
}

/// Parses manual entry in the form `"lat,lng"` (whitespace tolerated)
impl FromStr for GeoCoordinate {
    type Err = CoordinateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (lat, lng) = s
            .split_once(',')
            .ok_or_else(|| CoordinateError::Malformed(s.to_string()))?;
        let lat: f64 = lat
            .trim()
            .parse()
            .map_err(|_| CoordinateError::Malformed(s.to_string()))?;
        let lng: f64 = lng
            .trim()
            .parse()
            .map_err(|_| CoordinateError::Malformed(s.to_string()))?;
        Self::new(lat, lng)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_chennai() {
        let coord = GeoCoordinate::new(13.0827, 80.2707).unwrap();
        assert_eq!(coord.lat(), 13.0827);
        assert_eq!(coord.lng(), 80.2707);
    }

    #[test]
    fn test_rejects_latitude_out_of_range() {
        assert_eq!(
            GeoCoordinate::new(91.0, 80.2707),
            Err(CoordinateError::LatitudeOutOfRange(91.0))
        );
    }

    #[test]
    fn test_rejects_longitude_out_of_range() {
        assert_eq!(
            GeoCoordinate::new(13.0827, 200.0),
            Err(CoordinateError::LongitudeOutOfRange(200.0))
        );
    }

    #[test]
    fn test_accepts_bounds() {
        assert!(GeoCoordinate::new(90.0, 180.0).is_ok());
        assert!(GeoCoordinate::new(-90.0, -180.0).is_ok());
    }

    #[test]
    fn test_rejects_non_finite() {
        assert!(matches!(
            GeoCoordinate::new(f64::NAN, 0.0),
            Err(CoordinateError::LatitudeNotFinite(_))
        ));
        assert!(matches!(
            GeoCoordinate::new(0.0, f64::INFINITY),
            Err(CoordinateError::LongitudeNotFinite(_))
        ));
    }

    #[test]
    fn test_parse_manual_entry() {
        let coord: GeoCoordinate = " 13.0827 , 80.2707 ".parse().unwrap();
        assert_eq!(coord, GeoCoordinate::new(13.0827, 80.2707).unwrap());

        assert!(matches!(
            "13.0827".parse::<GeoCoordinate>(),
            Err(CoordinateError::Malformed(_))
        ));
        assert!(matches!(
            "abc,80".parse::<GeoCoordinate>(),
            Err(CoordinateError::Malformed(_))
        ));
        assert_eq!(
            "91,80".parse::<GeoCoordinate>(),
            Err(CoordinateError::LatitudeOutOfRange(91.0))
        );
    }

    #[test]
    fn test_deserialize_validates() {
        let ok: GeoCoordinate = serde_json::from_str(r#"{"lat":13.08,"lng":80.27}"#).unwrap();
        assert_eq!(ok.lat(), 13.08);

        let bad = serde_json::from_str::<GeoCoordinate>(r#"{"lat":13.08,"lng":200.0}"#);
        assert!(bad.is_err());
    }
}

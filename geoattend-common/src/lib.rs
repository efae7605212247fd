//! # GeoAttend Common Library
//!
//! Shared code for the GeoAttend front ends including:
//! - Configuration loading and resolution
//! - Logging initialization
//! - Geographic coordinate validation
//! - API request/response types and the HTTP client
//! - The key-value store used to hand data between screens

pub mod api;
pub mod config;
pub mod error;
pub mod geo;
pub mod logging;
pub mod store;
pub mod time;

pub use error::{Error, Result};
pub use geo::GeoCoordinate;

//! Device capture adapters
//!
//! Camera and geolocation access sit behind traits so the registration
//! wizard can run against real devices, still-image files, or test doubles.

pub mod camera;
pub mod geolocation;

pub use camera::{
    CameraAdapter, CameraDevice, CaptureError, CapturedImage, Frame, StillImageCamera,
    UnavailableCamera, VideoStream,
};
pub use geolocation::{
    FixedPositionSource, GeolocationAdapter, GeolocationError, Position, PositionOptions,
    PositionSource, UnavailablePositionSource,
};

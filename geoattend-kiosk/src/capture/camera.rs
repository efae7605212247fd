//! Camera adapter
//!
//! Wraps a [`CameraDevice`] behind acquire / capture / release calls.
//! The adapter owns at most one live stream; `release` stops every track of
//! it and is safe to call any number of times.

use async_trait::async_trait;
use image::codecs::jpeg::JpegEncoder;
use image::RgbImage;
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

/// Content type of every captured still
pub const CAPTURE_CONTENT_TYPE: &str = "image/jpeg";

const DEFAULT_JPEG_QUALITY: u8 = 85;

/// Camera errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CaptureError {
    /// Permission denied or no camera support
    #[error("Camera unavailable: {0}")]
    CaptureUnavailable(String),

    /// The stream has not reported non-zero dimensions yet
    #[error("Camera not ready yet ({width}x{height}), try again in a moment")]
    FrameNotReady { width: u32, height: u32 },

    #[error("No active camera stream")]
    NoActiveStream,

    #[error("Could not encode photo: {0}")]
    Encoding(String),
}

/// One raw RGB8 video frame
#[derive(Clone, PartialEq)]
pub struct Frame {
    pub width: u32,
    pub height: u32,
    pub rgb: Vec<u8>,
}

impl fmt::Debug for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Frame")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("rgb_len", &self.rgb.len())
            .finish()
    }
}

/// A live video stream bound to a device
pub trait VideoStream: Send {
    /// Dimensions reported by the source; `(0, 0)` until the first frame
    fn dimensions(&self) -> (u32, u32);

    /// Copy of the frame currently displayed
    fn current_frame(&mut self) -> Option<Frame>;

    /// Stop all tracks
    fn stop(&mut self);
}

/// Something that can open a video stream (permission prompt included)
#[async_trait]
pub trait CameraDevice: Send + Sync {
    async fn open_stream(&self) -> Result<Box<dyn VideoStream>, CaptureError>;
}

#[async_trait]
impl<T: CameraDevice + ?Sized> CameraDevice for Box<T> {
    async fn open_stream(&self) -> Result<Box<dyn VideoStream>, CaptureError> {
        (**self).open_stream().await
    }
}

/// Encoded still image taken from exactly one frame
#[derive(Clone, PartialEq)]
pub struct CapturedImage {
    pub bytes: Vec<u8>,
    pub content_type: String,
    pub width: u32,
    pub height: u32,
}

impl fmt::Debug for CapturedImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CapturedImage")
            .field("content_type", &self.content_type)
            .field("width", &self.width)
            .field("height", &self.height)
            .field("bytes", &self.bytes.len())
            .finish()
    }
}

/// Owns the camera stream for the capture step
pub struct CameraAdapter<D> {
    device: D,
    stream: Option<Box<dyn VideoStream>>,
    jpeg_quality: u8,
    acquisitions: u32,
    releases: u32,
}

impl<D> CameraAdapter<D> {
    pub fn new(device: D) -> Self {
        Self {
            device,
            stream: None,
            jpeg_quality: DEFAULT_JPEG_QUALITY,
            acquisitions: 0,
            releases: 0,
        }
    }

    pub fn with_jpeg_quality(mut self, quality: u8) -> Self {
        self.jpeg_quality = quality.clamp(1, 100);
        self
    }

    pub fn is_active(&self) -> bool {
        self.stream.is_some()
    }

    /// Streams opened so far
    pub fn acquisitions(&self) -> u32 {
        self.acquisitions
    }

    /// Streams actually stopped so far (no-op releases are not counted)
    pub fn releases(&self) -> u32 {
        self.releases
    }

    /// Stop the held stream, if any
    ///
    /// Returns whether a stream was stopped.
    pub fn release(&mut self) -> bool {
        match self.stream.take() {
            Some(mut stream) => {
                stream.stop();
                self.releases += 1;
                debug!(releases = self.releases, "Camera stream released");
                true
            }
            None => false,
        }
    }

    /// Encode the current frame of the held stream as JPEG
    pub fn capture_frame(&mut self) -> Result<CapturedImage, CaptureError> {
        let stream = self.stream.as_mut().ok_or(CaptureError::NoActiveStream)?;

        let (width, height) = stream.dimensions();
        if width == 0 || height == 0 {
            return Err(CaptureError::FrameNotReady { width, height });
        }

        let frame = stream
            .current_frame()
            .ok_or(CaptureError::FrameNotReady { width, height })?;
        if frame.width == 0 || frame.height == 0 {
            return Err(CaptureError::FrameNotReady {
                width: frame.width,
                height: frame.height,
            });
        }

        let image = encode_jpeg(&frame, self.jpeg_quality)?;
        debug!(
            width = image.width,
            height = image.height,
            bytes = image.bytes.len(),
            "Captured still frame"
        );
        Ok(image)
    }
}

impl<D: CameraDevice> CameraAdapter<D> {
    /// Open a live stream; no-op while one is already held
    pub async fn acquire(&mut self) -> Result<(), CaptureError> {
        if self.stream.is_some() {
            return Ok(());
        }
        let stream = self.device.open_stream().await?;
        self.stream = Some(stream);
        self.acquisitions += 1;
        debug!(acquisitions = self.acquisitions, "Camera stream acquired");
        Ok(())
    }
}

impl<D> Drop for CameraAdapter<D> {
    fn drop(&mut self) {
        self.release();
    }
}

impl<D> fmt::Debug for CameraAdapter<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CameraAdapter")
            .field("active", &self.stream.is_some())
            .field("acquisitions", &self.acquisitions)
            .field("releases", &self.releases)
            .finish()
    }
}

fn encode_jpeg(frame: &Frame, quality: u8) -> Result<CapturedImage, CaptureError> {
    let rgb = RgbImage::from_raw(frame.width, frame.height, frame.rgb.clone()).ok_or_else(|| {
        CaptureError::Encoding(format!(
            "frame buffer of {} bytes does not match {}x{}",
            frame.rgb.len(),
            frame.width,
            frame.height
        ))
    })?;

    let mut bytes = Vec::new();
    rgb.write_with_encoder(JpegEncoder::new_with_quality(&mut bytes, quality))
        .map_err(|e| CaptureError::Encoding(e.to_string()))?;

    Ok(CapturedImage {
        bytes,
        content_type: CAPTURE_CONTENT_TYPE.to_string(),
        width: frame.width,
        height: frame.height,
    })
}

// ============================================================================
// Devices
// ============================================================================

/// Serves a still image file as the camera's live frame
#[derive(Debug, Clone)]
pub struct StillImageCamera {
    path: PathBuf,
}

impl StillImageCamera {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl CameraDevice for StillImageCamera {
    async fn open_stream(&self) -> Result<Box<dyn VideoStream>, CaptureError> {
        let path = self.path.clone();
        let decoded = tokio::task::spawn_blocking(move || image::open(&path))
            .await
            .map_err(|e| CaptureError::CaptureUnavailable(e.to_string()))?
            .map_err(|e| {
                CaptureError::CaptureUnavailable(format!("{}: {}", self.path.display(), e))
            })?;

        let rgb = decoded.to_rgb8();
        info!(
            path = %self.path.display(),
            width = rgb.width(),
            height = rgb.height(),
            "Opened still image camera"
        );

        Ok(Box::new(StillImageStream {
            frame: Frame {
                width: rgb.width(),
                height: rgb.height(),
                rgb: rgb.into_raw(),
            },
            stopped: false,
        }))
    }
}

struct StillImageStream {
    frame: Frame,
    stopped: bool,
}

impl VideoStream for StillImageStream {
    fn dimensions(&self) -> (u32, u32) {
        if self.stopped {
            (0, 0)
        } else {
            (self.frame.width, self.frame.height)
        }
    }

    fn current_frame(&mut self) -> Option<Frame> {
        (!self.stopped).then(|| self.frame.clone())
    }

    fn stop(&mut self) {
        self.stopped = true;
    }
}

/// Device without camera support (or with permission denied)
#[derive(Debug, Clone)]
pub struct UnavailableCamera {
    reason: String,
}

impl UnavailableCamera {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

#[async_trait]
impl CameraDevice for UnavailableCamera {
    async fn open_stream(&self) -> Result<Box<dyn VideoStream>, CaptureError> {
        Err(CaptureError::CaptureUnavailable(self.reason.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    struct SolidStream {
        width: u32,
        height: u32,
        stops: Arc<AtomicU32>,
    }

    impl VideoStream for SolidStream {
        fn dimensions(&self) -> (u32, u32) {
            (self.width, self.height)
        }

        fn current_frame(&mut self) -> Option<Frame> {
            Some(Frame {
                width: self.width,
                height: self.height,
                rgb: vec![128; (self.width * self.height * 3) as usize],
            })
        }

        fn stop(&mut self) {
            self.stops.fetch_add(1, Ordering::SeqCst);
        }
    }

    struct SolidCamera {
        width: u32,
        height: u32,
        stops: Arc<AtomicU32>,
    }

    #[async_trait]
    impl CameraDevice for SolidCamera {
        async fn open_stream(&self) -> Result<Box<dyn VideoStream>, CaptureError> {
            Ok(Box::new(SolidStream {
                width: self.width,
                height: self.height,
                stops: Arc::clone(&self.stops),
            }))
        }
    }

    fn camera(width: u32, height: u32) -> (CameraAdapter<SolidCamera>, Arc<AtomicU32>) {
        let stops = Arc::new(AtomicU32::new(0));
        let adapter = CameraAdapter::new(SolidCamera {
            width,
            height,
            stops: Arc::clone(&stops),
        });
        (adapter, stops)
    }

    #[tokio::test]
    async fn test_capture_640x480_produces_jpeg() {
        let (mut adapter, _) = camera(640, 480);
        adapter.acquire().await.unwrap();

        let image = adapter.capture_frame().unwrap();
        assert_eq!(image.content_type, "image/jpeg");
        assert_eq!((image.width, image.height), (640, 480));
        assert_eq!(&image.bytes[..2], &[0xFF, 0xD8]);
    }

    #[tokio::test]
    async fn test_zero_dimension_frame_not_ready() {
        let (mut adapter, _) = camera(0, 0);
        adapter.acquire().await.unwrap();

        assert_eq!(
            adapter.capture_frame(),
            Err(CaptureError::FrameNotReady { width: 0, height: 0 })
        );
    }

    #[test]
    fn test_capture_without_stream() {
        let (mut adapter, _) = camera(640, 480);
        assert_eq!(adapter.capture_frame(), Err(CaptureError::NoActiveStream));
    }

    #[tokio::test]
    async fn test_release_is_idempotent() {
        let (mut adapter, stops) = camera(640, 480);
        adapter.acquire().await.unwrap();
        adapter.acquire().await.unwrap();
        assert_eq!(adapter.acquisitions(), 1);

        assert!(adapter.release());
        assert!(!adapter.release());
        assert!(!adapter.release());
        assert_eq!(adapter.releases(), 1);
        assert_eq!(stops.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_drop_releases_stream() {
        let (mut adapter, stops) = camera(4, 4);
        adapter.acquire().await.unwrap();
        drop(adapter);
        assert_eq!(stops.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_unavailable_camera() {
        let mut adapter = CameraAdapter::new(UnavailableCamera::new("permission denied"));
        assert_eq!(
            adapter.acquire().await,
            Err(CaptureError::CaptureUnavailable("permission denied".to_string()))
        );
        assert!(!adapter.is_active());
    }

    #[tokio::test]
    async fn test_still_image_camera_missing_file() {
        let mut adapter = CameraAdapter::new(StillImageCamera::new("/nonexistent/selfie.jpg"));
        assert!(matches!(
            adapter.acquire().await,
            Err(CaptureError::CaptureUnavailable(_))
        ));
    }

    #[tokio::test]
    async fn test_still_image_camera_serves_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("selfie.png");
        RgbImage::from_pixel(32, 24, image::Rgb([10, 20, 30]))
            .save(&path)
            .unwrap();

        let mut adapter = CameraAdapter::new(StillImageCamera::new(&path));
        adapter.acquire().await.unwrap();
        let captured = adapter.capture_frame().unwrap();
        assert_eq!((captured.width, captured.height), (32, 24));

        adapter.release();
        assert!(!adapter.is_active());
    }
}

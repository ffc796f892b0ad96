use std::sync::Arc;

use crate::models::bracket::BracketSettings;
use crate::models::error::CaptureError;
use crate::models::photo_models::{CorrelationId, PhotoCodec, PixelFormat};
use crate::traits::delivery_delegate::PhotoCaptureDelegate;

/// Read-only photo-output capability query.
///
/// Queried fresh every time bracket settings are built.
pub trait PhotoCapabilities {
    fn raw_pixel_formats(&self) -> Vec<PixelFormat>;

    fn processed_codecs(&self) -> Vec<PhotoCodec>;

    fn preview_pixel_formats(&self) -> Vec<PixelFormat>;

    fn thumbnail_codecs(&self) -> Vec<PhotoCodec>;
}

/// Interface for platform-specific photo hardware.
///
/// Implemented by:
/// - `SimulatedCamera` (bracket-capture-sim)
/// - Future: platform camera backends
///
/// All methods are called from the session thread only.
pub trait PhotoHardware: PhotoCapabilities + Send {
    /// Acquire the device, attach its input and the photo output.
    ///
    /// Fails with `NoDeviceFound`, `UnableToObtainVideoInput` or `UnableToAddInputs`.
    fn configure(&mut self) -> Result<(), CaptureError>;

    fn start_stream(&mut self) -> Result<(), CaptureError>;

    fn stop_stream(&mut self) -> Result<(), CaptureError>;

    /// Request one bracketed shot sequence.
    ///
    /// Returns the correlation id every callback for this request will carry.
    /// Callbacks must be delivered asynchronously, never from inside this call.
    fn request_bracket_capture(
        &mut self,
        settings: &BracketSettings,
        delegate: Arc<dyn PhotoCaptureDelegate>,
    ) -> Result<CorrelationId, CaptureError>;
}

/// Capability set captured as plain values.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CapabilitySnapshot {
    pub raw_pixel_formats: Vec<PixelFormat>,
    pub processed_codecs: Vec<PhotoCodec>,
    pub preview_pixel_formats: Vec<PixelFormat>,
    pub thumbnail_codecs: Vec<PhotoCodec>,
}

impl CapabilitySnapshot {
    pub fn of(capabilities: &dyn PhotoCapabilities) -> Self {
        Self {
            raw_pixel_formats: capabilities.raw_pixel_formats(),
            processed_codecs: capabilities.processed_codecs(),
            preview_pixel_formats: capabilities.preview_pixel_formats(),
            thumbnail_codecs: capabilities.thumbnail_codecs(),
        }
    }
}

impl PhotoCapabilities for CapabilitySnapshot {
    fn raw_pixel_formats(&self) -> Vec<PixelFormat> {
        self.raw_pixel_formats.clone()
    }

    fn processed_codecs(&self) -> Vec<PhotoCodec> {
        self.processed_codecs.clone()
    }

    fn preview_pixel_formats(&self) -> Vec<PixelFormat> {
        self.preview_pixel_formats.clone()
    }

    fn thumbnail_codecs(&self) -> Vec<PhotoCodec> {
        self.thumbnail_codecs.clone()
    }
}

use thiserror::Error;

use super::photo_models::{CorrelationId, PhotoVariant};

/// Errors surfaced by the bracket capture core.
///
/// Every variant is a plain value so it can travel through the error channel
/// to any number of observers. None of them is fatal to the process.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CaptureError {
    #[error("no capture device found")]
    NoDeviceFound,

    #[error("unable to obtain video input")]
    UnableToObtainVideoInput,

    #[error("unable to add inputs to the capture session")]
    UnableToAddInputs,

    #[error("RAW capture is not supported by this device")]
    RawUnsupported,

    #[error("unable to prepare bracket settings: {0}")]
    UnableToPrepareBracketSettings(String),

    #[error("photo delivered with no active capture")]
    ProcessedPhotoWithNoActiveCapture,

    #[error("session is not running")]
    SessionNotRunning,

    #[error("a capture is already in progress")]
    CaptureInProgress,

    #[error("capture request failed: {0}")]
    CaptureRequestFailed(String),

    #[error("sequence position {position} out of range for {expected} slots")]
    SequencePositionOutOfRange { position: u32, expected: usize },

    #[error("{variant} delivery for position {position} failed: {cause}")]
    PhotoDeliveryFailed {
        position: u32,
        variant: PhotoVariant,
        cause: String,
    },

    #[error("capture {id} sequence finished with error: {cause}")]
    SequenceFailed { id: CorrelationId, cause: String },

    #[error("capture {0} timed out before the sequence finished")]
    CaptureTimedOut(CorrelationId),

    #[error("persistence failed: {0}")]
    PersistenceFailed(String),

    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("capture session unavailable: {0}")]
    SessionUnavailable(String),
}

impl CaptureError {
    /// Whether this error means the session never reached `running`.
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            Self::NoDeviceFound | Self::UnableToObtainVideoInput | Self::UnableToAddInputs | Self::RawUnsupported
        )
    }
}

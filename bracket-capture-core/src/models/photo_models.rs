use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Hardware-assigned identifier binding asynchronous delivery events to one capture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CorrelationId(pub u64);

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Four-character pixel format code (e.g. `bgg4` for Bayer RAW, `BGRA` for previews).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PixelFormat(pub u32);

impl PixelFormat {
    pub const fn from_fourcc(code: &[u8; 4]) -> Self {
        Self(u32::from_be_bytes(*code))
    }

    pub fn fourcc(&self) -> [u8; 4] {
        self.0.to_be_bytes()
    }
}

impl fmt::Display for PixelFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let code = self.fourcc();
        if code.iter().all(|b| b.is_ascii_graphic() || *b == b' ') {
            write!(f, "{}", String::from_utf8_lossy(&code))
        } else {
            write!(f, "0x{:08x}", self.0)
        }
    }
}

/// Codec for processed (non-RAW) photos.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PhotoCodec {
    Hevc,
    Jpeg,
    Other(String),
}

impl PhotoCodec {
    /// File extension used when the encoded bytes are written to disk.
    pub fn file_extension(&self) -> &str {
        match self {
            Self::Hevc => "heic",
            Self::Jpeg => "jpg",
            Self::Other(_) => "bin",
        }
    }
}

impl fmt::Display for PhotoCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Hevc => f.write_str("hevc"),
            Self::Jpeg => f.write_str("jpeg"),
            Self::Other(name) => f.write_str(name),
        }
    }
}

/// Which of the two per-slot variants a delivery fills.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PhotoVariant {
    Raw,
    Processed,
}

impl fmt::Display for PhotoVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Raw => f.write_str("raw"),
            Self::Processed => f.write_str("processed"),
        }
    }
}

/// Image orientation, resolved from the EXIF/TIFF orientation tag at the hardware boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Orientation {
    Up,
    UpMirrored,
    Down,
    DownMirrored,
    LeftMirrored,
    Right,
    RightMirrored,
    Left,
}

impl Orientation {
    /// Maps the EXIF orientation value (1-8). Anything else is unknown.
    pub fn from_exif(value: u32) -> Option<Self> {
        match value {
            1 => Some(Self::Up),
            2 => Some(Self::UpMirrored),
            3 => Some(Self::Down),
            4 => Some(Self::DownMirrored),
            5 => Some(Self::LeftMirrored),
            6 => Some(Self::Right),
            7 => Some(Self::RightMirrored),
            8 => Some(Self::Left),
            _ => None,
        }
    }

    pub fn exif_value(&self) -> u32 {
        match self {
            Self::Up => 1,
            Self::UpMirrored => 2,
            Self::Down => 3,
            Self::DownMirrored => 4,
            Self::LeftMirrored => 5,
            Self::Right => 6,
            Self::RightMirrored => 7,
            Self::Left => 8,
        }
    }
}

/// Preview bytes as handed over by the hardware, before validation.
#[derive(Debug, Clone, PartialEq)]
pub struct PreviewPayload {
    pub width: u32,
    pub height: u32,
    pub pixel_format: PixelFormat,
    pub orientation: Option<Orientation>,
    pub data: Vec<u8>,
}

impl PreviewPayload {
    /// Converts into an owned preview if the payload is usable.
    ///
    /// Empty buffers, zero dimensions and a missing orientation all yield `None`.
    pub fn decode(self) -> Option<PreviewImage> {
        if self.data.is_empty() || self.width == 0 || self.height == 0 {
            return None;
        }
        let orientation = self.orientation?;
        Some(PreviewImage {
            width: self.width,
            height: self.height,
            pixel_format: self.pixel_format,
            orientation,
            data: Arc::from(self.data),
        })
    }
}

/// Decoded preview attached to an aggregate.
#[derive(Debug, Clone, PartialEq)]
pub struct PreviewImage {
    pub width: u32,
    pub height: u32,
    pub pixel_format: PixelFormat,
    pub orientation: Orientation,
    pub data: Arc<[u8]>,
}

/// One photo buffer delivered by the hardware for a single slot and variant.
///
/// All fields are owned. The hardware object it was extracted from is never
/// retained past the callback.
#[derive(Debug, Clone, PartialEq)]
pub struct PhotoDelivery {
    pub correlation_id: CorrelationId,
    /// 1-based hardware sequence counter.
    pub sequence_position: u32,
    pub variant: PhotoVariant,
    pub payload: Vec<u8>,
    pub codec: Option<PhotoCodec>,
    pub exposure_bias: Option<f32>,
    pub preview: Option<PreviewPayload>,
    pub error: Option<String>,
}

impl PhotoDelivery {
    pub fn new(correlation_id: CorrelationId, sequence_position: u32, variant: PhotoVariant, payload: Vec<u8>) -> Self {
        Self {
            correlation_id,
            sequence_position,
            variant,
            payload,
            codec: None,
            exposure_bias: None,
            preview: None,
            error: None,
        }
    }

    pub fn with_codec(mut self, codec: PhotoCodec) -> Self {
        self.codec = Some(codec);
        self
    }

    pub fn with_exposure_bias(mut self, bias: f32) -> Self {
        self.exposure_bias = Some(bias);
        self
    }

    pub fn with_preview(mut self, preview: PreviewPayload) -> Self {
        self.preview = Some(preview);
        self
    }

    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }
}

/// Diagnostics for debugging capture sessions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionDiagnostics {
    pub captures_requested: u64,
    pub captures_acknowledged: u64,
    pub captures_completed: u64,
    pub captures_timed_out: u64,
    pub captures_abandoned: u64,
    pub deliveries_merged: u64,
    pub deliveries_dropped: u64,
    pub persistence_dispatched: u64,
}

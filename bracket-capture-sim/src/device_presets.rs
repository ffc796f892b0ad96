//! Capability sets of typical photo hardware.

use bracket_capture_core::models::photo_models::{PhotoCodec, PixelFormat};
use bracket_capture_core::traits::photo_hardware::CapabilitySnapshot;

/// Bayer RAW, 14-bit packed.
pub const BAYER_RAW: PixelFormat = PixelFormat::from_fourcc(b"bgg4");
pub const BGRA_PREVIEW: PixelFormat = PixelFormat::from_fourcc(b"BGRA");

/// Hardware models the simulator can impersonate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DevicePreset {
    /// RAW, HEVC and JPEG, previews and thumbnails.
    ProRawPhone,
    /// RAW with JPEG only.
    LegacyRawPhone,
    /// RAW and HEVC without preview or thumbnail support.
    BareSensor,
    /// No RAW formats at all.
    ProcessedOnly,
}

impl DevicePreset {
    pub fn capabilities(&self) -> CapabilitySnapshot {
        match self {
            Self::ProRawPhone => CapabilitySnapshot {
                raw_pixel_formats: vec![BAYER_RAW],
                processed_codecs: vec![PhotoCodec::Hevc, PhotoCodec::Jpeg],
                preview_pixel_formats: vec![BGRA_PREVIEW],
                thumbnail_codecs: vec![PhotoCodec::Jpeg],
            },
            Self::LegacyRawPhone => CapabilitySnapshot {
                raw_pixel_formats: vec![BAYER_RAW],
                processed_codecs: vec![PhotoCodec::Jpeg],
                preview_pixel_formats: vec![BGRA_PREVIEW],
                thumbnail_codecs: vec![PhotoCodec::Jpeg],
            },
            Self::BareSensor => CapabilitySnapshot {
                raw_pixel_formats: vec![BAYER_RAW],
                processed_codecs: vec![PhotoCodec::Hevc],
                preview_pixel_formats: vec![],
                thumbnail_codecs: vec![],
            },
            Self::ProcessedOnly => CapabilitySnapshot {
                raw_pixel_formats: vec![],
                processed_codecs: vec![PhotoCodec::Hevc, PhotoCodec::Jpeg],
                preview_pixel_formats: vec![BGRA_PREVIEW],
                thumbnail_codecs: vec![PhotoCodec::Jpeg],
            },
        }
    }
}

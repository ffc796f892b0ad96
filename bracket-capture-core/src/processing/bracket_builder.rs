//! Builds immutable bracket settings from a photo-output capability query.

use crate::models::bracket::BracketSettings;
use crate::models::error::CaptureError;
use crate::models::photo_models::PhotoCodec;
use crate::traits::photo_hardware::PhotoCapabilities;

/// Processed codecs in order of preference.
const PREFERRED_PROCESSED_CODECS: [PhotoCodec; 2] = [PhotoCodec::Hevc, PhotoCodec::Jpeg];

/// Produce bracket settings for the given capabilities and exposure biases.
///
/// RAW and a preferred processed codec are required. Preview and thumbnail
/// formats are attached when offered and silently skipped otherwise.
pub fn build_bracket_settings(
    capabilities: &dyn PhotoCapabilities,
    exposure_biases: &[f32],
) -> Result<BracketSettings, CaptureError> {
    if exposure_biases.is_empty() {
        return Err(CaptureError::UnableToPrepareBracketSettings(
            "no exposure biases".into(),
        ));
    }

    let raw_pixel_format = capabilities
        .raw_pixel_formats()
        .first()
        .copied()
        .ok_or(CaptureError::RawUnsupported)?;

    let offered = capabilities.processed_codecs();
    let processed_codec = PREFERRED_PROCESSED_CODECS
        .iter()
        .find(|codec| offered.contains(codec))
        .cloned()
        .ok_or(CaptureError::UnableToObtainVideoInput)?;

    let preview_pixel_format = capabilities.preview_pixel_formats().first().copied();

    let thumbnails = capabilities.thumbnail_codecs();
    let thumbnail_codec = if thumbnails.contains(&PhotoCodec::Jpeg) {
        Some(PhotoCodec::Jpeg)
    } else {
        thumbnails.into_iter().next()
    };

    Ok(BracketSettings {
        raw_pixel_format,
        processed_codec,
        exposure_biases: exposure_biases.to_vec(),
        preview_pixel_format,
        thumbnail_codec,
    })
}

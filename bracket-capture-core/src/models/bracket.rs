use serde::{Deserialize, Serialize};

use super::photo_models::{PhotoCodec, PixelFormat};

/// Exposure biases for one bracket: under, normal, over.
pub const DEFAULT_EXPOSURE_BIASES: [f32; 3] = [-2.0, 0.0, 2.0];

/// Immutable description of one bracketed RAW+processed capture request.
///
/// Rebuilt before every request so capability changes are always honored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BracketSettings {
    pub raw_pixel_format: PixelFormat,
    pub processed_codec: PhotoCodec,
    pub exposure_biases: Vec<f32>,
    pub preview_pixel_format: Option<PixelFormat>,
    pub thumbnail_codec: Option<PhotoCodec>,
}

impl BracketSettings {
    /// Nominal number of exposures. The hardware's acknowledged count wins.
    pub fn nominal_count(&self) -> usize {
        self.exposure_biases.len()
    }
}

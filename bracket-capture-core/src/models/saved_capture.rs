use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::photo_models::{CorrelationId, Orientation, PhotoVariant};

/// Result returned when a directory store has written a completed capture.
#[derive(Debug, Clone, PartialEq)]
pub struct SavedCapture {
    pub directory: PathBuf,
    pub metadata_path: PathBuf,
    pub metadata: CaptureMetadata,
}

/// Metadata stored alongside a saved capture.
///
/// Serializable for the JSON sidecar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptureMetadata {
    pub id: String,
    pub correlation_id: CorrelationId,
    pub expected_count: usize,
    pub created_at: String,
    pub saved_at: String,
    pub files: Vec<SavedFile>,
    pub preview_orientation: Option<Orientation>,
}

impl CaptureMetadata {
    pub fn files_for(&self, variant: PhotoVariant) -> impl Iterator<Item = &SavedFile> {
        self.files.iter().filter(move |f| f.variant == variant)
    }
}

/// One variant written to disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedFile {
    pub position: u32,
    pub variant: PhotoVariant,
    pub file_name: String,
    pub size_bytes: u64,
    pub sha256: String,
    pub exposure_bias: Option<f32>,
}

use std::fs;
use std::path::{Path, PathBuf};

use crate::models::error::CaptureError;
use crate::models::saved_capture::CaptureMetadata;

/// Name of the JSON sidecar inside every capture directory.
pub const METADATA_FILE_NAME: &str = "capture.metadata.json";

pub fn metadata_path(capture_dir: &Path) -> PathBuf {
    capture_dir.join(METADATA_FILE_NAME)
}

/// Write capture metadata as a JSON sidecar file.
pub fn write_metadata(metadata: &CaptureMetadata, capture_dir: &Path) -> Result<PathBuf, CaptureError> {
    let path = metadata_path(capture_dir);
    let json = serde_json::to_string_pretty(metadata)
        .map_err(|e| CaptureError::PersistenceFailed(format!("failed to serialize metadata: {}", e)))?;
    fs::write(&path, json)
        .map_err(|e| CaptureError::PersistenceFailed(format!("failed to write metadata: {}", e)))?;
    Ok(path)
}

/// Read capture metadata from a capture directory.
pub fn read_metadata(capture_dir: &Path) -> Result<CaptureMetadata, CaptureError> {
    let json = fs::read_to_string(metadata_path(capture_dir))
        .map_err(|e| CaptureError::PersistenceFailed(format!("failed to read metadata: {}", e)))?;
    let metadata: CaptureMetadata = serde_json::from_str(&json)
        .map_err(|e| CaptureError::PersistenceFailed(format!("failed to parse metadata: {}", e)))?;
    Ok(metadata)
}

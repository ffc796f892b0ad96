use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;

use bracket_capture_core::storage::metadata::{metadata_path, read_metadata};
use bracket_capture_core::PhotoVariant;

/// Info about a saved capture, read back from its metadata sidecar.
#[derive(Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptureInfo {
    pub directory: String,
    pub correlation_id: u64,
    pub raw_files: usize,
    pub processed_files: usize,
    pub size_bytes: u64,
    pub created_at: String,
}

pub fn captures_dir() -> PathBuf {
    dirs_next::picture_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("Bracket Captures")
}

pub fn list_captures(dir: &Path) -> Result<Vec<CaptureInfo>, String> {
    let mut captures = Vec::new();

    let entries = fs::read_dir(dir).map_err(|e| e.to_string())?;
    for entry in entries.flatten() {
        let path = entry.path();

        // Only capture directories carry a sidecar
        if !metadata_path(&path).is_file() {
            continue;
        }

        let metadata = match read_metadata(&path) {
            Ok(m) => m,
            Err(e) => {
                log::warn!("skipping {}: {}", path.display(), e);
                continue;
            }
        };

        captures.push(CaptureInfo {
            directory: path.to_string_lossy().to_string(),
            correlation_id: metadata.correlation_id.0,
            raw_files: metadata.files_for(PhotoVariant::Raw).count(),
            processed_files: metadata.files_for(PhotoVariant::Processed).count(),
            size_bytes: metadata.files.iter().map(|f| f.size_bytes).sum(),
            created_at: metadata.created_at,
        });
    }

    // Sort newest first
    captures.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    Ok(captures)
}

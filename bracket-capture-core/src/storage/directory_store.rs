use std::fs;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

use crate::models::aggregate::{CaptureAggregate, CapturedPhoto};
use crate::models::error::CaptureError;
use crate::models::photo_models::PhotoVariant;
use crate::models::saved_capture::{CaptureMetadata, SavedCapture, SavedFile};
use crate::storage::metadata;
use crate::traits::capture_store::CaptureStore;

/// Capture store writing one directory per capture.
///
/// ## Layout
///
/// ```text
/// <root>/capture-<correlation id>-<timestamp>/
///     slot-1.dng            RAW variant
///     slot-1.heic           processed variant (extension follows the codec)
///     ...
///     capture.metadata.json sizes, SHA-256 checksums, exposure biases
/// ```
///
/// Empty slots are skipped. The sidecar is written last, so a directory
/// without one is an interrupted save.
#[derive(Debug, Clone)]
pub struct DirectoryStore {
    root: PathBuf,
}

impl DirectoryStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Write every present variant and the metadata sidecar.
    pub fn write_capture(&self, aggregate: &CaptureAggregate) -> Result<SavedCapture, CaptureError> {
        let directory = self.root.join(format!(
            "capture-{}-{}",
            aggregate.id().0,
            aggregate.created_at().format("%Y%m%dT%H%M%S%.3f")
        ));
        fs::create_dir_all(&directory)
            .map_err(|e| CaptureError::PersistenceFailed(format!("failed to create directory: {}", e)))?;

        let mut files = Vec::new();
        for (index, slot) in aggregate.entries().iter().enumerate() {
            let position = index as u32 + 1;
            for variant in [PhotoVariant::Raw, PhotoVariant::Processed] {
                if let Some(photo) = slot.get(variant) {
                    files.push(write_photo(&directory, position, variant, photo)?);
                }
            }
        }

        let metadata = CaptureMetadata {
            id: uuid::Uuid::new_v4().to_string(),
            correlation_id: aggregate.id(),
            expected_count: aggregate.expected_count(),
            created_at: aggregate.created_at().to_rfc3339(),
            saved_at: chrono::Utc::now().to_rfc3339(),
            files,
            preview_orientation: aggregate.preview_image().map(|p| p.orientation),
        };
        let metadata_path = metadata::write_metadata(&metadata, &directory)?;

        Ok(SavedCapture {
            directory,
            metadata_path,
            metadata,
        })
    }
}

impl CaptureStore for DirectoryStore {
    fn save(&self, aggregate: &CaptureAggregate) -> Result<(), CaptureError> {
        let saved = self.write_capture(aggregate)?;
        log::info!(
            "wrote {} files for capture {} to {}",
            saved.metadata.files.len(),
            aggregate.id(),
            saved.directory.display()
        );
        Ok(())
    }
}

fn write_photo(
    directory: &Path,
    position: u32,
    variant: PhotoVariant,
    photo: &CapturedPhoto,
) -> Result<SavedFile, CaptureError> {
    let extension = match variant {
        PhotoVariant::Raw => "dng",
        PhotoVariant::Processed => photo.codec.as_ref().map(|c| c.file_extension()).unwrap_or("bin"),
    };
    let file_name = format!("slot-{}.{}", position, extension);

    fs::write(directory.join(&file_name), &photo.data)
        .map_err(|e| CaptureError::PersistenceFailed(format!("failed to write {}: {}", file_name, e)))?;

    Ok(SavedFile {
        position,
        variant,
        file_name,
        size_bytes: photo.data.len() as u64,
        sha256: hex_encode(&Sha256::digest(&photo.data)),
        exposure_bias: photo.exposure_bias,
    })
}

fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::photo_models::{CorrelationId, Orientation, PhotoCodec, PhotoDelivery, PixelFormat, PreviewPayload};

    fn temp_root(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("bracket_capture_test_{}_{}", name, uuid::Uuid::new_v4()))
    }

    fn aggregate() -> CaptureAggregate {
        let id = CorrelationId(42);
        let mut aggregate = CaptureAggregate::new(id, 3);
        aggregate
            .merge(PhotoDelivery::new(id, 1, PhotoVariant::Raw, vec![1; 10]).with_exposure_bias(-2.0))
            .unwrap();
        aggregate
            .merge(
                PhotoDelivery::new(id, 1, PhotoVariant::Processed, vec![2; 5])
                    .with_codec(PhotoCodec::Hevc)
                    .with_preview(PreviewPayload {
                        width: 1,
                        height: 1,
                        pixel_format: PixelFormat::from_fourcc(b"BGRA"),
                        orientation: Some(Orientation::Left),
                        data: vec![0; 4],
                    }),
            )
            .unwrap();
        aggregate
            .merge(PhotoDelivery::new(id, 3, PhotoVariant::Processed, b"abc".to_vec()).with_codec(PhotoCodec::Jpeg))
            .unwrap();
        aggregate.mark_complete();
        aggregate
    }

    #[test]
    fn writes_present_variants_and_sidecar() {
        let root = temp_root("layout");
        let store = DirectoryStore::new(&root);

        let saved = store.write_capture(&aggregate()).unwrap();

        assert!(saved.directory.starts_with(store.root()));
        let names: Vec<_> = saved.metadata.files.iter().map(|f| f.file_name.as_str()).collect();
        assert_eq!(names, vec!["slot-1.dng", "slot-1.heic", "slot-3.jpg"]);
        assert_eq!(fs::read(saved.directory.join("slot-1.dng")).unwrap(), vec![1; 10]);
        assert_eq!(saved.metadata.files[0].exposure_bias, Some(-2.0));
        assert_eq!(saved.metadata.expected_count, 3);
        assert_eq!(saved.metadata.preview_orientation, Some(Orientation::Left));
        assert_eq!(saved.metadata.files_for(PhotoVariant::Processed).count(), 2);

        // SHA-256 of "abc"
        assert_eq!(
            saved.metadata.files[2].sha256,
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );

        fs::remove_dir_all(&root).ok();
    }

    #[test]
    fn sidecar_round_trips() {
        let root = temp_root("sidecar");
        let store = DirectoryStore::new(&root);

        let saved = store.write_capture(&aggregate()).unwrap();
        let loaded = metadata::read_metadata(&saved.directory).unwrap();

        assert_eq!(loaded, saved.metadata);
        assert_eq!(saved.metadata_path, metadata::metadata_path(&saved.directory));

        fs::remove_dir_all(&root).ok();
    }

    #[test]
    fn unwritable_root_fails_with_persistence_error() {
        let root = temp_root("blocked");
        fs::write(&root, b"not a directory").unwrap();
        let store = DirectoryStore::new(&root);

        let err = store.save(&aggregate()).unwrap_err();
        assert!(matches!(err, CaptureError::PersistenceFailed(_)));

        fs::remove_file(&root).ok();
    }

    #[test]
    fn missing_sidecar_is_an_error() {
        let root = temp_root("missing");
        fs::create_dir_all(&root).unwrap();
        assert!(metadata::read_metadata(&root).is_err());
        fs::remove_dir_all(&root).ok();
    }
}

use std::sync::Arc;

use chrono::{DateTime, Utc};

use super::error::CaptureError;
use super::photo_models::{CorrelationId, PhotoCodec, PhotoDelivery, PhotoVariant, PreviewImage};

/// Owned bytes of one delivered photo variant.
#[derive(Debug, Clone, PartialEq)]
pub struct CapturedPhoto {
    pub data: Arc<[u8]>,
    pub codec: Option<PhotoCodec>,
    pub exposure_bias: Option<f32>,
}

/// One exposure position holding up to two variants.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CaptureSlot {
    pub raw: Option<CapturedPhoto>,
    pub processed: Option<CapturedPhoto>,
}

impl CaptureSlot {
    pub fn is_empty(&self) -> bool {
        self.raw.is_none() && self.processed.is_none()
    }

    pub fn is_full(&self) -> bool {
        self.raw.is_some() && self.processed.is_some()
    }

    pub fn get(&self, variant: PhotoVariant) -> Option<&CapturedPhoto> {
        match variant {
            PhotoVariant::Raw => self.raw.as_ref(),
            PhotoVariant::Processed => self.processed.as_ref(),
        }
    }

    fn slot_mut(&mut self, variant: PhotoVariant) -> &mut Option<CapturedPhoto> {
        match variant {
            PhotoVariant::Raw => &mut self.raw,
            PhotoVariant::Processed => &mut self.processed,
        }
    }
}

/// What a successful merge changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MergeOutcome {
    /// The slot already held this variant and it was replaced.
    pub replaced: bool,
    pub preview_updated: bool,
}

/// In-memory assembly of every slot and variant belonging to one bracket capture.
///
/// Slots are pre-allocated at creation and addressed by `sequence_position - 1`,
/// so deliveries may arrive in any order. The slot count never changes.
#[derive(Debug, Clone, PartialEq)]
pub struct CaptureAggregate {
    id: CorrelationId,
    expected_count: usize,
    entries: Vec<CaptureSlot>,
    preview_image: Option<PreviewImage>,
    complete: bool,
    created_at: DateTime<Utc>,
}

impl CaptureAggregate {
    pub fn new(id: CorrelationId, expected_count: usize) -> Self {
        Self {
            id,
            expected_count,
            entries: vec![CaptureSlot::default(); expected_count],
            preview_image: None,
            complete: false,
            created_at: Utc::now(),
        }
    }

    pub fn id(&self) -> CorrelationId {
        self.id
    }

    pub fn expected_count(&self) -> usize {
        self.expected_count
    }

    pub fn entries(&self) -> &[CaptureSlot] {
        &self.entries
    }

    pub fn preview_image(&self) -> Option<&PreviewImage> {
        self.preview_image.as_ref()
    }

    pub fn is_complete(&self) -> bool {
        self.complete
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Number of slots with both variants present.
    pub fn filled_slots(&self) -> usize {
        self.entries.iter().filter(|s| s.is_full()).count()
    }

    /// Merge one delivery into its slot.
    ///
    /// Redelivery of the same `(position, variant)` replaces the earlier payload.
    /// A decodable preview replaces the current one (last writer wins).
    pub fn merge(&mut self, delivery: PhotoDelivery) -> Result<MergeOutcome, CaptureError> {
        if self.complete || delivery.correlation_id != self.id {
            return Err(CaptureError::ProcessedPhotoWithNoActiveCapture);
        }

        let position = delivery.sequence_position;
        let index = self.slot_index(position)?;

        if let Some(cause) = delivery.error {
            return Err(CaptureError::PhotoDeliveryFailed {
                position,
                variant: delivery.variant,
                cause,
            });
        }

        let photo = CapturedPhoto {
            data: Arc::from(delivery.payload),
            codec: delivery.codec,
            exposure_bias: delivery.exposure_bias,
        };
        let replaced = self.entries[index].slot_mut(delivery.variant).replace(photo).is_some();

        let preview = delivery.preview.and_then(|p| p.decode());
        let preview_updated = preview.is_some();
        if preview_updated {
            self.preview_image = preview;
        }

        Ok(MergeOutcome {
            replaced,
            preview_updated,
        })
    }

    /// Mark the sequence finished. Empty slots do not block completion.
    pub fn mark_complete(&mut self) {
        self.complete = true;
    }

    fn slot_index(&self, position: u32) -> Result<usize, CaptureError> {
        let out_of_range = CaptureError::SequencePositionOutOfRange {
            position,
            expected: self.expected_count,
        };
        let index = usize::try_from(position)
            .ok()
            .and_then(|p| p.checked_sub(1))
            .ok_or_else(|| out_of_range.clone())?;
        if index >= self.entries.len() {
            return Err(out_of_range);
        }
        Ok(index)
    }
}

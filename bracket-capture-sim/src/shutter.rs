//! Simulated shutter sequence.
//!
//! Runs on its own thread per request and calls the delegate the way photo
//! hardware does: acknowledge, one delivery per position and variant, finish.

use std::collections::HashMap;
use std::sync::Arc;
use std::thread;

use bracket_capture_core::models::bracket::BracketSettings;
use bracket_capture_core::models::photo_models::{
    CorrelationId, Orientation, PhotoDelivery, PhotoVariant, PreviewPayload,
};
use bracket_capture_core::traits::delivery_delegate::PhotoCaptureDelegate;

use crate::script::{DeliveryOrder, DeliveryScript};

/// EXIF orientation the simulated sensor reports (6 = rotated 90° clockwise).
const SENSOR_EXIF_ORIENTATION: u32 = 6;
const PREVIEW_WIDTH: u32 = 4;
const PREVIEW_HEIGHT: u32 = 3;

pub(crate) struct ShotPlan {
    pub id: CorrelationId,
    pub settings: BracketSettings,
    pub script: DeliveryScript,
}

/// Resolve the orientation entry of a hardware metadata dictionary.
pub fn resolve_orientation(metadata: &HashMap<String, u32>) -> Option<Orientation> {
    metadata.get("Orientation").copied().and_then(Orientation::from_exif)
}

pub(crate) fn run_sequence(plan: ShotPlan, delegate: Arc<dyn PhotoCaptureDelegate>) {
    let ShotPlan { id, settings, script } = plan;
    let expected = settings.nominal_count();

    pause(&script);
    delegate.on_capture_acknowledged(id, expected);

    let mut positions: Vec<u32> = (1..=expected as u32).collect();
    if script.order == DeliveryOrder::Descending {
        positions.reverse();
    }

    for position in positions {
        for variant in [PhotoVariant::Raw, PhotoVariant::Processed] {
            if script.is_dropped(position, variant) {
                log::debug!("simulated {}: dropping {} for position {}", id, variant, position);
                continue;
            }
            pause(&script);
            let mut delivery = synthesize(id, &settings, position, variant);
            if script.is_failing(position, variant) {
                delivery = delivery.with_error("simulated sensor readout failure");
            }
            delegate.on_photo_delivered(delivery);
        }
    }

    if script.withhold_finish {
        log::debug!("simulated {}: withholding sequence finish", id);
        return;
    }
    pause(&script);
    delegate.on_sequence_finished(id, None);
}

fn pause(script: &DeliveryScript) {
    if !script.delay.is_zero() {
        thread::sleep(script.delay);
    }
}

fn synthesize(id: CorrelationId, settings: &BracketSettings, position: u32, variant: PhotoVariant) -> PhotoDelivery {
    let bias = settings.exposure_biases.get(position as usize - 1).copied();

    let mut payload = match variant {
        PhotoVariant::Raw => b"II*\0".to_vec(),
        PhotoVariant::Processed => b"\0\0\0\x18ftyp".to_vec(),
    };
    payload.extend_from_slice(&id.0.to_le_bytes());
    payload.push(position as u8);

    let mut delivery = PhotoDelivery::new(id, position, variant, payload);
    if variant == PhotoVariant::Processed {
        delivery = delivery.with_codec(settings.processed_codec.clone());
    }
    if let Some(bias) = bias {
        delivery = delivery.with_exposure_bias(bias);
    }

    if let Some(pixel_format) = settings.preview_pixel_format {
        let metadata = HashMap::from([("Orientation".to_string(), SENSOR_EXIF_ORIENTATION)]);
        delivery = delivery.with_preview(PreviewPayload {
            width: PREVIEW_WIDTH,
            height: PREVIEW_HEIGHT,
            pixel_format,
            orientation: resolve_orientation(&metadata),
            data: vec![position as u8; (PREVIEW_WIDTH * PREVIEW_HEIGHT * 4) as usize],
        });
    }

    delivery
}

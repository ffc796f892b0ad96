use std::time::Duration;

use bracket_capture_core::models::error::CaptureError;
use bracket_capture_core::models::photo_models::PhotoVariant;

/// Order in which the simulated shutter walks the sequence positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeliveryOrder {
    #[default]
    Ascending,
    Descending,
}

/// How the simulated hardware behaves, including its faults.
#[derive(Debug, Clone, Default)]
pub struct DeliveryScript {
    pub order: DeliveryOrder,
    /// Pause before every callback.
    pub delay: Duration,
    /// Deliveries that never arrive.
    pub dropped: Vec<(u32, PhotoVariant)>,
    /// Deliveries that arrive carrying a hardware error.
    pub failing: Vec<(u32, PhotoVariant)>,
    /// Never signal that the sequence finished.
    pub withhold_finish: bool,
    /// Error reported by `configure()`.
    pub configure_fault: Option<CaptureError>,
    /// Reason every capture request is refused.
    pub request_fault: Option<String>,
}

impl DeliveryScript {
    pub(crate) fn is_dropped(&self, position: u32, variant: PhotoVariant) -> bool {
        self.dropped.contains(&(position, variant))
    }

    pub(crate) fn is_failing(&self, position: u32, variant: PhotoVariant) -> bool {
        self.failing.contains(&(position, variant))
    }
}

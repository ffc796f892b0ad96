use crate::models::photo_models::{CorrelationId, PhotoDelivery};

/// Delivery callbacks for one bracket capture request.
///
/// Called by the hardware subsystem on its own threads. Implementations must
/// hand the event off and return; the session's implementation only enqueues.
pub trait PhotoCaptureDelegate: Send + Sync {
    /// The hardware resolved the request and knows how many deliveries to expect.
    fn on_capture_acknowledged(&self, correlation_id: CorrelationId, expected_count: usize);

    /// One RAW or processed buffer for one sequence position.
    fn on_photo_delivered(&self, delivery: PhotoDelivery);

    /// The whole multi-shot sequence is over, whether or not every slot arrived.
    fn on_sequence_finished(&self, correlation_id: CorrelationId, error: Option<String>);
}

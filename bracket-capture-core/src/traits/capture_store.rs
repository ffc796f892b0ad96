use crate::models::aggregate::CaptureAggregate;
use crate::models::error::CaptureError;

/// Persistence boundary for completed captures.
///
/// Invoked once per completed aggregate on a worker thread, never on the
/// session thread. The core only logs and reports the result; retries are the
/// store's business.
pub trait CaptureStore: Send + Sync {
    fn save(&self, aggregate: &CaptureAggregate) -> Result<(), CaptureError>;
}

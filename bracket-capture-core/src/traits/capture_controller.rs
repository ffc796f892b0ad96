use std::sync::Arc;

use crate::models::aggregate::CaptureAggregate;
use crate::session::error_channel::ErrorReceiver;

/// UI-facing session surface.
///
/// Commands are dispatched into the session thread and return immediately.
/// Failures arrive on the error feed, not as return values.
pub trait CaptureController: Send + Sync {
    /// Configure the hardware and start streaming. Transitions: idle/stopped → configuring → running.
    fn start(&self);

    /// Request one bracket capture. Transitions: running → capturing.
    fn capture(&self);

    /// Stop the hardware stream. Transitions: running/capturing → stopped.
    fn stop(&self);

    /// Whether a capture is in flight.
    fn capturing(&self) -> bool;

    /// In-flight aggregate while capturing, otherwise the last completed one.
    fn recent_capture(&self) -> Option<Arc<CaptureAggregate>>;

    fn subscribe_errors(&self) -> ErrorReceiver;
}

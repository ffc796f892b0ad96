use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;

use crate::models::error::CaptureError;

/// Subscriber end of the error channel.
pub type ErrorReceiver = broadcast::Receiver<CaptureError>;

/// Block for the next error, skipping over notifications lost to lag.
///
/// Returns `None` once every sender is gone. Must not be called from inside an
/// async runtime.
pub fn recv_blocking(receiver: &mut ErrorReceiver) -> Option<CaptureError> {
    loop {
        match receiver.blocking_recv() {
            Ok(error) => return Some(error),
            Err(RecvError::Lagged(missed)) => log::warn!("error subscriber lagged, {} notifications lost", missed),
            Err(RecvError::Closed) => return None,
        }
    }
}

/// Fire-and-forget broadcast of capture errors.
///
/// Publishing never blocks and succeeds with zero subscribers. A subscriber
/// that falls more than `capacity` notifications behind loses the oldest ones.
#[derive(Debug, Clone)]
pub struct ErrorChannel {
    sender: broadcast::Sender<CaptureError>,
}

impl ErrorChannel {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn publish(&self, error: CaptureError) {
        log::warn!("capture error: {}", error);
        // Err only means nobody is listening.
        let _ = self.sender.send(error);
    }

    pub fn subscribe(&self) -> ErrorReceiver {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

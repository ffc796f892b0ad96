use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};

use crate::models::photo_models::{CorrelationId, PhotoDelivery};
use crate::traits::delivery_delegate::PhotoCaptureDelegate;

/// Everything that may mutate session state, in arrival order.
#[derive(Debug)]
pub(crate) enum SessionCommand {
    Start,
    Capture,
    Stop,
    Acknowledged {
        correlation_id: CorrelationId,
        expected_count: usize,
    },
    Delivered(PhotoDelivery),
    Finished {
        correlation_id: CorrelationId,
        error: Option<String>,
    },
    CompletionDeadline(CorrelationId),
    Sync(oneshot::Sender<()>),
    Shutdown,
}

/// Delegate handed to the hardware with every capture request.
///
/// Each callback becomes a command on the session queue; nothing touches
/// session state from the calling thread.
#[derive(Debug, Clone)]
pub struct DeliverySink {
    commands: mpsc::UnboundedSender<SessionCommand>,
}

impl DeliverySink {
    pub(crate) fn new(commands: mpsc::UnboundedSender<SessionCommand>) -> Self {
        Self { commands }
    }

    pub(crate) fn post(&self, command: SessionCommand) -> bool {
        match self.commands.send(command) {
            Ok(()) => true,
            Err(_) => {
                log::debug!("session closed, dropping command");
                false
            }
        }
    }

    pub fn into_delegate(self) -> Arc<dyn PhotoCaptureDelegate> {
        Arc::new(self)
    }
}

impl PhotoCaptureDelegate for DeliverySink {
    fn on_capture_acknowledged(&self, correlation_id: CorrelationId, expected_count: usize) {
        self.post(SessionCommand::Acknowledged {
            correlation_id,
            expected_count,
        });
    }

    fn on_photo_delivered(&self, delivery: PhotoDelivery) {
        self.post(SessionCommand::Delivered(delivery));
    }

    fn on_sequence_finished(&self, correlation_id: CorrelationId, error: Option<String>) {
        self.post(SessionCommand::Finished { correlation_id, error });
    }
}

use std::sync::Arc;
use std::thread;

use crate::models::aggregate::CaptureAggregate;
use crate::models::error::CaptureError;
use crate::session::error_channel::ErrorChannel;
use crate::traits::capture_store::CaptureStore;

/// Hands completed aggregates to the store off the session thread.
pub(crate) struct PersistenceDispatcher {
    store: Arc<dyn CaptureStore>,
    errors: ErrorChannel,
}

impl PersistenceDispatcher {
    pub(crate) fn new(store: Arc<dyn CaptureStore>, errors: ErrorChannel) -> Self {
        Self { store, errors }
    }

    /// Save on a short-lived worker thread. Saves for different captures are unordered.
    pub(crate) fn dispatch(&self, aggregate: Arc<CaptureAggregate>) {
        let store = Arc::clone(&self.store);
        let errors = self.errors.clone();
        let id = aggregate.id();

        let spawned = thread::Builder::new()
            .name("capture-persistence".into())
            .spawn(move || match store.save(&aggregate) {
                Ok(()) => log::info!(
                    "saved capture {} ({}/{} slots filled)",
                    id,
                    aggregate.filled_slots(),
                    aggregate.expected_count()
                ),
                Err(e) => {
                    log::error!("failed to save capture {}: {}", id, e);
                    errors.publish(as_persistence_error(e));
                }
            });

        if let Err(e) = spawned {
            log::error!("failed to spawn persistence thread for {}: {}", id, e);
            self.errors.publish(CaptureError::PersistenceFailed(format!(
                "failed to spawn persistence thread: {}",
                e
            )));
        }
    }
}

fn as_persistence_error(error: CaptureError) -> CaptureError {
    match error {
        CaptureError::PersistenceFailed(_) => error,
        other => CaptureError::PersistenceFailed(other.to_string()),
    }
}

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

use crate::models::aggregate::CaptureAggregate;
use crate::models::error::CaptureError;
use crate::traits::capture_store::CaptureStore;

/// In-memory capture store.
///
/// Keeps every saved aggregate and lets callers block until a number of saves
/// have landed. Can be told to fail, to exercise error reporting.
#[derive(Default)]
pub struct MemoryStore {
    saved: Mutex<Vec<Arc<CaptureAggregate>>>,
    saved_changed: Condvar,
    failure: Mutex<Option<String>>,
}

impl MemoryStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Make every following save fail with `cause`.
    pub fn fail_with(&self, cause: impl Into<String>) {
        *self.failure.lock() = Some(cause.into());
    }

    pub fn saved(&self) -> Vec<Arc<CaptureAggregate>> {
        self.saved.lock().clone()
    }

    /// Block until at least `count` aggregates were saved or `timeout` elapses.
    ///
    /// Returns whether the count was reached.
    pub fn wait_for_saves(&self, count: usize, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut saved = self.saved.lock();
        while saved.len() < count {
            if self.saved_changed.wait_until(&mut saved, deadline).timed_out() {
                return saved.len() >= count;
            }
        }
        true
    }
}

impl CaptureStore for MemoryStore {
    fn save(&self, aggregate: &CaptureAggregate) -> Result<(), CaptureError> {
        if let Some(cause) = self.failure.lock().clone() {
            return Err(CaptureError::PersistenceFailed(cause));
        }
        self.saved.lock().push(Arc::new(aggregate.clone()));
        self.saved_changed.notify_all();
        Ok(())
    }
}

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

use crate::models::photo_models::CorrelationId;
use crate::session::command::{DeliverySink, SessionCommand};

#[derive(Default)]
struct TimerState {
    armed: Option<(Instant, CorrelationId)>,
    shutdown: bool,
}

#[derive(Default)]
struct TimerShared {
    state: Mutex<TimerState>,
    changed: Condvar,
}

/// Completion deadline for the capture in flight.
///
/// One `capture-deadline` thread serves every capture. Arming replaces the
/// previous deadline; at most one capture is in flight at a time.
pub(crate) struct DeadlineTimer {
    shared: Arc<TimerShared>,
    handle: Option<thread::JoinHandle<()>>,
}

impl DeadlineTimer {
    pub(crate) fn spawn(sink: DeliverySink) -> std::io::Result<Self> {
        let shared = Arc::new(TimerShared::default());
        let worker = Arc::clone(&shared);
        let handle = thread::Builder::new()
            .name("capture-deadline".into())
            .spawn(move || run_timer(&worker, &sink))?;
        Ok(Self {
            shared,
            handle: Some(handle),
        })
    }

    /// Post `CompletionDeadline(id)` once `timeout` has elapsed, unless disarmed first.
    pub(crate) fn arm(&self, id: CorrelationId, timeout: Duration) {
        self.shared.state.lock().armed = Some((Instant::now() + timeout, id));
        self.shared.changed.notify_all();
    }

    pub(crate) fn disarm(&self) {
        self.shared.state.lock().armed = None;
        self.shared.changed.notify_all();
    }
}

impl Drop for DeadlineTimer {
    fn drop(&mut self) {
        self.shared.state.lock().shutdown = true;
        self.shared.changed.notify_all();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                log::error!("deadline timer thread panicked");
            }
        }
    }
}

fn run_timer(shared: &TimerShared, sink: &DeliverySink) {
    let mut state = shared.state.lock();
    while !state.shutdown {
        let armed = state.armed;
        match armed {
            None => shared.changed.wait(&mut state),
            Some((at, id)) if Instant::now() >= at => {
                state.armed = None;
                log::debug!("completion deadline reached for {}", id);
                sink.post(SessionCommand::CompletionDeadline(id));
            }
            Some((at, _)) => {
                shared.changed.wait_until(&mut state, at);
            }
        }
    }
}

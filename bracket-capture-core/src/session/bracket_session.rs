use std::sync::Arc;
use std::thread;

use parking_lot::Mutex;
use tokio::sync::{mpsc, oneshot, watch};

use crate::models::aggregate::CaptureAggregate;
use crate::models::config::SessionConfiguration;
use crate::models::error::CaptureError;
use crate::models::state::SessionSnapshot;
use crate::session::command::{DeliverySink, SessionCommand};
use crate::session::error_channel::{ErrorChannel, ErrorReceiver};
use crate::session::machine::SessionMachine;
use crate::traits::capture_controller::CaptureController;
use crate::traits::capture_store::CaptureStore;
use crate::traits::photo_hardware::PhotoHardware;

/// Bracket capture session orchestrator.
///
/// Generic over the photo hardware via the `PhotoHardware` trait. Owns one
/// session thread that runs the state machine:
/// ```text
/// [UI] start/capture/stop ─┐
///                          ├→ [command queue] → [session thread] ─→ snapshots (watch)
/// [Hardware] callbacks ────┘                         │          └→ errors (broadcast)
///                                                    └→ [persistence thread] → CaptureStore
/// ```
/// Every handle method returns immediately.
pub struct BracketSession {
    commands: mpsc::UnboundedSender<SessionCommand>,
    snapshots: watch::Receiver<SessionSnapshot>,
    errors: ErrorChannel,
    session_handle: Mutex<Option<thread::JoinHandle<()>>>,
}

impl BracketSession {
    pub fn new<H>(hardware: H, store: Arc<dyn CaptureStore>, config: SessionConfiguration) -> Result<Self, CaptureError>
    where
        H: PhotoHardware + 'static,
    {
        config.validate().map_err(CaptureError::InvalidConfiguration)?;

        let (commands, queue) = mpsc::unbounded_channel();
        let (snapshot_tx, snapshots) = watch::channel(SessionSnapshot::default());
        let errors = ErrorChannel::new(config.error_channel_capacity);
        let thread_name = config.session_thread_name.clone();

        let machine = SessionMachine::new(
            hardware,
            store,
            config,
            snapshot_tx,
            errors.clone(),
            DeliverySink::new(commands.clone()),
        );

        let handle = thread::Builder::new()
            .name(thread_name)
            .spawn(move || run_session(machine, queue))
            .map_err(|e| CaptureError::SessionUnavailable(format!("failed to spawn session thread: {}", e)))?;

        Ok(Self {
            commands,
            snapshots,
            errors,
            session_handle: Mutex::new(Some(handle)),
        })
    }

    /// Latest published state.
    pub fn snapshot(&self) -> SessionSnapshot {
        self.snapshots.borrow().clone()
    }

    /// Receiver that observes every published snapshot.
    pub fn subscribe_state(&self) -> watch::Receiver<SessionSnapshot> {
        self.snapshots.clone()
    }

    /// Delegate that feeds hardware callbacks into this session.
    pub fn delivery_sink(&self) -> DeliverySink {
        DeliverySink::new(self.commands.clone())
    }

    /// Block until every command sent before this call has been handled.
    ///
    /// Must not be called from inside an async runtime.
    pub fn sync(&self) -> Result<(), CaptureError> {
        let (done, wait) = oneshot::channel();
        self.send(SessionCommand::Sync(done))?;
        wait.blocking_recv()
            .map_err(|_| CaptureError::SessionUnavailable("session thread exited".into()))
    }

    /// Stop the hardware stream if needed and join the session thread.
    pub fn shutdown(&self) {
        let Some(handle) = self.session_handle.lock().take() else {
            return;
        };
        let _ = self.send(SessionCommand::Shutdown);
        if handle.join().is_err() {
            log::error!("session thread panicked");
        }
    }

    fn send(&self, command: SessionCommand) -> Result<(), CaptureError> {
        self.commands
            .send(command)
            .map_err(|_| CaptureError::SessionUnavailable("session thread exited".into()))
    }

    fn dispatch(&self, command: SessionCommand) {
        if let Err(e) = self.send(command) {
            self.errors.publish(e);
        }
    }
}

impl CaptureController for BracketSession {
    fn start(&self) {
        self.dispatch(SessionCommand::Start);
    }

    fn capture(&self) {
        self.dispatch(SessionCommand::Capture);
    }

    fn stop(&self) {
        self.dispatch(SessionCommand::Stop);
    }

    fn capturing(&self) -> bool {
        self.snapshots.borrow().capturing
    }

    fn recent_capture(&self) -> Option<Arc<CaptureAggregate>> {
        self.snapshots.borrow().recent_capture.clone()
    }

    fn subscribe_errors(&self) -> ErrorReceiver {
        self.errors.subscribe()
    }
}

impl Drop for BracketSession {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn run_session<H: PhotoHardware>(mut machine: SessionMachine<H>, mut queue: mpsc::UnboundedReceiver<SessionCommand>) {
    log::debug!("session thread started");
    while let Some(command) = queue.blocking_recv() {
        match command {
            SessionCommand::Sync(done) => {
                let _ = done.send(());
            }
            SessionCommand::Shutdown => {
                machine.shutdown();
                break;
            }
            other => machine.handle(other),
        }
    }
    log::debug!("session thread exiting in {:?}", machine.phase());
}

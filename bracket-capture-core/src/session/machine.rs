use std::sync::Arc;

use tokio::sync::watch;

use crate::models::aggregate::CaptureAggregate;
use crate::models::bracket::BracketSettings;
use crate::models::config::SessionConfiguration;
use crate::models::error::CaptureError;
use crate::models::photo_models::{CorrelationId, PhotoDelivery, SessionDiagnostics};
use crate::models::state::{SessionPhase, SessionSnapshot};
use crate::processing::bracket_builder::build_bracket_settings;
use crate::session::command::{DeliverySink, SessionCommand};
use crate::session::deadline::DeadlineTimer;
use crate::session::error_channel::ErrorChannel;
use crate::session::persistence::PersistenceDispatcher;
use crate::traits::capture_store::CaptureStore;
use crate::traits::photo_hardware::PhotoHardware;

/// The capture currently between request and completion.
#[derive(Debug)]
enum InFlight {
    /// Requested, waiting for the hardware to resolve it.
    Requested(CorrelationId),
    /// Acknowledged; deliveries merge into the aggregate.
    Assembling(CaptureAggregate),
}

impl InFlight {
    fn correlation_id(&self) -> CorrelationId {
        match self {
            Self::Requested(id) => *id,
            Self::Assembling(aggregate) => aggregate.id(),
        }
    }
}

/// Capture state machine. Owned by exactly one thread; every mutation is a `SessionCommand`.
pub(crate) struct SessionMachine<H: PhotoHardware> {
    hardware: H,
    config: SessionConfiguration,
    phase: SessionPhase,
    last_settings: Option<BracketSettings>,
    in_flight: Option<InFlight>,
    recent: Option<Arc<CaptureAggregate>>,
    diagnostics: SessionDiagnostics,
    snapshots: watch::Sender<SessionSnapshot>,
    errors: ErrorChannel,
    persistence: PersistenceDispatcher,
    deadline: Option<DeadlineTimer>,
    sink: DeliverySink,
}

impl<H: PhotoHardware> SessionMachine<H> {
    pub(crate) fn new(
        hardware: H,
        store: Arc<dyn CaptureStore>,
        config: SessionConfiguration,
        snapshots: watch::Sender<SessionSnapshot>,
        errors: ErrorChannel,
        sink: DeliverySink,
    ) -> Self {
        let deadline = config.completion_timeout.and_then(|_| match DeadlineTimer::spawn(sink.clone()) {
            Ok(timer) => Some(timer),
            Err(e) => {
                log::error!("failed to spawn deadline timer, captures will not time out: {}", e);
                None
            }
        });
        Self {
            hardware,
            config,
            phase: SessionPhase::Idle,
            last_settings: None,
            in_flight: None,
            recent: None,
            diagnostics: SessionDiagnostics::default(),
            snapshots,
            persistence: PersistenceDispatcher::new(store, errors.clone()),
            deadline,
            errors,
            sink,
        }
    }

    pub(crate) fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub(crate) fn handle(&mut self, command: SessionCommand) {
        match command {
            SessionCommand::Start => self.start(),
            SessionCommand::Capture => self.capture(),
            SessionCommand::Stop => self.stop(),
            SessionCommand::Acknowledged {
                correlation_id,
                expected_count,
            } => self.on_acknowledged(correlation_id, expected_count),
            SessionCommand::Delivered(delivery) => self.on_delivered(delivery),
            SessionCommand::Finished { correlation_id, error } => self.on_finished(correlation_id, error),
            SessionCommand::CompletionDeadline(id) => self.on_deadline(id),
            // Handled by the session loop.
            SessionCommand::Sync(_) | SessionCommand::Shutdown => {}
        }
    }

    /// Stop streaming before the session thread exits.
    pub(crate) fn shutdown(&mut self) {
        if self.phase.is_streaming() {
            self.stop();
        }
    }

    fn start(&mut self) {
        if !self.phase.can_start() {
            log::debug!("start ignored in {:?}", self.phase);
            return;
        }

        self.set_phase(SessionPhase::Configuring);

        match self.configure() {
            Ok(settings) => {
                log::info!(
                    "session running: raw {} / {} with {} exposures",
                    settings.raw_pixel_format,
                    settings.processed_codec,
                    settings.nominal_count()
                );
                self.last_settings = Some(settings);
                self.set_phase(SessionPhase::Running);
            }
            Err(e) => {
                log::error!("session configuration failed: {}", e);
                self.set_phase(SessionPhase::Idle);
                self.errors.publish(e);
            }
        }
    }

    fn configure(&mut self) -> Result<BracketSettings, CaptureError> {
        self.hardware.configure()?;
        let settings = build_bracket_settings(&self.hardware, &self.config.exposure_biases)?;
        self.hardware.start_stream()?;
        Ok(settings)
    }

    fn capture(&mut self) {
        match self.phase {
            SessionPhase::Running => {}
            SessionPhase::Capturing => {
                self.errors.publish(CaptureError::CaptureInProgress);
                return;
            }
            _ => {
                self.errors.publish(CaptureError::SessionNotRunning);
                return;
            }
        }

        let Some(settings) = self.fresh_settings() else {
            return;
        };

        self.diagnostics.captures_requested += 1;
        match self
            .hardware
            .request_bracket_capture(&settings, self.sink.clone().into_delegate())
        {
            Ok(id) => {
                log::debug!("requested bracket capture {}", id);
                self.in_flight = Some(InFlight::Requested(id));
                self.schedule_deadline(id);
                self.set_phase(SessionPhase::Capturing);
            }
            Err(e) => {
                let error = match e {
                    CaptureError::CaptureRequestFailed(_) => e,
                    other => CaptureError::CaptureRequestFailed(other.to_string()),
                };
                self.publish();
                self.errors.publish(error);
            }
        }
    }

    /// Rebuild settings for this request, falling back to the last good ones.
    fn fresh_settings(&mut self) -> Option<BracketSettings> {
        match build_bracket_settings(&self.hardware, &self.config.exposure_biases) {
            Ok(settings) => {
                self.last_settings = Some(settings.clone());
                Some(settings)
            }
            Err(e) => {
                let error = match e {
                    CaptureError::UnableToPrepareBracketSettings(_) => e,
                    other => CaptureError::UnableToPrepareBracketSettings(other.to_string()),
                };
                self.errors.publish(error);
                if self.last_settings.is_some() {
                    log::warn!("continuing with previous bracket settings");
                }
                self.last_settings.clone()
            }
        }
    }

    fn stop(&mut self) {
        if !self.phase.is_streaming() {
            log::debug!("stop ignored in {:?}", self.phase);
            return;
        }

        if let Some(abandoned) = self.in_flight.take() {
            log::warn!("stopping with capture {} in flight; abandoning it", abandoned.correlation_id());
            self.diagnostics.captures_abandoned += 1;
            self.disarm_deadline();
        }

        if let Err(e) = self.hardware.stop_stream() {
            self.errors.publish(e);
        }
        self.set_phase(SessionPhase::Stopped);
        log::info!("session stopped");
    }

    fn on_acknowledged(&mut self, id: CorrelationId, expected_count: usize) {
        let awaiting = matches!(self.in_flight, Some(InFlight::Requested(pending)) if pending == id);
        if !awaiting {
            log::warn!("ignoring acknowledgement for {} with no matching request", id);
            return;
        }

        log::debug!("capture {} acknowledged with {} slots", id, expected_count);
        self.in_flight = Some(InFlight::Assembling(CaptureAggregate::new(id, expected_count)));
        self.diagnostics.captures_acknowledged += 1;
        self.publish();
    }

    fn on_delivered(&mut self, delivery: PhotoDelivery) {
        let Some(InFlight::Assembling(aggregate)) = self.in_flight.as_mut() else {
            self.diagnostics.deliveries_dropped += 1;
            self.publish();
            self.errors.publish(CaptureError::ProcessedPhotoWithNoActiveCapture);
            return;
        };

        let position = delivery.sequence_position;
        let variant = delivery.variant;
        match aggregate.merge(delivery) {
            Ok(outcome) => {
                if outcome.replaced {
                    log::debug!("{} for position {} redelivered; keeping the latest", variant, position);
                }
                self.diagnostics.deliveries_merged += 1;
                self.publish();
            }
            Err(e) => {
                self.diagnostics.deliveries_dropped += 1;
                self.publish();
                self.errors.publish(e);
            }
        }
    }

    fn on_finished(&mut self, id: CorrelationId, error: Option<String>) {
        let active = self.in_flight.as_ref().map(InFlight::correlation_id) == Some(id);
        if !active {
            log::warn!("ignoring finish for {} with no matching capture", id);
            return;
        }

        if let Some(cause) = error {
            log::warn!("capture {} finished with error: {}", id, cause);
            self.errors.publish(CaptureError::SequenceFailed { id, cause });
        }

        self.disarm_deadline();
        match self.in_flight.take() {
            Some(InFlight::Assembling(aggregate)) => self.complete(aggregate),
            _ => {
                log::warn!("capture {} finished before it was acknowledged", id);
                self.set_phase(SessionPhase::Running);
            }
        }
    }

    fn on_deadline(&mut self, id: CorrelationId) {
        let matches = self.in_flight.as_ref().map(InFlight::correlation_id) == Some(id);
        if !matches {
            return;
        }

        self.diagnostics.captures_timed_out += 1;
        self.errors.publish(CaptureError::CaptureTimedOut(id));
        match self.in_flight.take() {
            Some(InFlight::Assembling(aggregate)) => self.complete(aggregate),
            _ => self.set_phase(SessionPhase::Running),
        }
    }

    fn complete(&mut self, mut aggregate: CaptureAggregate) {
        aggregate.mark_complete();
        log::info!(
            "capture {} complete: {}/{} slots filled",
            aggregate.id(),
            aggregate.filled_slots(),
            aggregate.expected_count()
        );

        let aggregate = Arc::new(aggregate);
        self.recent = Some(Arc::clone(&aggregate));
        self.diagnostics.captures_completed += 1;
        self.diagnostics.persistence_dispatched += 1;
        self.set_phase(SessionPhase::Running);

        self.persistence.dispatch(aggregate);
    }

    fn schedule_deadline(&self, id: CorrelationId) {
        if let (Some(timer), Some(timeout)) = (&self.deadline, self.config.completion_timeout) {
            timer.arm(id, timeout);
        }
    }

    fn disarm_deadline(&self) {
        if let Some(timer) = &self.deadline {
            timer.disarm();
        }
    }

    fn set_phase(&mut self, phase: SessionPhase) {
        if self.phase != phase {
            log::debug!("session phase {:?} -> {:?}", self.phase, phase);
            self.phase = phase;
        }
        self.publish();
    }

    fn publish(&self) {
        let recent_capture = match &self.in_flight {
            Some(InFlight::Assembling(aggregate)) => Some(Arc::new(aggregate.clone())),
            _ => self.recent.clone(),
        };
        self.snapshots.send_replace(SessionSnapshot {
            phase: self.phase,
            capturing: self.phase.is_capturing(),
            recent_capture,
            diagnostics: self.diagnostics.clone(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::photo_models::{Orientation, PhotoCodec, PhotoVariant, PixelFormat, PreviewPayload};
    use crate::storage::memory_store::MemoryStore;
    use crate::traits::delivery_delegate::PhotoCaptureDelegate;
    use crate::traits::photo_hardware::{CapabilitySnapshot, PhotoCapabilities};
    use parking_lot::Mutex;
    use std::time::Duration;
    use tokio::sync::{broadcast, mpsc};

    const SAVE_TIMEOUT: Duration = Duration::from_secs(5);

    #[derive(Default)]
    struct HardwareLog {
        capabilities: CapabilitySnapshot,
        configure_error: Option<CaptureError>,
        request_error: Option<CaptureError>,
        requests: Vec<BracketSettings>,
        streaming: bool,
        next_id: u64,
    }

    struct ScriptedHardware(Arc<Mutex<HardwareLog>>);

    impl PhotoCapabilities for ScriptedHardware {
        fn raw_pixel_formats(&self) -> Vec<PixelFormat> {
            self.0.lock().capabilities.raw_pixel_formats.clone()
        }

        fn processed_codecs(&self) -> Vec<PhotoCodec> {
            self.0.lock().capabilities.processed_codecs.clone()
        }

        fn preview_pixel_formats(&self) -> Vec<PixelFormat> {
            self.0.lock().capabilities.preview_pixel_formats.clone()
        }

        fn thumbnail_codecs(&self) -> Vec<PhotoCodec> {
            self.0.lock().capabilities.thumbnail_codecs.clone()
        }
    }

    impl PhotoHardware for ScriptedHardware {
        fn configure(&mut self) -> Result<(), CaptureError> {
            match self.0.lock().configure_error.clone() {
                Some(e) => Err(e),
                None => Ok(()),
            }
        }

        fn start_stream(&mut self) -> Result<(), CaptureError> {
            self.0.lock().streaming = true;
            Ok(())
        }

        fn stop_stream(&mut self) -> Result<(), CaptureError> {
            self.0.lock().streaming = false;
            Ok(())
        }

        fn request_bracket_capture(
            &mut self,
            settings: &BracketSettings,
            _delegate: Arc<dyn PhotoCaptureDelegate>,
        ) -> Result<CorrelationId, CaptureError> {
            let mut hardware = self.0.lock();
            if let Some(e) = hardware.request_error.clone() {
                return Err(e);
            }
            hardware.requests.push(settings.clone());
            hardware.next_id += 1;
            Ok(CorrelationId(hardware.next_id))
        }
    }

    fn capabilities() -> CapabilitySnapshot {
        CapabilitySnapshot {
            raw_pixel_formats: vec![PixelFormat::from_fourcc(b"bgg4")],
            processed_codecs: vec![PhotoCodec::Hevc],
            preview_pixel_formats: vec![PixelFormat::from_fourcc(b"BGRA")],
            thumbnail_codecs: vec![PhotoCodec::Jpeg],
        }
    }

    struct Harness {
        machine: SessionMachine<ScriptedHardware>,
        hardware: Arc<Mutex<HardwareLog>>,
        snapshots: watch::Receiver<SessionSnapshot>,
        errors: broadcast::Receiver<CaptureError>,
        store: Arc<MemoryStore>,
        _commands: mpsc::UnboundedReceiver<SessionCommand>,
    }

    impl Harness {
        fn new(capabilities: CapabilitySnapshot) -> Self {
            let hardware = Arc::new(Mutex::new(HardwareLog {
                capabilities,
                ..Default::default()
            }));
            let store = MemoryStore::new();
            let (snapshot_tx, snapshots) = watch::channel(SessionSnapshot::default());
            let errors = ErrorChannel::new(16);
            let error_rx = errors.subscribe();
            let (tx, rx) = mpsc::unbounded_channel();
            let config = SessionConfiguration {
                completion_timeout: None,
                ..Default::default()
            };
            let machine = SessionMachine::new(
                ScriptedHardware(Arc::clone(&hardware)),
                store.clone(),
                config,
                snapshot_tx,
                errors,
                DeliverySink::new(tx),
            );
            Self {
                machine,
                hardware,
                snapshots,
                errors: error_rx,
                store,
                _commands: rx,
            }
        }

        fn running() -> Self {
            let mut harness = Self::new(capabilities());
            harness.machine.handle(SessionCommand::Start);
            assert_eq!(harness.machine.phase(), SessionPhase::Running);
            harness
        }

        fn snapshot(&self) -> SessionSnapshot {
            self.snapshots.borrow().clone()
        }

        fn errors(&mut self) -> Vec<CaptureError> {
            let mut errors = Vec::new();
            while let Ok(e) = self.errors.try_recv() {
                errors.push(e);
            }
            errors
        }

        /// Capture and acknowledge, returning the correlation id.
        fn acknowledged_capture(&mut self, expected_count: usize) -> CorrelationId {
            self.machine.handle(SessionCommand::Capture);
            let id = CorrelationId(self.hardware.lock().next_id);
            self.machine.handle(SessionCommand::Acknowledged {
                correlation_id: id,
                expected_count,
            });
            id
        }

        fn deliver(&mut self, delivery: PhotoDelivery) {
            self.machine.handle(SessionCommand::Delivered(delivery));
        }

        fn finish(&mut self, id: CorrelationId) {
            self.machine.handle(SessionCommand::Finished {
                correlation_id: id,
                error: None,
            });
        }
    }

    fn preview(tag: u8) -> PreviewPayload {
        PreviewPayload {
            width: 2,
            height: 1,
            pixel_format: PixelFormat::from_fourcc(b"BGRA"),
            orientation: Some(Orientation::Up),
            data: vec![tag; 8],
        }
    }

    fn shot(id: CorrelationId, position: u32, variant: PhotoVariant) -> PhotoDelivery {
        PhotoDelivery::new(id, position, variant, vec![position as u8; 4]).with_preview(preview(position as u8))
    }

    #[test]
    fn start_reaches_running() {
        let mut harness = Harness::running();
        let snapshot = harness.snapshot();

        assert_eq!(snapshot.phase, SessionPhase::Running);
        assert!(!snapshot.capturing);
        assert!(snapshot.recent_capture.is_none());
        assert!(harness.hardware.lock().streaming);
        assert!(harness.errors().is_empty());
    }

    #[test]
    fn start_without_raw_support_stays_idle_with_one_error() {
        let mut harness = Harness::new(CapabilitySnapshot {
            raw_pixel_formats: vec![],
            ..capabilities()
        });

        harness.machine.handle(SessionCommand::Start);

        assert_eq!(harness.machine.phase(), SessionPhase::Idle);
        assert_eq!(harness.errors(), vec![CaptureError::RawUnsupported]);
        assert!(!harness.hardware.lock().streaming);

        harness.machine.handle(SessionCommand::Capture);
        assert_eq!(harness.errors(), vec![CaptureError::SessionNotRunning]);
        assert!(harness.hardware.lock().requests.is_empty());
        assert!(harness.snapshot().recent_capture.is_none());

        // Retry once the capability is back.
        harness.hardware.lock().capabilities = capabilities();
        harness.machine.handle(SessionCommand::Start);
        assert_eq!(harness.machine.phase(), SessionPhase::Running);
    }

    #[test]
    fn configure_failure_is_reported() {
        let mut harness = Harness::new(capabilities());
        harness.hardware.lock().configure_error = Some(CaptureError::NoDeviceFound);

        harness.machine.handle(SessionCommand::Start);

        assert_eq!(harness.snapshot().phase, SessionPhase::Idle);
        assert_eq!(harness.errors(), vec![CaptureError::NoDeviceFound]);
    }

    #[test]
    fn full_bracket_is_assembled_published_and_persisted() {
        let mut harness = Harness::running();
        harness.machine.handle(SessionCommand::Capture);
        assert!(harness.snapshot().capturing);
        // No aggregate until the hardware acknowledges.
        assert!(harness.snapshot().recent_capture.is_none());

        let id = CorrelationId(harness.hardware.lock().next_id);
        harness.machine.handle(SessionCommand::Acknowledged {
            correlation_id: id,
            expected_count: 3,
        });
        let placeholder = harness.snapshot().recent_capture.unwrap();
        assert_eq!(placeholder.entries().len(), 3);
        assert!(placeholder.entries().iter().all(|s| s.is_empty()));

        let mut merged = 0;
        for position in 1..=3 {
            for variant in [PhotoVariant::Raw, PhotoVariant::Processed] {
                harness.deliver(shot(id, position, variant));
                merged += 1;
                let snapshot = harness.snapshot();
                assert!(snapshot.capturing);
                assert_eq!(snapshot.diagnostics.deliveries_merged, merged);
                assert!(snapshot.recent_capture.unwrap().entries()[position as usize - 1]
                    .get(variant)
                    .is_some());
            }
        }

        harness.finish(id);

        let snapshot = harness.snapshot();
        assert_eq!(snapshot.phase, SessionPhase::Running);
        assert!(!snapshot.capturing);
        let recent = snapshot.recent_capture.unwrap();
        assert!(recent.is_complete());
        assert_eq!(recent.filled_slots(), 3);
        assert_eq!(recent.preview_image().unwrap().data[0], 3);

        assert!(harness.store.wait_for_saves(1, SAVE_TIMEOUT));
        let saved = harness.store.saved();
        assert_eq!(saved.len(), 1);
        assert_eq!(*saved[0], *recent);
        assert_eq!(snapshot.diagnostics.persistence_dispatched, 1);
        assert!(harness.errors().is_empty());
    }

    #[test]
    fn finish_with_empty_slots_still_completes() {
        let mut harness = Harness::running();
        let id = harness.acknowledged_capture(3);
        harness.deliver(shot(id, 2, PhotoVariant::Processed));

        harness.finish(id);

        let snapshot = harness.snapshot();
        assert!(!snapshot.capturing);
        assert!(harness.store.wait_for_saves(1, SAVE_TIMEOUT));
        let saved = &harness.store.saved()[0];
        assert!(saved.entries()[0].is_empty());
        assert!(saved.entries()[1].processed.is_some());
        assert!(saved.entries()[2].is_empty());
    }

    #[test]
    fn delivery_without_active_capture_is_rejected_once() {
        let mut harness = Harness::running();
        let id = harness.acknowledged_capture(1);
        harness.deliver(shot(id, 1, PhotoVariant::Raw));
        harness.finish(id);
        let before = harness.snapshot().recent_capture.unwrap();

        harness.deliver(shot(id, 1, PhotoVariant::Processed));

        assert_eq!(harness.errors(), vec![CaptureError::ProcessedPhotoWithNoActiveCapture]);
        let after = harness.snapshot().recent_capture.unwrap();
        assert!(Arc::ptr_eq(&before, &after));
        assert!(after.entries()[0].processed.is_none());
        assert_eq!(harness.snapshot().diagnostics.deliveries_dropped, 1);
    }

    #[test]
    fn foreign_delivery_does_not_touch_active_aggregate() {
        let mut harness = Harness::running();
        let id = harness.acknowledged_capture(3);
        let foreign = CorrelationId(id.0 + 100);

        harness.deliver(shot(foreign, 1, PhotoVariant::Raw));

        assert_eq!(harness.errors(), vec![CaptureError::ProcessedPhotoWithNoActiveCapture]);
        let current = harness.snapshot().recent_capture.unwrap();
        assert_eq!(current.id(), id);
        assert!(current.entries().iter().all(|s| s.is_empty()));
    }

    #[test]
    fn second_capture_is_rejected_while_in_flight() {
        let mut harness = Harness::running();
        let id = harness.acknowledged_capture(3);
        harness.deliver(shot(id, 1, PhotoVariant::Raw));

        harness.machine.handle(SessionCommand::Capture);

        assert_eq!(harness.errors(), vec![CaptureError::CaptureInProgress]);
        assert_eq!(harness.hardware.lock().requests.len(), 1);
        let current = harness.snapshot().recent_capture.unwrap();
        assert_eq!(current.id(), id);
        assert!(current.entries()[0].raw.is_some());

        harness.finish(id);
        harness.machine.handle(SessionCommand::Capture);
        assert!(harness.errors().is_empty());
        assert_eq!(harness.hardware.lock().requests.len(), 2);
    }

    #[test]
    fn hardware_count_overrides_nominal_count() {
        let mut harness = Harness::running();
        let id = harness.acknowledged_capture(6);
        let current = harness.snapshot().recent_capture.unwrap();
        assert_eq!(current.id(), id);
        assert_eq!(current.expected_count(), 6);
        assert_eq!(harness.hardware.lock().requests[0].nominal_count(), 3);
    }

    #[test]
    fn settings_are_rebuilt_per_capture_with_fallback() {
        let mut harness = Harness::running();
        harness.hardware.lock().capabilities.processed_codecs = vec![PhotoCodec::Jpeg];
        let id = harness.acknowledged_capture(3);
        harness.finish(id);
        assert_eq!(harness.hardware.lock().requests[0].processed_codec, PhotoCodec::Jpeg);

        harness.hardware.lock().capabilities.raw_pixel_formats.clear();
        harness.machine.handle(SessionCommand::Capture);

        let errors = harness.errors();
        assert_eq!(errors.len(), 1);
        assert!(matches!(errors[0], CaptureError::UnableToPrepareBracketSettings(_)));
        let hardware = harness.hardware.lock();
        assert_eq!(hardware.requests.len(), 2);
        assert_eq!(hardware.requests[1].processed_codec, PhotoCodec::Jpeg);
    }

    #[test]
    fn rejected_request_leaves_session_running() {
        let mut harness = Harness::running();
        harness.hardware.lock().request_error = Some(CaptureError::UnableToAddInputs);

        harness.machine.handle(SessionCommand::Capture);

        assert_eq!(harness.machine.phase(), SessionPhase::Running);
        assert_eq!(
            harness.errors(),
            vec![CaptureError::CaptureRequestFailed(CaptureError::UnableToAddInputs.to_string())]
        );
    }

    #[test]
    fn rejected_request_is_counted_in_the_published_snapshot() {
        let mut harness = Harness::running();
        harness.hardware.lock().request_error = Some(CaptureError::CaptureRequestFailed("busy".into()));

        harness.machine.handle(SessionCommand::Capture);

        assert_eq!(harness.snapshot().diagnostics.captures_requested, 1);
        assert!(!harness.snapshot().capturing);
    }

    #[test]
    fn dropped_deliveries_are_counted_in_the_published_snapshot() {
        let mut harness = Harness::running();
        let id = harness.acknowledged_capture(2);

        harness.deliver(shot(id, 5, PhotoVariant::Raw));
        assert_eq!(harness.snapshot().diagnostics.deliveries_dropped, 1);

        harness.deliver(shot(id, 1, PhotoVariant::Raw).with_error("readout"));
        assert_eq!(harness.snapshot().diagnostics.deliveries_dropped, 2);
        assert_eq!(harness.snapshot().diagnostics.deliveries_merged, 0);
    }

    #[test]
    fn sequence_error_is_reported_and_capture_still_persisted() {
        let mut harness = Harness::running();
        let id = harness.acknowledged_capture(2);
        harness.deliver(shot(id, 1, PhotoVariant::Raw));

        harness.machine.handle(SessionCommand::Finished {
            correlation_id: id,
            error: Some("thermal shutdown".into()),
        });

        assert_eq!(
            harness.errors(),
            vec![CaptureError::SequenceFailed {
                id,
                cause: "thermal shutdown".into()
            }]
        );
        let snapshot = harness.snapshot();
        assert!(!snapshot.capturing);
        assert_eq!(snapshot.diagnostics.persistence_dispatched, 1);
        assert!(harness.store.wait_for_saves(1, SAVE_TIMEOUT));
        assert!(harness.store.saved()[0].entries()[0].raw.is_some());
    }

    #[test]
    fn stray_sequence_error_is_only_logged() {
        let mut harness = Harness::running();
        let id = harness.acknowledged_capture(1);

        harness.machine.handle(SessionCommand::Finished {
            correlation_id: CorrelationId(id.0 + 7),
            error: Some("late".into()),
        });

        assert!(harness.errors().is_empty());
        assert!(harness.snapshot().capturing);
    }

    #[test]
    fn deadline_timer_completes_a_capture_without_finish() {
        let hardware = Arc::new(Mutex::new(HardwareLog {
            capabilities: capabilities(),
            ..Default::default()
        }));
        let store = MemoryStore::new();
        let (snapshot_tx, _snapshots) = watch::channel(SessionSnapshot::default());
        let errors = ErrorChannel::new(16);
        let (tx, mut rx) = mpsc::unbounded_channel();
        let config = SessionConfiguration {
            completion_timeout: Some(Duration::from_millis(30)),
            ..Default::default()
        };
        let mut machine = SessionMachine::new(
            ScriptedHardware(Arc::clone(&hardware)),
            store.clone(),
            config,
            snapshot_tx,
            errors,
            DeliverySink::new(tx),
        );
        machine.handle(SessionCommand::Start);
        machine.handle(SessionCommand::Capture);
        let id = CorrelationId(hardware.lock().next_id);
        machine.handle(SessionCommand::Acknowledged {
            correlation_id: id,
            expected_count: 3,
        });

        match rx.blocking_recv() {
            Some(command @ SessionCommand::CompletionDeadline(_)) => machine.handle(command),
            other => panic!("unexpected command: {:?}", other),
        }

        assert_eq!(machine.phase(), SessionPhase::Running);
        assert!(store.wait_for_saves(1, SAVE_TIMEOUT));
    }

    #[test]
    fn deadline_force_completes_partial_capture() {
        let mut harness = Harness::running();
        let id = harness.acknowledged_capture(3);
        harness.deliver(shot(id, 1, PhotoVariant::Raw));

        harness.machine.handle(SessionCommand::CompletionDeadline(id));

        assert_eq!(harness.errors(), vec![CaptureError::CaptureTimedOut(id)]);
        let snapshot = harness.snapshot();
        assert!(!snapshot.capturing);
        assert_eq!(snapshot.diagnostics.captures_timed_out, 1);
        assert!(harness.store.wait_for_saves(1, SAVE_TIMEOUT));

        // Stragglers for the timed-out capture are protocol violations.
        harness.deliver(shot(id, 2, PhotoVariant::Raw));
        harness.finish(id);
        assert_eq!(harness.errors(), vec![CaptureError::ProcessedPhotoWithNoActiveCapture]);
        assert_eq!(harness.store.saved().len(), 1);
    }

    #[test]
    fn deadline_after_completion_is_ignored() {
        let mut harness = Harness::running();
        let id = harness.acknowledged_capture(1);
        harness.finish(id);

        harness.machine.handle(SessionCommand::CompletionDeadline(id));

        assert!(harness.errors().is_empty());
        assert_eq!(harness.snapshot().diagnostics.captures_timed_out, 0);
    }

    #[test]
    fn deadline_before_acknowledgement_clears_capturing() {
        let mut harness = Harness::running();
        harness.machine.handle(SessionCommand::Capture);
        let id = CorrelationId(harness.hardware.lock().next_id);

        harness.machine.handle(SessionCommand::CompletionDeadline(id));

        assert!(!harness.snapshot().capturing);
        assert_eq!(harness.errors(), vec![CaptureError::CaptureTimedOut(id)]);
        assert!(!harness.store.wait_for_saves(1, Duration::from_millis(50)));
    }

    #[test]
    fn finish_before_acknowledgement_clears_capturing() {
        let mut harness = Harness::running();
        harness.machine.handle(SessionCommand::Capture);
        let id = CorrelationId(harness.hardware.lock().next_id);

        harness.finish(id);

        assert_eq!(harness.machine.phase(), SessionPhase::Running);
        assert!(harness.snapshot().recent_capture.is_none());
    }

    #[test]
    fn stray_finish_keeps_capture_in_flight() {
        let mut harness = Harness::running();
        let id = harness.acknowledged_capture(3);

        harness.finish(CorrelationId(id.0 + 1));

        assert!(harness.snapshot().capturing);
        assert_eq!(harness.snapshot().recent_capture.unwrap().id(), id);
    }

    #[test]
    fn stop_abandons_in_flight_capture() {
        let mut harness = Harness::running();
        let id = harness.acknowledged_capture(3);
        harness.deliver(shot(id, 1, PhotoVariant::Raw));

        harness.machine.handle(SessionCommand::Stop);

        let snapshot = harness.snapshot();
        assert_eq!(snapshot.phase, SessionPhase::Stopped);
        assert!(!snapshot.capturing);
        assert_eq!(snapshot.diagnostics.captures_abandoned, 1);
        assert!(!harness.hardware.lock().streaming);
        assert!(!harness.store.wait_for_saves(1, Duration::from_millis(50)));

        harness.machine.handle(SessionCommand::Start);
        assert_eq!(harness.machine.phase(), SessionPhase::Running);
    }

    #[test]
    fn persistence_failure_is_reported_on_the_channel() {
        let mut harness = Harness::running();
        harness.store.fail_with("read-only volume");
        let id = harness.acknowledged_capture(1);

        harness.finish(id);

        let error = harness.errors.blocking_recv().unwrap();
        assert_eq!(error, CaptureError::PersistenceFailed("read-only volume".into()));
        assert_eq!(harness.machine.phase(), SessionPhase::Running);
    }
}

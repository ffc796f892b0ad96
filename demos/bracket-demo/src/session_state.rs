use std::thread::{self, JoinHandle};

use serde::Serialize;

use bracket_capture_core::{
    recv_blocking, CaptureAggregate, CaptureError, ErrorReceiver, PhotoVariant, SessionDiagnostics,
    SessionPhase, SessionSnapshot,
};

// -- Payloads logged as JSON --

#[derive(Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotPayload {
    pub phase: String,
    pub capturing: bool,
    pub recent_capture: Option<CapturePayload>,
    pub diagnostics: DiagnosticsInfo,
}

#[derive(Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CapturePayload {
    pub correlation_id: u64,
    pub expected_count: usize,
    pub raw_count: usize,
    pub processed_count: usize,
    pub has_preview: bool,
    pub complete: bool,
}

#[derive(Clone, Serialize)]
struct ErrorPayload {
    message: String,
    configuration: bool,
}

fn phase_name(phase: SessionPhase) -> &'static str {
    match phase {
        SessionPhase::Idle => "idle",
        SessionPhase::Configuring => "configuring",
        SessionPhase::Running => "running",
        SessionPhase::Capturing => "capturing",
        SessionPhase::Stopped => "stopped",
    }
}

impl From<&CaptureAggregate> for CapturePayload {
    fn from(aggregate: &CaptureAggregate) -> Self {
        let count = |variant: PhotoVariant| aggregate.entries().iter().filter(|slot| slot.get(variant).is_some()).count();
        Self {
            correlation_id: aggregate.id().0,
            expected_count: aggregate.expected_count(),
            raw_count: count(PhotoVariant::Raw),
            processed_count: count(PhotoVariant::Processed),
            has_preview: aggregate.preview_image().is_some(),
            complete: aggregate.is_complete(),
        }
    }
}

impl From<&SessionSnapshot> for SnapshotPayload {
    fn from(snapshot: &SessionSnapshot) -> Self {
        Self {
            phase: phase_name(snapshot.phase).to_string(),
            capturing: snapshot.capturing,
            recent_capture: snapshot.recent_capture.as_deref().map(CapturePayload::from),
            diagnostics: DiagnosticsInfo::from(snapshot.diagnostics.clone()),
        }
    }
}

/// Serializable diagnostics snapshot.
#[derive(Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiagnosticsInfo {
    pub captures_requested: u64,
    pub captures_acknowledged: u64,
    pub captures_completed: u64,
    pub captures_timed_out: u64,
    pub captures_abandoned: u64,
    pub deliveries_merged: u64,
    pub deliveries_dropped: u64,
    pub persistence_dispatched: u64,
}

impl From<SessionDiagnostics> for DiagnosticsInfo {
    fn from(d: SessionDiagnostics) -> Self {
        Self {
            captures_requested: d.captures_requested,
            captures_acknowledged: d.captures_acknowledged,
            captures_completed: d.captures_completed,
            captures_timed_out: d.captures_timed_out,
            captures_abandoned: d.captures_abandoned,
            deliveries_merged: d.deliveries_merged,
            deliveries_dropped: d.deliveries_dropped,
            persistence_dispatched: d.persistence_dispatched,
        }
    }
}

pub fn log_snapshot(snapshot: &SessionSnapshot) {
    match serde_json::to_string(&SnapshotPayload::from(snapshot)) {
        Ok(json) => log::info!("session://snapshot {}", json),
        Err(e) => log::warn!("failed to serialize snapshot: {}", e),
    }
}

fn log_error(error: &CaptureError) {
    let payload = ErrorPayload {
        message: error.to_string(),
        configuration: error.is_configuration_error(),
    };
    match serde_json::to_string(&payload) {
        Ok(json) => log::error!("session://error {}", json),
        Err(e) => log::warn!("failed to serialize error: {}", e),
    }
}

/// Drains the error feed on its own thread until the session is gone.
pub fn spawn_error_logger(mut errors: ErrorReceiver) -> std::io::Result<JoinHandle<()>> {
    thread::Builder::new().name("error-logger".into()).spawn(move || {
        while let Some(error) = recv_blocking(&mut errors) {
            log_error(&error);
        }
        log::debug!("error feed closed");
    })
}

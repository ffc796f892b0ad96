use std::sync::Arc;

use super::aggregate::CaptureAggregate;
use super::photo_models::SessionDiagnostics;

/// Session lifecycle.
///
/// State transitions:
/// ```text
/// idle → configuring → running ⇄ capturing
///            ↓            ↓          ↓
///          idle        stopped ← ────┘
///                         ↓
///                    configuring (start again)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Idle,
    Configuring,
    Running,
    Capturing,
    Stopped,
}

impl SessionPhase {
    pub fn is_capturing(&self) -> bool {
        matches!(self, Self::Capturing)
    }

    /// Whether the hardware stream is active.
    pub fn is_streaming(&self) -> bool {
        matches!(self, Self::Running | Self::Capturing)
    }

    /// Whether `start()` may begin configuring from here.
    pub fn can_start(&self) -> bool {
        matches!(self, Self::Idle | Self::Stopped)
    }
}

/// Copy of the session's observable state, published after every mutation.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSnapshot {
    pub phase: SessionPhase,
    pub capturing: bool,
    /// The in-flight aggregate while capturing, otherwise the last completed one.
    pub recent_capture: Option<Arc<CaptureAggregate>>,
    pub diagnostics: SessionDiagnostics,
}

impl Default for SessionSnapshot {
    fn default() -> Self {
        Self {
            phase: SessionPhase::Idle,
            capturing: false,
            recent_capture: None,
            diagnostics: SessionDiagnostics::default(),
        }
    }
}

use std::time::Duration;

use super::bracket::DEFAULT_EXPOSURE_BIASES;

/// Configuration for a bracket capture session.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionConfiguration {
    /// Per-shot exposure biases in EV, exactly three (default: -2, 0, +2).
    pub exposure_biases: Vec<f32>,

    /// Force-complete a capture whose sequence never finishes (None = wait forever).
    pub completion_timeout: Option<Duration>,

    /// Number of undelivered error notifications kept per subscriber.
    pub error_channel_capacity: usize,

    /// Name of the serialized session thread.
    pub session_thread_name: String,
}

impl SessionConfiguration {
    pub fn validate(&self) -> Result<(), String> {
        if self.exposure_biases.len() != DEFAULT_EXPOSURE_BIASES.len() {
            return Err(format!(
                "exactly {} exposure biases are required, got {}",
                DEFAULT_EXPOSURE_BIASES.len(),
                self.exposure_biases.len()
            ));
        }
        if let Some(bias) = self.exposure_biases.iter().find(|b| !b.is_finite()) {
            return Err(format!("exposure bias must be finite: {}", bias));
        }
        if self.error_channel_capacity == 0 {
            return Err("error channel capacity must be positive".into());
        }
        if self.completion_timeout == Some(Duration::ZERO) {
            return Err("completion timeout must be non-zero".into());
        }
        Ok(())
    }
}

impl Default for SessionConfiguration {
    fn default() -> Self {
        Self {
            exposure_biases: DEFAULT_EXPOSURE_BIASES.to_vec(),
            completion_timeout: Some(Duration::from_secs(15)),
            error_channel_capacity: 32,
            session_thread_name: "capture-session".into(),
        }
    }
}

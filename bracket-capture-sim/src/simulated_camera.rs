//! Simulated photo hardware.
//!
//! Behaves like a bracket-capable camera: configuration can fail, the stream
//! must be running to capture, and every request is answered asynchronously
//! from a dedicated shutter thread.

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

use bracket_capture_core::models::bracket::BracketSettings;
use bracket_capture_core::models::error::CaptureError;
use bracket_capture_core::models::photo_models::{CorrelationId, PhotoCodec, PixelFormat};
use bracket_capture_core::traits::delivery_delegate::PhotoCaptureDelegate;
use bracket_capture_core::traits::photo_hardware::{CapabilitySnapshot, PhotoCapabilities, PhotoHardware};

use crate::device_presets::DevicePreset;
use crate::script::DeliveryScript;
use crate::shutter::{self, ShotPlan};

#[derive(Debug)]
struct SimState {
    capabilities: CapabilitySnapshot,
    script: DeliveryScript,
    configured: bool,
    streaming: bool,
    last_id: u64,
    requests: Vec<BracketSettings>,
    sequences_run: usize,
}

struct Shared {
    state: Mutex<SimState>,
    sequence_done: Condvar,
}

/// Handle for steering and inspecting a `SimulatedCamera` after it was moved
/// into a session.
#[derive(Clone)]
pub struct SimulatorControl {
    shared: Arc<Shared>,
}

impl SimulatorControl {
    pub fn set_capabilities(&self, capabilities: CapabilitySnapshot) {
        self.shared.state.lock().capabilities = capabilities;
    }

    /// Applies to requests issued after this call.
    pub fn set_script(&self, script: DeliveryScript) {
        self.shared.state.lock().script = script;
    }

    pub fn is_streaming(&self) -> bool {
        self.shared.state.lock().streaming
    }

    /// Settings of every accepted capture request, oldest first.
    pub fn requests(&self) -> Vec<BracketSettings> {
        self.shared.state.lock().requests.clone()
    }

    /// Block until `count` shutter sequences ran to their end or `timeout` elapses.
    pub fn wait_for_sequences(&self, count: usize, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut state = self.shared.state.lock();
        while state.sequences_run < count {
            if self.shared.sequence_done.wait_until(&mut state, deadline).timed_out() {
                return state.sequences_run >= count;
            }
        }
        true
    }
}

/// Simulated bracket-capable camera.
pub struct SimulatedCamera {
    shared: Arc<Shared>,
    shutter_handles: Mutex<Vec<thread::JoinHandle<()>>>,
}

impl SimulatedCamera {
    pub fn new(capabilities: CapabilitySnapshot) -> Self {
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(SimState {
                    capabilities,
                    script: DeliveryScript::default(),
                    configured: false,
                    streaming: false,
                    last_id: 0,
                    requests: Vec::new(),
                    sequences_run: 0,
                }),
                sequence_done: Condvar::new(),
            }),
            shutter_handles: Mutex::new(Vec::new()),
        }
    }

    pub fn from_preset(preset: DevicePreset) -> Self {
        Self::new(preset.capabilities())
    }

    pub fn with_script(self, script: DeliveryScript) -> Self {
        self.shared.state.lock().script = script;
        self
    }

    pub fn control(&self) -> SimulatorControl {
        SimulatorControl {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl Default for SimulatedCamera {
    fn default() -> Self {
        Self::from_preset(DevicePreset::ProRawPhone)
    }
}

impl PhotoCapabilities for SimulatedCamera {
    fn raw_pixel_formats(&self) -> Vec<PixelFormat> {
        self.shared.state.lock().capabilities.raw_pixel_formats.clone()
    }

    fn processed_codecs(&self) -> Vec<PhotoCodec> {
        self.shared.state.lock().capabilities.processed_codecs.clone()
    }

    fn preview_pixel_formats(&self) -> Vec<PixelFormat> {
        self.shared.state.lock().capabilities.preview_pixel_formats.clone()
    }

    fn thumbnail_codecs(&self) -> Vec<PhotoCodec> {
        self.shared.state.lock().capabilities.thumbnail_codecs.clone()
    }
}

impl PhotoHardware for SimulatedCamera {
    fn configure(&mut self) -> Result<(), CaptureError> {
        let mut state = self.shared.state.lock();
        if let Some(fault) = state.script.configure_fault.clone() {
            return Err(fault);
        }
        state.configured = true;
        log::debug!("simulated camera configured");
        Ok(())
    }

    fn start_stream(&mut self) -> Result<(), CaptureError> {
        let mut state = self.shared.state.lock();
        if !state.configured {
            return Err(CaptureError::UnableToAddInputs);
        }
        state.streaming = true;
        Ok(())
    }

    fn stop_stream(&mut self) -> Result<(), CaptureError> {
        self.shared.state.lock().streaming = false;
        Ok(())
    }

    fn request_bracket_capture(
        &mut self,
        settings: &BracketSettings,
        delegate: Arc<dyn PhotoCaptureDelegate>,
    ) -> Result<CorrelationId, CaptureError> {
        let plan = {
            let mut state = self.shared.state.lock();
            if !state.streaming {
                return Err(CaptureError::CaptureRequestFailed("stream is not running".into()));
            }
            if let Some(reason) = state.script.request_fault.clone() {
                return Err(CaptureError::CaptureRequestFailed(reason));
            }
            state.last_id += 1;
            state.requests.push(settings.clone());
            ShotPlan {
                id: CorrelationId(state.last_id),
                settings: settings.clone(),
                script: state.script.clone(),
            }
        };
        let id = plan.id;

        let shared = Arc::clone(&self.shared);
        let handle = thread::Builder::new()
            .name("simulated-shutter".into())
            .spawn(move || {
                shutter::run_sequence(plan, delegate);
                shared.state.lock().sequences_run += 1;
                shared.sequence_done.notify_all();
            })
            .map_err(|e| CaptureError::CaptureRequestFailed(format!("failed to spawn shutter thread: {}", e)))?;

        let mut handles = self.shutter_handles.lock();
        handles.retain(|h| !h.is_finished());
        handles.push(handle);
        Ok(id)
    }
}

impl Drop for SimulatedCamera {
    fn drop(&mut self) {
        for handle in self.shutter_handles.lock().drain(..) {
            if handle.join().is_err() {
                log::error!("simulated shutter thread panicked");
            }
        }
    }
}

//! # bracket-capture-sim
//!
//! Simulated photo hardware backend for bracket-capture-kit.
//!
//! Provides:
//! - `SimulatedCamera`: `PhotoHardware` that answers capture requests from its own shutter thread
//! - `SimulatorControl`: steer capabilities and faults after the camera was moved into a session
//! - `DevicePreset`: capability sets of typical devices
//! - `DeliveryScript`: delivery order, delays and injected faults
//!
//! ## Usage
//! ```ignore
//! use bracket_capture_core::{BracketSession, CaptureController, MemoryStore, SessionConfiguration};
//! use bracket_capture_sim::SimulatedCamera;
//!
//! let session = BracketSession::new(SimulatedCamera::default(), MemoryStore::new(), SessionConfiguration::default())?;
//! session.start();
//! session.capture();
//! ```

pub mod device_presets;
pub mod script;
pub mod shutter;
pub mod simulated_camera;


pub use device_presets::DevicePreset;
pub use script::{DeliveryOrder, DeliveryScript};
pub use shutter::resolve_orientation;
pub use simulated_camera::{SimulatedCamera, SimulatorControl};

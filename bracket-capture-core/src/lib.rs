//! # bracket-capture-core
//!
//! Platform-agnostic bracketed RAW+processed photo capture core.
//!
//! Provides bracket settings, capture aggregation, and session orchestration.
//! Platform-specific backends implement the `PhotoHardware` trait and plug
//! into the generic `BracketSession`.
//!
//! ## Architecture
//!
//! ```text
//! bracket-capture-core (this crate)
//! ├── traits/       ← PhotoHardware, PhotoCapabilities, PhotoCaptureDelegate, CaptureStore, CaptureController
//! ├── models/       ← CaptureError, CaptureAggregate, BracketSettings, SessionSnapshot, etc.
//! ├── processing/   ← bracket settings builder
//! ├── session/      ← BracketSession (serialized session thread), state machine, error channel
//! └── storage/      ← DirectoryStore, MemoryStore, metadata sidecar
//! ```

pub mod models;
pub mod processing;
pub mod session;
pub mod storage;
pub mod traits;

// Re-export key types at crate root for convenience.
pub use models::aggregate::{CaptureAggregate, CaptureSlot, CapturedPhoto, MergeOutcome};
pub use models::bracket::{BracketSettings, DEFAULT_EXPOSURE_BIASES};
pub use models::config::SessionConfiguration;
pub use models::error::CaptureError;
pub use models::photo_models::{
    CorrelationId, Orientation, PhotoCodec, PhotoDelivery, PhotoVariant, PixelFormat, PreviewImage, PreviewPayload,
    SessionDiagnostics,
};
pub use models::saved_capture::{CaptureMetadata, SavedCapture, SavedFile};
pub use models::state::{SessionPhase, SessionSnapshot};
pub use processing::bracket_builder::build_bracket_settings;
pub use session::bracket_session::BracketSession;
pub use session::error_channel::{recv_blocking, ErrorChannel, ErrorReceiver};
pub use session::DeliverySink;
pub use storage::directory_store::DirectoryStore;
pub use storage::memory_store::MemoryStore;
pub use traits::capture_controller::CaptureController;
pub use traits::capture_store::CaptureStore;
pub use traits::delivery_delegate::PhotoCaptureDelegate;
pub use traits::photo_hardware::{CapabilitySnapshot, PhotoCapabilities, PhotoHardware};

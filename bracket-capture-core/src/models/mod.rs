pub mod aggregate;
pub mod bracket;
pub mod config;
pub mod error;
pub mod photo_models;
pub mod saved_capture;
pub mod state;

pub mod capture_controller;
pub mod capture_store;
pub mod delivery_delegate;
pub mod photo_hardware;

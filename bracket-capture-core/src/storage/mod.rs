pub mod directory_store;
pub mod memory_store;
pub mod metadata;

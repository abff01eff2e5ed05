//! Stowage Core Library
//!
//! Domain types shared by every Stowage component: the file metadata record,
//! its classification tables, the storage type selector and configuration.

pub mod config;
pub mod models;
pub mod storage_types;

// Re-export commonly used types
pub use config::{BackendProperties, Config};
pub use models::{DataType, File};
pub use storage_types::FileStorageType;

//! Core types shared across the permission engine
//!
//! - `PermissionError` - Error taxonomy for guards and configuration
//! - `PermissionResult` - Result alias

pub mod error;

pub use error::{PermissionError, PermissionResult};

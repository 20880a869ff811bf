pub mod config;
pub mod core;
pub mod permissions;

// Optional components
pub mod logging;

pub use config::PermissionConfig;
pub use crate::core::{PermissionError, PermissionResult};
pub use permissions::{PermissionDispatcher, PermissionScope};

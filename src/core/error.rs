//! Permission engine error types

use thiserror::Error;

/// Errors surfaced at the edges of the permission engine
///
/// The engine itself answers every query with a boolean. Errors only appear
/// where a denied check has to become a user-visible failure, or where
/// configuration is loaded from the outside world.
#[derive(Error, Debug)]
pub enum PermissionError {
    /// A guarded operation was refused
    #[error("Access to this API has been restricted (permission: {permission}{})", format_resource(.resource))]
    AccessDenied {
        /// Canonical name of the violated scope (e.g. `FileSystemIn`)
        permission: &'static str,
        /// Resource that was checked, empty for scope-level checks
        resource: String,
    },

    /// Scope label not recognized
    #[error("Unknown permission scope: {0}")]
    UnknownScope(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

fn format_resource(resource: &str) -> String {
    if resource.is_empty() {
        String::new()
    } else {
        format!(", resource: {}", resource)
    }
}

impl PermissionError {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        PermissionError::Config(msg.into())
    }

    /// Whether this error is an access-control refusal
    pub fn is_access_denied(&self) -> bool {
        matches!(self, PermissionError::AccessDenied { .. })
    }
}

/// Result type alias for permission engine operations
pub type PermissionResult<T> = Result<T, PermissionError>;

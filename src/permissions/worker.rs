//! Worker thread permission

use super::node::{Latch, PermissionNode};
use super::scope::PermissionScope;

/// Kill switch for creating worker threads
///
/// Same all-or-nothing model as [`super::ChildProcessNode`]: resources are
/// ignored and a denial can never be lifted.
#[derive(Debug, Default)]
pub struct WorkerNode {
    deny_all: Latch,
}

impl WorkerNode {
    /// Create a node that still allows workers
    pub fn new() -> Self {
        Self::default()
    }
}

impl PermissionNode for WorkerNode {
    fn name(&self) -> &'static str {
        "worker"
    }

    fn apply(&self, _spec: &str) {}

    fn deny(&self, _scope: PermissionScope, _params: &[String]) -> bool {
        if !self.deny_all.trip() {
            tracing::debug!("Worker thread creation denied for the rest of the process");
        }
        true
    }

    fn is_granted(&self, _scope: PermissionScope, _resource: &str) -> bool {
        !self.deny_all.is_tripped()
    }
}

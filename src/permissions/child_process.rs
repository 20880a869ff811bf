//! Child process permission
//!
//! Spawning is all-or-nothing. Once denied, it stays denied for the rest of
//! the process; there is no allow-spec to undo it.

use super::node::{Latch, PermissionNode};
use super::scope::PermissionScope;

/// Kill switch for spawning child processes
#[derive(Debug, Default)]
pub struct ChildProcessNode {
    deny_all: Latch,
}

impl ChildProcessNode {
    /// Create a node that still allows spawning
    pub fn new() -> Self {
        Self::default()
    }
}

impl PermissionNode for ChildProcessNode {
    fn name(&self) -> &'static str {
        "child_process"
    }

    fn apply(&self, _spec: &str) {}

    fn deny(&self, _scope: PermissionScope, _params: &[String]) -> bool {
        if !self.deny_all.trip() {
            tracing::debug!("Child process spawning denied for the rest of the process");
        }
        true
    }

    fn is_granted(&self, _scope: PermissionScope, _resource: &str) -> bool {
        !self.deny_all.is_tripped()
    }
}

//! Permission node trait
//!
//! A node holds the policy state for one family of scopes. The dispatcher
//! maps several scopes onto the same node instance, so nodes take `&self`
//! and keep their mutable state behind interior locks or atomics.

use std::sync::atomic::{AtomicBool, Ordering};

use super::scope::PermissionScope;

/// Policy state for one family of scopes
pub trait PermissionNode: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &'static str;

    /// Apply an allow-spec (CLI flag value) to this node
    fn apply(&self, spec: &str);

    /// Narrow the policy for `scope`; empty `params` denies the whole scope.
    ///
    /// Returns `false` when this node does not handle `scope`.
    fn deny(&self, scope: PermissionScope, params: &[String]) -> bool;

    /// Whether `scope` is granted for `resource` (empty means scope-level check)
    fn is_granted(&self, scope: PermissionScope, resource: &str) -> bool;
}

/// One-way switch: once tripped, it stays tripped
#[derive(Debug, Default)]
pub struct Latch(AtomicBool);

impl Latch {
    /// A latch that has not been tripped
    pub fn new() -> Self {
        Self::default()
    }

    /// Trip the latch, returning whether it was already tripped
    pub fn trip(&self) -> bool {
        self.0.swap(true, Ordering::AcqRel)
    }

    /// Whether the latch has been tripped
    pub fn is_tripped(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

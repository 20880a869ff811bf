//! Permission dispatcher
//!
//! Routes every scope to the node that owns it. The scope map is fixed at
//! construction; only node state and the `enabled` flag change afterwards.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::core::{PermissionError, PermissionResult};

use super::child_process::ChildProcessNode;
use super::fs::FilesystemNode;
use super::node::PermissionNode;
use super::scope::PermissionScope;
use super::worker::WorkerNode;

/// Shared handle to a node; several scopes may point at the same one
pub type ArcNode = Arc<dyn PermissionNode>;

/// Entry point for every permission query
///
/// Until [`PermissionDispatcher::enable_permissions`] is called every check
/// passes, so embedders that never opt in keep their existing behavior.
///
/// # Example
///
/// ```
/// use permission_engine::permissions::{PermissionDispatcher, PermissionScope};
///
/// let permissions = PermissionDispatcher::new();
/// permissions.enable_permissions();
/// permissions.apply("read:/definitely/missing/app.conf", PermissionScope::FileSystem);
///
/// assert!(permissions.is_granted(PermissionScope::FileSystemIn, "/definitely/missing/app.conf"));
/// assert!(!permissions.is_granted(PermissionScope::FileSystemOut, "/definitely/missing/app.conf"));
/// ```
pub struct PermissionDispatcher {
    nodes: HashMap<PermissionScope, ArcNode>,
    filesystem: Arc<FilesystemNode>,
    enabled: AtomicBool,
}

impl PermissionDispatcher {
    /// Create a disabled dispatcher with one node per scope family
    pub fn new() -> Self {
        let filesystem = Arc::new(FilesystemNode::new());
        let fs_node: ArcNode = filesystem.clone();
        let child_process: ArcNode = Arc::new(ChildProcessNode::new());
        let worker: ArcNode = Arc::new(WorkerNode::new());

        let mut nodes: HashMap<PermissionScope, ArcNode> = HashMap::new();
        for scope in PermissionScope::FILESYSTEM {
            nodes.insert(scope, fs_node.clone());
        }
        nodes.insert(PermissionScope::ChildProcess, child_process);
        nodes.insert(PermissionScope::WorkerThreads, worker);

        Self {
            nodes,
            filesystem,
            enabled: AtomicBool::new(false),
        }
    }

    /// Turn enforcement on. There is no way back.
    pub fn enable_permissions(&self) {
        if !self.enabled.swap(true, Ordering::AcqRel) {
            tracing::info!("Permission enforcement enabled");
        }
    }

    /// Whether enforcement is on
    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }

    /// Node registered for `scope`, if any
    pub fn node_for(&self, scope: PermissionScope) -> Option<&ArcNode> {
        self.nodes.get(&scope)
    }

    /// The filesystem node, for inspecting granted and denied paths
    pub fn filesystem(&self) -> &FilesystemNode {
        &self.filesystem
    }

    /// Whether `scope` is granted for `resource` (empty means scope-level check)
    ///
    /// Always `true` while disabled; `false` for scopes with no node.
    pub fn is_granted(&self, scope: PermissionScope, resource: &str) -> bool {
        if !self.is_enabled() {
            return true;
        }
        match self.nodes.get(&scope) {
            Some(node) => node.is_granted(scope, resource),
            None => false,
        }
    }

    /// Guard for a sensitive operation
    ///
    /// Returns [`PermissionError::AccessDenied`] carrying the scope's
    /// canonical name when the check fails.
    pub fn ensure_granted(&self, scope: PermissionScope, resource: &str) -> PermissionResult<()> {
        if self.is_granted(scope, resource) {
            return Ok(());
        }
        tracing::debug!("Access denied: {} {:?}", scope, resource);
        Err(PermissionError::AccessDenied {
            permission: scope.name(),
            resource: resource.to_string(),
        })
    }

    /// Apply an allow-spec to the node owning `scope`; unmapped scopes are ignored
    pub fn apply(&self, spec: &str, scope: PermissionScope) {
        match self.nodes.get(&scope) {
            Some(node) => {
                tracing::debug!("Applying '{}' to {} node", spec, node.name());
                node.apply(spec);
            }
            None => tracing::debug!("No permission node for {}; ignoring '{}'", scope, spec),
        }
    }

    /// Narrow the policy for `scope`; empty `params` denies the whole scope
    ///
    /// Returns `false` for scopes with no node.
    pub fn deny(&self, scope: PermissionScope, params: &[String]) -> bool {
        match self.nodes.get(&scope) {
            Some(node) => node.deny(scope, params),
            None => false,
        }
    }

    /// Script-facing check: `check("fs.read", "/tmp/x")`
    ///
    /// Unrecognized labels are never granted.
    pub fn check_label(&self, label: &str, resource: Option<&str>) -> bool {
        let scope = PermissionScope::from_label(label);
        !scope.is_root() && self.is_granted(scope, resource.unwrap_or_default())
    }

    /// Script-facing deny: `deny("fs.write", ["/etc"])`
    ///
    /// Unrecognized labels deny nothing and return `false`.
    pub fn deny_label(&self, label: &str, params: &[String]) -> bool {
        let scope = PermissionScope::from_label(label);
        if scope.is_root() {
            tracing::warn!("Cannot deny unknown permission '{}'", label);
            return false;
        }
        self.deny(scope, params)
    }
}

impl Default for PermissionDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for PermissionDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut scopes: Vec<_> = self.nodes.keys().copied().collect();
        scopes.sort();
        f.debug_struct("PermissionDispatcher")
            .field("enabled", &self.is_enabled())
            .field("scopes", &scopes)
            .finish()
    }
}

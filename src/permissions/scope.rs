//! Permission scope taxonomy
//!
//! Scopes form a shallow tree rooted at a synthetic [`PermissionScope::Root`]:
//!
//! ```text
//! Root
//! ├── FileSystem (fs)
//! │   ├── FileSystemIn  (fs.read)
//! │   └── FileSystemOut (fs.write)
//! ├── ChildProcess (child)
//! └── WorkerThreads (worker)
//! ```

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::core::PermissionError;

/// A named category of guarded operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PermissionScope {
    /// Synthetic root; also returned for unrecognized labels
    Root,
    /// Any filesystem access
    FileSystem,
    /// Filesystem reads
    FileSystemIn,
    /// Filesystem writes
    FileSystemOut,
    /// Spawning child processes
    ChildProcess,
    /// Creating worker threads
    WorkerThreads,
}

impl PermissionScope {
    /// Every concrete scope, root excluded
    pub const ALL: [PermissionScope; 5] = [
        PermissionScope::FileSystem,
        PermissionScope::FileSystemIn,
        PermissionScope::FileSystemOut,
        PermissionScope::ChildProcess,
        PermissionScope::WorkerThreads,
    ];

    /// Scopes served by the filesystem node
    pub const FILESYSTEM: [PermissionScope; 3] = [
        PermissionScope::FileSystem,
        PermissionScope::FileSystemIn,
        PermissionScope::FileSystemOut,
    ];

    /// Label used in specs and by the script-facing API (`fs.read`, ...)
    ///
    /// Returns `None` for the root sentinel.
    pub fn to_label(self) -> Option<&'static str> {
        match self {
            PermissionScope::Root => None,
            PermissionScope::FileSystem => Some("fs"),
            PermissionScope::FileSystemIn => Some("fs.read"),
            PermissionScope::FileSystemOut => Some("fs.write"),
            PermissionScope::ChildProcess => Some("child"),
            PermissionScope::WorkerThreads => Some("worker"),
        }
    }

    /// Parse a label, yielding [`PermissionScope::Root`] when unrecognized
    pub fn from_label(label: &str) -> PermissionScope {
        Self::ALL
            .into_iter()
            .find(|scope| scope.to_label() == Some(label))
            .unwrap_or(PermissionScope::Root)
    }

    /// Canonical name carried by access-denied errors
    pub fn name(self) -> &'static str {
        match self {
            PermissionScope::Root => "PermissionsRoot",
            PermissionScope::FileSystem => "FileSystem",
            PermissionScope::FileSystemIn => "FileSystemIn",
            PermissionScope::FileSystemOut => "FileSystemOut",
            PermissionScope::ChildProcess => "ChildProcess",
            PermissionScope::WorkerThreads => "WorkerThreads",
        }
    }

    /// Immediate parent in the taxonomy; the root is its own parent
    pub fn parent(self) -> PermissionScope {
        match self {
            PermissionScope::FileSystemIn | PermissionScope::FileSystemOut => {
                PermissionScope::FileSystem
            }
            _ => PermissionScope::Root,
        }
    }

    /// Immediate children in the taxonomy
    pub fn children(self) -> impl Iterator<Item = PermissionScope> {
        Self::ALL
            .into_iter()
            .filter(move |scope| scope.parent() == self)
    }

    /// Whether this is the root sentinel
    pub fn is_root(self) -> bool {
        self == PermissionScope::Root
    }
}

impl fmt::Display for PermissionScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.to_label().unwrap_or("root"))
    }
}

impl FromStr for PermissionScope {
    type Err = PermissionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match PermissionScope::from_label(s) {
            PermissionScope::Root => Err(PermissionError::UnknownScope(s.to_string())),
            scope => Ok(scope),
        }
    }
}

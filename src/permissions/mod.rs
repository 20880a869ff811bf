//! Permission system for sensitive host operations
//!
//! This module gates filesystem reads and writes, child process spawning and
//! worker thread creation:
//!
//! - **Scopes**: `PermissionScope`, a small tree (`fs` → `fs.read`/`fs.write`,
//!   `child`, `worker`)
//! - **Nodes**: one `PermissionNode` per scope family holding its policy state
//! - **Dispatcher**: `PermissionDispatcher` routes each scope to its node
//!
//! Policy only ever narrows at runtime. A denied child process or worker
//! permission is final; a denied filesystem path stays denied until a broad
//! grant (`read`, `write` or `fs`) resets that direction.
//!
//! ## Example
//!
//! ```rust,ignore
//! use permission_engine::permissions::{PermissionDispatcher, PermissionScope};
//!
//! let permissions = PermissionDispatcher::new();
//! permissions.enable_permissions();
//! permissions.apply("read:/tmp,write:./out.log", PermissionScope::FileSystem);
//!
//! // Before every guarded operation
//! permissions.ensure_granted(PermissionScope::FileSystemIn, "/tmp/x")?;
//!
//! // Scripts can only narrow further
//! permissions.deny(PermissionScope::ChildProcess, &[]);
//! ```

mod child_process;
mod dispatcher;
mod fs;
mod node;
mod radix;
mod scope;
mod worker;

pub use child_process::ChildProcessNode;
pub use dispatcher::{ArcNode, PermissionDispatcher};
pub use fs::FilesystemNode;
pub use node::{Latch, PermissionNode};
pub use radix::{PathMatcher, WILDCARD};
pub use scope::PermissionScope;
pub use worker::WorkerNode;

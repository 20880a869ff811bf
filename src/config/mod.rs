//! Startup configuration
//!
//! Mirrors the CLI flags an embedding host accepts and turns them into
//! `apply`/`deny` calls on a fresh [`PermissionDispatcher`].
//!
//! ```ignore
//! let permissions = PermissionConfig::new()
//!     .with_enabled(true)
//!     .with_fs_read("/tmp")
//!     .with_fs_write("./out.log")
//!     .build();
//! ```
//!
//! The same settings can be loaded from JSON:
//!
//! ```json
//! {
//!   "enabled": true,
//!   "allow_fs_read": ["/tmp"],
//!   "allow_fs_write": ["./out.log"],
//!   "allow_child_process": false
//! }
//! ```

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::core::{PermissionError, PermissionResult};
use crate::permissions::{PermissionDispatcher, PermissionScope};

/// Permission settings established at process start
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PermissionConfig {
    /// Enforce permissions at all (`--experimental-permission`)
    pub enabled: bool,

    /// Raw filesystem allow-specs (`--allow-fs read,write:/tmp`)
    pub allow_fs: Vec<String>,

    /// Paths readable by the process (`--allow-fs-read`); `*` allows all
    pub allow_fs_read: Vec<String>,

    /// Paths writable by the process (`--allow-fs-write`); `*` allows all
    pub allow_fs_write: Vec<String>,

    /// Keep child process spawning available (`--allow-child-process`)
    pub allow_child_process: bool,

    /// Keep worker threads available (`--allow-worker`)
    pub allow_worker: bool,
}

impl PermissionConfig {
    /// Create a configuration with enforcement off
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a configuration from a JSON file
    pub fn from_file(path: impl AsRef<Path>) -> PermissionResult<Self> {
        let path = path.as_ref();
        let file = File::open(path)?;
        let config: Self = serde_json::from_reader(BufReader::new(file))?;
        config.validate()?;
        tracing::debug!("Loaded permission config from {:?}", path);
        Ok(config)
    }

    /// Parse a configuration from a JSON string
    pub fn from_json(json: &str) -> PermissionResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject entries that could never grant anything
    pub fn validate(&self) -> PermissionResult<()> {
        let empty = self
            .allow_fs
            .iter()
            .chain(&self.allow_fs_read)
            .chain(&self.allow_fs_write)
            .any(|entry| entry.is_empty());
        if empty {
            return Err(PermissionError::config("empty filesystem permission entry"));
        }
        Ok(())
    }

    /// Enable or disable enforcement
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Add a raw filesystem allow-spec
    pub fn with_fs(mut self, spec: impl Into<String>) -> Self {
        self.allow_fs.push(spec.into());
        self
    }

    /// Allow reading a path (directories include their contents)
    pub fn with_fs_read(mut self, path: impl Into<String>) -> Self {
        self.allow_fs_read.push(path.into());
        self
    }

    /// Allow writing a path (directories include their contents)
    pub fn with_fs_write(mut self, path: impl Into<String>) -> Self {
        self.allow_fs_write.push(path.into());
        self
    }

    /// Keep child process spawning available
    pub fn with_child_process(mut self, allow: bool) -> Self {
        self.allow_child_process = allow;
        self
    }

    /// Keep worker threads available
    pub fn with_worker(mut self, allow: bool) -> Self {
        self.allow_worker = allow;
        self
    }

    /// Layer `other` on top of this configuration
    ///
    /// Lists are concatenated and boolean flags are OR-ed, so a later source
    /// can only add grants it names explicitly.
    pub fn merge(mut self, other: PermissionConfig) -> Self {
        self.enabled |= other.enabled;
        self.allow_fs.extend(other.allow_fs);
        self.allow_fs_read.extend(other.allow_fs_read);
        self.allow_fs_write.extend(other.allow_fs_write);
        self.allow_child_process |= other.allow_child_process;
        self.allow_worker |= other.allow_worker;
        self
    }

    /// Build a dispatcher with this policy applied
    pub fn build(&self) -> PermissionDispatcher {
        let dispatcher = PermissionDispatcher::new();
        self.apply_to(&dispatcher);
        dispatcher
    }

    /// Apply this policy to an existing dispatcher
    ///
    /// Does nothing unless `enabled` is set.
    pub fn apply_to(&self, dispatcher: &PermissionDispatcher) {
        if !self.enabled {
            return;
        }
        dispatcher.enable_permissions();

        for spec in &self.allow_fs {
            dispatcher.apply(spec, PermissionScope::FileSystem);
        }
        for path in &self.allow_fs_read {
            dispatcher.apply(&direction_spec("read", path), PermissionScope::FileSystemIn);
        }
        for path in &self.allow_fs_write {
            dispatcher.apply(&direction_spec("write", path), PermissionScope::FileSystemOut);
        }

        if self.allow_child_process {
            warn_dangerous_flag("--allow-child-process");
        } else {
            dispatcher.deny(PermissionScope::ChildProcess, &[]);
        }

        if self.allow_worker {
            warn_dangerous_flag("--allow-worker");
        } else {
            dispatcher.deny(PermissionScope::WorkerThreads, &[]);
        }
    }
}

fn direction_spec(keyword: &str, path: &str) -> String {
    if path == "*" {
        keyword.to_string()
    } else {
        format!("{}:{}", keyword, path)
    }
}

fn warn_dangerous_flag(flag: &str) {
    tracing::warn!(
        "SecurityWarning: The flag {} must be used with extreme caution. It could invalidate the permission model.",
        flag
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_disabled_config_leaves_dispatcher_open() {
        let dispatcher = PermissionConfig::new().with_fs_read("/tmp").build();

        assert!(!dispatcher.is_enabled());
        assert!(dispatcher.is_granted(PermissionScope::ChildProcess, ""));
        assert!(dispatcher.is_granted(PermissionScope::FileSystemOut, "/etc/passwd"));
    }

    #[test]
    fn test_enabled_without_flags_denies_everything() {
        let dispatcher = PermissionConfig::new().with_enabled(true).build();

        assert!(!dispatcher.is_granted(PermissionScope::FileSystem, ""));
        assert!(!dispatcher.is_granted(PermissionScope::FileSystemIn, ""));
        assert!(!dispatcher.is_granted(PermissionScope::FileSystemOut, ""));
        assert!(!dispatcher.is_granted(PermissionScope::ChildProcess, ""));
        assert!(!dispatcher.is_granted(PermissionScope::WorkerThreads, ""));
    }

    #[test]
    fn test_flags_become_grants() {
        let dispatcher = PermissionConfig::new()
            .with_enabled(true)
            .with_fs_read("/srv/missing/data.csv")
            .with_fs_write("*")
            .with_child_process(true)
            .build();

        assert!(dispatcher.is_granted(PermissionScope::FileSystemIn, "/srv/missing/data.csv"));
        assert!(!dispatcher.is_granted(PermissionScope::FileSystemIn, "/srv/missing/other.csv"));
        assert!(dispatcher.is_granted(PermissionScope::FileSystemOut, "/anything"));
        assert!(dispatcher.is_granted(PermissionScope::ChildProcess, ""));
        assert!(!dispatcher.is_granted(PermissionScope::WorkerThreads, ""));
    }

    #[test]
    fn test_raw_fs_spec() {
        let dispatcher = PermissionConfig::new()
            .with_enabled(true)
            .with_fs("read")
            .build();

        assert!(dispatcher.is_granted(PermissionScope::FileSystem, ""));
        assert!(dispatcher.is_granted(PermissionScope::FileSystemIn, ""));
        assert!(!dispatcher.is_granted(PermissionScope::FileSystemOut, ""));
    }

    #[test]
    fn test_from_json() {
        let config = PermissionConfig::from_json(
            r#"{"enabled": true, "allow_fs_read": ["/tmp"], "allow_worker": true}"#,
        )
        .unwrap();

        assert!(config.enabled);
        assert_eq!(config.allow_fs_read, vec!["/tmp".to_string()]);
        assert!(config.allow_worker);
        assert!(!config.allow_child_process);
        assert!(config.allow_fs.is_empty());
    }

    #[test]
    fn test_from_json_rejects_bad_input() {
        let err = PermissionConfig::from_json(r#"{"allow_network": true}"#).unwrap_err();
        assert!(matches!(err, PermissionError::Serialization(_)));

        let err = PermissionConfig::from_json(r#"{"allow_fs_write": [""]}"#).unwrap_err();
        assert!(matches!(err, PermissionError::Config(_)));
    }

    #[test]
    fn test_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, r#"{{"enabled": true, "allow_fs": ["write"]}}"#).unwrap();

        let config = PermissionConfig::from_file(file.path()).unwrap();
        let dispatcher = config.build();
        assert!(dispatcher.is_granted(PermissionScope::FileSystemOut, "/x"));
        assert!(!dispatcher.is_granted(PermissionScope::FileSystemIn, "/x"));

        let err = PermissionConfig::from_file("/definitely/not/a/config.json").unwrap_err();
        assert!(matches!(err, PermissionError::Io(_)));
    }

    #[test]
    fn test_merge() {
        let base = PermissionConfig::new().with_fs_read("/a");
        let overlay = PermissionConfig::new()
            .with_enabled(true)
            .with_fs_read("/b")
            .with_worker(true);

        let merged = base.merge(overlay);
        assert!(merged.enabled);
        assert_eq!(merged.allow_fs_read, vec!["/a".to_string(), "/b".to_string()]);
        assert!(merged.allow_worker);
        assert!(!merged.allow_child_process);
    }

    #[test]
    fn test_round_trip_serialization() {
        let config = PermissionConfig::new()
            .with_enabled(true)
            .with_fs("read,write:/tmp");
        let json = serde_json::to_string(&config).unwrap();
        assert_eq!(PermissionConfig::from_json(&json).unwrap(), config);
    }
}

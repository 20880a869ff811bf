//! Filesystem permission
//!
//! Reads and writes are tracked as two independent directions. Each direction
//! has:
//!
//! - a `deny_all` latch that closes the whole direction
//! - a granted-path matcher; only listed paths are reachable
//! - a denied-path matcher carved out of the grants by `deny(scope, paths)`
//!
//! Both directions start closed. `apply` opens them:
//!
//! ```text
//! fs                       everything, both directions
//! read                     every path, reads
//! read:/tmp,write:./a.log  /tmp (recursively) for reads, ./a.log for writes
//! ```

use std::fs;
use std::path::MAIN_SEPARATOR;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use super::node::PermissionNode;
use super::radix::{PathMatcher, WILDCARD};
use super::scope::PermissionScope;

/// Which way data flows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Access {
    Read,
    Write,
}

impl Access {
    fn from_keyword(keyword: &str) -> Option<Self> {
        match keyword {
            "read" => Some(Access::Read),
            "write" => Some(Access::Write),
            _ => None,
        }
    }

    fn from_scope(scope: PermissionScope) -> Option<Self> {
        match scope {
            PermissionScope::FileSystemIn => Some(Access::Read),
            PermissionScope::FileSystemOut => Some(Access::Write),
            _ => None,
        }
    }
}

/// One parsed clause of an allow-spec
#[derive(Debug, PartialEq, Eq)]
enum Clause {
    /// `fs`
    Everything,
    /// `read` / `write`
    Direction(Access),
    /// `read:<path>` / `write:<path>`, directory-expanded
    Paths(Access, Vec<String>),
}

/// Split an allow-spec into clauses, stopping at the first unrecognized keyword.
fn parse_spec(spec: &str) -> Vec<Clause> {
    let mut clauses = Vec::new();

    for clause in spec.split(',').filter(|c| !c.is_empty()) {
        let (keyword, resource) = match clause.split_once(':') {
            Some((keyword, resource)) => (keyword, Some(resource)),
            None => (clause, None),
        };

        if keyword == "fs" {
            clauses.push(Clause::Everything);
            break;
        }

        let Some(access) = Access::from_keyword(keyword) else {
            tracing::warn!(
                "Unrecognized filesystem permission '{}' in '{}'; ignoring the rest of the spec",
                keyword,
                spec
            );
            break;
        };

        match resource {
            None => clauses.push(Clause::Direction(access)),
            Some("") => {
                tracing::warn!("Empty resource in filesystem clause '{}'", clause);
                clauses.push(Clause::Paths(access, Vec::new()));
            }
            Some(resource) => clauses.push(Clause::Paths(access, expand_resource(resource))),
        }
    }

    clauses
}

/// Directories cover themselves and everything beneath them.
///
/// Anything that cannot be resolved as a directory (including paths that do
/// not exist) is kept as a literal.
fn expand_resource(resource: &str) -> Vec<String> {
    if !is_directory(resource) {
        return vec![resource.to_string()];
    }

    let trimmed = resource.trim_end_matches(MAIN_SEPARATOR);
    let dir = if trimmed.is_empty() { resource } else { trimmed };

    let mut subtree = String::with_capacity(trimmed.len() + 2);
    subtree.push_str(trimmed);
    subtree.push(MAIN_SEPARATOR);
    subtree.push(WILDCARD as char);

    vec![dir.to_string(), subtree]
}

fn is_directory(resource: &str) -> bool {
    match fs::metadata(resource) {
        Ok(metadata) => metadata.is_dir(),
        Err(e) => {
            tracing::trace!("Treating '{}' as a literal path: {}", resource, e);
            false
        }
    }
}

/// Policy state for one direction
#[derive(Debug)]
struct Direction {
    deny_all: bool,
    /// Set by an explicit whole-direction denial; narrow grants cannot reopen it
    revoked: bool,
    granted: PathMatcher,
    denied: PathMatcher,
}

impl Default for Direction {
    fn default() -> Self {
        Self {
            deny_all: true,
            revoked: false,
            granted: PathMatcher::new(),
            denied: PathMatcher::new(),
        }
    }
}

impl Direction {
    fn grant_everything(&mut self) {
        self.deny_all = false;
        self.revoked = false;
        self.denied.clear();
        self.granted.clear();
        self.granted.insert("*");
    }

    fn grant(&mut self, paths: &[String]) {
        if !self.revoked {
            self.deny_all = false;
        }
        for path in paths {
            self.granted.insert(path);
        }
    }

    fn revoke(&mut self) {
        self.deny_all = true;
        self.revoked = true;
    }

    fn deny(&mut self, paths: &[String]) {
        for path in paths {
            self.granted.remove(path);
            self.denied.insert(path);
        }
    }

    fn is_granted(&self, resource: &str) -> bool {
        !self.deny_all
            && (resource.is_empty()
                || (!self.denied.lookup(resource) && self.granted.lookup(resource)))
    }
}

#[derive(Debug, Default)]
struct FsState {
    read: Direction,
    write: Direction,
}

impl FsState {
    fn direction_mut(&mut self, access: Access) -> &mut Direction {
        match access {
            Access::Read => &mut self.read,
            Access::Write => &mut self.write,
        }
    }

    fn direction(&self, access: Access) -> &Direction {
        match access {
            Access::Read => &self.read,
            Access::Write => &self.write,
        }
    }
}

/// Permission node for `fs`, `fs.read` and `fs.write`
#[derive(Debug, Default)]
pub struct FilesystemNode {
    state: RwLock<FsState>,
}

impl FilesystemNode {
    /// Create a node with both directions closed
    pub fn new() -> Self {
        Self::default()
    }

    fn read_state(&self) -> RwLockReadGuard<'_, FsState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_state(&self) -> RwLockWriteGuard<'_, FsState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Entries currently granted for `scope` (`fs.read` or `fs.write`)
    pub fn granted_paths(&self, scope: PermissionScope) -> Vec<String> {
        Access::from_scope(scope)
            .map(|access| self.read_state().direction(access).granted.entries())
            .unwrap_or_default()
    }

    /// Entries explicitly denied for `scope` (`fs.read` or `fs.write`)
    pub fn denied_paths(&self, scope: PermissionScope) -> Vec<String> {
        Access::from_scope(scope)
            .map(|access| self.read_state().direction(access).denied.entries())
            .unwrap_or_default()
    }
}

impl PermissionNode for FilesystemNode {
    fn name(&self) -> &'static str {
        "fs"
    }

    fn apply(&self, spec: &str) {
        // Resolve directories before taking the lock
        let clauses = parse_spec(spec);

        let mut state = self.write_state();
        for clause in clauses {
            tracing::debug!("Applying filesystem clause {:?}", clause);
            match clause {
                Clause::Everything => {
                    state.read.grant_everything();
                    state.write.grant_everything();
                }
                Clause::Direction(access) => state.direction_mut(access).grant_everything(),
                Clause::Paths(access, paths) => state.direction_mut(access).grant(&paths),
            }
        }
    }

    fn deny(&self, scope: PermissionScope, params: &[String]) -> bool {
        if scope == PermissionScope::FileSystem {
            let mut state = self.write_state();
            state.read.revoke();
            state.write.revoke();
            tracing::debug!("Filesystem access denied in both directions");
            return true;
        }

        let Some(access) = Access::from_scope(scope) else {
            return false;
        };

        let paths: Vec<String> = params.iter().flat_map(|p| expand_resource(p)).collect();

        let mut state = self.write_state();
        let direction = state.direction_mut(access);
        if params.is_empty() {
            direction.revoke();
            tracing::debug!("Denied all of {}", scope);
        } else if !direction.revoked {
            direction.deny(&paths);
            tracing::debug!("Denied {} for {:?}", scope, paths);
        }
        true
    }

    fn is_granted(&self, scope: PermissionScope, resource: &str) -> bool {
        let state = self.read_state();
        match scope {
            PermissionScope::FileSystem => !(state.read.deny_all && state.write.deny_all),
            PermissionScope::FileSystemIn => state.read.is_granted(resource),
            PermissionScope::FileSystemOut => state.write.is_granted(resource),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const IN: PermissionScope = PermissionScope::FileSystemIn;
    const OUT: PermissionScope = PermissionScope::FileSystemOut;
    const FS: PermissionScope = PermissionScope::FileSystem;

    fn paths(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn dir_string(dir: &TempDir) -> String {
        dir.path().to_string_lossy().into_owned()
    }

    #[test]
    fn test_starts_closed() {
        let node = FilesystemNode::new();

        assert!(!node.is_granted(FS, ""));
        assert!(!node.is_granted(IN, ""));
        assert!(!node.is_granted(OUT, ""));
        assert!(!node.is_granted(IN, "/etc/passwd"));
    }

    #[test]
    fn test_parse_spec() {
        assert_eq!(
            parse_spec("read,write:/definitely/not/here.txt"),
            vec![
                Clause::Direction(Access::Read),
                Clause::Paths(Access::Write, paths(&["/definitely/not/here.txt"])),
            ]
        );
        assert_eq!(parse_spec("fs,read:/x"), vec![Clause::Everything]);
        assert_eq!(
            parse_spec("write,exec:/bin,read"),
            vec![Clause::Direction(Access::Write)]
        );
        assert_eq!(parse_spec(",,read,"), vec![Clause::Direction(Access::Read)]);
        assert_eq!(parse_spec("read:"), vec![Clause::Paths(Access::Read, vec![])]);
        assert_eq!(
            parse_spec("write:C:/out.log"),
            vec![Clause::Paths(Access::Write, paths(&["C:/out.log"]))]
        );
    }

    #[test]
    fn test_bare_keywords() {
        let node = FilesystemNode::new();
        node.apply("write");

        assert!(node.is_granted(FS, ""));
        assert!(!node.is_granted(IN, ""));
        assert!(node.is_granted(OUT, ""));
        assert!(node.is_granted(OUT, "/any/where"));
        assert!(!node.is_granted(IN, "/any/where"));
    }

    #[test]
    fn test_fs_token_opens_everything() {
        let node = FilesystemNode::new();
        node.apply("fs");

        assert!(node.is_granted(IN, "/etc/passwd"));
        assert!(node.is_granted(OUT, "/tmp/out"));
        assert!(node.is_granted(FS, ""));
    }

    #[test]
    fn test_directory_grant_covers_subtree() {
        let tmp = TempDir::new().unwrap();
        let root = dir_string(&tmp);

        let node = FilesystemNode::new();
        node.apply(&format!("read:{}/", root));

        assert!(node.is_granted(IN, &root));
        assert!(node.is_granted(IN, &format!("{}/", root)));
        assert!(node.is_granted(IN, &format!("{}/a/b.txt", root)));
        assert!(!node.is_granted(IN, &format!("{}x/secret", root)));
        assert!(!node.is_granted(OUT, &format!("{}/a/b.txt", root)));
    }

    #[test]
    fn test_exact_file_grant_does_not_bleed() {
        let node = FilesystemNode::new();
        node.apply("read:/etc/app.conf.does-not-exist");

        assert!(node.is_granted(IN, "/etc/app.conf.does-not-exist"));
        assert!(!node.is_granted(IN, "/etc/app.conf.does-not-exist.bak"));
        assert!(!node.is_granted(IN, "/etc/app.conf.does-not-exist/sub"));
        assert!(!node.is_granted(IN, "/etc"));
    }

    #[test]
    fn test_unrecognized_keyword_keeps_earlier_clauses() {
        let node = FilesystemNode::new();
        node.apply("read:/a.txt,bogus,write");

        assert!(node.is_granted(IN, "/a.txt"));
        assert!(!node.is_granted(OUT, ""));
    }

    #[test]
    fn test_deny_whole_filesystem() {
        let node = FilesystemNode::new();
        node.apply("fs");

        assert!(node.deny(FS, &paths(&["/ignored"])));
        assert!(!node.is_granted(FS, ""));
        assert!(!node.is_granted(IN, "/tmp/x"));
        assert!(!node.is_granted(OUT, "/tmp/x"));
    }

    #[test]
    fn test_deny_direction() {
        let node = FilesystemNode::new();
        node.apply("fs");

        assert!(node.deny(IN, &[]));
        assert!(!node.is_granted(IN, ""));
        assert!(!node.is_granted(IN, "/tmp/x"));
        assert!(node.is_granted(OUT, "/tmp/x"));
        assert!(node.is_granted(FS, ""));

        assert!(node.deny(OUT, &[]));
        assert!(!node.is_granted(FS, ""));
    }

    #[test]
    fn test_full_deny_is_idempotent() {
        let node = FilesystemNode::new();
        node.apply("read");

        node.deny(IN, &[]);
        let after_first: Vec<bool> = ["", "/a", "/b/c"].iter().map(|r| node.is_granted(IN, r)).collect();
        node.deny(IN, &[]);
        let after_second: Vec<bool> = ["", "/a", "/b/c"].iter().map(|r| node.is_granted(IN, r)).collect();

        assert_eq!(after_first, after_second);
    }

    #[test]
    fn test_path_deny_after_full_deny_is_noop() {
        let node = FilesystemNode::new();
        node.apply("read");
        node.deny(IN, &[]);

        assert!(node.deny(IN, &paths(&["/tmp/x"])));
        assert!(!node.is_granted(IN, ""));
        assert!(node.denied_paths(IN).is_empty());
    }

    #[test]
    fn test_deny_paths_inside_open_direction() {
        let node = FilesystemNode::new();
        node.apply("read");

        assert!(node.deny(
            IN,
            &paths(&["/example/foo*", "/show", "/slower", "/slown"])
        ));

        assert!(node.is_granted(IN, ""));
        assert!(node.is_granted(IN, "/slow"));
        assert!(node.is_granted(IN, "/slows"));
        assert!(!node.is_granted(IN, "/slown"));
        assert!(!node.is_granted(IN, "/show"));
        assert!(!node.is_granted(IN, "/example/foo2/file"));
        assert!(node.is_granted(IN, "/example/fo/foo2.js"));
        assert!(!node.is_granted(OUT, ""));
    }

    #[test]
    fn test_deny_directory_carves_out_subtree() {
        let tmp = TempDir::new().unwrap();
        let root = dir_string(&tmp);
        let secret = tmp.path().join("secret");
        std::fs::create_dir(&secret).unwrap();
        let secret = secret.to_string_lossy().into_owned();

        let node = FilesystemNode::new();
        node.apply(&format!("write:{}", root));
        node.deny(OUT, &[secret.clone()]);

        assert!(node.is_granted(OUT, &format!("{}/public.txt", root)));
        assert!(!node.is_granted(OUT, &secret));
        assert!(!node.is_granted(OUT, &format!("{}/key.pem", secret)));
    }

    #[test]
    fn test_deny_removes_exact_grant() {
        let node = FilesystemNode::new();
        node.apply("read:/srv/a.txt,read:/srv/b.txt");

        node.deny(IN, &paths(&["/srv/a.txt"]));

        assert!(!node.is_granted(IN, "/srv/a.txt"));
        assert!(node.is_granted(IN, "/srv/b.txt"));
        assert_eq!(node.granted_paths(IN), paths(&["/srv/b.txt"]));
        assert_eq!(node.denied_paths(IN), paths(&["/srv/a.txt"]));
    }

    #[test]
    fn test_narrow_grant_cannot_override_denial() {
        let node = FilesystemNode::new();
        node.apply("read");
        node.deny(IN, &paths(&["/etc/shadow"]));

        node.apply("read:/etc/shadow");
        assert!(!node.is_granted(IN, "/etc/shadow"));

        // A broad grant resets the direction
        node.apply("read");
        assert!(node.is_granted(IN, "/etc/shadow"));
    }

    #[test]
    fn test_denial_before_any_grant_survives_narrow_grant() {
        let node = FilesystemNode::new();
        node.deny(IN, &paths(&["/srv/secret.key"]));
        assert_eq!(node.denied_paths(IN), paths(&["/srv/secret.key"]));

        node.apply("read:/srv/secret.key,read:/srv/public");
        assert!(!node.is_granted(IN, "/srv/secret.key"));
        assert!(node.is_granted(IN, "/srv/public"));

        node.apply("read");
        assert!(node.is_granted(IN, "/srv/secret.key"));
    }

    #[test]
    fn test_empty_resource_opens_direction_only() {
        let node = FilesystemNode::new();
        node.apply("read:");

        assert!(node.is_granted(IN, ""));
        assert!(!node.is_granted(IN, "/etc/hosts"));
        assert!(!node.is_granted(OUT, ""));
        assert!(node.granted_paths(IN).is_empty());
    }

    #[test]
    fn test_revoked_direction_needs_broad_grant() {
        let node = FilesystemNode::new();
        node.apply("read:/data.csv");
        node.deny(IN, &[]);

        node.apply("read:/other.csv");
        assert!(!node.is_granted(IN, "/other.csv"));
        assert!(!node.is_granted(IN, ""));

        node.apply("fs");
        assert!(node.is_granted(IN, "/other.csv"));
    }

    #[test]
    fn test_other_scopes_not_handled() {
        let node = FilesystemNode::new();
        node.apply("fs");

        assert!(!node.deny(PermissionScope::ChildProcess, &[]));
        assert!(!node.is_granted(PermissionScope::WorkerThreads, ""));
        assert!(!node.is_granted(PermissionScope::Root, ""));
    }

    #[test]
    fn test_expand_resource() {
        let tmp = TempDir::new().unwrap();
        let root = dir_string(&tmp);

        assert_eq!(
            expand_resource(&format!("{}/", root)),
            vec![root.clone(), format!("{}/*", root)]
        );
        assert_eq!(expand_resource("/no/such/file"), paths(&["/no/such/file"]));
        assert_eq!(expand_resource("/"), paths(&["/", "/*"]));
    }
}

//! Radix tree path matcher
//!
//! A compressed trie over the raw bytes of a path. Every node owns a prefix
//! and a map from the first byte of each child's prefix to that child, so no
//! two siblings ever start with the same byte. A node can additionally be
//! marked:
//!
//! - `terminal` - a path ending exactly here was inserted
//! - `wildcard` - a path ending here with `*` was inserted; any input that
//!   reaches this node matches, whatever its remaining suffix
//!
//! No normalization happens here. Callers hand in already-resolved paths.

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::mem;

/// Byte that turns the rest of an inserted path into a catch-all
pub const WILDCARD: u8 = b'*';

#[derive(Debug, Default, Clone)]
struct Node {
    prefix: Vec<u8>,
    children: BTreeMap<u8, Node>,
    terminal: bool,
    wildcard: bool,
}

impl Node {
    fn leaf(prefix: &[u8]) -> Self {
        Self {
            prefix: prefix.to_vec(),
            ..Self::default()
        }
    }

    /// Walk (creating and splitting as needed) to the node for `key`.
    ///
    /// `key` is what remains of the inserted path after this node's prefix.
    fn descend(&mut self, key: &[u8]) -> &mut Node {
        let Some(&first) = key.first() else {
            return self;
        };

        match self.children.entry(first) {
            Entry::Vacant(slot) => slot.insert(Node::leaf(key)),
            Entry::Occupied(slot) => {
                let child = slot.into_mut();
                let common = common_prefix_len(&child.prefix, key);
                if common < child.prefix.len() {
                    child.split(common);
                }
                child.descend(&key[common..])
            }
        }
    }

    /// Keep `prefix[..at]` here and push everything else one level down.
    fn split(&mut self, at: usize) {
        let suffix = self.prefix.split_off(at);
        let lower = Node {
            prefix: suffix,
            children: mem::take(&mut self.children),
            terminal: mem::replace(&mut self.terminal, false),
            wildcard: mem::replace(&mut self.wildcard, false),
        };
        self.children.insert(lower.prefix[0], lower);
    }

    fn remove(&mut self, key: &[u8], wildcard: bool) -> bool {
        let Some(&first) = key.first() else {
            let mark = if wildcard {
                &mut self.wildcard
            } else {
                &mut self.terminal
            };
            return mem::replace(mark, false);
        };

        let Some(child) = self.children.get_mut(&first) else {
            return false;
        };
        if !key.starts_with(&child.prefix) {
            return false;
        }

        let consumed = child.prefix.len();
        if !child.remove(&key[consumed..], wildcard) {
            return false;
        }

        if child.is_vacant() {
            self.children.remove(&first);
        } else {
            child.merge_only_child();
        }
        true
    }

    fn is_vacant(&self) -> bool {
        !self.terminal && !self.wildcard && self.children.is_empty()
    }

    /// Re-compress an unmarked node that is left with a single child.
    fn merge_only_child(&mut self) {
        if self.terminal || self.wildcard || self.children.len() != 1 {
            return;
        }
        if let Some((_, only)) = self.children.pop_first() {
            self.prefix.extend_from_slice(&only.prefix);
            self.children = only.children;
            self.terminal = only.terminal;
            self.wildcard = only.wildcard;
        }
    }

    fn collect(&self, path: &mut Vec<u8>, out: &mut Vec<String>) {
        let restore = path.len();
        path.extend_from_slice(&self.prefix);

        if self.terminal {
            out.push(String::from_utf8_lossy(path).into_owned());
        }
        if self.wildcard {
            let mut entry = String::from_utf8_lossy(path).into_owned();
            entry.push(WILDCARD as char);
            out.push(entry);
        }
        for child in self.children.values() {
            child.collect(path, out);
        }

        path.truncate(restore);
    }
}

fn common_prefix_len(a: &[u8], b: &[u8]) -> usize {
    a.iter().zip(b).take_while(|(x, y)| x == y).count()
}

/// Splits an inserted path into its literal part and whether it ends in a wildcard.
///
/// Everything after the first `*` is ignored.
fn split_wildcard(path: &str) -> (&[u8], bool) {
    let bytes = path.as_bytes();
    match bytes.iter().position(|&b| b == WILDCARD) {
        Some(at) => (&bytes[..at], true),
        None => (bytes, false),
    }
}

/// Set of granted (or denied) paths with directory-subtree wildcards
///
/// # Example
///
/// ```
/// use permission_engine::permissions::PathMatcher;
///
/// let mut matcher = PathMatcher::new();
/// matcher.insert("/tmp/*");
/// matcher.insert("/etc/app.conf");
///
/// assert!(matcher.lookup("/tmp/a/b.txt"));
/// assert!(matcher.lookup("/etc/app.conf"));
/// assert!(!matcher.lookup("/etc/app.conf.bak"));
/// assert!(!matcher.lookup("/tmpx/secret"));
/// ```
#[derive(Debug, Default, Clone)]
pub struct PathMatcher {
    root: Node,
    len: usize,
}

impl PathMatcher {
    /// Create an empty matcher
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a path. A `*` ends the path and covers every suffix from there.
    ///
    /// Returns `false` when the entry was already present.
    pub fn insert(&mut self, path: &str) -> bool {
        let (literal, wildcard) = split_wildcard(path);
        let node = self.root.descend(literal);
        let mark = if wildcard {
            &mut node.wildcard
        } else {
            &mut node.terminal
        };

        let added = !mem::replace(mark, true);
        if added {
            self.len += 1;
        }
        added
    }

    /// Whether `path` equals an inserted entry or falls under a wildcard entry
    pub fn lookup(&self, path: &str) -> bool {
        let mut node = &self.root;
        let mut rest = path.as_bytes();

        loop {
            if node.wildcard {
                return true;
            }
            let Some(first) = rest.first() else {
                return node.terminal;
            };
            let Some(child) = node.children.get(first) else {
                return false;
            };
            if !rest.starts_with(&child.prefix) {
                return false;
            }
            rest = &rest[child.prefix.len()..];
            node = child;
        }
    }

    /// Remove an entry previously added with [`PathMatcher::insert`].
    ///
    /// Only the exact entry is removed (`/tmp/*` removes the wildcard, `/tmp/a`
    /// removes the literal). Paths merely covered by a wildcard are untouched.
    /// Returns whether anything was removed.
    pub fn remove(&mut self, path: &str) -> bool {
        let (literal, wildcard) = split_wildcard(path);
        let removed = self.root.remove(literal, wildcard);
        if removed {
            self.len -= 1;
        }
        removed
    }

    /// Number of entries (literal and wildcard)
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether no entry has been inserted
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Drop every entry
    pub fn clear(&mut self) {
        self.root = Node::default();
        self.len = 0;
    }

    /// Reconstruct the inserted entries in byte order; wildcard entries end in `*`
    pub fn entries(&self) -> Vec<String> {
        let mut out = Vec::with_capacity(self.len);
        self.root.collect(&mut Vec::new(), &mut out);
        out
    }
}

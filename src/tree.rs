//! The aggregated file tree.
//!
//! [`TreeBuilder`] accumulates resolved files from every source, keeping one
//! directory node per name at each level. [`TreeBuilder::finish`] flattens the
//! result and sorts it once with [`sort_nodes`].

use std::cmp::Ordering;
use std::collections::hash_map::Entry;
use std::collections::HashMap;

use tracing::{debug, warn};

use crate::policy::Policy;

/// The type of a tree node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    Directory,
    File {
        /// Decoded text or a placeholder.
        content: String,
    },
}

impl NodeKind {
    /// Check if this is a directory.
    pub fn is_directory(&self) -> bool {
        matches!(self, NodeKind::Directory)
    }

    /// Check if this is a file.
    pub fn is_file(&self) -> bool {
        matches!(self, NodeKind::File { .. })
    }
}

/// A node in the aggregated tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeNode {
    /// File or directory name (not full path).
    pub name: String,
    /// Slash-joined logical path from the top of the tree.
    pub path: String,
    /// Type of node (file or directory).
    pub kind: NodeKind,
    /// Child nodes (empty for files).
    children: Vec<TreeNode>,
}

impl TreeNode {
    /// Create a new directory node.
    pub fn directory(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            kind: NodeKind::Directory,
            children: Vec::new(),
        }
    }

    /// Create a new file node.
    pub fn file(
        name: impl Into<String>,
        path: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            kind: NodeKind::File {
                content: content.into(),
            },
            children: Vec::new(),
        }
    }

    pub fn is_directory(&self) -> bool {
        self.kind.is_directory()
    }

    pub fn is_file(&self) -> bool {
        self.kind.is_file()
    }

    /// Add a child node. Only meaningful for directories.
    pub fn add_child(&mut self, child: TreeNode) {
        self.children.push(child);
    }

    pub fn children(&self) -> &[TreeNode] {
        &self.children
    }

    /// File content, if this is a file.
    pub fn content(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::File { content } => Some(content),
            NodeKind::Directory => None,
        }
    }

    /// Sort children: directories first, then by name. Recurses.
    pub fn sort_children(&mut self) {
        sort_nodes(&mut self.children);
    }

    /// Count total files in this subtree.
    pub fn file_count(&self) -> usize {
        match &self.kind {
            NodeKind::File { .. } => 1,
            NodeKind::Directory => file_count(&self.children),
        }
    }

    /// Count directories in this subtree, including this one.
    pub fn directory_count(&self) -> usize {
        match &self.kind {
            NodeKind::File { .. } => 0,
            NodeKind::Directory => 1 + directory_count(&self.children),
        }
    }

    /// Count content lines in this subtree.
    pub fn line_count(&self) -> usize {
        match &self.kind {
            NodeKind::File { content } => count_lines(content),
            NodeKind::Directory => line_count(&self.children),
        }
    }
}

fn count_lines(content: &str) -> usize {
    if content.is_empty() {
        return 0;
    }
    let newlines = bytecount::count(content.as_bytes(), b'\n');
    if content.ends_with('\n') {
        newlines
    } else {
        newlines + 1
    }
}

/// Count files across a node list.
pub fn file_count(nodes: &[TreeNode]) -> usize {
    nodes.iter().map(TreeNode::file_count).sum()
}

/// Count directories across a node list.
pub fn directory_count(nodes: &[TreeNode]) -> usize {
    nodes.iter().map(TreeNode::directory_count).sum()
}

/// Count content lines across a node list.
pub fn line_count(nodes: &[TreeNode]) -> usize {
    nodes.iter().map(TreeNode::line_count).sum()
}

/// Compare two names the way a locale-aware collation would for plain names.
///
/// Case is ignored first. Among names that differ only in case, the lowercase
/// form sorts first. Remaining ties fall back to code points so the order is
/// total.
pub fn compare_names(a: &str, b: &str) -> Ordering {
    let folded_a = a.chars().flat_map(char::to_lowercase);
    let folded_b = b.chars().flat_map(char::to_lowercase);

    folded_a
        .cmp(folded_b)
        .then_with(|| {
            a.chars()
                .zip(b.chars())
                .find(|(x, y)| x != y)
                .map_or(Ordering::Equal, |(x, y)| {
                    match (x.is_lowercase(), y.is_lowercase()) {
                        (true, false) => Ordering::Less,
                        (false, true) => Ordering::Greater,
                        _ => x.cmp(&y),
                    }
                })
        })
        .then_with(|| a.cmp(b))
}

fn compare_nodes(a: &TreeNode, b: &TreeNode) -> Ordering {
    match (&a.kind, &b.kind) {
        (NodeKind::Directory, NodeKind::File { .. }) => Ordering::Less,
        (NodeKind::File { .. }, NodeKind::Directory) => Ordering::Greater,
        _ => compare_names(&a.name, &b.name),
    }
}

/// Sort a node list in place: directories before files, then by name.
///
/// Every directory's children are sorted too. The sort is stable, so nodes that
/// compare equal (same-named top-level sources) keep their source order.
pub fn sort_nodes(nodes: &mut [TreeNode]) {
    nodes.sort_by(compare_nodes);
    for node in nodes.iter_mut() {
        node.sort_children();
    }
}

fn join_path(prefix: &str, name: &str) -> String {
    format!("{}/{}", prefix, name)
}

/// A directory under construction, with children keyed by name.
#[derive(Debug)]
struct PendingDirectory {
    name: String,
    path: String,
    dirs: HashMap<String, PendingDirectory>,
    files: HashMap<String, TreeNode>,
}

impl PendingDirectory {
    fn new(name: String, path: String) -> Self {
        Self {
            name,
            path,
            dirs: HashMap::new(),
            files: HashMap::new(),
        }
    }

    fn insert(&mut self, segments: &[String], content: String, policy: &Policy) -> bool {
        match segments {
            [] => false,
            [name] => {
                if policy.is_ignored_name(name) {
                    return false;
                }
                match self.files.entry(name.clone()) {
                    Entry::Occupied(existing) => {
                        debug!(path = %existing.get().path, "duplicate file path, keeping the first");
                        false
                    }
                    Entry::Vacant(slot) => {
                        let path = join_path(&self.path, name);
                        slot.insert(TreeNode::file(name.clone(), path, content));
                        true
                    }
                }
            }
            [head, rest @ ..] => {
                let parent_path = &self.path;
                self.dirs
                    .entry(head.clone())
                    .or_insert_with(|| {
                        PendingDirectory::new(head.clone(), join_path(parent_path, head))
                    })
                    .insert(rest, content, policy)
            }
        }
    }

    fn into_node(self) -> TreeNode {
        let mut node = TreeNode::directory(self.name, self.path);

        for (name, file) in self.files {
            if self.dirs.contains_key(&name) {
                warn!(path = %file.path, "file shares its name with a directory; keeping the directory");
                continue;
            }
            node.add_child(file);
        }

        for (_, dir) in self.dirs {
            node.add_child(dir.into_node());
        }

        node
    }
}

#[derive(Debug)]
enum PendingRoot {
    File(TreeNode),
    Directory(PendingDirectory),
}

/// Handle to a directory-source root inside a [`TreeBuilder`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RootId(usize);

/// Accumulates resolved files into one tree.
///
/// # Examples
///
/// ```
/// use promptdump::tree::TreeBuilder;
/// use promptdump::Policy;
///
/// let policy = Policy::default();
/// let mut builder = TreeBuilder::new(&policy);
/// let root = builder.push_directory("proj");
/// builder.insert(root, &["src".into(), "a.txt".into()], "hello".into());
/// builder.insert(root, &["src".into(), "b.txt".into()], "world".into());
///
/// let tree = builder.finish();
/// assert_eq!(tree.len(), 1);
/// assert_eq!(tree[0].children().len(), 1); // one `src`
/// assert_eq!(tree[0].file_count(), 2);
/// ```
#[derive(Debug)]
pub struct TreeBuilder<'p> {
    policy: &'p Policy,
    roots: Vec<PendingRoot>,
}

impl<'p> TreeBuilder<'p> {
    pub fn new(policy: &'p Policy) -> Self {
        Self {
            policy,
            roots: Vec::new(),
        }
    }

    /// Start a fresh top-level directory for a directory source.
    ///
    /// Never merges with an existing root of the same name.
    pub fn push_directory(&mut self, name: &str) -> RootId {
        let id = RootId(self.roots.len());
        self.roots.push(PendingRoot::Directory(PendingDirectory::new(
            name.to_string(),
            name.to_string(),
        )));
        id
    }

    /// Append a top-level file. Returns `false` if its name is ignored.
    pub fn push_file(&mut self, name: &str, content: String) -> bool {
        if self.policy.is_ignored_name(name) {
            return false;
        }
        self.roots
            .push(PendingRoot::File(TreeNode::file(name, name, content)));
        true
    }

    /// Insert a file below a directory root at the given segments.
    ///
    /// Intermediate directories are created on first use and reused after.
    /// Returns `false` when nothing was inserted.
    pub fn insert(&mut self, root: RootId, segments: &[String], content: String) -> bool {
        match self.roots.get_mut(root.0) {
            Some(PendingRoot::Directory(dir)) => dir.insert(segments, content, self.policy),
            _ => false,
        }
    }

    /// Flatten and sort the accumulated tree.
    pub fn finish(self) -> Vec<TreeNode> {
        let mut nodes: Vec<TreeNode> = self
            .roots
            .into_iter()
            .map(|root| match root {
                PendingRoot::File(node) => node,
                PendingRoot::Directory(dir) => dir.into_node(),
            })
            .collect();

        sort_nodes(&mut nodes);
        nodes
    }
}

//! Text serializers for a finished tree.
//!
//! Both functions are pure and expect a sorted tree; given the same tree they
//! always produce the same bytes.

use crate::tree::{NodeKind, TreeNode};

/// Box-drawing characters for tree rendering.
const BRANCH: &str = "├── ";
const LAST_BRANCH: &str = "└── ";
const VERTICAL: &str = "│   ";
const SPACE: &str = "    ";

/// Opening of a per-file header in the contents dump.
pub const FILE_HEADER_PREFIX: &str = "# -------- FILE: ";
/// Closing of a per-file header in the contents dump.
pub const FILE_HEADER_SUFFIX: &str = " --------";

/// Render the tree as a box-drawing listing.
///
/// Each top-level node is a line of its own; directories list their children
/// below it. Every line ends with `\n`.
///
/// # Examples
///
/// ```
/// use promptdump::render::render_structure;
/// use promptdump::tree::TreeNode;
///
/// let mut root = TreeNode::directory("proj", "proj");
/// root.add_child(TreeNode::file("a.txt", "proj/a.txt", "hello"));
///
/// assert_eq!(render_structure(&[root]), "proj\n└── a.txt\n");
/// ```
pub fn render_structure(tree: &[TreeNode]) -> String {
    let mut output = String::with_capacity(4096);
    for node in tree {
        output.push_str(&node.name);
        output.push('\n');
        render_children(&mut output, node.children(), "");
    }
    output
}

fn render_children(output: &mut String, children: &[TreeNode], prefix: &str) {
    let child_count = children.len();
    for (i, child) in children.iter().enumerate() {
        let is_last = i + 1 == child_count;

        output.push_str(prefix);
        output.push_str(if is_last { LAST_BRANCH } else { BRANCH });
        output.push_str(&child.name);
        output.push('\n');

        if child.is_directory() {
            let continuation = if is_last { SPACE } else { VERTICAL };
            let child_prefix = format!("{}{}", prefix, continuation);
            render_children(output, child.children(), &child_prefix);
        }
    }
}

/// Render every file's content under a header naming its full path.
///
/// Files appear in depth-first order. The result is trimmed, so an empty tree
/// gives an empty string.
///
/// # Examples
///
/// ```
/// use promptdump::render::render_contents;
/// use promptdump::tree::TreeNode;
///
/// let file = TreeNode::file("a.txt", "a.txt", "hello");
/// assert_eq!(
///     render_contents(&[file]),
///     "# -------- FILE: a.txt --------\n\n```\nhello\n```"
/// );
/// ```
pub fn render_contents(tree: &[TreeNode]) -> String {
    let mut output = String::with_capacity(8192);
    for node in tree {
        push_file_sections(&mut output, node);
    }
    output.trim().to_string()
}

fn push_file_sections(output: &mut String, node: &TreeNode) {
    match &node.kind {
        NodeKind::File { content } => {
            output.push('\n');
            output.push_str(FILE_HEADER_PREFIX);
            output.push_str(&node.path);
            output.push_str(FILE_HEADER_SUFFIX);
            output.push_str("\n\n```\n");
            output.push_str(content);
            output.push_str("\n```\n");
        }
        NodeKind::Directory => {
            for child in node.children() {
                push_file_sections(output, child);
            }
        }
    }
}

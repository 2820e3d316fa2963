//! Output formatting for promptdump.
//!
//! Wraps the two strings of an [`Aggregation`] into one document: XML-style
//! tags, Markdown sections, or JSON for programmatic access.

use serde::Serialize;
use thiserror::Error;

use crate::builder::Aggregation;
use crate::tokens::{count_tokens, Encoding};
use crate::tree::{NodeKind, TreeNode};

/// Errors that can occur during output formatting.
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Output format selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// XML-style tags around plain text (default).
    #[default]
    Xml,
    /// Markdown headings with a fenced structure block.
    Markdown,
    /// JSON for programmatic access.
    Json,
}

/// Options controlling what the document contains.
#[derive(Debug, Clone)]
pub struct OutputOptions {
    pub format: OutputFormat,
    /// Include the tree listing.
    pub include_structure: bool,
    /// Include the file contents dump.
    pub include_contents: bool,
    /// Encoding for the JSON summary's token count.
    pub encoding: Encoding,
}

impl Default for OutputOptions {
    fn default() -> Self {
        Self {
            format: OutputFormat::Xml,
            include_structure: true,
            include_contents: true,
            encoding: Encoding::default(),
        }
    }
}

impl OutputOptions {
    /// Options for the tree listing alone.
    pub fn structure_only() -> Self {
        Self {
            include_contents: false,
            ..Default::default()
        }
    }

    /// Options for the contents dump alone.
    pub fn contents_only() -> Self {
        Self {
            include_structure: false,
            ..Default::default()
        }
    }
}

/// Size figures for a finished pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub files: usize,
    pub directories: usize,
    pub lines: usize,
    pub tokens: usize,
}

impl Summary {
    /// Compute the summary; tokens cover the structure and contents strings.
    pub fn compute(aggregation: &Aggregation, encoding: Encoding) -> Self {
        Self {
            tokens: count_tokens(&aggregation.structure, encoding)
                + count_tokens(&aggregation.contents, encoding),
            ..Self::compute_counts(aggregation)
        }
    }

    /// Like [`Summary::compute`], with tokens over the included sections only.
    pub fn for_document(aggregation: &Aggregation, options: &OutputOptions) -> Self {
        let mut tokens = 0;
        if options.include_structure {
            tokens += count_tokens(&aggregation.structure, options.encoding);
        }
        if options.include_contents {
            tokens += count_tokens(&aggregation.contents, options.encoding);
        }
        Self {
            tokens,
            ..Self::compute_counts(aggregation)
        }
    }

    fn compute_counts(aggregation: &Aggregation) -> Self {
        Self {
            files: aggregation.file_count(),
            directories: aggregation.directory_count(),
            lines: aggregation.line_count(),
            tokens: 0,
        }
    }
}

// ============================================================================
// Main Entry Point
// ============================================================================

/// Format the final document.
pub fn format_document(
    aggregation: &Aggregation,
    options: &OutputOptions,
) -> Result<String, OutputError> {
    match options.format {
        OutputFormat::Xml => Ok(format_xml(aggregation, options)),
        OutputFormat::Markdown => Ok(format_markdown(aggregation, options)),
        OutputFormat::Json => format_json(aggregation, options),
    }
}

// ============================================================================
// Text Formatting
// ============================================================================

fn format_xml(aggregation: &Aggregation, options: &OutputOptions) -> String {
    let mut output = String::with_capacity(
        aggregation.structure.len() + aggregation.contents.len() + 128,
    );

    if options.include_structure {
        push_tagged(&mut output, "file_map", aggregation.structure.trim());
    }

    if options.include_contents {
        if !output.is_empty() {
            output.push('\n');
        }
        push_tagged(&mut output, "file_contents", &aggregation.contents);
    }

    output
}

fn push_tagged(output: &mut String, tag: &str, body: &str) {
    output.push_str(&format!("<{}>\n", tag));
    if !body.is_empty() {
        output.push_str(body);
        output.push('\n');
    }
    output.push_str(&format!("</{}>\n", tag));
}

fn format_markdown(aggregation: &Aggregation, options: &OutputOptions) -> String {
    let mut output = String::with_capacity(
        aggregation.structure.len() + aggregation.contents.len() + 128,
    );

    if options.include_structure {
        output.push_str("## Project structure\n\n```\n");
        let structure = aggregation.structure.trim();
        if !structure.is_empty() {
            output.push_str(structure);
            output.push('\n');
        }
        output.push_str("```\n");
    }

    if options.include_contents {
        if !output.is_empty() {
            output.push('\n');
        }
        output.push_str("## File contents\n");
        if !aggregation.contents.is_empty() {
            output.push('\n');
            output.push_str(&aggregation.contents);
            output.push('\n');
        }
    }

    output
}

// ============================================================================
// JSON Formatting
// ============================================================================

#[derive(Serialize)]
struct JsonOutput<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    structure: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    contents: Option<&'a str>,
    tree: Vec<JsonTree<'a>>,
    summary: Summary,
}

#[derive(Serialize)]
struct JsonTree<'a> {
    name: &'a str,
    path: &'a str,
    kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<&'a str>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    children: Vec<JsonTree<'a>>,
}

/// File bodies are left out unless `with_contents` is set.
fn tree_to_json(node: &TreeNode, with_contents: bool) -> JsonTree<'_> {
    let (kind, content) = match &node.kind {
        NodeKind::Directory => ("directory", None),
        NodeKind::File { content } => ("file", with_contents.then_some(content.as_str())),
    };

    JsonTree {
        name: &node.name,
        path: &node.path,
        kind,
        content,
        children: node
            .children()
            .iter()
            .map(|child| tree_to_json(child, with_contents))
            .collect(),
    }
}

fn format_json(aggregation: &Aggregation, options: &OutputOptions) -> Result<String, OutputError> {
    let output = JsonOutput {
        structure: options
            .include_structure
            .then(|| aggregation.structure.trim_end()),
        contents: options
            .include_contents
            .then_some(aggregation.contents.as_str()),
        tree: aggregation
            .tree
            .iter()
            .map(|node| tree_to_json(node, options.include_contents))
            .collect(),
        summary: Summary::for_document(aggregation, options),
    };

    let mut json = serde_json::to_string_pretty(&output)?;
    json.push('\n');
    Ok(json)
}

//! promptdump - Merge selected files and directories into LLM-ready text.
//!
//! Takes a list of independently selected sources (loose files or whole
//! directories), merges them into one sorted tree, and renders two strings:
//! a box-drawing tree listing and a dump of every file's contents under a
//! header naming its path.
//!
//! # Quick Start
//!
//! ```
//! use promptdump::builder::Aggregator;
//! use promptdump::source::{FileHandle, Source, SourceId};
//!
//! let sources = vec![
//!     Source::directory(
//!         SourceId::new("1"),
//!         "proj",
//!         vec![
//!             FileHandle::text("a.txt", "hello").with_relative_path("proj/src/a.txt"),
//!             FileHandle::text("x.js", "skip me").with_relative_path("proj/node_modules/x.js"),
//!         ],
//!     ),
//!     Source::file(SourceId::new("2"), FileHandle::text("notes.md", "# Notes")),
//! ];
//!
//! let result = Aggregator::new().run(&sources).unwrap();
//! assert_eq!(result.structure, "proj\n└── src\n    └── a.txt\nnotes.md\n");
//! assert!(!result.contents.contains("x.js"));
//! ```
//!
//! # Modules
//!
//! - [`policy`] - Ignore lists and binary detection
//! - [`source`] - Sources and file handles supplied by the caller
//! - [`resolver`] - Placement of a handle within its source
//! - [`tree`] - Tree construction, ordering, and counts
//! - [`render`] - Tree listing and contents dump
//! - [`builder`] - One aggregation pass
//! - [`walker`] - Building sources from filesystem paths
//! - [`output`] - Final document formats
//! - [`tokens`] - Token estimates

pub mod policy;
pub mod source;
pub mod errors;
pub mod resolver;
pub mod tree;
pub mod render;
pub mod builder;
pub mod walker;
pub mod output;
pub mod tokens;

// Re-export key types at crate root for convenience
pub use builder::{aggregate, Aggregation, Aggregator, CancelFlag};
pub use errors::PromptDumpError;
pub use output::{format_document, OutputError, OutputFormat, OutputOptions, Summary};
pub use policy::{Policy, PolicyError};
pub use render::{render_contents, render_structure};
pub use source::{FileHandle, HandleContent, Source, SourceError, SourceId, SourceKind, SourceSet};
pub use tree::{NodeKind, TreeNode};
pub use walker::WalkError;

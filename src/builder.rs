//! Fluent builder API for one aggregation pass.
//!
//! A pass runs in three phases: every handle is resolved against the policy
//! (sequential), the surviving handles are read in parallel, and the results
//! are inserted into a [`TreeBuilder`] in enumeration order before a single
//! sort. Nothing is rendered until the whole pass has completed.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use rayon::prelude::*;
use tracing::{debug, trace};

use crate::errors::PromptDumpError;
use crate::policy::Policy;
use crate::render::{render_contents, render_structure};
use crate::resolver::{resolve_directory_entry, resolve_file_entry, Resolution};
use crate::source::{FileHandle, Source, SourceError, SourceKind};
use crate::tree::{self, RootId, TreeBuilder, TreeNode};

/// Shared flag for abandoning a pass from another thread.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Reads that have not started are skipped.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Builder for aggregating sources.
///
/// # Examples
///
/// ```
/// use promptdump::builder::Aggregator;
/// use promptdump::source::{FileHandle, Source, SourceId};
///
/// let handle = FileHandle::text("a.txt", "hello").with_relative_path("proj/src/a.txt");
/// let sources = vec![Source::directory(SourceId::new("1"), "proj", vec![handle])];
///
/// let result = Aggregator::new().run(&sources).unwrap();
/// assert_eq!(result.structure, "proj\n└── src\n    └── a.txt\n");
/// assert!(result.contents.contains("# -------- FILE: proj/src/a.txt --------"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct Aggregator {
    policy: Policy,
    cancel: Option<CancelFlag>,
}

/// Where a planned file goes once its content is known.
enum Target {
    TopLevel,
    Under(RootId),
}

struct PlannedFile<'a> {
    target: Target,
    segments: Vec<String>,
    handle: &'a FileHandle,
}

impl Aggregator {
    /// Create an aggregator with the built-in policy.
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a custom classification policy.
    pub fn policy(mut self, policy: Policy) -> Self {
        self.policy = policy;
        self
    }

    /// Abandon the pass when `flag` is raised.
    pub fn cancel_on(mut self, flag: CancelFlag) -> Self {
        self.cancel = Some(flag);
        self
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(CancelFlag::is_cancelled)
    }

    /// Run one pass over `sources`.
    ///
    /// Either both output strings are produced or an error is returned; no
    /// partial result is exposed.
    pub fn run(&self, sources: &[Source]) -> Result<Aggregation, PromptDumpError> {
        debug!(sources = sources.len(), "aggregation pass started");

        let mut builder = TreeBuilder::new(&self.policy);
        let planned = self.plan(sources, &mut builder)?;

        if self.is_cancelled() {
            return Err(PromptDumpError::Cancelled);
        }

        let contents = self.read(&planned)?;

        for (file, content) in planned.into_iter().zip(contents) {
            match file.target {
                Target::TopLevel => builder.push_file(&file.segments[0], content),
                Target::Under(root) => builder.insert(root, &file.segments, content),
            };
        }

        let tree = builder.finish();
        let structure = render_structure(&tree);
        let contents = render_contents(&tree);

        debug!(
            files = tree::file_count(&tree),
            directories = tree::directory_count(&tree),
            "aggregation pass finished"
        );

        Ok(Aggregation {
            tree,
            structure,
            contents,
        })
    }

    /// Resolve the content of every planned file in parallel.
    ///
    /// Reads that have not started when cancellation is requested are skipped
    /// and the whole phase fails.
    fn read(&self, planned: &[PlannedFile<'_>]) -> Result<Vec<String>, PromptDumpError> {
        planned
            .par_iter()
            .map(|file| {
                if self.is_cancelled() {
                    None
                } else {
                    Some(self.policy.resolve_content(file.handle))
                }
            })
            .collect::<Option<Vec<String>>>()
            .ok_or(PromptDumpError::Cancelled)
    }

    /// Resolve every handle and register directory roots.
    fn plan<'a>(
        &self,
        sources: &'a [Source],
        builder: &mut TreeBuilder<'_>,
    ) -> Result<Vec<PlannedFile<'a>>, SourceError> {
        let mut planned = Vec::new();

        for source in sources {
            let target = match source.kind {
                SourceKind::File => None,
                SourceKind::Directory => {
                    if source.name.is_empty() {
                        return Err(SourceError::EmptyName {
                            id: source.id.clone(),
                        });
                    }
                    Some(builder.push_directory(&source.name))
                }
            };

            for handle in &source.handles {
                let resolution = match target {
                    None => resolve_file_entry(source, handle, &self.policy)?,
                    Some(_) => resolve_directory_entry(source, handle, &self.policy)?,
                };

                match resolution {
                    Resolution::Place(segments) => planned.push(PlannedFile {
                        target: target.map_or(Target::TopLevel, Target::Under),
                        segments,
                        handle,
                    }),
                    Resolution::Exclude(reason) => {
                        trace!(source = %source.id, file = %handle.name, ?reason, "excluded");
                    }
                }
            }
        }

        Ok(planned)
    }
}

/// Result of one aggregation pass.
#[derive(Debug, Clone)]
pub struct Aggregation {
    /// The sorted tree.
    pub tree: Vec<TreeNode>,
    /// Box-drawing listing of the tree.
    pub structure: String,
    /// Concatenated file contents with per-file headers.
    pub contents: String,
}

impl Aggregation {
    pub fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }

    pub fn file_count(&self) -> usize {
        tree::file_count(&self.tree)
    }

    pub fn directory_count(&self) -> usize {
        tree::directory_count(&self.tree)
    }

    pub fn line_count(&self) -> usize {
        tree::line_count(&self.tree)
    }
}

/// Aggregate sources with the built-in policy.
pub fn aggregate(sources: &[Source]) -> Result<Aggregation, PromptDumpError> {
    Aggregator::new().run(sources)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::SourceId;

    fn dir(name: &str, files: &[(&str, &str)]) -> Source {
        let handles = files
            .iter()
            .map(|(path, content)| {
                let file_name = path.rsplit('/').next().unwrap_or(path);
                FileHandle::text(file_name, *content).with_relative_path(*path)
            })
            .collect();
        Source::directory(SourceId::new(name), name, handles)
    }

    #[test]
    fn test_empty_input() {
        let result = aggregate(&[]).unwrap();
        assert!(result.is_empty());
        assert_eq!(result.structure, "");
        assert_eq!(result.contents, "");
    }

    #[test]
    fn test_file_sources_are_top_level() {
        let sources = vec![
            Source::file(SourceId::new("1"), FileHandle::text("b.txt", "bee")),
            Source::files(
                SourceId::new("2"),
                "picked",
                vec![FileHandle::text("a.txt", "ay"), FileHandle::text(".DS_Store", "")],
            ),
        ];

        let result = aggregate(&sources).unwrap();
        assert_eq!(result.structure, "a.txt\nb.txt\n");
        assert_eq!(result.tree[0].path, "a.txt");
        assert_eq!(result.file_count(), 2);
    }

    #[test]
    fn test_empty_directory_source_still_listed() {
        let sources = vec![dir("proj", &[("proj/node_modules/x.js", "x")])];
        let result = aggregate(&sources).unwrap();
        assert_eq!(result.structure, "proj\n");
        assert_eq!(result.contents, "");
    }

    #[test]
    fn test_malformed_source_fails_pass() {
        let sources = vec![
            dir("ok", &[("ok/a.txt", "a")]),
            Source::directory(SourceId::new("bad"), "", Vec::new()),
        ];
        let err = aggregate(&sources).unwrap_err();
        assert!(matches!(
            err,
            PromptDumpError::Processing(SourceError::EmptyName { .. })
        ));
    }

    #[test]
    fn test_cancelled_before_run() {
        let flag = CancelFlag::new();
        flag.cancel();
        let sources = vec![dir("proj", &[("proj/a.txt", "a")])];
        let err = Aggregator::new().cancel_on(flag).run(&sources).unwrap_err();
        assert!(matches!(err, PromptDumpError::Cancelled));
    }

    #[test]
    fn test_cancelled_during_read() {
        let flag = CancelFlag::new();
        let aggregator = Aggregator::new().cancel_on(flag.clone());
        let sources = vec![dir("proj", &[("proj/a.txt", "a"), ("proj/b.txt", "b")])];

        let policy = Policy::default();
        let mut builder = TreeBuilder::new(&policy);
        let planned = aggregator.plan(&sources, &mut builder).unwrap();
        assert_eq!(planned.len(), 2);
        assert_eq!(aggregator.read(&planned).unwrap(), vec!["a", "b"]);

        flag.cancel();
        let err = aggregator.read(&planned).unwrap_err();
        assert!(matches!(err, PromptDumpError::Cancelled));
    }

    #[test]
    fn test_custom_policy() {
        let policy = Policy::from_json(r#"{ "ignored_dirs": ["secret"] }"#).unwrap();
        let sources = vec![dir(
            "proj",
            &[("proj/secret/key.txt", "k"), ("proj/node_modules/m.js", "m")],
        )];

        let result = Aggregator::new().policy(policy).run(&sources).unwrap();
        assert_eq!(result.file_count(), 1);
        assert!(result.contents.contains("proj/node_modules/m.js"));
        assert!(!result.contents.contains("key.txt"));
    }

    #[test]
    fn test_unreadable_file_does_not_fail_pass() {
        let handle = FileHandle::disk("gone.txt", "/nonexistent/promptdump/gone.txt")
            .with_relative_path("proj/gone.txt");
        let sources = vec![Source::directory(SourceId::new("1"), "proj", vec![handle])];

        let result = aggregate(&sources).unwrap();
        assert!(result.contents.contains("[Error reading file: "));
    }
}

//! Path resolution: where a handle lands in the tree, if anywhere.
//!
//! Directory-source handles carry paths like `proj/src/a.txt`. The leading
//! root segment duplicates the source name and is dropped; the rest becomes the
//! placement under the source's directory node.

use crate::policy::Policy;
use crate::source::{FileHandle, Source, SourceError};

/// Why a handle was left out of the tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Exclusion {
    /// A path segment matched the ignored-directory list.
    IgnoredDirectory(String),
    /// The file name matched the ignored-name policy.
    IgnoredName(String),
}

/// Outcome of resolving one handle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Include the file at these segments (relative to its source root).
    Place(Vec<String>),
    /// Leave the file out.
    Exclude(Exclusion),
}

/// Resolve a handle belonging to a directory source.
///
/// # Examples
///
/// ```
/// use promptdump::resolver::{resolve_directory_entry, Resolution};
/// use promptdump::source::{FileHandle, Source, SourceId};
/// use promptdump::Policy;
///
/// let handle = FileHandle::text("a.txt", "hello").with_relative_path("proj/src/a.txt");
/// let source = Source::directory(SourceId::new("1"), "proj", vec![handle.clone()]);
///
/// let resolution = resolve_directory_entry(&source, &handle, &Policy::default()).unwrap();
/// assert_eq!(resolution, Resolution::Place(vec!["src".into(), "a.txt".into()]));
/// ```
pub fn resolve_directory_entry(
    source: &Source,
    handle: &FileHandle,
    policy: &Policy,
) -> Result<Resolution, SourceError> {
    let raw_path = handle.relative_path.as_deref().unwrap_or(&handle.name);

    let mut segments: Vec<&str> = raw_path.split('/').filter(|s| !s.is_empty()).collect();

    if segments.len() > 1 && segments[0] == source.name {
        segments.remove(0);
    }

    if segments.is_empty() {
        return Err(SourceError::EmptyPath {
            id: source.id.clone(),
            path: raw_path.to_string(),
        });
    }

    if let Some(dir) = segments.iter().find(|s| policy.is_ignored_dir_segment(s)) {
        return Ok(Resolution::Exclude(Exclusion::IgnoredDirectory(
            (*dir).to_string(),
        )));
    }

    let file_name = segments[segments.len() - 1];
    if policy.is_ignored_name(file_name) {
        return Ok(Resolution::Exclude(Exclusion::IgnoredName(
            file_name.to_string(),
        )));
    }

    Ok(Resolution::Place(
        segments.into_iter().map(str::to_string).collect(),
    ))
}

/// Resolve a handle belonging to a file source.
///
/// The bare name is used as-is; no path splitting happens.
pub fn resolve_file_entry(
    source: &Source,
    handle: &FileHandle,
    policy: &Policy,
) -> Result<Resolution, SourceError> {
    if handle.name.is_empty() {
        return Err(SourceError::EmptyFileName {
            id: source.id.clone(),
        });
    }

    if policy.is_ignored_name(&handle.name) {
        return Ok(Resolution::Exclude(Exclusion::IgnoredName(
            handle.name.clone(),
        )));
    }

    Ok(Resolution::Place(vec![handle.name.clone()]))
}

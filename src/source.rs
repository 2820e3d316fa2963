//! Sources: the caller's selected files and directories.
//!
//! A [`Source`] is either a set of loose files or one directory whose files
//! carry slash-delimited paths rooted at the directory name. Handles are read
//! at most once per aggregation pass.

use std::fmt;
use std::io;
use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

use crate::policy::extension_of;

/// Malformed source records. Any of these fails the whole pass.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("directory source {id} has an empty name")]
    EmptyName { id: SourceId },

    #[error("source {id} contains a file with an empty name")]
    EmptyFileName { id: SourceId },

    #[error("source {id}: path {path:?} has no usable segments")]
    EmptyPath { id: SourceId, path: String },
}

/// Opaque identifier of a source.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct SourceId(String);

impl SourceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Whether a source holds loose files or a single directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    File,
    Directory,
}

/// Where a handle's content comes from.
#[derive(Debug, Clone)]
pub enum HandleContent {
    /// Already-decoded text.
    Text(String),
    /// Raw bytes, decoded as UTF-8 on read.
    Bytes(Vec<u8>),
    /// A file on disk, read lazily.
    Disk(PathBuf),
}

impl HandleContent {
    /// Read the content as UTF-8 text.
    pub fn read_text(&self) -> io::Result<String> {
        match self {
            HandleContent::Text(text) => Ok(text.clone()),
            HandleContent::Bytes(bytes) => String::from_utf8(bytes.clone())
                .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e)),
            HandleContent::Disk(path) => std::fs::read_to_string(path),
        }
    }
}

/// One selected file.
#[derive(Debug, Clone)]
pub struct FileHandle {
    /// Bare file name.
    pub name: String,
    /// Slash-delimited path rooted at the source name (directory sources only).
    pub relative_path: Option<String>,
    /// Declared media type, e.g. `image/png`.
    pub media_type: Option<String>,
    /// Content stream.
    pub content: HandleContent,
}

impl FileHandle {
    pub fn new(name: impl Into<String>, content: HandleContent) -> Self {
        Self {
            name: name.into(),
            relative_path: None,
            media_type: None,
            content,
        }
    }

    /// Handle over in-memory text.
    pub fn text(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self::new(name, HandleContent::Text(text.into()))
    }

    /// Handle over in-memory bytes.
    pub fn bytes(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self::new(name, HandleContent::Bytes(bytes))
    }

    /// Handle over a file on disk.
    pub fn disk(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self::new(name, HandleContent::Disk(path.into()))
    }

    pub fn with_relative_path(mut self, path: impl Into<String>) -> Self {
        self.relative_path = Some(path.into());
        self
    }

    pub fn with_media_type(mut self, media_type: impl Into<String>) -> Self {
        self.media_type = Some(media_type.into());
        self
    }

    /// Lowercased extension of the bare name.
    pub fn extension(&self) -> Option<String> {
        extension_of(&self.name)
    }

    pub fn read_text(&self) -> io::Result<String> {
        self.content.read_text()
    }
}

/// One user-selected unit.
#[derive(Debug, Clone)]
pub struct Source {
    pub id: SourceId,
    pub name: String,
    pub kind: SourceKind,
    pub handles: Vec<FileHandle>,
}

impl Source {
    /// A source of loose files, each becoming a top-level entry.
    pub fn files(id: SourceId, name: impl Into<String>, handles: Vec<FileHandle>) -> Self {
        Self {
            id,
            name: name.into(),
            kind: SourceKind::File,
            handles,
        }
    }

    /// A source holding a single file, named after it.
    pub fn file(id: SourceId, handle: FileHandle) -> Self {
        let name = handle.name.clone();
        Self::files(id, name, vec![handle])
    }

    /// A directory source. Handles should carry paths rooted at `name`.
    pub fn directory(id: SourceId, name: impl Into<String>, handles: Vec<FileHandle>) -> Self {
        Self {
            id,
            name: name.into(),
            kind: SourceKind::Directory,
            handles,
        }
    }

    pub fn is_directory(&self) -> bool {
        self.kind == SourceKind::Directory
    }
}

/// The caller's current selection, in insertion order.
///
/// Ids are unique within one set and are never reused after removal.
#[derive(Debug, Default)]
pub struct SourceSet {
    sources: Vec<Source>,
    next_id: u64,
}

impl SourceSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a source and return its freshly allocated id.
    pub fn add(
        &mut self,
        kind: SourceKind,
        name: impl Into<String>,
        handles: Vec<FileHandle>,
    ) -> SourceId {
        let id = SourceId(format!("source-{}", self.next_id));
        self.next_id += 1;

        self.sources.push(Source {
            id: id.clone(),
            name: name.into(),
            kind,
            handles,
        });
        id
    }

    /// Remove a source by id.
    pub fn remove(&mut self, id: &SourceId) -> Option<Source> {
        let idx = self.sources.iter().position(|s| &s.id == id)?;
        Some(self.sources.remove(idx))
    }

    pub fn get(&self, id: &SourceId) -> Option<&Source> {
        self.sources.iter().find(|s| &s.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Source> {
        self.sources.iter()
    }

    pub fn as_slice(&self) -> &[Source] {
        &self.sources
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}

//! Turning filesystem paths into sources.
//!
//! Uses the `ignore` crate to enumerate a directory into a flat list of
//! handles whose relative paths are rooted at the directory name, the same
//! shape a browser hands over for a dropped folder. Content is not read here.

use std::path::{Path, PathBuf};

use glob::Pattern;
use ignore::WalkBuilder;
use thiserror::Error;
use tracing::{debug, trace};

use crate::policy::{extension_of, Policy};
use crate::source::{FileHandle, SourceKind, SourceSet};

/// Errors that can occur while collecting sources.
#[derive(Debug, Error)]
pub enum WalkError {
    #[error("path not found: {path}")]
    NotFound { path: PathBuf },

    #[error("permission denied: {path}")]
    PermissionDenied { path: PathBuf },

    #[error("IO error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid exclude pattern {pattern:?}: {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: glob::PatternError,
    },
}

/// Options for directory walking.
#[derive(Debug, Clone)]
pub struct WalkOptions {
    /// Maximum depth to recurse (None = unlimited).
    pub max_depth: Option<usize>,
    /// Include hidden files and directories.
    pub include_hidden: bool,
    /// Respect .gitignore patterns.
    pub respect_gitignore: bool,
    /// Glob patterns matched against source-relative paths and file names.
    pub exclude: Vec<Pattern>,
}

impl Default for WalkOptions {
    fn default() -> Self {
        Self {
            max_depth: None,
            include_hidden: true,
            respect_gitignore: false,
            exclude: Vec::new(),
        }
    }
}

impl WalkOptions {
    /// Compile exclude patterns.
    pub fn with_excludes(mut self, patterns: &[String]) -> Result<Self, WalkError> {
        for pattern in patterns {
            let compiled = Pattern::new(pattern).map_err(|source| WalkError::Pattern {
                pattern: pattern.clone(),
                source,
            })?;
            self.exclude.push(compiled);
        }
        Ok(self)
    }

    /// Set maximum depth.
    pub fn max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }

    fn is_excluded(&self, relative: &str, name: &str) -> bool {
        self.exclude
            .iter()
            .any(|p| p.matches(relative) || p.matches(name))
    }
}

/// Guess a media type from a file name, the way a browser fills `File.type`.
///
/// Only the families that matter for classification are covered.
pub fn media_type_for(name: &str) -> Option<&'static str> {
    let media_type = match extension_of(name)?.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "bmp" => "image/bmp",
        "ico" => "image/x-icon",
        "svg" => "image/svg+xml",
        "avif" => "image/avif",
        "mp4" | "m4v" => "video/mp4",
        "webm" => "video/webm",
        "mov" => "video/quicktime",
        "mp3" => "audio/mpeg",
        "wav" => "audio/wav",
        "ogg" => "audio/ogg",
        "flac" => "audio/flac",
        "pdf" => "application/pdf",
        "zip" => "application/zip",
        "json" => "application/json",
        "txt" => "text/plain",
        "md" => "text/markdown",
        "html" | "htm" => "text/html",
        "css" => "text/css",
        "js" | "mjs" => "text/javascript",
        _ => return None,
    };
    Some(media_type)
}

fn display_name(path: &Path) -> String {
    path.file_name().map_or_else(
        || path.to_string_lossy().into_owned(),
        |n| n.to_string_lossy().into_owned(),
    )
}

/// Name of a selected path, as a file picker would report it.
///
/// Paths without a final component (`.`, `..`, `dir/..`) are canonicalized
/// first so the source is named after the real directory.
fn source_name(path: &Path) -> Result<String, WalkError> {
    if let Some(name) = path.file_name() {
        return Ok(name.to_string_lossy().into_owned());
    }

    let resolved = std::fs::canonicalize(path).map_err(|source| WalkError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(display_name(&resolved))
}

fn disk_handle(name: String, path: &Path) -> FileHandle {
    let media_type = media_type_for(&name);
    let handle = FileHandle::disk(name, path);
    match media_type {
        Some(m) => handle.with_media_type(m),
        None => handle,
    }
}

/// Build one source per path: files become file sources, directories become
/// directory sources.
///
/// Directories named in `policy`'s ignore list are pruned during the walk so
/// their contents are never enumerated.
pub fn collect_sources(
    paths: &[PathBuf],
    options: &WalkOptions,
    policy: &Policy,
) -> Result<SourceSet, WalkError> {
    let mut set = SourceSet::new();

    for path in paths {
        let metadata = std::fs::metadata(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => WalkError::NotFound { path: path.clone() },
            std::io::ErrorKind::PermissionDenied => {
                WalkError::PermissionDenied { path: path.clone() }
            }
            _ => WalkError::Io {
                path: path.clone(),
                source: e,
            },
        })?;

        let name = source_name(path)?;

        if metadata.is_dir() {
            let handles = walk_directory(path, &name, options, policy)?;
            debug!(directory = %path.display(), files = handles.len(), "collected directory");
            set.add(SourceKind::Directory, name, handles);
        } else {
            let handle = disk_handle(name.clone(), path);
            set.add(SourceKind::File, name, vec![handle]);
        }
    }

    Ok(set)
}

/// Enumerate the files below `root` as handles rooted at `root_name`.
pub fn walk_directory(
    root: &Path,
    root_name: &str,
    options: &WalkOptions,
    policy: &Policy,
) -> Result<Vec<FileHandle>, WalkError> {
    let mut builder = WalkBuilder::new(root);

    builder
        .hidden(!options.include_hidden)
        .ignore(false)
        .parents(options.respect_gitignore)
        .git_ignore(options.respect_gitignore)
        .git_global(options.respect_gitignore)
        .git_exclude(options.respect_gitignore)
        .follow_links(false)
        .max_depth(options.max_depth);

    let ignored_dirs = policy.ignored_dirs.clone();
    builder.filter_entry(move |entry| {
        let is_dir = entry.file_type().is_some_and(|ft| ft.is_dir());
        let name = entry.file_name().to_string_lossy();
        entry.depth() == 0 || !is_dir || !ignored_dirs.contains(&*name)
    });

    let mut handles = Vec::new();

    for result in builder.build() {
        let entry = match result {
            Ok(entry) => entry,
            Err(ignore::Error::Io(io_err)) => {
                return Err(WalkError::Io {
                    path: root.to_path_buf(),
                    source: io_err,
                });
            }
            Err(e) => {
                // Unreadable subdirectories and gitignore parse errors are skipped
                debug!(error = %e, "walk entry skipped");
                continue;
            }
        };

        if !entry.file_type().is_some_and(|ft| ft.is_file()) {
            continue;
        }

        let Ok(relative) = entry.path().strip_prefix(root) else {
            continue;
        };
        let relative: Vec<String> = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect();
        let relative = relative.join("/");
        let name = display_name(entry.path());

        if options.is_excluded(&relative, &name) {
            trace!(path = %relative, "excluded by pattern");
            continue;
        }

        handles.push(
            disk_handle(name, entry.path()).with_relative_path(format!("{}/{}", root_name, relative)),
        );
    }

    Ok(handles)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn create_test_dir() -> TempDir {
        let dir = TempDir::new().unwrap();

        fs::create_dir_all(dir.path().join("proj/src")).unwrap();
        fs::create_dir_all(dir.path().join("proj/node_modules/pkg")).unwrap();
        fs::write(dir.path().join("proj/src/main.rs"), "fn main() {}").unwrap();
        fs::write(dir.path().join("proj/src/lib.rs"), "pub fn hello() {}").unwrap();
        fs::write(dir.path().join("proj/Cargo.toml"), "[package]").unwrap();
        fs::write(dir.path().join("proj/node_modules/pkg/index.js"), "x").unwrap();
        fs::write(dir.path().join("proj/logo.png"), [0x89u8, b'P']).unwrap();

        dir
    }

    fn relative_paths(handles: &[FileHandle]) -> Vec<String> {
        let mut paths: Vec<String> = handles
            .iter()
            .filter_map(|h| h.relative_path.clone())
            .collect();
        paths.sort();
        paths
    }

    #[test]
    fn test_walk_directory_roots_paths() {
        let dir = create_test_dir();
        let handles = walk_directory(
            &dir.path().join("proj"),
            "proj",
            &WalkOptions::default(),
            &Policy::default(),
        )
        .unwrap();

        assert_eq!(
            relative_paths(&handles),
            vec!["proj/Cargo.toml", "proj/logo.png", "proj/src/lib.rs", "proj/src/main.rs"]
        );
    }

    #[test]
    fn test_walk_directory_sets_media_type() {
        let dir = create_test_dir();
        let handles = walk_directory(
            &dir.path().join("proj"),
            "proj",
            &WalkOptions::default(),
            &Policy::default(),
        )
        .unwrap();

        let logo = handles.iter().find(|h| h.name == "logo.png").unwrap();
        assert_eq!(logo.media_type.as_deref(), Some("image/png"));
        let main = handles.iter().find(|h| h.name == "main.rs").unwrap();
        assert_eq!(main.media_type, None);
    }

    #[test]
    fn test_walk_without_pruning_keeps_dependency_dirs() {
        let dir = create_test_dir();
        let handles = walk_directory(
            &dir.path().join("proj"),
            "proj",
            &WalkOptions::default(),
            &Policy::empty(),
        )
        .unwrap();

        assert!(relative_paths(&handles).contains(&"proj/node_modules/pkg/index.js".to_string()));
    }

    #[test]
    fn test_walk_exclude_patterns() {
        let dir = create_test_dir();
        let options = WalkOptions::default()
            .with_excludes(&["src/main.rs".to_string(), "*.toml".to_string()])
            .unwrap();
        let handles =
            walk_directory(&dir.path().join("proj"), "proj", &options, &Policy::default()).unwrap();

        assert_eq!(
            relative_paths(&handles),
            vec!["proj/logo.png", "proj/src/lib.rs"]
        );
    }

    #[test]
    fn test_invalid_exclude_pattern() {
        let result = WalkOptions::default().with_excludes(&["[".to_string()]);
        assert!(matches!(result, Err(WalkError::Pattern { .. })));
    }

    #[test]
    fn test_walk_hidden_files() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("visible.rs"), "").unwrap();
        fs::write(dir.path().join(".hidden.rs"), "").unwrap();

        let with_hidden =
            walk_directory(dir.path(), "d", &WalkOptions::default(), &Policy::default()).unwrap();
        assert_eq!(with_hidden.len(), 2);

        let options = WalkOptions {
            include_hidden: false,
            ..Default::default()
        };
        let without_hidden = walk_directory(dir.path(), "d", &options, &Policy::default()).unwrap();
        assert_eq!(relative_paths(&without_hidden), vec!["d/visible.rs"]);
    }

    #[test]
    fn test_walk_max_depth() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("a/b/c")).unwrap();
        fs::write(dir.path().join("a/b/c/deep.rs"), "").unwrap();
        fs::write(dir.path().join("a/shallow.rs"), "").unwrap();

        let options = WalkOptions::default().max_depth(2);
        let handles = walk_directory(dir.path(), "root", &options, &Policy::default()).unwrap();

        assert_eq!(relative_paths(&handles), vec!["root/a/shallow.rs"]);
    }

    #[test]
    fn test_collect_sources_kinds() {
        let dir = create_test_dir();
        let paths = vec![
            dir.path().join("proj"),
            dir.path().join("proj/Cargo.toml"),
        ];

        let set = collect_sources(&paths, &WalkOptions::default(), &Policy::default()).unwrap();
        let sources = set.as_slice();
        assert_eq!(sources.len(), 2);
        assert_eq!(sources[0].kind, SourceKind::Directory);
        assert_eq!(sources[0].name, "proj");
        assert_eq!(sources[1].kind, SourceKind::File);
        assert_eq!(sources[1].name, "Cargo.toml");
    }

    #[test]
    fn test_collect_sources_names_parent_path_after_directory() {
        let dir = create_test_dir();
        let paths = vec![dir.path().join("proj/src/..")];

        let set = collect_sources(&paths, &WalkOptions::default(), &Policy::default()).unwrap();
        let source = &set.as_slice()[0];
        assert_eq!(source.name, "proj");
        assert!(source
            .handles
            .iter()
            .any(|h| h.relative_path.as_deref() == Some("proj/src/main.rs")));
    }

    #[test]
    fn test_collect_sources_missing_path() {
        let result = collect_sources(
            &[PathBuf::from("/nonexistent/promptdump/path")],
            &WalkOptions::default(),
            &Policy::default(),
        );
        assert!(matches!(result, Err(WalkError::NotFound { .. })));
    }

    #[test]
    fn test_media_type_for() {
        assert_eq!(media_type_for("photo.JPG"), Some("image/jpeg"));
        assert_eq!(media_type_for("clip.webm"), Some("video/webm"));
        assert_eq!(media_type_for("main.rs"), None);
        assert_eq!(media_type_for(".gitignore"), None);
    }
}

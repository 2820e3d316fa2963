//! Classification policy: which files are excluded and which are binary.
//!
//! The denylists are plain data. [`Policy::default`] carries the built-in
//! lists; a JSON policy file can replace any of them (see [`Policy::load`]).

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::source::FileHandle;

/// Errors that can occur while loading a policy file.
#[derive(Debug, Error)]
pub enum PolicyError {
    #[error("cannot read policy file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid policy file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Media-type prefixes that always mark content as binary.
const BINARY_MEDIA_PREFIXES: &[&str] = &["image/", "video/", "audio/"];

/// Name prefixes that are never included.
const IGNORED_NAME_PREFIXES: &[&str] = &[
    "npm-debug.",
    "yarn-debug.",
    "yarn-error.",
    ".metro-health-check",
];

const DEFAULT_IGNORED_NAMES: &[&str] = &[
    ".DS_Store",
    "Thumbs.db",
    "desktop.ini",
    "package-lock.json",
    "yarn.lock",
    "pnpm-lock.yaml",
    "bun.lockb",
    "composer.lock",
    "Cargo.lock",
    "Gemfile.lock",
    "poetry.lock",
    ".eslintcache",
    ".npmrc",
    ".yarnrc",
    ".env",
];

const DEFAULT_IGNORED_EXTENSIONS: &[&str] = &[
    "log", "lock", "map", "pyc", "pyo", "class", "o", "obj", "a", "lib", "so", "dll", "dylib",
    "exe", "tsbuildinfo", "swp", "swo", "tmp", "bak", "pem", "key",
];

const DEFAULT_IGNORED_DIRS: &[&str] = &[
    // Version control
    ".git",
    ".svn",
    ".hg",
    // Dependencies
    "node_modules",
    "bower_components",
    "jspm_packages",
    ".pnpm-store",
    ".yarn",
    "vendor",
    "Pods",
    ".venv",
    "venv",
    // Build output
    "dist",
    "build",
    "out",
    "target",
    "coverage",
    ".nyc_output",
    // IDEs
    ".idea",
    ".vscode",
    ".vs",
    // Framework caches
    ".next",
    ".nuxt",
    ".svelte-kit",
    ".angular",
    ".expo",
    ".turbo",
    ".vercel",
    ".cache",
    ".parcel-cache",
    ".gradle",
    "__pycache__",
    ".pytest_cache",
    ".mypy_cache",
];

const DEFAULT_BINARY_EXTENSIONS: &[&str] = &[
    // Images
    "png", "jpg", "jpeg", "gif", "bmp", "ico", "webp", "tiff", "tif", "psd", "heic", "avif",
    // Audio and video
    "mp3", "wav", "ogg", "flac", "aac", "m4a", "mp4", "m4v", "mov", "avi", "mkv", "webm",
    // Documents and archives
    "pdf", "doc", "docx", "xls", "xlsx", "ppt", "pptx", "zip", "tar", "gz", "tgz", "bz2",
    "xz", "rar", "7z", "jar", "war",
    // Fonts
    "woff", "woff2", "ttf", "otf", "eot",
    // Other
    "bin", "dat", "wasm", "sqlite", "sqlite3", "db",
];

fn to_set(items: &[&str]) -> BTreeSet<String> {
    items.iter().map(|s| (*s).to_string()).collect()
}

/// Lowercased extension of a bare file name.
///
/// A leading dot does not start an extension, so `.gitignore` has none.
///
/// # Examples
///
/// ```
/// use promptdump::policy::extension_of;
///
/// assert_eq!(extension_of("photo.PNG").as_deref(), Some("png"));
/// assert_eq!(extension_of(".gitignore"), None);
/// assert_eq!(extension_of("Makefile"), None);
/// ```
pub fn extension_of(name: &str) -> Option<String> {
    match name.rfind('.') {
        Some(0) | None => None,
        Some(idx) => Some(name[idx + 1..].to_lowercase()),
    }
}

/// Placeholder used instead of the content of a binary file.
pub fn binary_placeholder(media_type: Option<&str>) -> String {
    format!(
        "[Binary file content not displayed: {}]",
        media_type.filter(|m| !m.is_empty()).unwrap_or("unknown")
    )
}

/// Placeholder used when reading a file's content fails.
pub fn read_error_placeholder(error: &std::io::Error) -> String {
    format!("[Error reading file: {}]", error)
}

/// Denylists deciding exclusion and binary classification.
///
/// Every field is optional in the JSON form; a missing field keeps the
/// built-in list and a present one replaces it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Policy {
    /// Exact file names that are never included.
    pub ignored_names: BTreeSet<String>,
    /// Lowercase extensions (without the dot) that are never included.
    pub ignored_extensions: BTreeSet<String>,
    /// Directory names whose whole subtree is excluded.
    pub ignored_dirs: BTreeSet<String>,
    /// Lowercase extensions whose content is replaced by a placeholder.
    pub binary_extensions: BTreeSet<String>,
}

impl Default for Policy {
    fn default() -> Self {
        Self {
            ignored_names: to_set(DEFAULT_IGNORED_NAMES),
            ignored_extensions: to_set(DEFAULT_IGNORED_EXTENSIONS),
            ignored_dirs: to_set(DEFAULT_IGNORED_DIRS),
            binary_extensions: to_set(DEFAULT_BINARY_EXTENSIONS),
        }
    }
}

impl Policy {
    /// A policy with every denylist empty. Only the fixed name patterns apply.
    pub fn empty() -> Self {
        Self {
            ignored_names: BTreeSet::new(),
            ignored_extensions: BTreeSet::new(),
            ignored_dirs: BTreeSet::new(),
            binary_extensions: BTreeSet::new(),
        }
    }

    /// Parse a policy from JSON text.
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// Load a policy from a JSON file.
    pub fn load(path: &Path) -> Result<Self, PolicyError> {
        let text = std::fs::read_to_string(path).map_err(|source| PolicyError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&text).map_err(|source| PolicyError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Check whether a bare file name is excluded.
    ///
    /// # Examples
    ///
    /// ```
    /// use promptdump::Policy;
    ///
    /// let policy = Policy::default();
    /// assert!(policy.is_ignored_name("yarn-error.log"));
    /// assert!(policy.is_ignored_name(".env.production.local"));
    /// assert!(policy.is_ignored_name("app.orig.js"));
    /// assert!(!policy.is_ignored_name("main.rs"));
    /// ```
    pub fn is_ignored_name(&self, name: &str) -> bool {
        if self.ignored_names.contains(name) {
            return true;
        }

        if let Some(ext) = extension_of(name) {
            if self.ignored_extensions.contains(&ext) {
                return true;
            }
        }

        IGNORED_NAME_PREFIXES.iter().any(|p| name.starts_with(p))
            || (name.starts_with(".env") && name.ends_with(".local"))
            || name.contains(".orig.")
    }

    /// Check whether a single path segment names an excluded directory.
    pub fn is_ignored_dir_segment(&self, segment: &str) -> bool {
        self.ignored_dirs.contains(segment)
    }

    /// Check whether a handle's content should be treated as binary.
    pub fn is_binary(&self, handle: &FileHandle) -> bool {
        if let Some(media_type) = handle.media_type.as_deref() {
            if BINARY_MEDIA_PREFIXES.iter().any(|p| media_type.starts_with(p)) {
                return true;
            }
        }

        handle
            .extension()
            .is_some_and(|ext| self.binary_extensions.contains(&ext))
    }

    /// Resolve a handle to the text placed in the output.
    ///
    /// Binary handles are never read. Read failures become a placeholder
    /// instead of an error.
    pub fn resolve_content(&self, handle: &FileHandle) -> String {
        if self.is_binary(handle) {
            return binary_placeholder(handle.media_type.as_deref());
        }

        match handle.read_text() {
            Ok(text) => text,
            Err(e) => {
                tracing::debug!(file = %handle.name, error = %e, "content read failed");
                read_error_placeholder(&e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ignored_exact_names() {
        let policy = Policy::default();
        assert!(policy.is_ignored_name(".DS_Store"));
        assert!(policy.is_ignored_name("package-lock.json"));
        assert!(!policy.is_ignored_name("package.json"));
    }

    #[test]
    fn test_ignored_names_are_case_sensitive() {
        let policy = Policy::default();
        assert!(!policy.is_ignored_name(".ds_store"));
    }

    #[test]
    fn test_ignored_extension_is_lowercased() {
        let policy = Policy::default();
        assert!(policy.is_ignored_name("server.log"));
        assert!(policy.is_ignored_name("SERVER.LOG"));
        assert!(policy.is_ignored_name("bundle.js.map"));
    }

    #[test]
    fn test_ignored_patterns() {
        let policy = Policy::empty();
        assert!(policy.is_ignored_name("npm-debug.log.123"));
        assert!(policy.is_ignored_name("yarn-debug.log"));
        assert!(policy.is_ignored_name("yarn-error.txt"));
        assert!(policy.is_ignored_name(".metro-health-check12345"));
        assert!(policy.is_ignored_name(".env.local"));
        assert!(policy.is_ignored_name(".env.development.local"));
        assert!(policy.is_ignored_name("index.orig.ts"));

        assert!(!policy.is_ignored_name(".env.example"));
        assert!(!policy.is_ignored_name("env.local"));
        assert!(!policy.is_ignored_name("original.ts"));
    }

    #[test]
    fn test_ignored_dir_segments_exact_only() {
        let policy = Policy::default();
        assert!(policy.is_ignored_dir_segment("node_modules"));
        assert!(policy.is_ignored_dir_segment(".git"));
        assert!(!policy.is_ignored_dir_segment("Node_Modules"));
        assert!(!policy.is_ignored_dir_segment("node_modules_backup"));
        assert!(!policy.is_ignored_dir_segment("src"));
    }

    #[test]
    fn test_extension_of() {
        assert_eq!(extension_of("a.tar.GZ").as_deref(), Some("gz"));
        assert_eq!(extension_of("trailing.").as_deref(), Some(""));
        assert_eq!(extension_of(".env"), None);
        assert_eq!(extension_of("README"), None);
    }

    #[test]
    fn test_binary_by_media_type() {
        let policy = Policy::empty();
        let image = FileHandle::bytes("logo.dat", vec![0, 1, 2]).with_media_type("image/png");
        let video = FileHandle::bytes("clip", vec![]).with_media_type("video/mp4");
        let audio = FileHandle::bytes("song", vec![]).with_media_type("audio/mpeg");
        let text = FileHandle::text("notes", "hi").with_media_type("text/plain");

        assert!(policy.is_binary(&image));
        assert!(policy.is_binary(&video));
        assert!(policy.is_binary(&audio));
        assert!(!policy.is_binary(&text));
    }

    #[test]
    fn test_binary_by_extension() {
        let policy = Policy::default();
        assert!(policy.is_binary(&FileHandle::bytes("font.WOFF2", vec![])));
        assert!(policy.is_binary(&FileHandle::bytes("archive.zip", vec![])));
        assert!(!policy.is_binary(&FileHandle::text("main.rs", "fn main() {}")));
    }

    #[test]
    fn test_resolve_binary_placeholder() {
        let policy = Policy::default();
        let png = FileHandle::bytes("a.png", vec![0x89, b'P', b'N', b'G']).with_media_type("image/png");
        assert_eq!(
            policy.resolve_content(&png),
            "[Binary file content not displayed: image/png]"
        );

        let no_hint = FileHandle::bytes("b.zip", vec![1, 2, 3]);
        assert_eq!(
            policy.resolve_content(&no_hint),
            "[Binary file content not displayed: unknown]"
        );
    }

    #[test]
    fn test_resolve_text() {
        let policy = Policy::default();
        let handle = FileHandle::text("a.txt", "hello");
        assert_eq!(policy.resolve_content(&handle), "hello");
    }

    #[test]
    fn test_resolve_read_failure_is_placeholder() {
        let policy = Policy::default();
        let invalid = FileHandle::bytes("latin1.txt", vec![0xff, 0xfe, 0x00]);
        let content = policy.resolve_content(&invalid);
        assert!(content.starts_with("[Error reading file: "));

        let missing = FileHandle::disk("gone.txt", "/nonexistent/promptdump/gone.txt");
        assert!(policy.resolve_content(&missing).starts_with("[Error reading file: "));
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let policy = Policy::from_json(r#"{ "ignored_dirs": ["generated"] }"#).unwrap();
        assert!(policy.is_ignored_dir_segment("generated"));
        assert!(!policy.is_ignored_dir_segment("node_modules"));
        assert_eq!(policy.ignored_names, Policy::default().ignored_names);
    }

    #[test]
    fn test_unknown_json_field_rejected() {
        assert!(Policy::from_json(r#"{ "ignore": [] }"#).is_err());
    }

    #[test]
    fn test_json_roundtrip_of_default() {
        let json = serde_json::to_string(&Policy::default()).unwrap();
        assert_eq!(Policy::from_json(&json).unwrap(), Policy::default());
    }
}

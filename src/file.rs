//! Input files handed to the importers
//!
//! Files are immutable. Their parent is derived from the path, so siblings
//! and ancestors are found through a [`FileIndex`] over the whole batch.

use std::borrow::Cow;
use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputFile {
    path: PathBuf,
    bytes: Vec<u8>,
}

impl InputFile {
    pub fn new(path: impl Into<PathBuf>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            path: path.into(),
            bytes: bytes.into(),
        }
    }

    pub fn from_text(path: impl Into<PathBuf>, text: &str) -> Self {
        Self::new(path, text.as_bytes().to_vec())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn parent(&self) -> Option<&Path> {
        self.path.parent()
    }

    pub fn name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| self.path.display().to_string())
    }

    pub fn stem(&self) -> Option<String> {
        self.path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .filter(|s| !s.is_empty())
    }

    /// Lowercase extension with its leading dot, e.g. `.enex`
    pub fn extension(&self) -> Option<String> {
        self.path
            .extension()
            .map(|e| format!(".{}", e.to_string_lossy().to_lowercase()))
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// UTF-8 view of the payload; invalid sequences are replaced and a BOM is dropped
    pub fn text(&self) -> Cow<'_, str> {
        match String::from_utf8_lossy(&self.bytes) {
            Cow::Borrowed(s) => Cow::Borrowed(s.strip_prefix('\u{feff}').unwrap_or(s)),
            Cow::Owned(s) => match s.strip_prefix('\u{feff}') {
                Some(stripped) => Cow::Owned(stripped.to_string()),
                None => Cow::Owned(s),
            },
        }
    }
}

/// Normalize a path to forward slashes, dropping `.` and folding `..`
pub fn normalize_path(path: &Path) -> String {
    let mut parts: Vec<String> = Vec::new();
    for component in path.components() {
        match component {
            Component::Normal(part) => parts.push(part.to_string_lossy().to_string()),
            Component::ParentDir => {
                parts.pop();
            }
            Component::RootDir => parts.clear(),
            Component::CurDir | Component::Prefix(_) => {}
        }
    }
    let joined = parts.join("/");
    if path.has_root() {
        format!("/{}", joined)
    } else {
        joined
    }
}

/// Lookup table over every file in a batch
pub struct FileIndex<'a> {
    files: &'a [InputFile],
    by_path: HashMap<String, usize>,
}

impl<'a> FileIndex<'a> {
    pub fn new(files: &'a [InputFile]) -> Self {
        let by_path = files
            .iter()
            .enumerate()
            .map(|(i, f)| (normalize_path(f.path()), i))
            .collect();
        Self { files, by_path }
    }

    pub fn get(&self, path: &Path) -> Option<&'a InputFile> {
        self.by_path
            .get(&normalize_path(path))
            .map(|&i| &self.files[i])
    }

    /// First file (in batch order) whose normalized path contains `fragment`
    pub fn find_containing(&self, fragment: &str) -> Option<&'a InputFile> {
        self.files
            .iter()
            .find(|f| normalize_path(f.path()).contains(fragment))
    }
}

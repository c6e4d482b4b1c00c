//! Provider contract and the batch harness every importer runs through
//!
//! A provider turns a batch of [`InputFile`]s into an [`ImportResult`]. Each
//! file is transformed into its own buffer; the buffer is merged only when the
//! transform reports [`FileOutcome::Handled`], so a failing or foreign file
//! never leaves partial records behind.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::error::{ImportError, Result};
use crate::evernote::Evernote;
use crate::file::InputFile;
use crate::hasher::{Hasher, Md5Hasher};
use crate::hierarchy::DEFAULT_MAX_DEPTH;
use crate::joplin::Joplin;
use crate::models::{ImportResult, Note};
use crate::simplenote::Simplenote;
use crate::zoho::Zoho;

/// Static description of a provider
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderDescriptor {
    pub name: &'static str,
    pub version: &'static str,
    /// Extensions the provider actually parses
    pub supported_extensions: &'static [&'static str],
    /// Extensions a user may hand to the provider
    pub valid_extensions: &'static [&'static str],
}

impl ProviderDescriptor {
    /// Whether the harness will pass `file` to the transform
    pub fn supports(&self, file: &InputFile) -> bool {
        matches_extension(self.supported_extensions, file)
    }

    /// Whether `file` is an acceptable input for this provider at all
    pub fn accepts(&self, file: &InputFile) -> bool {
        matches_extension(self.valid_extensions, file)
    }
}

fn matches_extension(extensions: &[&str], file: &InputFile) -> bool {
    file.extension()
        .map(|ext| extensions.iter().any(|e| e.eq_ignore_ascii_case(&ext)))
        .unwrap_or(false)
}

/// Runtime settings shared read-only by every file in a batch
pub struct ProviderSettings {
    pub hasher: Box<dyn Hasher>,
    pub max_folder_depth: usize,
    pub include_trashed: bool,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            hasher: Box::new(Md5Hasher),
            max_folder_depth: DEFAULT_MAX_DEPTH,
            include_trashed: false,
        }
    }
}

impl fmt::Debug for ProviderSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderSettings")
            .field("hasher", &self.hasher.kind())
            .field("max_folder_depth", &self.max_folder_depth)
            .field("include_trashed", &self.include_trashed)
            .finish()
    }
}

/// What a transform made of one file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileOutcome {
    /// The file belonged to this provider; keep its buffer
    Handled,
    /// The file is not in this provider's format; drop its buffer silently
    NotApplicable,
}

/// Records and errors produced by a transform
#[derive(Debug)]
pub struct BatchOutput<T> {
    pub items: Vec<T>,
    pub errors: Vec<ImportError>,
}

impl<T> Default for BatchOutput<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            errors: Vec::new(),
        }
    }
}

impl<T> BatchOutput<T> {
    fn append(&mut self, other: BatchOutput<T>) {
        self.items.extend(other.items);
        self.errors.extend(other.errors);
    }
}

impl From<BatchOutput<Note>> for ImportResult {
    fn from(output: BatchOutput<Note>) -> Self {
        ImportResult {
            notes: output.items,
            errors: output.errors,
        }
    }
}

/// Run `transform` over every supported file in input order.
///
/// Never aborts: an `Err` from one file is recorded and the next file is
/// processed as usual.
pub fn iterate<T, F>(
    descriptor: &ProviderDescriptor,
    files: &[InputFile],
    mut transform: F,
) -> BatchOutput<T>
where
    F: FnMut(&InputFile, &mut BatchOutput<T>) -> Result<FileOutcome>,
{
    let mut output = BatchOutput::default();

    for file in files {
        if !descriptor.supports(file) {
            log::debug!("{}: skipping unsupported file {}", descriptor.name, file.path().display());
            continue;
        }

        let mut buffer = BatchOutput::default();
        match transform(file, &mut buffer) {
            Ok(FileOutcome::Handled) => output.append(buffer),
            Ok(FileOutcome::NotApplicable) => {
                log::debug!("{}: {} is not applicable", descriptor.name, file.path().display());
            }
            Err(e) => {
                log::warn!("{}: {}", descriptor.name, e);
                output.errors.push(e);
            }
        }
    }

    output
}

pub trait Provider {
    fn descriptor(&self) -> &ProviderDescriptor;

    fn process(&self, files: &[InputFile], settings: &ProviderSettings) -> ImportResult;
}

/// The importers this crate ships
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    Evernote,
    Joplin,
    Simplenote,
    Zoho,
}

impl ProviderKind {
    pub fn all() -> &'static [ProviderKind] {
        &[
            ProviderKind::Evernote,
            ProviderKind::Joplin,
            ProviderKind::Simplenote,
            ProviderKind::Zoho,
        ]
    }

    pub fn provider(self) -> Box<dyn Provider> {
        match self {
            ProviderKind::Evernote => Box::new(Evernote),
            ProviderKind::Joplin => Box::new(Joplin),
            ProviderKind::Simplenote => Box::new(Simplenote),
            ProviderKind::Zoho => Box::new(Zoho),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ProviderKind::Evernote => "evernote",
            ProviderKind::Joplin => "joplin",
            ProviderKind::Simplenote => "simplenote",
            ProviderKind::Zoho => "zoho",
        }
    }
}

impl FromStr for ProviderKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        ProviderKind::all()
            .iter()
            .copied()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| {
                format!(
                    "Unknown provider '{}'. Expected one of: evernote, joplin, simplenote, zoho",
                    s
                )
            })
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Run the provider selected by `kind` over `files`
pub fn import(
    kind: ProviderKind,
    files: &[InputFile],
    settings: &ProviderSettings,
) -> ImportResult {
    let provider = kind.provider();
    let result = provider.process(files, settings);

    log::info!(
        "{} import finished: {} notes, {} attachments, {} errors from {} files",
        provider.descriptor().name,
        result.notes.len(),
        result.attachment_count(),
        result.errors.len(),
        files.len()
    );

    result
}

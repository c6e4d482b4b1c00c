//! Zoho Notebook import implementation
//!
//! A Zoho Notebook export holds one directory per notebook with a `meta.json`
//! naming it, and one `.znel` XML file per note. Images and files a note
//! embeds live next to it and are referenced by relative path.

use std::path::Path;

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;

use crate::attachments::{
    mime_from_extension, resolve_attachments, ReferenceScheme, ResourceDescriptor,
};
use crate::error::ImportError;
use crate::file::{FileIndex, InputFile};
use crate::models::{ImportResult, Note, NoteContent, Notebook, UNTITLED_NOTE};
use crate::provider::{iterate, FileOutcome, Provider, ProviderDescriptor, ProviderSettings};
use crate::xml::{parse_document, XmlElement};

static REFERENCE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)\b(?:src|href)\s*=\s*["']([^"']+)["']"#).unwrap());

pub static DESCRIPTOR: ProviderDescriptor = ProviderDescriptor {
    name: "Zoho Notebook",
    version: "1.0.0",
    supported_extensions: &[".znel"],
    valid_extensions: &[".znel"],
};

/// Notebook metadata file stored in every notebook directory
pub const NOTEBOOK_META: &str = "meta.json";

#[derive(Debug, Default, Clone, Copy)]
pub struct Zoho;

#[derive(Debug, Deserialize)]
struct NotebookMeta {
    name: Option<String>,
}

/// Typed view over a `.znel` document
struct Znel<'a> {
    root: &'a XmlElement,
}

impl<'a> Znel<'a> {
    fn meta(&self) -> Option<&'a XmlElement> {
        self.root.child("ZMeta")
    }

    fn title(&self) -> Option<&'a str> {
        self.meta()?.text_of("ZTitle")
    }

    fn created(&self) -> Option<DateTime<Utc>> {
        self.meta()?.text_of("ZCreatedDate").and_then(parse_zoho_date)
    }

    fn modified(&self) -> Option<DateTime<Utc>> {
        self.meta()?.text_of("ZModifiedDate").and_then(parse_zoho_date)
    }

    fn tags(&self) -> Vec<&'a str> {
        self.meta()
            .and_then(|meta| meta.child("ZTags"))
            .map(|tags| {
                tags.children_named("ZTag")
                    .map(|t| t.text.trim())
                    .filter(|t| !t.is_empty())
                    .collect()
            })
            .unwrap_or_default()
    }

    fn content(&self) -> &'a str {
        self.root
            .child("ZContent")
            .map(|c| c.text.trim())
            .unwrap_or_default()
    }
}

/// Parse RFC 3339 or `2021-05-04T10:20:30+0530`
pub fn parse_zoho_date(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    DateTime::parse_from_rfc3339(value)
        .or_else(|_| DateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%z"))
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

impl Provider for Zoho {
    fn descriptor(&self) -> &ProviderDescriptor {
        &DESCRIPTOR
    }

    fn process(&self, files: &[InputFile], settings: &ProviderSettings) -> ImportResult {
        let index = FileIndex::new(files);

        let output = iterate(&DESCRIPTOR, files, |file, out| {
            let root = parse_document(&file.text())
                .map_err(|message| ImportError::parse(file.name(), message))?;
            if root.name != "ZNote" {
                return Ok(FileOutcome::NotApplicable);
            }
            let znel = Znel { root: &root };
            let note_dir = file.parent().unwrap_or_else(|| Path::new(""));

            let mut content = znel.content().to_string();
            let descriptors = relative_references(&content);
            let attachments = resolve_attachments(
                &mut content,
                &descriptors,
                ReferenceScheme::RelativePath,
                |resource| {
                    let relative = html_escape::decode_html_entities(&resource.id);
                    index
                        .get(&note_dir.join(relative.as_ref()))
                        .map(|f| f.bytes().to_vec())
                },
                settings.hasher.as_ref(),
            );

            let title = znel.title().unwrap_or(UNTITLED_NOTE);
            let mut note = Note::new(title, NoteContent::html(content));
            note.date_created = znel.created();
            note.date_edited = znel.modified();
            note.tags = znel.tags().into_iter().map(str::to_string).collect();
            note.attachments = attachments;
            note.notebooks = find_notebook(note_dir, &index).into_iter().collect();

            out.items.push(note);
            Ok(FileOutcome::Handled)
        });

        output.into()
    }
}

/// Relative `src`/`href` values in `content`, first occurrence order
fn relative_references(content: &str) -> Vec<ResourceDescriptor> {
    let mut descriptors: Vec<ResourceDescriptor> = Vec::new();

    for caps in REFERENCE_RE.captures_iter(content) {
        let value = caps[1].trim();
        // skip absolute paths, fragments and anything with a scheme
        if value.is_empty() || value.contains(':') || value.starts_with(['/', '#']) {
            continue;
        }
        if descriptors.iter().any(|d| d.id == value) {
            continue;
        }

        let path = Path::new(value);
        descriptors.push(ResourceDescriptor {
            id: value.to_string(),
            filename: path.file_name().map(|n| n.to_string_lossy().to_string()),
            mime: mime_from_extension(path).map(str::to_string),
        });
    }

    descriptors
}

/// Notebook named by the nearest `meta.json` at or above `dir`
fn find_notebook(dir: &Path, index: &FileIndex<'_>) -> Option<Notebook> {
    for ancestor in dir.ancestors() {
        let Some(meta_file) = index.get(&ancestor.join(NOTEBOOK_META)) else {
            continue;
        };
        return match serde_json::from_str::<NotebookMeta>(&meta_file.text()) {
            Ok(NotebookMeta { name: Some(name) }) if !name.trim().is_empty() => {
                Some(Notebook::new(name.trim()))
            }
            Ok(_) => None,
            Err(e) => {
                log::warn!(
                    "Ignoring unreadable notebook metadata {}: {}",
                    meta_file.path().display(),
                    e
                );
                None
            }
        };
    }
    None
}

//! Simplenote JSON import implementation
//!
//! A Simplenote export is one `notes.json` document:
//! `{"activeNotes": [...], "trashNotes": [...]}`. `trashNotes` is optional
//! and only read when trashed notes are requested.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;

use crate::error::ImportError;
use crate::file::InputFile;
use crate::models::{ImportResult, Note, NoteContent, UNTITLED_NOTE};
use crate::provider::{iterate, FileOutcome, Provider, ProviderDescriptor, ProviderSettings};
use crate::render::{markdown_to_html, text_to_html};

pub static DESCRIPTOR: ProviderDescriptor = ProviderDescriptor {
    name: "Simplenote",
    version: "1.0.0",
    supported_extensions: &[".json"],
    valid_extensions: &[".txt", ".json"],
};

const REQUIRED_FIELDS: &str =
    "Invalid note. content, creationDate & lastModified properties are required.";

#[derive(Debug, Default, Clone, Copy)]
pub struct Simplenote;

/// Notes are deserialized one at a time so a bad note only costs itself
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SimplenoteNote {
    content: Option<String>,
    creation_date: Option<String>,
    last_modified: Option<String>,
    pinned: Option<bool>,
    #[serde(default)]
    markdown: bool,
    #[serde(default)]
    tags: Vec<String>,
}

impl Provider for Simplenote {
    fn descriptor(&self) -> &ProviderDescriptor {
        &DESCRIPTOR
    }

    fn process(&self, files: &[InputFile], settings: &ProviderSettings) -> ImportResult {
        iterate(&DESCRIPTOR, files, |file, out| {
            let export: Value = serde_json::from_str(&file.text())
                .map_err(|e| ImportError::parse(file.name(), e.to_string()))?;
            // anything without an activeNotes array belongs to another app
            let Some(active_notes) = export.get("activeNotes").and_then(Value::as_array) else {
                return Ok(FileOutcome::NotApplicable);
            };

            let trashed: &[Value] = match export.get("trashNotes") {
                Some(Value::Array(notes)) if settings.include_trashed => notes.as_slice(),
                _ => &[],
            };

            for value in active_notes.iter().chain(trashed) {
                match convert_note(value.clone()) {
                    Ok(note) => out.items.push(note),
                    Err(message) => {
                        log::warn!("Skipping Simplenote note in {}: {}", file.name(), message);
                        out.errors.push(ImportError::validation(
                            format!("File: {}", file.name()),
                            message,
                        ));
                    }
                }
            }
            Ok(FileOutcome::Handled)
        })
        .into()
    }
}

fn convert_note(value: Value) -> Result<Note, String> {
    let note: SimplenoteNote =
        serde_json::from_value(value).map_err(|e| format!("{} {}", REQUIRED_FIELDS, e))?;

    let (Some(content), Some(created), Some(modified)) = (
        note.content.filter(|c| !c.is_empty()),
        note.creation_date.filter(|d| !d.is_empty()),
        note.last_modified.filter(|d| !d.is_empty()),
    ) else {
        return Err(REQUIRED_FIELDS.to_string());
    };

    let date_created = parse_date(&created)
        .ok_or_else(|| format!("Invalid note. creationDate '{}' is not a valid date.", created))?;
    let date_edited = parse_date(&modified)
        .ok_or_else(|| format!("Invalid note. lastModified '{}' is not a valid date.", modified))?;

    let content = content.replace("\r\n", "\n");
    let (title, rest) = content.split_once('\n').unwrap_or((content.as_str(), ""));
    let title = title.trim();
    let html = if note.markdown {
        markdown_to_html(rest)
    } else {
        text_to_html(rest)
    };

    let mut converted = Note::new(
        if title.is_empty() { UNTITLED_NOTE } else { title },
        NoteContent::html(html),
    );
    converted.date_created = Some(date_created);
    converted.date_edited = Some(date_edited);
    converted.pinned = note.pinned;
    converted.tags = note.tags.into_iter().filter(|t| !t.is_empty()).collect();
    Ok(converted)
}

fn parse_date(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value.trim())
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

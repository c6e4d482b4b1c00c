use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ImportError;

/// Title given to notes whose source has none
pub const UNTITLED_NOTE: &str = "Untitled note";

/// Topic used when a notebook chain has a single level
pub const DEFAULT_TOPIC: &str = "All notes";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    #[default]
    Html,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NoteContent {
    #[serde(rename = "type")]
    pub content_type: ContentType,
    pub data: String,
}

impl NoteContent {
    pub fn html(data: impl Into<String>) -> Self {
        Self {
            content_type: ContentType::Html,
            data: data.into(),
        }
    }
}

/// A flattened notebook reference: the top-most ancestor plus the path below it
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Notebook {
    pub name: String,
    pub topic: String,
}

impl Notebook {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            topic: DEFAULT_TOPIC.to_string(),
        }
    }

    pub fn with_topic(name: impl Into<String>, topic: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            topic: topic.into(),
        }
    }
}

/// A binary payload referenced from a note's content by its hash
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    #[serde(skip)]
    pub data: Vec<u8>,
    pub size: usize,
    pub hash: String,
    pub hash_type: String,
    pub filename: String,
    pub mime: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_created: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_edited: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pinned: Option<bool>,
    pub tags: BTreeSet<String>,
    pub attachments: Vec<Attachment>,
    pub notebooks: Vec<Notebook>,
    pub content: NoteContent,
}

impl Note {
    pub fn new(title: impl Into<String>, content: NoteContent) -> Self {
        Self {
            title: title.into(),
            date_created: None,
            date_edited: None,
            pinned: None,
            tags: BTreeSet::new(),
            attachments: Vec::new(),
            notebooks: Vec::new(),
            content,
        }
    }
}

/// Everything one batch produced: notes in input order plus recorded errors
#[derive(Debug, Default, Serialize)]
pub struct ImportResult {
    pub notes: Vec<Note>,
    pub errors: Vec<ImportError>,
}

impl ImportResult {
    pub fn is_empty(&self) -> bool {
        self.notes.is_empty() && self.errors.is_empty()
    }

    pub fn attachment_count(&self) -> usize {
        self.notes.iter().map(|n| n.attachments.len()).sum()
    }
}

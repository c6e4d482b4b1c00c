//! Typed views over an Evernote `.enex` export
//!
//! `EnexDocument` owns the parsed tree; notes, resources and resource
//! attributes are borrowed views whose getters read the tree on every call.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use chrono::{DateTime, NaiveDateTime, Utc};
use thiserror::Error;

use crate::hasher::Hasher;
use crate::xml::{parse_document, XmlElement};

#[derive(Debug, Error)]
pub enum ResourceError {
    #[error("{0} is required.")]
    MissingField(&'static str),

    #[error("resource data is not valid base64: {0}")]
    InvalidData(#[from] base64::DecodeError),
}

/// Parse Evernote date format (YYYYMMDDTHHmmssZ)
pub fn parse_evernote_date(date_str: &str) -> Option<DateTime<Utc>> {
    // Format: 20231231T235959Z
    let clean = date_str.trim();
    if clean.len() < 15 {
        return None;
    }

    let without_z = clean.trim_end_matches('Z');
    NaiveDateTime::parse_from_str(without_z, "%Y%m%dT%H%M%S")
        .ok()
        .map(|dt| dt.and_utc())
}

pub struct EnexDocument {
    root: XmlElement,
}

impl EnexDocument {
    pub fn parse(text: &str) -> Result<Self, String> {
        parse_document(text).map(|root| Self { root })
    }

    /// Whether the root element is `<en-export>`
    pub fn is_export(&self) -> bool {
        self.root.name == "en-export"
    }

    pub fn application(&self) -> Option<&str> {
        self.root.attribute("application")
    }

    pub fn notes(&self) -> impl Iterator<Item = EnexNote<'_>> {
        self.root
            .children_named("note")
            .map(|element| EnexNote { element })
    }
}

#[derive(Clone, Copy)]
pub struct EnexNote<'a> {
    element: &'a XmlElement,
}

impl<'a> EnexNote<'a> {
    pub fn title(&self) -> Option<&'a str> {
        self.element.text_of("title")
    }

    /// Raw ENML body
    pub fn content(&self) -> Option<&'a str> {
        self.element
            .child("content")
            .map(|c| c.text.as_str())
            .filter(|c| !c.trim().is_empty())
    }

    pub fn created(&self) -> Option<DateTime<Utc>> {
        self.element.text_of("created").and_then(parse_evernote_date)
    }

    pub fn updated(&self) -> Option<DateTime<Utc>> {
        self.element.text_of("updated").and_then(parse_evernote_date)
    }

    pub fn tags(&self) -> Vec<&'a str> {
        self.element
            .children_named("tag")
            .map(|t| t.text.trim())
            .filter(|t| !t.is_empty())
            .collect()
    }

    pub fn source_url(&self) -> Option<&'a str> {
        self.element
            .child("note-attributes")
            .and_then(|a| a.text_of("source-url"))
    }

    pub fn author(&self) -> Option<&'a str> {
        self.element
            .child("note-attributes")
            .and_then(|a| a.text_of("author"))
    }

    /// Every `<resource>` child, each validated on its own
    pub fn resources(&self) -> Vec<Result<EnexResource<'a>, ResourceError>> {
        self.element
            .children_named("resource")
            .map(EnexResource::new)
            .collect()
    }
}

#[derive(Clone, Copy)]
pub struct EnexResource<'a> {
    element: &'a XmlElement,
}

impl<'a> EnexResource<'a> {
    /// Wrap a `<resource>` element; `data` and `mime` must be present
    pub fn new(element: &'a XmlElement) -> Result<Self, ResourceError> {
        if element.text_of("data").is_none() {
            return Err(ResourceError::MissingField("data"));
        }
        if element.text_of("mime").is_none() {
            return Err(ResourceError::MissingField("mime"));
        }
        Ok(Self { element })
    }

    /// Base64 payload with all embedded whitespace removed
    pub fn data(&self) -> String {
        self.element
            .text_of("data")
            .map(|d| d.chars().filter(|c| !c.is_whitespace()).collect())
            .unwrap_or_default()
    }

    pub fn mime(&self) -> &'a str {
        self.element.text_of("mime").unwrap_or_default()
    }

    pub fn width(&self) -> Option<f64> {
        self.element.number_of("width")
    }

    pub fn height(&self) -> Option<f64> {
        self.element.number_of("height")
    }

    pub fn duration(&self) -> Option<f64> {
        self.element.number_of("duration")
    }

    pub fn alternate_data(&self) -> Option<&'a str> {
        self.element.text_of("alternate-data")
    }

    pub fn decoded(&self) -> Result<Vec<u8>, ResourceError> {
        Ok(BASE64.decode(self.data())?)
    }

    /// Digest of the decoded payload.
    ///
    /// With MD5 this equals the `hash` attribute of the `<en-media>` element
    /// that embeds the resource in the note body.
    pub fn hash(&self, hasher: &dyn Hasher) -> Result<String, ResourceError> {
        Ok(hasher.hash(&self.decoded()?))
    }

    pub fn attributes(&self) -> Option<ResourceAttributes<'a>> {
        self.element
            .child("resource-attributes")
            .map(|element| ResourceAttributes { element })
    }
}

#[derive(Clone, Copy)]
pub struct ResourceAttributes<'a> {
    element: &'a XmlElement,
}

impl<'a> ResourceAttributes<'a> {
    pub fn latitude(&self) -> Option<f64> {
        self.element.number_of("latitude")
    }

    pub fn longitude(&self) -> Option<f64> {
        self.element.number_of("longitude")
    }

    pub fn altitude(&self) -> Option<f64> {
        self.element.number_of("altitude")
    }

    pub fn source_url(&self) -> Option<&'a str> {
        self.element.text_of("source-url")
    }

    pub fn camera_make(&self) -> Option<&'a str> {
        self.element.text_of("camera-make")
    }

    pub fn camera_model(&self) -> Option<&'a str> {
        self.element.text_of("camera-model")
    }

    pub fn reco_type(&self) -> Option<&'a str> {
        self.element.text_of("reco-type")
    }

    pub fn filename(&self) -> Option<&'a str> {
        self.element.text_of("file-name")
    }

    pub fn attachment(&self) -> Option<bool> {
        self.element.bool_of("attachment")
    }
}

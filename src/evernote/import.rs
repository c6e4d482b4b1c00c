//! Evernote .enex import implementation
//!
//! Converts Evernote export files (.enex) to canonical notes.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::Regex;

use super::enex::{EnexDocument, EnexNote, EnexResource};
use crate::attachments::{resolve_attachments, ReferenceScheme, ResourceDescriptor};
use crate::error::ImportError;
use crate::file::InputFile;
use crate::hasher::Md5Hasher;
use crate::models::{ImportResult, Note, NoteContent, Notebook, UNTITLED_NOTE};
use crate::provider::{iterate, FileOutcome, Provider, ProviderDescriptor, ProviderSettings};

static XML_DECL_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<\?xml[^>]*\?>").unwrap());
static DOCTYPE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<!DOCTYPE[^>]*>").unwrap());
static EN_NOTE_OPEN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)<en-note\b").unwrap());
static EN_NOTE_CLOSE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)</en-note\s*>").unwrap());
static TODO_CHECKED_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)<en-todo\s+checked\s*=\s*["']true["']\s*/?>(?:\s*</en-todo>)?"#).unwrap()
});
static TODO_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)<en-todo\b[^>]*?/?>(?:\s*</en-todo>)?").unwrap());

pub static DESCRIPTOR: ProviderDescriptor = ProviderDescriptor {
    name: "Evernote",
    version: "1.0.0",
    supported_extensions: &[".enex"],
    valid_extensions: &[".enex"],
};

#[derive(Debug, Default, Clone, Copy)]
pub struct Evernote;

impl Provider for Evernote {
    fn descriptor(&self) -> &ProviderDescriptor {
        &DESCRIPTOR
    }

    fn process(&self, files: &[InputFile], settings: &ProviderSettings) -> ImportResult {
        let output = iterate(&DESCRIPTOR, files, |file, out| {
            let text = file.text();
            let document = EnexDocument::parse(&text)
                .map_err(|message| ImportError::parse(file.name(), message))?;
            if !document.is_export() {
                return Ok(FileOutcome::NotApplicable);
            }

            // ENEX carries no notebook structure; the export file stands in for it
            let notebook = file.stem().map(Notebook::new);

            for note in document.notes() {
                let converted =
                    convert_note(&note, file, notebook.as_ref(), settings, &mut out.errors);
                out.items.push(converted);
            }
            Ok(FileOutcome::Handled)
        });

        output.into()
    }
}

fn convert_note(
    note: &EnexNote<'_>,
    file: &InputFile,
    notebook: Option<&Notebook>,
    settings: &ProviderSettings,
    errors: &mut Vec<ImportError>,
) -> Note {
    let title = note.title().unwrap_or(UNTITLED_NOTE);
    let context = format!("{} / {}", file.name(), title);

    // Resources are keyed by the MD5 of their bytes, the same digest
    // <en-media hash> uses, independent of the configured hasher
    let mut descriptors = Vec::new();
    let mut resources: HashMap<String, EnexResource<'_>> = HashMap::new();
    for resource in note.resources() {
        let resource = match resource {
            Ok(resource) => resource,
            Err(e) => {
                log::warn!("Dropping resource in {}: {}", context, e);
                errors.push(ImportError::validation(&context, e.to_string()));
                continue;
            }
        };
        let id = match resource.hash(&Md5Hasher) {
            Ok(id) => id,
            Err(e) => {
                log::warn!("Dropping resource in {}: {}", context, e);
                errors.push(ImportError::validation(&context, e.to_string()));
                continue;
            }
        };

        descriptors.push(ResourceDescriptor {
            id: id.clone(),
            filename: resource
                .attributes()
                .and_then(|a| a.filename())
                .map(str::to_string),
            mime: Some(resource.mime().to_string()),
        });
        resources.insert(id, resource);
    }

    let mut content = enml_to_html(note.content().unwrap_or_default());
    let attachments = resolve_attachments(
        &mut content,
        &descriptors,
        ReferenceScheme::EnexMedia,
        |descriptor| {
            resources
                .get(&descriptor.id)
                .and_then(|r| r.decoded().ok())
        },
        settings.hasher.as_ref(),
    );

    let mut converted = Note::new(title, NoteContent::html(content));
    converted.date_created = note.created();
    converted.date_edited = note.updated();
    converted.tags = note.tags().into_iter().map(str::to_string).collect();
    converted.attachments = attachments;
    converted.notebooks = notebook.cloned().into_iter().collect();
    converted
}

/// Turn an ENML body into plain HTML, leaving `<en-media>` for the attachment resolver
fn enml_to_html(enml: &str) -> String {
    let html = XML_DECL_RE.replace_all(enml, "");
    let html = DOCTYPE_RE.replace_all(&html, "");
    let html = EN_NOTE_OPEN_RE.replace_all(&html, "<div");
    let html = EN_NOTE_CLOSE_RE.replace_all(&html, "</div>");
    let html = TODO_CHECKED_RE.replace_all(&html, r#"<input type="checkbox" checked="checked" />"#);
    let html = TODO_RE.replace_all(&html, r#"<input type="checkbox" />"#);
    html.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::hasher::Sha256Hasher;

    fn enex(notes: &str) -> String {
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE en-export SYSTEM "http://xml.evernote.com/pub/evernote-export3.dtd">
<en-export application="Evernote">{}</en-export>"#,
            notes
        )
    }

    // base64("hello world") / md5 5eb63bbbe01eeed093cb22bb8f5acdc3
    // base64("hi")          / md5 49f68a5c8493ec2c0bf489821c21fc3b
    const TWO_RESOURCES: &str = r#"<note>
  <title>Trip</title>
  <content><![CDATA[<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE en-note SYSTEM "http://xml.evernote.com/pub/enml2.dtd">
<en-note><div>See</div><en-media hash="5eb63bbbe01eeed093cb22bb8f5acdc3" type="image/png"/><en-todo checked="true"/>done<en-todo/>open<en-media type="application/pdf" hash="49f68a5c8493ec2c0bf489821c21fc3b"></en-media></en-note>]]></content>
  <created>20231230T101500Z</created>
  <tag>travel</tag>
  <resource>
    <data encoding="base64">aGVsbG8gd29ybGQ=</data>
    <mime>image/png</mime>
    <resource-attributes><file-name>photo.png</file-name></resource-attributes>
  </resource>
  <resource>
    <data encoding="base64">aGk=</data>
    <mime>application/pdf</mime>
  </resource>
</note>"#;

    fn import(files: &[InputFile]) -> ImportResult {
        Evernote.process(files, &ProviderSettings::default())
    }

    #[test]
    fn test_enml_to_html() {
        let html = enml_to_html(
            r#"<?xml version="1.0"?><!DOCTYPE en-note SYSTEM "x"><en-note style="a"><en-todo checked="true"/>a<en-todo checked="false"/>b</en-note>"#,
        );
        assert_eq!(
            html,
            r#"<div style="a"><input type="checkbox" checked="checked" />a<input type="checkbox" />b</div>"#
        );
    }

    #[test]
    fn test_every_attachment_hash_is_in_content() {
        let files = vec![InputFile::from_text("Travel.enex", &enex(TWO_RESOURCES))];
        let result = import(&files);

        assert!(result.errors.is_empty());
        assert_eq!(result.notes.len(), 1);
        let note = &result.notes[0];
        assert_eq!(note.title, "Trip");
        assert_eq!(note.attachments.len(), 2);
        for attachment in &note.attachments {
            assert!(!attachment.hash.is_empty());
            assert!(note.content.data.contains(&attachment.hash));
        }
        assert!(!note.content.data.contains("en-media"));
        assert!(!note.content.data.contains("en-note"));
        assert!(note.content.data.contains(r#"<input type="checkbox" checked="checked" />done"#));

        assert_eq!(note.attachments[0].filename, "photo.png");
        assert_eq!(note.attachments[0].data, b"hello world");
        assert_eq!(note.attachments[1].mime, "application/pdf");
        assert_eq!(note.attachments[1].filename, note.attachments[1].hash);

        assert!(note.tags.contains("travel"));
        assert!(note.date_created.is_some());
        assert!(note.date_edited.is_none());
        assert_eq!(note.notebooks, vec![Notebook::new("Travel")]);
    }

    #[test]
    fn test_configured_hasher_keys_attachments() {
        let files = vec![InputFile::from_text("Travel.enex", &enex(TWO_RESOURCES))];
        let settings = ProviderSettings {
            hasher: Box::new(Sha256Hasher),
            ..ProviderSettings::default()
        };
        let result = Evernote.process(&files, &settings);

        let note = &result.notes[0];
        assert_eq!(note.attachments.len(), 2);
        for attachment in &note.attachments {
            assert_eq!(attachment.hash_type, "sha256");
            assert_eq!(attachment.hash.len(), 64);
            assert!(note.content.data.contains(&attachment.hash));
        }
    }

    #[test]
    fn test_invalid_resource_is_recorded_and_note_kept() {
        let notes = r#"<note>
  <title>Broken</title>
  <content><![CDATA[<en-note>text</en-note>]]></content>
  <resource><mime>image/png</mime></resource>
  <resource><data>@@@</data><mime>image/png</mime></resource>
</note>"#;
        let files = vec![InputFile::from_text("a.enex", &enex(notes))];
        let result = import(&files);

        assert_eq!(result.notes.len(), 1);
        assert!(result.notes[0].attachments.is_empty());
        assert_eq!(result.errors.len(), 2);
        assert!(result.errors.iter().all(|e| e.kind() == ErrorKind::Validation));
        assert_eq!(result.errors[0].context(), "a.enex / Broken");
        assert_eq!(result.errors[0].message(), "data is required.");
    }

    #[test]
    fn test_unreferenced_resource_is_dropped() {
        let notes = r#"<note>
  <title>Plain</title>
  <content><![CDATA[<en-note>no media</en-note>]]></content>
  <resource><data>aGk=</data><mime>image/png</mime></resource>
</note>"#;
        let files = vec![InputFile::from_text("a.enex", &enex(notes))];
        let result = import(&files);

        assert!(result.errors.is_empty());
        assert!(result.notes[0].attachments.is_empty());
    }

    #[test]
    fn test_untitled_and_multiple_notes() {
        let notes = r#"<note><content><![CDATA[<en-note>one</en-note>]]></content></note>
<note><title>Two</title><content><![CDATA[<en-note>two</en-note>]]></content></note>"#;
        let files = vec![InputFile::from_text("a.enex", &enex(notes))];
        let result = import(&files);

        let titles: Vec<&str> = result.notes.iter().map(|n| n.title.as_str()).collect();
        assert_eq!(titles, vec![UNTITLED_NOTE, "Two"]);
    }

    #[test]
    fn test_malformed_file_does_not_stop_batch() {
        let files = vec![
            InputFile::from_text("broken.enex", "<en-export><note><title>x</title>"),
            InputFile::from_text("other.xml", "<en-export></en-export>"),
            InputFile::from_text("good.enex", &enex(TWO_RESOURCES)),
        ];
        let result = import(&files);

        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].kind(), ErrorKind::Parse);
        assert_eq!(result.errors[0].context(), "broken.enex");
        assert_eq!(result.notes.len(), 1);
    }

    #[test]
    fn test_non_export_xml_is_not_applicable() {
        let files = vec![InputFile::from_text("notes.enex", "<html><body/></html>")];
        let result = import(&files);
        assert!(result.is_empty());
    }
}

//! Joplin JEX/RAW import implementation
//!
//! Joplin exports contain:
//! - .md files, one serialized item each (note, folder, resource, tag, note-tag)
//! - resource payloads under `resources/<id>.<ext>`
//!
//! Each item is identified by a 32-character hex ID. Items are parsed first,
//! then notes are joined to their tags, folder chain and resources.

use std::collections::BTreeSet;

use super::item::{unserialize, FolderEntity, JoplinItem, NoteEntity, ResourceEntity};
use crate::attachments::{resolve_attachments, ReferenceScheme, ResourceDescriptor};
use crate::error::ImportError;
use crate::file::{FileIndex, InputFile};
use crate::hierarchy::{FolderRecord, FolderTree, TagIndex};
use crate::models::{ImportResult, Note, NoteContent, UNTITLED_NOTE};
use crate::provider::{
    iterate, BatchOutput, FileOutcome, Provider, ProviderDescriptor, ProviderSettings,
};
use crate::render::{first_heading_text, markdown_to_html};

pub static DESCRIPTOR: ProviderDescriptor = ProviderDescriptor {
    name: "Joplin",
    version: "1.0.0",
    supported_extensions: &[".jex", ".md"],
    valid_extensions: &[".jex", ".md"],
};

/// Tag added to todo notes that are not yet done
pub const TODO_TAG: &str = "todo";
/// Tag added to finished todo notes
pub const COMPLETED_TAG: &str = "completed";

#[derive(Debug, Default, Clone, Copy)]
pub struct Joplin;

/// Every item of an export, bucketed by kind
#[derive(Default)]
struct JoplinData {
    notes: Vec<NoteEntity>,
    folders: Vec<FolderEntity>,
    resources: Vec<ResourceEntity>,
    tags: Vec<(String, String)>,
    note_tags: Vec<(String, String)>,
}

impl JoplinData {
    fn collect(items: Vec<JoplinItem>) -> Self {
        let mut data = Self::default();
        for item in items {
            match item {
                JoplinItem::Note(note) => data.notes.push(note),
                JoplinItem::Folder(folder) => data.folders.push(folder),
                JoplinItem::Resource(resource) => data.resources.push(resource),
                JoplinItem::Tag(tag) => {
                    if let Some(id) = tag.id {
                        data.tags.push((id, tag.title.unwrap_or_default()));
                    }
                }
                JoplinItem::NoteTag(link) => {
                    if let (Some(note_id), Some(tag_id)) = (link.note_id, link.tag_id) {
                        data.note_tags.push((note_id, tag_id));
                    }
                }
                JoplinItem::Ignored(type_code) => {
                    log::debug!("Ignoring Joplin item of type {}", type_code);
                }
            }
        }
        data
    }
}

/// Everything a note needs from the rest of the export
struct Correlation<'a> {
    folders: FolderTree,
    tags: TagIndex,
    resources: Vec<ResourceDescriptor>,
    files: FileIndex<'a>,
}

impl Provider for Joplin {
    fn descriptor(&self) -> &ProviderDescriptor {
        &DESCRIPTOR
    }

    fn process(&self, files: &[InputFile], settings: &ProviderSettings) -> ImportResult {
        let BatchOutput { items, errors } = iterate(&DESCRIPTOR, files, |file, out| {
            if file.extension().as_deref() == Some(".jex") {
                // JEX archives are expanded by the source loader
                return Ok(FileOutcome::NotApplicable);
            }
            let item = unserialize(&file.text())
                .map_err(|message| ImportError::parse(file.name(), message))?;
            out.items.push(item);
            Ok(FileOutcome::Handled)
        });

        let data = JoplinData::collect(items);
        let correlation = Correlation {
            folders: FolderTree::new(data.folders.iter().filter_map(folder_record)),
            tags: TagIndex::new(data.tags, data.note_tags),
            resources: data.resources.iter().filter_map(resource_descriptor).collect(),
            files: FileIndex::new(files),
        };

        let notes = data
            .notes
            .iter()
            .filter_map(|note| convert_note(note, &correlation, settings))
            .collect();

        ImportResult { notes, errors }
    }
}

fn folder_record(folder: &FolderEntity) -> Option<FolderRecord> {
    Some(FolderRecord {
        id: folder.id.clone()?,
        title: folder.title.clone().unwrap_or_default(),
        parent_id: folder.parent_id.clone(),
    })
}

fn resource_descriptor(resource: &ResourceEntity) -> Option<ResourceDescriptor> {
    Some(ResourceDescriptor {
        id: resource.id.clone()?,
        filename: resource.title.clone().or_else(|| resource.filename.clone()),
        mime: resource.mime.clone(),
    })
}

/// Returns `None` for notes without an id or body
fn convert_note(
    note: &NoteEntity,
    correlation: &Correlation<'_>,
    settings: &ProviderSettings,
) -> Option<Note> {
    let id = note.id.as_deref()?;
    let body = note.body.as_deref()?;

    let mut content = if note.is_html {
        body.to_string()
    } else {
        markdown_to_html(body)
    };

    let title = note
        .title
        .clone()
        .or_else(|| first_heading_text(&content))
        .unwrap_or_else(|| UNTITLED_NOTE.to_string());

    let attachments = resolve_attachments(
        &mut content,
        &correlation.resources,
        ReferenceScheme::Joplin,
        |resource| {
            correlation
                .files
                .find_containing(&format!("resources/{}", resource.id))
                .map(|file| file.bytes().to_vec())
        },
        settings.hasher.as_ref(),
    );

    let mut tags: BTreeSet<String> = correlation.tags.tags_for(id).into_iter().collect();
    if note.is_todo {
        let status = if note.todo_completed { COMPLETED_TAG } else { TODO_TAG };
        tags.insert(status.to_string());
    }

    let notebooks = note
        .parent_id
        .as_deref()
        .and_then(|parent| correlation.folders.resolve_notebook(parent, settings.max_folder_depth))
        .into_iter()
        .collect();

    let mut converted = Note::new(title, NoteContent::html(content));
    converted.date_created = note.user_created_time.or(note.created_time);
    converted.date_edited = note.user_updated_time.or(note.updated_time);
    converted.tags = tags;
    converted.attachments = attachments;
    converted.notebooks = notebooks;
    Some(converted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::models::Notebook;

    const NOTE_ID: &str = "0123456789abcdef0123456789abcdef";
    const ROOT_ID: &str = "aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa";
    const CHILD_ID: &str = "bbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb";
    const LEAF_ID: &str = "cccccccccccccccccccccccccccccccc";
    const IMAGE_ID: &str = "11111111111111111111111111111111";
    const PDF_ID: &str = "22222222222222222222222222222222";
    const UNUSED_ID: &str = "33333333333333333333333333333333";

    fn folder(id: &str, title: &str, parent: &str) -> InputFile {
        InputFile::from_text(
            format!("export/{}.md", id),
            &format!("{}\n\nid: {}\nparent_id: {}\ntype_: 2", title, id, parent),
        )
    }

    fn resource(id: &str, title: &str, mime: &str) -> InputFile {
        InputFile::from_text(
            format!("export/{}.md", id),
            &format!("{}\n\nid: {}\nmime: {}\nfilename: \ntype_: 4", title, id, mime),
        )
    }

    fn export() -> Vec<InputFile> {
        vec![
            InputFile::from_text(
                format!("export/{}.md", NOTE_ID),
                &format!(
                    "Trip plan\n\nSee ![map](:/{img}) and [the ticket](:/{pdf}).\n\nAgain ![map](:/{img})\n\nid: {id}\nparent_id: {leaf}\ncreated_time: 2023-01-15T10:30:00.000Z\nuser_created_time: 2022-12-01T08:00:00.000Z\nupdated_time: 1673778600000\nis_todo: 1\ntodo_completed: 1673778600000\ntype_: 1",
                    img = IMAGE_ID,
                    pdf = PDF_ID,
                    id = NOTE_ID,
                    leaf = LEAF_ID
                ),
            ),
            folder(ROOT_ID, "A", ""),
            folder(CHILD_ID, "B", ROOT_ID),
            folder(LEAF_ID, "C", CHILD_ID),
            resource(IMAGE_ID, "map.png", "image/png"),
            resource(PDF_ID, "", "application/pdf"),
            resource(UNUSED_ID, "unused.bin", ""),
            InputFile::from_text("export/t1.md", "travel\n\nid: t1\ntype_: 5"),
            InputFile::from_text("export/t2.md", "unused\n\nid: t2\ntype_: 5"),
            InputFile::from_text(
                "export/nt1.md",
                &format!("id: nt1\nnote_id: {}\ntag_id: t1\ntype_: 6", NOTE_ID),
            ),
            InputFile::new(format!("export/resources/{}.png", IMAGE_ID), vec![1, 2, 3]),
            InputFile::new(format!("export/resources/{}.pdf", PDF_ID), vec![4, 5]),
            InputFile::new(format!("export/resources/{}.bin", UNUSED_ID), vec![6]),
        ]
    }

    fn import(files: &[InputFile]) -> ImportResult {
        Joplin.process(files, &ProviderSettings::default())
    }

    #[test]
    fn test_full_export() {
        let result = import(&export());

        assert!(result.errors.is_empty());
        assert_eq!(result.notes.len(), 1);
        let note = &result.notes[0];

        assert_eq!(note.title, "Trip plan");
        assert_eq!(note.notebooks, vec![Notebook::with_topic("A", "B.C")]);
        let tags: Vec<&str> = note.tags.iter().map(String::as_str).collect();
        assert_eq!(tags, vec!["completed", "travel"]);

        assert_eq!(note.attachments.len(), 2);
        for attachment in &note.attachments {
            assert!(note.content.data.contains(&attachment.hash));
        }
        assert_eq!(note.attachments[0].filename, "map.png");
        assert_eq!(note.attachments[0].data, vec![1, 2, 3]);
        assert_eq!(note.attachments[1].filename, note.attachments[1].hash);
        assert_eq!(note.attachments[1].mime, "application/pdf");
        assert!(!note.content.data.contains(":/"));

        // user_created_time wins over created_time
        assert_eq!(
            note.date_created.unwrap().to_rfc3339(),
            "2022-12-01T08:00:00+00:00"
        );
        assert_eq!(note.date_edited.unwrap().timestamp_millis(), 1673778600000);
    }

    #[test]
    fn test_notes_without_id_or_body_are_skipped_silently() {
        let files = vec![
            InputFile::from_text("a.md", "No id\n\nbody\n\ntype_: 1"),
            InputFile::from_text("b.md", "No body\n\nid: b\ntype_: 1"),
            InputFile::from_text("c.md", "Kept\n\nbody\n\nid: c\ntype_: 1"),
        ];
        let result = import(&files);

        assert!(result.errors.is_empty());
        assert_eq!(result.notes.len(), 1);
        assert_eq!(result.notes[0].title, "Kept");
        assert!(result.notes[0].notebooks.is_empty());
    }

    #[test]
    fn test_title_from_heading() {
        let files = vec![
            InputFile::from_text("a.md", "\n\n## Heading *title*\n\ntext\n\nid: a\ntype_: 1"),
            InputFile::from_text("b.md", "\n\nplain text\n\nid: b\ntype_: 1"),
        ];
        let result = import(&files);

        assert_eq!(result.notes[0].title, "Heading title");
        assert_eq!(result.notes[1].title, UNTITLED_NOTE);
    }

    #[test]
    fn test_html_note_is_not_rendered() {
        let files = vec![InputFile::from_text(
            "a.md",
            "Web clip\n\n<p>*kept*</p>\n\nid: a\nmarkup_language: 2\ntype_: 1",
        )];
        let result = import(&files);
        assert_eq!(result.notes[0].content.data, "<p>*kept*</p>");
    }

    #[test]
    fn test_malformed_item_is_recorded() {
        let mut files = export();
        files.insert(0, InputFile::from_text("export/broken.md", "Title\n\nid: x"));
        files.push(InputFile::from_text("export/archive.jex", ""));
        let result = import(&files);

        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].kind(), ErrorKind::Parse);
        assert_eq!(result.errors[0].context(), "broken.md");
        assert_eq!(result.notes.len(), 1);
    }

    #[test]
    fn test_folder_cycle_and_dangling_parent() {
        let files = vec![
            folder("x", "X", "y"),
            folder("y", "Y", "x"),
            folder("d", "D", "gone"),
            InputFile::from_text("n1.md", "One\n\nbody\n\nid: n1\nparent_id: x\ntype_: 1"),
            InputFile::from_text("n2.md", "Two\n\nbody\n\nid: n2\nparent_id: d\ntype_: 1"),
            InputFile::from_text("n3.md", "Three\n\nbody\n\nid: n3\nparent_id: nowhere\ntype_: 1"),
        ];
        let result = import(&files);

        assert_eq!(result.notes[0].notebooks, vec![Notebook::with_topic("Y", "X")]);
        assert_eq!(result.notes[1].notebooks, vec![Notebook::new("D")]);
        assert!(result.notes[2].notebooks.is_empty());
    }

    #[test]
    fn test_thumbnail_linking_to_document() {
        let files = vec![
            InputFile::from_text(
                format!("export/{}.md", NOTE_ID),
                &format!(
                    "Scan\n\n[![thumb](:/{img})](:/{pdf})\n\nid: {id}\ntype_: 1",
                    img = IMAGE_ID,
                    pdf = PDF_ID,
                    id = NOTE_ID
                ),
            ),
            resource(IMAGE_ID, "thumb.png", "image/png"),
            resource(PDF_ID, "doc.pdf", "application/pdf"),
            InputFile::new(format!("export/resources/{}.png", IMAGE_ID), vec![1, 2, 3]),
            InputFile::new(format!("export/resources/{}.pdf", PDF_ID), vec![4, 5]),
        ];
        let result = import(&files);

        let note = &result.notes[0];
        assert_eq!(note.attachments.len(), 2);
        for attachment in &note.attachments {
            assert!(
                note.content.data.contains(&attachment.hash),
                "{} missing from {}",
                attachment.filename,
                note.content.data
            );
        }
    }
}

//! Joplin serialized item format
//!
//! Every item in a JEX/RAW export is one `.md` file:
//!
//! ```text
//! Title
//!
//! Body (notes only)
//!
//! id: 0123456789abcdef0123456789abcdef
//! parent_id: ...
//! type_: 1
//! ```
//!
//! The trailing `key: value` block up to the first blank line holds the
//! properties. Item type is read from `type_`.

use std::collections::HashMap;

use chrono::{DateTime, TimeZone, Utc};

/// Joplin item types (from type_ field)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoplinType {
    Note = 1,
    Folder = 2,
    Resource = 4,
    Tag = 5,
    NoteTag = 6,
}

impl JoplinType {
    pub fn from_i64(value: i64) -> Option<Self> {
        match value {
            1 => Some(JoplinType::Note),
            2 => Some(JoplinType::Folder),
            4 => Some(JoplinType::Resource),
            5 => Some(JoplinType::Tag),
            6 => Some(JoplinType::NoteTag),
            _ => None,
        }
    }
}

/// `markup_language` value for notes whose body is HTML
const MARKUP_HTML: i64 = 2;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct NoteEntity {
    pub id: Option<String>,
    pub parent_id: Option<String>,
    pub title: Option<String>,
    pub body: Option<String>,
    pub created_time: Option<DateTime<Utc>>,
    pub updated_time: Option<DateTime<Utc>>,
    pub user_created_time: Option<DateTime<Utc>>,
    pub user_updated_time: Option<DateTime<Utc>>,
    pub is_todo: bool,
    pub todo_completed: bool,
    pub is_html: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FolderEntity {
    pub id: Option<String>,
    pub title: Option<String>,
    pub parent_id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceEntity {
    pub id: Option<String>,
    pub title: Option<String>,
    pub mime: Option<String>,
    pub filename: Option<String>,
    pub file_extension: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TagEntity {
    pub id: Option<String>,
    pub title: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NoteTagEntity {
    pub note_id: Option<String>,
    pub tag_id: Option<String>,
}

/// One deserialized export item
#[derive(Debug, Clone, PartialEq)]
pub enum JoplinItem {
    Note(NoteEntity),
    Folder(FolderEntity),
    Resource(ResourceEntity),
    Tag(TagEntity),
    NoteTag(NoteTagEntity),
    /// Settings, revisions, master keys and other item kinds not imported
    Ignored(i64),
}

/// Parse Joplin timestamp (milliseconds since epoch or ISO-8601)
pub fn parse_joplin_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(millis) = value.parse::<i64>() {
        if millis <= 0 {
            return None;
        }
        return Utc.timestamp_millis_opt(millis).single();
    }
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

struct Properties(HashMap<String, String>);

impl Properties {
    fn text(&self, key: &str) -> Option<String> {
        self.0
            .get(key)
            .filter(|v| !v.is_empty())
            .cloned()
    }

    fn time(&self, key: &str) -> Option<DateTime<Utc>> {
        self.0.get(key).and_then(|v| parse_joplin_timestamp(v))
    }

    fn number(&self, key: &str) -> Option<i64> {
        self.0.get(key).and_then(|v| v.parse::<i64>().ok())
    }

    fn flag(&self, key: &str) -> bool {
        self.number(key).map(|n| n != 0).unwrap_or(false)
    }
}

/// Deserialize one exported item
pub fn unserialize(content: &str) -> Result<JoplinItem, String> {
    let lines: Vec<&str> = content.trim_end().split('\n').collect();

    let mut properties = HashMap::new();
    let mut body_end = 0;
    for (i, line) in lines.iter().enumerate().rev() {
        let line = line.trim();
        if line.is_empty() {
            body_end = i;
            break;
        }
        let Some((key, value)) = line.split_once(':') else {
            return Err(format!("Invalid property format: {}", line));
        };
        properties.insert(key.trim().to_string(), value.trim().to_string());
    }
    let props = Properties(properties);

    let type_code = match props.0.get("type_") {
        Some(value) => value
            .parse::<i64>()
            .map_err(|_| format!("Invalid type_ value: {}", value))?,
        None => return Err("Missing required property: type_".to_string()),
    };

    // The first leading line is the title, the next one separates it from the body
    let leading: Vec<&str> = lines[..body_end]
        .iter()
        .map(|l| l.trim_end_matches('\r'))
        .collect();
    let title = leading
        .first()
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty());
    let body = leading.get(2..).map(|rest| rest.join("\n"));

    let item = match JoplinType::from_i64(type_code) {
        Some(JoplinType::Note) => JoplinItem::Note(NoteEntity {
            id: props.text("id"),
            parent_id: props.text("parent_id"),
            title,
            body: body.filter(|b| !b.trim().is_empty()),
            created_time: props.time("created_time"),
            updated_time: props.time("updated_time"),
            user_created_time: props.time("user_created_time"),
            user_updated_time: props.time("user_updated_time"),
            is_todo: props.flag("is_todo"),
            todo_completed: props.flag("todo_completed"),
            is_html: props.number("markup_language") == Some(MARKUP_HTML),
        }),
        Some(JoplinType::Folder) => JoplinItem::Folder(FolderEntity {
            id: props.text("id"),
            title,
            parent_id: props.text("parent_id"),
        }),
        Some(JoplinType::Resource) => JoplinItem::Resource(ResourceEntity {
            id: props.text("id"),
            title,
            mime: props.text("mime"),
            filename: props.text("filename"),
            file_extension: props.text("file_extension"),
        }),
        Some(JoplinType::Tag) => JoplinItem::Tag(TagEntity {
            id: props.text("id"),
            title,
        }),
        Some(JoplinType::NoteTag) => JoplinItem::NoteTag(NoteTagEntity {
            note_id: props.text("note_id"),
            tag_id: props.text("tag_id"),
        }),
        None => JoplinItem::Ignored(type_code),
    };

    Ok(item)
}

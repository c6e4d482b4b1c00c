//! Folder hierarchy and tag correlation shared by the record-based importers
//!
//! Exports describe folders and tags as separate records linked by id.
//! [`FolderTree`] walks parent chains into a flattened [`Notebook`];
//! [`TagIndex`] joins note-tag link rows into per-note tag titles.
//!
//! Export data is not trusted: parent ids may dangle or form cycles, so every
//! walk is bounded by a visited set and a maximum depth.

use std::collections::{HashMap, HashSet};

use crate::models::{Notebook, DEFAULT_TOPIC};

/// Separator between topic levels below the notebook
pub const TOPIC_SEPARATOR: &str = ".";

/// Upper bound on ancestors collected for one note
pub const DEFAULT_MAX_DEPTH: usize = 32;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FolderRecord {
    pub id: String,
    pub title: String,
    pub parent_id: Option<String>,
}

#[derive(Debug, Default)]
pub struct FolderTree {
    folders: HashMap<String, FolderRecord>,
}

impl FolderTree {
    pub fn new(folders: impl IntoIterator<Item = FolderRecord>) -> Self {
        Self {
            folders: folders.into_iter().map(|f| (f.id.clone(), f)).collect(),
        }
    }

    pub fn get(&self, id: &str) -> Option<&FolderRecord> {
        self.folders.get(id)
    }

    pub fn len(&self) -> usize {
        self.folders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.folders.is_empty()
    }

    /// Folder `folder_id` followed by its ancestors, innermost first.
    ///
    /// Stops at a root, at a dangling parent id, at an id already visited, or
    /// after `max_depth` folders.
    pub fn ancestors(&self, folder_id: &str, max_depth: usize) -> Vec<&FolderRecord> {
        let mut chain = Vec::new();
        let mut seen = HashSet::new();
        let mut current_id = Some(folder_id);

        while let Some(id) = current_id {
            if chain.len() >= max_depth {
                log::debug!("Folder chain from {} truncated at depth {}", folder_id, max_depth);
                break;
            }
            if !seen.insert(id) {
                log::debug!("Folder cycle detected at {}", id);
                break;
            }

            let Some(folder) = self.folders.get(id) else {
                if id != folder_id {
                    log::debug!("Dangling parent folder reference: {}", id);
                }
                break;
            };

            chain.push(folder);
            current_id = folder.parent_id.as_deref().filter(|p| !p.is_empty());
        }

        chain
    }

    /// Flatten the chain above `folder_id` into a notebook + topic
    pub fn resolve_notebook(&self, folder_id: &str, max_depth: usize) -> Option<Notebook> {
        let chain = self.ancestors(folder_id, max_depth);
        let titles: Vec<&str> = chain.iter().map(|f| f.title.as_str()).collect();
        notebook_from_chain(&titles)
    }
}

/// Build a notebook from titles ordered innermost first.
///
/// The outermost title becomes the notebook name and the rest, outer to
/// inner, form the topic.
pub fn notebook_from_chain(titles: &[&str]) -> Option<Notebook> {
    let (top_most, rest) = titles.split_last()?;
    let topic = if rest.is_empty() {
        DEFAULT_TOPIC.to_string()
    } else {
        rest.iter()
            .rev()
            .copied()
            .collect::<Vec<_>>()
            .join(TOPIC_SEPARATOR)
    };
    Some(Notebook::with_topic(*top_most, topic))
}

/// Tag titles by id plus note → tag link rows
#[derive(Debug, Default)]
pub struct TagIndex {
    titles: HashMap<String, String>,
    links: HashMap<String, Vec<String>>,
}

impl TagIndex {
    /// `tags` are `(tag id, title)` pairs, `links` are `(note id, tag id)` rows
    pub fn new(
        tags: impl IntoIterator<Item = (String, String)>,
        links: impl IntoIterator<Item = (String, String)>,
    ) -> Self {
        let mut index = Self {
            titles: tags.into_iter().collect(),
            links: HashMap::new(),
        };
        for (note_id, tag_id) in links {
            let tag_ids = index.links.entry(note_id).or_default();
            if !tag_ids.contains(&tag_id) {
                tag_ids.push(tag_id);
            }
        }
        index
    }

    /// Titles of every tag linked to `note_id`; links to unknown tags are dropped
    pub fn tags_for(&self, note_id: &str) -> Vec<String> {
        let Some(tag_ids) = self.links.get(note_id) else {
            return Vec::new();
        };

        tag_ids
            .iter()
            .filter_map(|tag_id| match self.titles.get(tag_id) {
                Some(title) if !title.is_empty() => Some(title.clone()),
                Some(_) => None,
                None => {
                    log::debug!("Note {} links to unknown tag {}", note_id, tag_id);
                    None
                }
            })
            .collect()
    }
}

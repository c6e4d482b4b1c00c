//! Convert note-app exports into one canonical note model.
//!
//! Each supported app has a [`Provider`] that turns a batch of
//! [`InputFile`]s into an [`ImportResult`]: the notes it could read plus an
//! error for every file or note it could not.

pub mod attachments;
pub mod config;
pub mod error;
pub mod evernote;
pub mod file;
pub mod hasher;
pub mod hierarchy;
pub mod joplin;
pub mod models;
pub mod provider;
pub mod render;
pub mod simplenote;
pub mod source;
pub mod xml;
pub mod zoho;

pub use config::ImportConfig;
pub use error::{ErrorKind, ImportError};
pub use file::InputFile;
pub use hasher::{HashAlgorithm, Hasher};
pub use models::{Attachment, ImportResult, Note, NoteContent, Notebook};
pub use provider::{import, Provider, ProviderKind, ProviderSettings};

//! Import error types
//!
//! Errors are values collected into an [`ImportResult`](crate::models::ImportResult),
//! never a reason to stop a batch. Each one names the smallest unit it
//! affected (a file, or a note inside a file).

use std::path::{Path, PathBuf};

use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};
use thiserror::Error;

/// Coarse classification of an [`ImportError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorKind {
    /// A required field is missing or invalid on one record
    Validation,
    /// The top-level payload of one file is malformed
    Parse,
    /// Reading input from disk failed
    Io,
}

/// Errors recorded while importing a batch of files
#[derive(Debug, Error)]
pub enum ImportError {
    #[error("{message} ({context})")]
    Validation { context: String, message: String },

    #[error("Failed to parse {context}: {message}")]
    Parse { context: String, message: String },

    #[error("IO error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ImportError {
    pub fn validation(context: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            context: context.into(),
            message: message.into(),
        }
    }

    pub fn parse(context: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Parse {
            context: context.into(),
            message: message.into(),
        }
    }

    pub fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation { .. } => ErrorKind::Validation,
            Self::Parse { .. } => ErrorKind::Parse,
            Self::Io { .. } => ErrorKind::Io,
        }
    }

    /// The file or record the error originated from
    pub fn context(&self) -> String {
        match self {
            Self::Validation { context, .. } | Self::Parse { context, .. } => context.clone(),
            Self::Io { path, .. } => path.display().to_string(),
        }
    }

    /// Human readable message without the context suffix
    pub fn message(&self) -> String {
        match self {
            Self::Validation { message, .. } | Self::Parse { message, .. } => message.clone(),
            Self::Io { source, .. } => source.to_string(),
        }
    }
}

impl Serialize for ImportError {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("ImportError", 3)?;
        state.serialize_field("kind", &self.kind())?;
        state.serialize_field("message", &self.message())?;
        state.serialize_field("context", &self.context())?;
        state.end()
    }
}

/// Result type alias for import operations
pub type Result<T> = std::result::Result<T, ImportError>;

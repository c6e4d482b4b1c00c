//! Import configuration
//!
//! Read from a TOML file:
//!
//! ```toml
//! hash_algorithm = "sha256"
//! max_folder_depth = 16
//! include_trashed = true
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{ImportError, Result};
use crate::hasher::HashAlgorithm;
use crate::hierarchy::DEFAULT_MAX_DEPTH;
use crate::provider::ProviderSettings;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ImportConfig {
    /// Digest used for attachment hashes
    pub hash_algorithm: HashAlgorithm,
    /// Maximum number of folders collected when flattening a notebook path
    pub max_folder_depth: usize,
    /// Also import Simplenote notes from the trash
    pub include_trashed: bool,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            hash_algorithm: HashAlgorithm::default(),
            max_folder_depth: DEFAULT_MAX_DEPTH,
            include_trashed: false,
        }
    }
}

impl ImportConfig {
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(text).map_err(|e| ImportError::parse("config", e.to_string()))?;
        if config.max_folder_depth == 0 {
            return Err(ImportError::validation(
                "config",
                "max_folder_depth must be at least 1",
            ));
        }
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|e| ImportError::io(path, e))?;
        Self::from_toml_str(&text).map_err(|e| match e {
            ImportError::Parse { message, .. } => {
                ImportError::parse(path.display().to_string(), message)
            }
            ImportError::Validation { message, .. } => {
                ImportError::validation(path.display().to_string(), message)
            }
            other => other,
        })
    }

    /// Runtime settings handed to providers
    pub fn settings(&self) -> ProviderSettings {
        ProviderSettings {
            hasher: self.hash_algorithm.hasher(),
            max_folder_depth: self.max_folder_depth,
            include_trashed: self.include_trashed,
        }
    }
}

//! Content hashing for attachments

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Turns attachment bytes into the digest string that keys them in note content
pub trait Hasher: Send + Sync {
    fn hash(&self, data: &[u8]) -> String;

    /// Algorithm tag stored alongside each attachment
    fn kind(&self) -> &'static str;
}

/// MD5, the digest Evernote uses for `<en-media hash>`
#[derive(Debug, Clone, Copy, Default)]
pub struct Md5Hasher;

impl Hasher for Md5Hasher {
    fn hash(&self, data: &[u8]) -> String {
        format!("{:x}", md5::compute(data))
    }

    fn kind(&self) -> &'static str {
        "md5"
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Sha256Hasher;

impl Hasher for Sha256Hasher {
    fn hash(&self, data: &[u8]) -> String {
        hex::encode(Sha256::digest(data))
    }

    fn kind(&self) -> &'static str {
        "sha256"
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum HashAlgorithm {
    #[default]
    Md5,
    Sha256,
}

impl HashAlgorithm {
    pub fn hasher(self) -> Box<dyn Hasher> {
        match self {
            Self::Md5 => Box::new(Md5Hasher),
            Self::Sha256 => Box::new(Sha256Hasher),
        }
    }
}

impl FromStr for HashAlgorithm {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "md5" => Ok(Self::Md5),
            "sha256" => Ok(Self::Sha256),
            other => Err(format!("unknown hash algorithm: {other}")),
        }
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Md5 => f.write_str("md5"),
            Self::Sha256 => f.write_str("sha256"),
        }
    }
}

//! Digest primitives shared by the tree builder and the proof engine.

use std::fs::File;
use std::io;
use std::path::Path;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Prefix byte for leaf content under [`HashScheme::Tagged`].
const LEAF_TAG: u8 = 0x00;
/// Prefix byte for internal-node combination under [`HashScheme::Tagged`].
const NODE_TAG: u8 = 0x01;

/// How leaf and internal-node digests are derived.
///
/// `Plain` hashes raw content for leaves and the concatenated hex text of two
/// children for internal nodes. `Tagged` prefixes each hash input with a
/// one-byte node kind, so a leaf digest can never be replayed as an internal
/// node digest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HashScheme {
    #[default]
    Plain,
    Tagged,
}

impl HashScheme {
    pub fn as_str(&self) -> &'static str {
        match self {
            HashScheme::Plain => "plain",
            HashScheme::Tagged => "tagged",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "plain" => Some(HashScheme::Plain),
            "tagged" => Some(HashScheme::Tagged),
            _ => None,
        }
    }

    /// Digest of raw leaf content.
    pub fn leaf_digest(&self, data: &[u8]) -> String {
        let mut hasher = Sha256::new();
        if *self == HashScheme::Tagged {
            hasher.update([LEAF_TAG]);
        }
        hasher.update(data);
        hex::encode(hasher.finalize())
    }

    /// Parent digest of two children, `left` first.
    pub fn combine(&self, left: &str, right: &str) -> String {
        let mut hasher = Sha256::new();
        if *self == HashScheme::Tagged {
            hasher.update([NODE_TAG]);
        }
        hasher.update(left.as_bytes());
        hasher.update(right.as_bytes());
        hex::encode(hasher.finalize())
    }

    /// Streaming leaf digest of a file's contents.
    pub fn hash_file<P: AsRef<Path>>(&self, path: P) -> io::Result<String> {
        let mut file = File::open(path)?;
        let mut hasher = Sha256::new();
        if *self == HashScheme::Tagged {
            hasher.update([LEAF_TAG]);
        }
        io::copy(&mut file, &mut hasher)?;
        Ok(hex::encode(hasher.finalize()))
    }
}

/// Compute SHA-256 hash of data.
pub fn hash_data(data: &[u8]) -> String {
    HashScheme::Plain.leaf_digest(data)
}

/// Hash the concatenation of two hex digests.
pub fn combine(left: &str, right: &str) -> String {
    HashScheme::Plain.combine(left, right)
}

/// Compute SHA-256 hash of a file without loading it into memory.
pub fn hash_file<P: AsRef<Path>>(path: P) -> io::Result<String> {
    HashScheme::Plain.hash_file(path)
}

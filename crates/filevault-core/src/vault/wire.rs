//! Download payloads exchanged with remote verifiers.

use serde::{Deserialize, Serialize};

use crate::merkle::{HashScheme, ProofStep};

/// A stored file together with its inclusion proof.
///
/// `root_hash` is the server's claim and informational only; verifiers
/// check against their own trusted root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadResponse {
    pub file_name: String,
    /// File contents, hex encoded in JSON
    #[serde(with = "hex_bytes")]
    pub file_data: Vec<u8>,
    /// Empty when the server could not prove the file
    pub proof: Vec<ProofStep>,
    pub leaf_index: Option<usize>,
    pub root_hash: Option<String>,
    #[serde(default)]
    pub scheme: HashScheme,
}

impl DownloadResponse {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

mod hex_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(deserializer)?;
        hex::decode(s).map_err(serde::de::Error::custom)
    }
}

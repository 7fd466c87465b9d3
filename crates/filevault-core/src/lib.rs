//! Filevault Core Library
//!
//! Upload a directory of files and later download any one of them with a
//! proof that the bytes are exactly the bytes uploaded.
//!
//! # Architecture
//!
//! ```text
//!   Client directory                                  Vault (per session)
//!   ────────────────                                  ───────────────────
//!   hash each file ──► client tree ──► trusted root   store file ──► leaf
//!          │                               │                          │
//!          └──────────── upload ───────────┼─────────────────► server tree
//!                                          │                          │
//!                                          ▼                          ▼
//!                               verify(leaf, proof, root) ◄── file + proof
//! ```
//!
//! # Modules
//!
//! - [`merkle`]: tree builder, proof generation and verification
//! - [`session`]: session-keyed registry of server trees
//! - [`db`]: SQLite arrival log and session roots
//! - [`vault`]: file storage, directory upload, download verification
//! - [`config`]: JSON configuration with environment overrides

pub mod config;
pub mod db;
pub mod merkle;
pub mod session;
pub mod vault;

// Re-export commonly used types
pub use config::Config;
pub use db::Database;
pub use merkle::{
    verify_proof, verify_proof_with, HashScheme, MerkleError, MerkleProof, MerkleTree, ProofStep,
    SiblingPosition, TreeStats,
};
pub use session::TreeRegistry;
pub use vault::{DownloadResponse, Vault, VaultError};

// UniFFI setup - using proc macros
uniffi::setup_scaffolding!();

use std::sync::{Arc, Mutex};

// =========================================================================
// FFI Error Type
// =========================================================================

#[derive(Debug, thiserror::Error, uniffi::Error)]
pub enum FilevaultError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Integrity failure: {0}")]
    IntegrityFailure(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<MerkleError> for FilevaultError {
    fn from(e: MerkleError) -> Self {
        match e {
            MerkleError::NotFound(leaf) => FilevaultError::NotFound(leaf),
        }
    }
}

impl From<VaultError> for FilevaultError {
    fn from(e: VaultError) -> Self {
        match e {
            VaultError::IntegrityFailure(file) => FilevaultError::IntegrityFailure(file),
            VaultError::FileNotFound(file) => FilevaultError::NotFound(file),
            other => FilevaultError::Internal(other.to_string()),
        }
    }
}

impl From<serde_json::Error> for FilevaultError {
    fn from(e: serde_json::Error) -> Self {
        FilevaultError::SerializationError(e.to_string())
    }
}

impl<T> From<std::sync::PoisonError<T>> for FilevaultError {
    fn from(e: std::sync::PoisonError<T>) -> Self {
        FilevaultError::Internal(format!("Lock poisoned: {}", e))
    }
}

// =========================================================================
// Factory Functions (exported to FFI)
// =========================================================================

/// Create an empty tree.
#[uniffi::export]
pub fn new_tree(scheme: FfiHashScheme) -> Arc<FilevaultCore> {
    Arc::new(FilevaultCore {
        tree: Mutex::new(MerkleTree::with_scheme(scheme.into())),
    })
}

/// Leaf digest of raw content.
#[uniffi::export]
pub fn hash_bytes(data: Vec<u8>, scheme: FfiHashScheme) -> String {
    HashScheme::from(scheme).leaf_digest(&data)
}

/// Verify proof steps for a leaf digest against a trusted root.
#[uniffi::export]
pub fn verify_inclusion(
    leaf_hash: String,
    steps: Vec<FfiProofStep>,
    root_hash: String,
    scheme: FfiHashScheme,
) -> bool {
    let steps: Vec<ProofStep> = steps.into_iter().map(Into::into).collect();
    verify_proof_with(scheme.into(), &leaf_hash, &steps, &root_hash)
}

/// Verify a JSON download response and return the verified file bytes.
#[uniffi::export]
pub fn verify_download_json(
    response_json: String,
    trusted_root: String,
    scheme: FfiHashScheme,
) -> Result<Vec<u8>, FilevaultError> {
    let response = DownloadResponse::from_json(&response_json)?;
    Ok(vault::verify_download(&response, &trusted_root, scheme.into())?)
}

// =========================================================================
// Main API Object
// =========================================================================

/// Thread-safe tree wrapper for FFI.
#[derive(uniffi::Object)]
pub struct FilevaultCore {
    tree: Mutex<MerkleTree>,
}

#[uniffi::export]
impl FilevaultCore {
    /// Append a leaf digest and return the new root.
    pub fn add_leaf(&self, digest: String) -> Result<String, FilevaultError> {
        let mut tree = self.tree.lock()?;
        tree.add_leaf(digest);
        Ok(tree.root().unwrap_or_default().to_string())
    }

    /// Current root, if any leaf has been added.
    pub fn root(&self) -> Result<Option<String>, FilevaultError> {
        let tree = self.tree.lock()?;
        Ok(tree.root().map(str::to_string))
    }

    pub fn leaf_count(&self) -> Result<u32, FilevaultError> {
        let tree = self.tree.lock()?;
        Ok(tree.len() as u32)
    }

    /// Generate an inclusion proof for the first leaf equal to `digest`.
    pub fn generate_proof(&self, digest: String) -> Result<FfiMerkleProof, FilevaultError> {
        let tree = self.tree.lock()?;
        let proof = tree.generate_proof(&digest)?;
        Ok(proof.into())
    }
}

// =========================================================================
// FFI Types
// =========================================================================

/// FFI-safe hash scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, uniffi::Enum)]
pub enum FfiHashScheme {
    Plain,
    Tagged,
}

impl From<FfiHashScheme> for HashScheme {
    fn from(scheme: FfiHashScheme) -> Self {
        match scheme {
            FfiHashScheme::Plain => HashScheme::Plain,
            FfiHashScheme::Tagged => HashScheme::Tagged,
        }
    }
}

impl From<HashScheme> for FfiHashScheme {
    fn from(scheme: HashScheme) -> Self {
        match scheme {
            HashScheme::Plain => FfiHashScheme::Plain,
            HashScheme::Tagged => FfiHashScheme::Tagged,
        }
    }
}

/// FFI-safe proof step. `sibling_hash` is `None` for a promoted level.
#[derive(Debug, Clone, PartialEq, Eq, uniffi::Record)]
pub struct FfiProofStep {
    pub sibling_hash: Option<String>,
    pub sibling_on_left: bool,
}

impl From<ProofStep> for FfiProofStep {
    fn from(step: ProofStep) -> Self {
        match step {
            ProofStep::Sibling { hash, position } => Self {
                sibling_hash: Some(hash),
                sibling_on_left: position == SiblingPosition::Left,
            },
            ProofStep::Promoted => Self {
                sibling_hash: None,
                sibling_on_left: false,
            },
        }
    }
}

impl From<FfiProofStep> for ProofStep {
    fn from(step: FfiProofStep) -> Self {
        match step.sibling_hash {
            Some(hash) => ProofStep::Sibling {
                hash,
                position: if step.sibling_on_left {
                    SiblingPosition::Left
                } else {
                    SiblingPosition::Right
                },
            },
            None => ProofStep::Promoted,
        }
    }
}

/// FFI-safe inclusion proof.
#[derive(Debug, Clone, uniffi::Record)]
pub struct FfiMerkleProof {
    pub leaf_hash: String,
    pub root_hash: String,
    pub steps: Vec<FfiProofStep>,
    pub leaf_index: u32,
    pub scheme: FfiHashScheme,
}

impl From<MerkleProof> for FfiMerkleProof {
    fn from(proof: MerkleProof) -> Self {
        Self {
            leaf_hash: proof.leaf_hash,
            root_hash: proof.root_hash,
            steps: proof.steps.into_iter().map(Into::into).collect(),
            leaf_index: proof.leaf_index as u32,
            scheme: proof.scheme.into(),
        }
    }
}

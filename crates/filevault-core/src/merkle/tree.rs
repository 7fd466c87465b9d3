//! Merkle tree core implementation.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use super::digest::HashScheme;
use super::proof::{verify_proof_with, MerkleProof, ProofStep, SiblingPosition};

/// Merkle tree errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MerkleError {
    #[error("Leaf not found: {0}")]
    NotFound(String),
}

pub type MerkleResult<T> = Result<T, MerkleError>;

/// Append-only Merkle tree over hex digests.
///
/// The root is rebuilt from the full leaf sequence on every append. Odd
/// layers promote their last node unchanged instead of duplicating it.
///
/// Deserialization rebuilds the root from the leaves; a serialized `root`
/// is never trusted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "TreeLeaves")]
pub struct MerkleTree {
    leaves: Vec<String>,
    root: Option<String>,
    scheme: HashScheme,
}

#[derive(Deserialize)]
struct TreeLeaves {
    leaves: Vec<String>,
    #[serde(default)]
    scheme: HashScheme,
}

impl From<TreeLeaves> for MerkleTree {
    fn from(raw: TreeLeaves) -> Self {
        MerkleTree::from_leaves(raw.scheme, raw.leaves)
    }
}

/// Tree statistics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeStats {
    pub root_hash: Option<String>,
    pub height: u32,
    pub leaf_count: u32,
}

impl MerkleTree {
    /// Create an empty tree using the plain hash scheme.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty tree using the given hash scheme.
    pub fn with_scheme(scheme: HashScheme) -> Self {
        Self {
            scheme,
            ..Self::default()
        }
    }

    /// Build a tree by appending every leaf in order.
    pub fn from_leaves<I, S>(scheme: HashScheme, leaves: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let leaves: Vec<String> = leaves.into_iter().map(Into::into).collect();
        let root = compute_root(&leaves, scheme);
        Self {
            leaves,
            root,
            scheme,
        }
    }

    /// Append a leaf digest and recompute the root.
    pub fn add_leaf(&mut self, digest: impl Into<String>) {
        self.leaves.push(digest.into());
        self.root = compute_root(&self.leaves, self.scheme);
        debug!(
            leaf_count = self.leaves.len(),
            root = self.root.as_deref().unwrap_or_default(),
            "leaf appended"
        );
    }

    /// Current root, `None` while the tree is empty.
    pub fn root(&self) -> Option<&str> {
        self.root.as_deref()
    }

    pub fn leaves(&self) -> &[String] {
        &self.leaves
    }

    pub fn scheme(&self) -> HashScheme {
        self.scheme
    }

    pub fn len(&self) -> usize {
        self.leaves.len()
    }

    pub fn is_empty(&self) -> bool {
        self.leaves.is_empty()
    }

    /// Number of levels including the leaf level; 0 for an empty tree.
    pub fn height(&self) -> u32 {
        if self.leaves.is_empty() {
            return 0;
        }
        let mut width = self.leaves.len();
        let mut height = 1;
        while width > 1 {
            width = width.div_ceil(2);
            height += 1;
        }
        height
    }

    pub fn stats(&self) -> TreeStats {
        TreeStats {
            root_hash: self.root.clone(),
            height: self.height(),
            leaf_count: self.leaves.len() as u32,
        }
    }

    /// Position of the first leaf equal to `digest`.
    pub fn position(&self, digest: &str) -> Option<usize> {
        self.leaves.iter().position(|leaf| leaf == digest)
    }

    /// Generate an inclusion proof for the first leaf equal to `digest`.
    pub fn generate_proof(&self, digest: &str) -> MerkleResult<MerkleProof> {
        let index = self
            .position(digest)
            .ok_or_else(|| MerkleError::NotFound(digest.to_string()))?;
        self.generate_proof_at(index)
    }

    /// Generate an inclusion proof for the leaf at `index`.
    pub fn generate_proof_at(&self, index: usize) -> MerkleResult<MerkleProof> {
        let (leaf_hash, root_hash) = match (self.leaves.get(index), &self.root) {
            (Some(leaf), Some(root)) => (leaf.clone(), root.clone()),
            _ => return Err(MerkleError::NotFound(format!("leaf index {}", index))),
        };

        let mut steps = Vec::new();
        let mut layer = self.leaves.clone();
        let mut current = index;

        while layer.len() > 1 {
            let step = if current % 2 == 1 {
                ProofStep::Sibling {
                    hash: layer[current - 1].clone(),
                    position: SiblingPosition::Left,
                }
            } else if current + 1 < layer.len() {
                ProofStep::Sibling {
                    hash: layer[current + 1].clone(),
                    position: SiblingPosition::Right,
                }
            } else {
                ProofStep::Promoted
            };
            steps.push(step);

            layer = next_layer(&layer, self.scheme);
            current /= 2;
        }

        debug!(leaf_index = index, steps = steps.len(), "proof generated");

        Ok(MerkleProof {
            leaf_hash,
            root_hash,
            steps,
            leaf_index: index,
            scheme: self.scheme,
        })
    }

    /// Verify proof steps for `leaf` against this tree's current root.
    pub fn verify(&self, leaf: &str, steps: &[ProofStep]) -> bool {
        match &self.root {
            Some(root) => verify_proof_with(self.scheme, leaf, steps, root),
            None => false,
        }
    }
}

/// Collapse one layer into its parent layer.
fn next_layer(layer: &[String], scheme: HashScheme) -> Vec<String> {
    layer
        .chunks(2)
        .map(|pair| match pair {
            [left, right] => scheme.combine(left, right),
            [lone] => lone.clone(),
            _ => unreachable!("chunks(2) yields one or two elements"),
        })
        .collect()
}

/// Compute the root of an ordered leaf sequence; `None` when empty.
pub fn compute_root(leaves: &[String], scheme: HashScheme) -> Option<String> {
    if leaves.is_empty() {
        return None;
    }

    let mut layer = leaves.to_vec();
    while layer.len() > 1 {
        layer = next_layer(&layer, scheme);
    }
    layer.pop()
}

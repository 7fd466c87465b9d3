//! Merkle inclusion proofs and their verification.

use serde::{Deserialize, Serialize};

use super::digest::HashScheme;

/// Side of the running digest a sibling sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SiblingPosition {
    Left,
    Right,
}

/// One level of an inclusion proof.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ProofStep {
    /// Combine the running digest with `hash`, placed on `position`.
    Sibling {
        hash: String,
        position: SiblingPosition,
    },
    /// The node was the unpaired tail of an odd layer and passes through.
    Promoted,
}

/// Merkle inclusion proof, detached from the tree that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MerkleProof {
    /// Hash of the leaf being proven
    pub leaf_hash: String,
    /// Root hash at time of proof generation
    pub root_hash: String,
    /// Steps from leaf level to root
    pub steps: Vec<ProofStep>,
    /// Index of leaf in tree (for context)
    pub leaf_index: usize,
    /// Hash scheme the tree was built with
    #[serde(default)]
    pub scheme: HashScheme,
}

impl MerkleProof {
    /// Verify against the root embedded in the proof.
    pub fn verify(&self) -> bool {
        verify_proof_with(self.scheme, &self.leaf_hash, &self.steps, &self.root_hash)
    }

    /// Verify against a root obtained out-of-band.
    pub fn verify_against(&self, trusted_root: &str) -> bool {
        verify_proof_with(self.scheme, &self.leaf_hash, &self.steps, trusted_root)
    }

    /// Number of sibling digests carried (promoted levels excluded).
    pub fn sibling_count(&self) -> usize {
        self.steps
            .iter()
            .filter(|step| matches!(step, ProofStep::Sibling { .. }))
            .count()
    }
}

/// Replay `steps` over `leaf` using the plain scheme and compare with `root`.
pub fn verify_proof(leaf: &str, steps: &[ProofStep], root: &str) -> bool {
    verify_proof_with(HashScheme::Plain, leaf, steps, root)
}

/// Replay `steps` over `leaf` and compare with `root`.
///
/// Never fails: a malformed or forged proof yields `false`.
pub fn verify_proof_with(scheme: HashScheme, leaf: &str, steps: &[ProofStep], root: &str) -> bool {
    let computed = steps
        .iter()
        .fold(leaf.to_string(), |current, step| match step {
            ProofStep::Promoted => current,
            ProofStep::Sibling {
                hash,
                position: SiblingPosition::Right,
            } => scheme.combine(&current, hash),
            ProofStep::Sibling {
                hash,
                position: SiblingPosition::Left,
            } => scheme.combine(hash, &current),
        });

    computed == root
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::merkle::{combine, MerkleTree};

    #[test]
    fn test_empty_proof() {
        assert!(verify_proof("root", &[], "root"));
        assert!(!verify_proof("leaf", &[], "root"));
    }

    #[test]
    fn test_orientation_is_honoured() {
        let root = combine("a", "b");
        let left = [ProofStep::Sibling {
            hash: "a".to_string(),
            position: SiblingPosition::Left,
        }];
        let right = [ProofStep::Sibling {
            hash: "a".to_string(),
            position: SiblingPosition::Right,
        }];
        assert!(verify_proof("b", &left, &root));
        assert!(!verify_proof("b", &right, &root));
    }

    #[test]
    fn test_promoted_steps_pass_through() {
        let steps = [ProofStep::Promoted, ProofStep::Promoted];
        assert!(verify_proof("x", &steps, "x"));
    }

    #[test]
    fn test_verify_against_other_root() {
        let tree = MerkleTree::from_leaves(HashScheme::Plain, ["a", "b", "c"]);
        let proof = tree.generate_proof("c").unwrap();
        assert!(proof.verify_against(tree.root().unwrap()));
        assert!(!proof.verify_against(&combine("a", "b")));
        assert_eq!(proof.sibling_count(), 1);
    }

    #[test]
    fn test_proof_json_shape() {
        let proof = MerkleProof {
            leaf_hash: "h2".to_string(),
            root_hash: "root".to_string(),
            steps: vec![
                ProofStep::Sibling {
                    hash: "h1".to_string(),
                    position: SiblingPosition::Left,
                },
                ProofStep::Promoted,
            ],
            leaf_index: 1,
            scheme: HashScheme::Plain,
        };

        let json = serde_json::to_value(&proof).unwrap();
        assert_eq!(
            json["steps"],
            serde_json::json!([
                {"kind": "sibling", "hash": "h1", "position": "left"},
                {"kind": "promoted"}
            ])
        );
        assert_eq!(json["scheme"], "plain");

        let parsed: MerkleProof = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, proof);
    }

    #[test]
    fn test_scheme_defaults_when_absent() {
        let json = r#"{"leaf_hash":"a","root_hash":"a","steps":[],"leaf_index":0}"#;
        let proof: MerkleProof = serde_json::from_str(json).unwrap();
        assert_eq!(proof.scheme, HashScheme::Plain);
        assert!(proof.verify());
    }
}

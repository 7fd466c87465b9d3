//! Merkle tree integration tests.

use filevault_core::merkle::{
    combine, hash_data, verify_proof, HashScheme, MerkleError, MerkleTree, ProofStep,
    SiblingPosition,
};

fn file_digests(n: usize) -> Vec<String> {
    (0..n)
        .map(|i| hash_data(format!("contents of file {}", i).as_bytes()))
        .collect()
}

#[test]
fn test_single_leaf_root() {
    let mut tree = MerkleTree::new();
    let leaf = hash_data(b"only file");
    tree.add_leaf(leaf.clone());

    // Single leaf: root == leaf
    assert_eq!(tree.root(), Some(leaf.as_str()));
}

#[test]
fn test_deterministic_root() {
    let first = MerkleTree::from_leaves(HashScheme::Plain, file_digests(7));
    let second = MerkleTree::from_leaves(HashScheme::Plain, file_digests(7));
    assert_eq!(first.root(), second.root());

    let mut incremental = MerkleTree::new();
    for leaf in file_digests(7) {
        incremental.add_leaf(leaf);
    }
    assert_eq!(incremental.root(), first.root());
}

#[test]
fn test_order_sensitive() {
    let leaves = file_digests(4);
    let mut reordered = leaves.clone();
    reordered.swap(0, 3);

    let original = MerkleTree::from_leaves(HashScheme::Plain, leaves);
    let swapped = MerkleTree::from_leaves(HashScheme::Plain, reordered);
    assert_ne!(original.root(), swapped.root());
}

#[test]
fn test_three_leaf_scenario() {
    let mut tree = MerkleTree::new();
    for leaf in ["h1", "h2", "h3"] {
        tree.add_leaf(leaf);
    }

    let expected_root = combine(&combine("h1", "h2"), "h3");
    assert_eq!(tree.root(), Some(expected_root.as_str()));

    let proof = tree.generate_proof("h2").unwrap();
    assert_eq!(
        proof.steps,
        vec![
            ProofStep::Sibling {
                hash: "h1".to_string(),
                position: SiblingPosition::Left,
            },
            ProofStep::Promoted,
        ]
    );
    assert!(verify_proof("h2", &proof.steps, &expected_root));
}

#[test]
fn test_even_tree_round_trip() {
    let tree = MerkleTree::from_leaves(HashScheme::Plain, ["a", "b", "c", "d"]);
    let root = tree.root().unwrap();

    for leaf in ["a", "b", "c", "d"] {
        let proof = tree.generate_proof(leaf).unwrap();
        assert_eq!(proof.steps.len(), 2);
        assert!(verify_proof(leaf, &proof.steps, root));
    }
}

#[test]
fn test_proof_for_every_leaf_of_odd_trees() {
    for n in [3, 5, 6, 7, 9, 11, 13] {
        let tree = MerkleTree::from_leaves(HashScheme::Plain, file_digests(n));
        for leaf in tree.leaves() {
            let proof = tree.generate_proof(leaf).unwrap();
            assert!(proof.verify());
            assert_eq!(proof.leaf_hash, *leaf);
        }
    }
}

#[test]
fn test_unknown_leaf_not_found() {
    let tree = MerkleTree::from_leaves(HashScheme::Plain, file_digests(3));
    let missing = hash_data(b"never uploaded");
    assert_eq!(
        tree.generate_proof(&missing).unwrap_err(),
        MerkleError::NotFound(missing)
    );
}

#[test]
fn test_tamper_detection() {
    let contents: Vec<Vec<u8>> = (0..6).map(|i| vec![i as u8; 64]).collect();
    let tree = MerkleTree::from_leaves(
        HashScheme::Plain,
        contents.iter().map(|c| hash_data(c)),
    );
    let root = tree.root().unwrap();

    let proof = tree.generate_proof(&hash_data(&contents[3])).unwrap();
    for byte in 0..contents[3].len() {
        let mut tampered = contents[3].clone();
        tampered[byte] ^= 0xff;
        assert!(!verify_proof(&hash_data(&tampered), &proof.steps, root));
    }
}

#[test]
fn test_tampered_proof_fails() {
    let tree = MerkleTree::from_leaves(HashScheme::Plain, file_digests(5));
    let mut proof = tree.generate_proof(&tree.leaves()[1]).unwrap();

    // Tamper with leaf hash
    let original_leaf = proof.leaf_hash.clone();
    proof.leaf_hash = "tampered_hash".to_string();
    assert!(!proof.verify());

    // Restore and tamper with root
    proof.leaf_hash = original_leaf;
    proof.root_hash = "tampered_root".to_string();
    assert!(!proof.verify());
}

#[test]
fn test_empty_proof_semantics() {
    let tree = MerkleTree::from_leaves(HashScheme::Plain, ["only"]);
    let root = tree.root().unwrap();

    assert!(verify_proof("only", &[], root));
    assert!(!verify_proof("other", &[], root));
}

#[test]
fn test_truncated_and_extended_proofs_fail() {
    let tree = MerkleTree::from_leaves(HashScheme::Plain, file_digests(8));
    let root = tree.root().unwrap();
    let leaf = &tree.leaves()[5];
    let proof = tree.generate_proof(leaf).unwrap();

    assert!(!verify_proof(leaf, &proof.steps[..2], root));

    let mut extended = proof.steps.clone();
    extended.push(ProofStep::Sibling {
        hash: hash_data(b"extra"),
        position: SiblingPosition::Right,
    });
    assert!(!verify_proof(leaf, &extended, root));
}

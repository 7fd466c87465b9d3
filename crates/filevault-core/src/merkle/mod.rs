//! Merkle tree engine: leaf accumulation, root computation, inclusion proofs.

mod digest;
mod tree;
mod proof;

pub use digest::*;
pub use tree::*;
pub use proof::*;

//! Session-keyed registry of server-side Merkle trees.
//!
//! Each upload session owns an independent tree, so proofs for one upload
//! batch never depend on files from another. All access to a tree goes
//! through one mutex: appends are serialized and proofs are taken from a
//! consistent snapshot.
//!
//! A session keeps the hash scheme it was created with for its whole life,
//! independent of the registry default used for new sessions.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use thiserror::Error;
use tracing::info;
use uuid::Uuid;

use crate::merkle::{HashScheme, MerkleError, MerkleProof, MerkleTree};

/// Session registry errors.
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Unknown session: {0}")]
    UnknownSession(Uuid),

    #[error("Merkle error: {0}")]
    Merkle(#[from] MerkleError),

    #[error("Lock poisoned: {0}")]
    LockPoisoned(String),
}

pub type SessionResult<T> = Result<T, SessionError>;

/// Trees keyed by upload session.
pub struct TreeRegistry {
    /// Scheme given to newly opened sessions
    scheme: HashScheme,
    trees: Mutex<HashMap<Uuid, MerkleTree>>,
}

impl TreeRegistry {
    pub fn new(scheme: HashScheme) -> Self {
        Self {
            scheme,
            trees: Mutex::new(HashMap::new()),
        }
    }

    pub fn scheme(&self) -> HashScheme {
        self.scheme
    }

    fn lock(&self) -> SessionResult<MutexGuard<'_, HashMap<Uuid, MerkleTree>>> {
        self.trees
            .lock()
            .map_err(|e| SessionError::LockPoisoned(e.to_string()))
    }

    /// Start a new session with an empty tree.
    pub fn open_session(&self) -> SessionResult<Uuid> {
        let id = Uuid::new_v4();
        self.open_session_with(id)?;
        Ok(id)
    }

    /// Register an empty tree under a caller-chosen id (no-op if present).
    pub fn open_session_with(&self, id: Uuid) -> SessionResult<()> {
        let mut trees = self.lock()?;
        trees
            .entry(id)
            .or_insert_with(|| MerkleTree::with_scheme(self.scheme));
        info!(session = %id, "session opened");
        Ok(())
    }

    /// Replace a session's tree with one rebuilt from a recorded leaf log,
    /// under the scheme the session was recorded with.
    pub fn restore(
        &self,
        id: Uuid,
        scheme: HashScheme,
        leaves: Vec<String>,
    ) -> SessionResult<Option<String>> {
        let tree = MerkleTree::from_leaves(scheme, leaves);
        let root = tree.root().map(str::to_string);
        info!(
            session = %id,
            scheme = scheme.as_str(),
            leaf_count = tree.len(),
            "session restored"
        );
        self.lock()?.insert(id, tree);
        Ok(root)
    }

    /// Append a leaf to a session's tree and return the new root.
    pub fn append(&self, id: Uuid, digest: &str) -> SessionResult<String> {
        let mut trees = self.lock()?;
        let tree = trees.get_mut(&id).ok_or(SessionError::UnknownSession(id))?;
        tree.add_leaf(digest);
        Ok(tree.root().unwrap_or_default().to_string())
    }

    pub fn root(&self, id: Uuid) -> SessionResult<Option<String>> {
        self.with_tree(id, |tree| tree.root().map(str::to_string))
    }

    /// Hash scheme of one session's tree.
    pub fn session_scheme(&self, id: Uuid) -> SessionResult<HashScheme> {
        self.with_tree(id, MerkleTree::scheme)
    }

    pub fn leaf_count(&self, id: Uuid) -> SessionResult<usize> {
        self.with_tree(id, MerkleTree::len)
    }

    /// Generate a proof for `digest` within one session.
    pub fn generate_proof(&self, id: Uuid, digest: &str) -> SessionResult<MerkleProof> {
        let trees = self.lock()?;
        let tree = trees.get(&id).ok_or(SessionError::UnknownSession(id))?;
        Ok(tree.generate_proof(digest)?)
    }

    /// Clone of a session's tree taken under the lock.
    pub fn snapshot(&self, id: Uuid) -> SessionResult<MerkleTree> {
        self.with_tree(id, Clone::clone)
    }

    pub fn close_session(&self, id: Uuid) -> SessionResult<Option<MerkleTree>> {
        let removed = self.lock()?.remove(&id);
        if removed.is_some() {
            info!(session = %id, "session closed");
        }
        Ok(removed)
    }

    pub fn sessions(&self) -> SessionResult<Vec<Uuid>> {
        let mut ids: Vec<Uuid> = self.lock()?.keys().copied().collect();
        ids.sort();
        Ok(ids)
    }

    fn with_tree<T>(&self, id: Uuid, f: impl FnOnce(&MerkleTree) -> T) -> SessionResult<T> {
        let trees = self.lock()?;
        trees
            .get(&id)
            .map(f)
            .ok_or(SessionError::UnknownSession(id))
    }
}

impl Default for TreeRegistry {
    fn default() -> Self {
        Self::new(HashScheme::default())
    }
}

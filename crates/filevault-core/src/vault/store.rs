//! Server-side file storage with per-session Merkle trees.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use tracing::{info, warn};
use uuid::Uuid;

use crate::config::Config;
use crate::db::{Database, FileRecord, RootRecord};
use crate::merkle::{HashScheme, MerkleError};
use crate::session::{SessionError, TreeRegistry};

use super::{validate_file_name, DownloadResponse, VaultError, VaultResult};

/// Result of storing one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredFile {
    pub file_name: String,
    /// Leaf digest of the stored bytes
    pub digest: String,
    /// Session root after the append
    pub root: String,
    pub leaf_count: u32,
}

/// File vault manager.
pub struct Vault {
    dir: PathBuf,
    db: Mutex<Database>,
    registry: TreeRegistry,
}

impl Vault {
    /// Open the vault described by `config`, replaying recorded sessions.
    pub fn open(config: &Config) -> VaultResult<Self> {
        let db = Database::open(&config.vault.database)?;
        Self::with_database(&config.vault.dir, db, config.hash_scheme)
    }

    /// Open a vault over an already-open database.
    pub fn with_database<P: AsRef<Path>>(
        dir: P,
        db: Database,
        scheme: HashScheme,
    ) -> VaultResult<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;

        let vault = Self {
            dir,
            db: Mutex::new(db),
            registry: TreeRegistry::new(scheme),
        };
        vault.replay_sessions()?;
        Ok(vault)
    }

    /// Rebuild every session tree from the arrival log.
    fn replay_sessions(&self) -> VaultResult<()> {
        let db = self.lock_db()?;
        for session in db.recorded_sessions()? {
            let leaves = db.leaf_digests(session)?;
            let record = db.get_root(session)?;
            let scheme = record
                .as_ref()
                .map_or(self.scheme(), |record| record.scheme);
            let root = self.registry.restore(session, scheme, leaves)?;

            if let Some(record) = record {
                if root.as_deref() != Some(record.root_hash.as_str()) {
                    warn!(
                        session = %session,
                        recorded = %record.root_hash,
                        rebuilt = root.as_deref().unwrap_or_default(),
                        "rebuilt root differs from recorded root"
                    );
                }
            }
        }
        Ok(())
    }

    fn lock_db(&self) -> VaultResult<MutexGuard<'_, Database>> {
        self.db
            .lock()
            .map_err(|e| VaultError::LockPoisoned(e.to_string()))
    }

    /// Scheme given to new sessions. Existing sessions keep their own.
    pub fn scheme(&self) -> HashScheme {
        self.registry.scheme()
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn file_path(&self, session: Uuid, file_name: &str) -> PathBuf {
        self.dir.join(session.to_string()).join(file_name)
    }

    /// Start a new upload session.
    pub fn begin_upload(&self) -> VaultResult<Uuid> {
        Ok(self.registry.open_session()?)
    }

    /// Store one file and append its digest to the session tree.
    pub fn store_file(&self, session: Uuid, file_name: &str, data: &[u8]) -> VaultResult<StoredFile> {
        validate_file_name(file_name)?;

        // Held until the root is recorded so log order matches tree order.
        let db = self.lock_db()?;

        let scheme = self.registry.session_scheme(session)?;
        if db.find_file(session, file_name)?.is_some() {
            return Err(VaultError::DuplicateFile(file_name.to_string()));
        }

        let path = self.file_path(session, file_name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, data)?;

        let digest = scheme.leaf_digest(data);
        if let Err(e) = db.record_file(session, file_name, &digest, data.len() as u64) {
            // Unrecorded bytes must not linger under the session directory.
            if let Err(remove_err) = fs::remove_file(&path) {
                warn!(
                    path = %path.display(),
                    error = %remove_err,
                    "failed to remove unrecorded file"
                );
            }
            return Err(e.into());
        }
        let root = self.registry.append(session, &digest)?;

        let stats = self.registry.snapshot(session)?.stats();
        db.upsert_root(session, &root, stats.leaf_count, stats.height, scheme)?;

        info!(
            session = %session,
            file = file_name,
            size = data.len(),
            digest = %digest,
            "file stored"
        );

        Ok(StoredFile {
            file_name: file_name.to_string(),
            digest,
            root,
            leaf_count: stats.leaf_count,
        })
    }

    /// Read a stored file and package it with its inclusion proof.
    ///
    /// If the stored bytes no longer match any leaf the response carries an
    /// empty proof, which a verifier will reject.
    pub fn download(&self, session: Uuid, file_name: &str) -> VaultResult<DownloadResponse> {
        validate_file_name(file_name)?;

        let db = self.lock_db()?;
        if db.find_file(session, file_name)?.is_none() {
            return Err(VaultError::FileNotFound(file_name.to_string()));
        }

        let file_data = match fs::read(self.file_path(session, file_name)) {
            Ok(data) => data,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(VaultError::FileNotFound(file_name.to_string()))
            }
            Err(e) => return Err(e.into()),
        };

        let scheme = self.registry.session_scheme(session)?;
        let digest = scheme.leaf_digest(&file_data);
        let (proof, leaf_index) = match self.registry.generate_proof(session, &digest) {
            Ok(proof) => (proof.steps, Some(proof.leaf_index)),
            Err(SessionError::Merkle(MerkleError::NotFound(_))) => {
                warn!(
                    session = %session,
                    file = file_name,
                    "no leaf for stored bytes, sending empty proof"
                );
                (Vec::new(), None)
            }
            Err(e) => return Err(e.into()),
        };

        Ok(DownloadResponse {
            file_name: file_name.to_string(),
            file_data,
            proof,
            leaf_index,
            root_hash: self.registry.root(session)?,
            scheme,
        })
    }

    pub fn session_root(&self, session: Uuid) -> VaultResult<Option<String>> {
        Ok(self.registry.root(session)?)
    }

    /// Persisted roots of all sessions that stored at least one file.
    pub fn list_sessions(&self) -> VaultResult<Vec<RootRecord>> {
        Ok(self.lock_db()?.list_roots()?)
    }

    pub fn list_files(&self, session: Uuid) -> VaultResult<Vec<FileRecord>> {
        Ok(self.lock_db()?.list_files(session)?)
    }
}

//! File vault: stores uploaded files per session and serves them back with
//! inclusion proofs.
//!
//! The server half ([`Vault`]) and the client half ([`upload_directory`],
//! [`verify_download`]) build separate trees over the same arrival order.
//! The client keeps its own root as the trusted root; the server's claimed
//! root is never used for verification.

mod client;
mod store;
mod wire;

pub use client::*;
pub use store::*;
pub use wire::*;

use std::path::PathBuf;

use thiserror::Error;

use crate::db::DbError;
use crate::session::SessionError;

/// Vault errors.
#[derive(Error, Debug)]
pub enum VaultError {
    #[error("Database error: {0}")]
    Database(#[from] DbError),

    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid file name: {0:?}")]
    InvalidFileName(String),

    #[error("File already uploaded in this session: {0}")]
    DuplicateFile(String),

    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("Integrity verification failed for {0}")]
    IntegrityFailure(String),

    #[error("Root mismatch: client {client}, server {server}")]
    RootMismatch { client: String, server: String },

    #[error("No trusted root in {0}")]
    MissingRoot(PathBuf),

    #[error("Lock poisoned: {0}")]
    LockPoisoned(String),
}

pub type VaultResult<T> = Result<T, VaultError>;

/// Accept only plain, single-component file names.
pub fn validate_file_name(name: &str) -> VaultResult<()> {
    let invalid = name.is_empty()
        || name == "."
        || name == ".."
        || name.contains('/')
        || name.contains('\\')
        || name.contains('\0');
    if invalid {
        return Err(VaultError::InvalidFileName(name.to_string()));
    }
    Ok(())
}

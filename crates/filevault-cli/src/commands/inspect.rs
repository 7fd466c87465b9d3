use std::path::Path;

use anyhow::{Context, Result};
use filevault_core::vault::hash_directory;
use filevault_core::{Config, MerkleTree, Vault};
use uuid::Uuid;

/// Hash a directory locally without uploading it.
pub fn run_hash(config: &Config, dir: &Path) -> Result<()> {
    let hashed = hash_directory(dir, config.hash_scheme)
        .with_context(|| format!("failed to hash {}", dir.display()))?;

    for file in &hashed {
        println!("  {}  {}", file.digest, file.path.display());
    }

    let tree = MerkleTree::from_leaves(
        config.hash_scheme,
        hashed.into_iter().map(|file| file.digest),
    );
    match tree.root() {
        Some(root) => println!("Root: {root} ({} leaves, height {})", tree.len(), tree.height()),
        None => println!("No files found in {}", dir.display()),
    }
    Ok(())
}

pub fn run_root(config: &Config, session: Uuid) -> Result<()> {
    let vault = Vault::open(config).context("failed to open vault")?;
    match vault.session_root(session)? {
        Some(root) => println!("{root}"),
        None => println!("Session {session} has no files"),
    }
    Ok(())
}

pub fn run_sessions(config: &Config) -> Result<()> {
    let vault = Vault::open(config).context("failed to open vault")?;
    let sessions = vault.list_sessions()?;
    if sessions.is_empty() {
        println!("No sessions");
        return Ok(());
    }

    for record in sessions {
        println!(
            "{}  {:>5} files  {}  {}  {}",
            record.session_id,
            record.leaf_count,
            record.scheme.as_str(),
            record.root_hash,
            record.updated_at
        );
    }
    Ok(())
}

pub fn run_files(config: &Config, session: Uuid) -> Result<()> {
    let vault = Vault::open(config).context("failed to open vault")?;
    for record in vault.list_files(session)? {
        println!(
            "{:>4}  {}  {:>10}  {}",
            record.seq, record.digest, record.size, record.file_name
        );
    }
    Ok(())
}

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use filevault_core::vault::{save_root, upload_directory};
use filevault_core::{Config, Vault};

/// Upload a directory as a new session and save the client root as the
/// trusted root for later downloads.
pub fn run_upload(config: &Config, dir: &Path, remove_source: bool) -> Result<()> {
    let vault = Vault::open(config).context("failed to open vault")?;
    let report = upload_directory(&vault, dir)
        .with_context(|| format!("failed to upload {}", dir.display()))?;

    println!("Session: {}", report.session_id);
    for stored in &report.files {
        println!("  {}  {}", stored.digest, stored.file_name);
    }

    match report.root() {
        Some(root) => {
            save_root(&config.client.root_file, root).with_context(|| {
                format!(
                    "failed to save root to {}",
                    config.client.root_file.display()
                )
            })?;
            println!("Root: {root}");
            println!("Saved trusted root to {}", config.client.root_file.display());
        }
        None => {
            println!("No files found in {}", dir.display());
            println!(
                "Trusted root in {} was not updated",
                config.client.root_file.display()
            );
            tracing::warn!(dir = %dir.display(), "empty upload, trusted root unchanged");
        }
    }

    if remove_source {
        fs::remove_dir_all(dir)
            .with_context(|| format!("failed to remove {}", dir.display()))?;
        tracing::info!(dir = %dir.display(), "source directory removed");
    }

    Ok(())
}

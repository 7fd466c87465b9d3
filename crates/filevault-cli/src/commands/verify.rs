use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use filevault_core::vault::verify_download;
use filevault_core::{Config, DownloadResponse};

use super::trusted_root;

/// Re-check a saved download bundle against the trusted root.
pub fn run_verify(config: &Config, bundle: &Path, root: Option<&str>) -> Result<()> {
    let raw = fs::read_to_string(bundle)
        .with_context(|| format!("failed to read {}", bundle.display()))?;
    let response = DownloadResponse::from_json(&raw).context("malformed bundle")?;

    let trusted = trusted_root(config, root)?;
    // Sessions keep the scheme they were uploaded with.
    let data = verify_download(&response, &trusted, response.scheme)?;

    println!(
        "Verified {} ({} bytes, {} proof steps)",
        response.file_name,
        data.len(),
        response.proof.len()
    );
    Ok(())
}

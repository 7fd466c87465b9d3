use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use filevault_core::vault::verify_download;
use filevault_core::{Config, Vault};
use uuid::Uuid;

use super::trusted_root;

/// Download a file, verify it against the trusted root and write it out.
///
/// Nothing is written to `output` unless verification succeeds.
pub fn run_download(
    config: &Config,
    session: Uuid,
    file: &str,
    output: Option<&Path>,
    bundle: Option<&Path>,
    root: Option<&str>,
) -> Result<()> {
    let vault = Vault::open(config).context("failed to open vault")?;
    let response = vault
        .download(session, file)
        .with_context(|| format!("failed to download {file}"))?;

    if let Some(bundle) = bundle {
        fs::write(bundle, response.to_json()?)
            .with_context(|| format!("failed to write bundle {}", bundle.display()))?;
        println!("Wrote bundle to {}", bundle.display());
    }

    let trusted = trusted_root(config, root)?;
    // Sessions keep the scheme they were uploaded with.
    let data = verify_download(&response, &trusted, response.scheme)?;

    let output = output.map(Path::to_path_buf).unwrap_or_else(|| PathBuf::from(file));
    fs::write(&output, &data)
        .with_context(|| format!("failed to write {}", output.display()))?;

    println!(
        "Downloaded and verified {} ({} bytes) -> {}",
        file,
        data.len(),
        output.display()
    );
    Ok(())
}

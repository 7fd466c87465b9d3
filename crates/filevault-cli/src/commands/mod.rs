pub mod download;
pub mod inspect;
pub mod upload;
pub mod verify;

use anyhow::Result;
use filevault_core::vault::load_root;
use filevault_core::Config;

/// Root given on the command line, or the one saved by the last upload.
pub(crate) fn trusted_root(config: &Config, provided: Option<&str>) -> Result<String> {
    match provided {
        Some(root) => Ok(root.trim().to_string()),
        None => Ok(load_root(&config.client.root_file)?),
    }
}

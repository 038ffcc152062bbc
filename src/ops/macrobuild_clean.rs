//! Implementation of `macrobuild clean`.

use std::path::Path;

use anyhow::Result;

use crate::util::fs::remove_dir_all_if_exists;

/// Remove the build folder. Returns whether there was anything to remove.
pub fn clean(build_folder: &Path) -> Result<bool> {
    if !build_folder.exists() {
        return Ok(false);
    }
    remove_dir_all_if_exists(build_folder)?;
    tracing::info!("removed {}", build_folder.display());
    Ok(true)
}

//! `macrobuild clean` command

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;

use crate::cli::CleanArgs;
use macrobuild::ops::clean;
use macrobuild::util::{Shell, Status};

pub fn execute(args: CleanArgs, project: Option<&Path>, shell: &Arc<Shell>) -> Result<()> {
    let target = super::resolve(&args.target, project)?;

    if clean(&target.build_folder)? {
        shell.status(Status::Removed, target.build_folder.display());
    } else {
        shell.note(format!("{} does not exist", target.build_folder.display()));
    }
    Ok(())
}

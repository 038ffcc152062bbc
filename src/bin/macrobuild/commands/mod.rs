//! Command implementations

use std::path::Path;

use anyhow::Result;

use crate::cli::TargetArgs;
use macrobuild::util::{GlobalContext, Overrides, ResolvedTarget};

pub mod build;
pub mod clean;
pub mod compile;

/// Resolve the target selected on the command line.
pub fn resolve(args: &TargetArgs, project: Option<&Path>) -> Result<ResolvedTarget> {
    let ctx = GlobalContext::new()?;
    let overrides = Overrides {
        target: args.target.clone(),
        build_folder: args.build_folder.clone(),
        app_loc: args.app_loc.clone(),
    };
    ctx.resolve_target(project, &overrides)
}

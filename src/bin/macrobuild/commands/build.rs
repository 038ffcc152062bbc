//! `macrobuild build` command

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;

use crate::cli::BuildArgs;
use macrobuild::ops::{build, BuildOptions, CompileOptions};
use macrobuild::util::{Shell, Status};

pub fn execute(args: BuildArgs, project: Option<&Path>, shell: &Arc<Shell>) -> Result<()> {
    let target = super::resolve(&args.target, project)?;
    let opts = BuildOptions {
        compile: CompileOptions { force: args.force },
    };

    let phase = shell.phase(
        Status::Compiling,
        format!("target `{}` ({})", target.name, target.server_type),
    );
    let result = build(&target, &opts, shell)?;
    if result.compile.skipped {
        shell.status(Status::Fresh, "compiled sources are current");
    }

    shell.status(Status::Created, result.files.script.display());
    shell.verbose_status(Status::Created, result.files.tree.display());
    shell.verbose_status(Status::Created, result.files.compressed_tree.display());
    phase.finish(format!("{} artifacts", result.artifacts.len()));

    shell.json_event(&serde_json::json!({
        "reason": "built",
        "target": target.name,
        "script": result.files.script,
        "tree": result.files.tree,
        "compressedTree": result.files.compressed_tree,
        "artifacts": result.artifacts,
    }));
    Ok(())
}

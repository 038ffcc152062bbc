//! `macrobuild compile` command

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;

use crate::cli::CompileArgs;
use macrobuild::ops::{compile, CompileOptions};
use macrobuild::util::{Shell, Status};

pub fn execute(args: CompileArgs, project: Option<&Path>, shell: &Arc<Shell>) -> Result<()> {
    let target = super::resolve(&args.target, project)?;
    let opts = CompileOptions { force: args.force };

    let phase = shell.phase(
        Status::Compiling,
        format!("target `{}` ({})", target.name, target.server_type),
    );
    let result = compile(&target, &opts, shell)?;

    if result.skipped {
        shell.status(
            Status::Fresh,
            format!("{} is current", target.build_folder.display()),
        );
        return Ok(());
    }

    shell.verbose_status(Status::Info, &result.reason);
    phase.finish(format!(
        "{} files, {} dependencies",
        result.artifacts.len(),
        result.dependencies
    ));
    shell.json_event(&serde_json::json!({
        "reason": "compiled",
        "target": target.name,
        "buildFolder": target.build_folder,
        "artifacts": result.artifacts.iter().map(|a| a.build_path()).collect::<Vec<_>>(),
        "tests": result.test_flow.tests,
    }));
    Ok(())
}

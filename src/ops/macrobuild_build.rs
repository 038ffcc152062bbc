//! Implementation of `macrobuild build`.

use std::sync::Arc;

use anyhow::Result;

use crate::encoder::{encode, write_bundle, BundleFiles, ScriptFrame};
use crate::ops::macrobuild_compile::{compile, CompileOptions, CompileResult};
use crate::util::config::ResolvedTarget;
use crate::util::shell::{Shell, Status};

#[derive(Debug, Clone, Default)]
pub struct BuildOptions {
    pub compile: CompileOptions,
}

#[derive(Debug, Clone)]
pub struct BuildResult {
    pub compile: CompileResult,
    pub files: BundleFiles,

    /// Artifact paths in the order they appear in the script and tree
    pub artifacts: Vec<String>,
}

/// Compile if stale, then encode the build folder into the deployment script
/// and artifact tree.
pub fn build(target: &ResolvedTarget, opts: &BuildOptions, shell: &Arc<Shell>) -> Result<BuildResult> {
    let compile = compile(target, &opts.compile, shell)?;

    shell.status(
        Status::Building,
        format!("{} ({})", target.build_file, target.server_type),
    );
    let frame = ScriptFrame::for_target(target)?;
    let bundle = encode(
        &target.build_folder,
        target.server_type,
        &target.app_loc,
        &frame,
    )?;
    let files = write_bundle(&bundle, &target.build_folder, &target.build_file)?;
    tracing::info!(
        "wrote {} artifacts to {}",
        bundle.artifacts.len(),
        files.script.display()
    );

    Ok(BuildResult {
        compile,
        files,
        artifacts: bundle.artifacts,
    })
}

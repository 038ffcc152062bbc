//! Implementation of `macrobuild compile`.
//!
//! A compile run:
//! 1. checks that every declared source folder exists
//! 2. skips the run when the build folder is still current (unless forced)
//! 3. copies each service and job folder into `<build>/services|jobs/<name>`
//! 4. moves test files into `<build>/tests/<category>/...`
//! 5. compiles every script in place, sharing one dependency ledger
//! 6. compiles macro tests against the persisted ledger
//! 7. compiles the test set-up and tear-down programs (best effort)
//! 8. writes the test flow manifest

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use walkdir::WalkDir;

use crate::compiler::{
    check_compile_status, BuildError, DependencyLedger, DirectivePolicy, HeaderResolver, Inliner,
    IGNORED_FOLDERS, LEDGER_FILE,
};
use crate::core::server::is_script_file;
use crate::core::test_flow::{is_test_file, SET_UP_FILE, TEAR_DOWN_FILE, TEST_FLOW_FILE};
use crate::core::{Category, CompiledArtifact, TestFlow};
use crate::util::config::ResolvedTarget;
use crate::util::fs::{
    copy_dir_all, ensure_dir, file_name, glob_files, relative_path, remove_dir_all_if_exists,
    to_slash_path, write_string,
};
use crate::util::shell::{Shell, Status};

/// Glob patterns finding test files inside macro folders.
const MACRO_TEST_PATTERNS: [&str; 2] = ["**/*.test.sas", "**/*.test.[0-9]*.sas"];

#[derive(Debug, Clone, Default)]
pub struct CompileOptions {
    /// Compile even when the build folder is current
    pub force: bool,
}

/// Outcome of a compile run.
#[derive(Debug, Clone, Default)]
pub struct CompileResult {
    /// The build folder was current and nothing was compiled
    pub skipped: bool,

    /// Why the build folder was (or was not) considered stale
    pub reason: String,

    /// Compiled files, in compilation order
    pub artifacts: Vec<CompiledArtifact>,

    pub test_flow: TestFlow,

    /// Number of dependency files loaded during the run
    pub dependencies: usize,
}

/// Compile the target's sources into its build folder.
pub fn compile(target: &ResolvedTarget, opts: &CompileOptions, shell: &Arc<Shell>) -> Result<CompileResult> {
    check_source_folders(target)?;

    let services = target.sources.folders(Category::Service);
    let jobs = target.sources.folders(Category::Job);
    let build = &target.build_folder;

    let status = check_compile_status(build, services, jobs)?;
    if status.equal && !opts.force {
        tracing::info!("build folder {} is current", build.display());
        let flow_path = build.join(TEST_FLOW_FILE);
        let test_flow = if flow_path.exists() {
            TestFlow::load(&flow_path)?
        } else {
            TestFlow::default()
        };
        return Ok(CompileResult {
            skipped: true,
            reason: "build folder is current".to_string(),
            test_flow,
            ..CompileResult::default()
        });
    }
    let reason = if status.equal {
        "forced".to_string()
    } else {
        status.reason
    };
    tracing::info!("compiling target `{}`: {}", target.name, reason);

    // A half-written build folder would pass the next staleness check.
    match compile_into(target, build, reason, shell) {
        Ok(result) => Ok(result),
        Err(e) => {
            tracing::warn!("compile failed, removing {}", build.display());
            if let Err(cleanup) = remove_dir_all_if_exists(build) {
                tracing::warn!("could not remove {}: {:#}", build.display(), cleanup);
            }
            Err(e)
        }
    }
}

/// Rebuild `build` from scratch. The caller removes it if this fails.
fn compile_into(
    target: &ResolvedTarget,
    build: &Path,
    reason: String,
    shell: &Arc<Shell>,
) -> Result<CompileResult> {
    let services = target.sources.folders(Category::Service);
    let jobs = target.sources.folders(Category::Job);

    remove_dir_all_if_exists(build)?;
    ensure_dir(build)?;
    materialize(build, Category::Service, services)?;
    materialize(build, Category::Job, jobs)?;
    relocate_tests(build)?;

    let resolver = HeaderResolver::new();
    let policy = DirectivePolicy::default();
    let inliner = Inliner::new(
        &resolver,
        target.sources.folders(Category::Macro),
        target.sources.folders(Category::Program),
        &policy,
    );

    let mut ledger = DependencyLedger::new();
    let pending = pending_files(build)?;
    let mut artifacts = Vec::with_capacity(pending.len());
    let mut progress = shell.progress(pending.len() as u64, "compiling");
    for (category, path) in pending {
        let relative = to_slash_path(&relative_path(build, &path));
        shell.verbose_status(Status::Compiling, &relative);

        let content = inliner
            .compile_file(&mut ledger, category, &path, target.category_config(category))
            .with_context(|| format!("failed to compile {}", relative))?;
        write_string(&path, &content)?;
        artifacts.push(artifact(build, category, &path, content));
        progress.inc(1);
    }
    progress.finish();

    let ledger_path = build.join(LEDGER_FILE);
    ledger.save(&ledger_path)?;

    let mut ledger = DependencyLedger::load(&ledger_path)?;
    for (path, destination) in macro_tests(build, target.sources.folders(Category::Macro))? {
        shell.verbose_status(Status::Compiling, path.display());
        let content = inliner
            .compile_file(&mut ledger, Category::Test, &path, &target.test)
            .with_context(|| format!("failed to compile macro test {}", path.display()))?;
        write_string(&destination, &content)?;
        artifacts.push(artifact(build, Category::Test, &destination, content));
    }

    for (program, name) in [
        (&target.test_set_up, SET_UP_FILE),
        (&target.test_tear_down, TEAR_DOWN_FILE),
    ] {
        let Some(program) = program else {
            continue;
        };
        let destination = build.join(Category::Test.folder_name()).join(name);
        match inliner.compile_file(&mut ledger, Category::Test, program, &target.test) {
            Ok(content) => {
                write_string(&destination, &content)?;
                artifacts.push(artifact(build, Category::Test, &destination, content));
            }
            Err(e) => {
                tracing::warn!("skipping {}: {:#}", program.display(), e);
                shell.warn(format!("could not compile {}: {:#}", program.display(), e));
            }
        }
    }

    let test_flow = TestFlow::from_build_folder(build)?;
    test_flow.save(&build.join(TEST_FLOW_FILE))?;

    Ok(CompileResult {
        skipped: false,
        reason,
        artifacts,
        test_flow,
        dependencies: ledger.len(),
    })
}

/// Every declared source folder must exist.
fn check_source_folders(target: &ResolvedTarget) -> Result<()> {
    for category in [Category::Service, Category::Job, Category::Macro, Category::Program] {
        if let Some(missing) = target
            .sources
            .folders(category)
            .iter()
            .find(|f| !f.is_dir())
        {
            return Err(BuildError::MissingSourceFolder {
                path: missing.clone(),
            }
            .into());
        }
    }
    Ok(())
}

/// Copy each source folder to `<build>/<category>/<folder name>`.
fn materialize(build: &Path, category: Category, folders: &[PathBuf]) -> Result<()> {
    for folder in folders {
        let destination = build.join(category.folder_name()).join(file_name(folder));
        copy_dir_all(folder, &destination, IGNORED_FOLDERS).map_err(|e| {
            BuildError::FolderCopy {
                source_folder: folder.clone(),
                destination: destination.clone(),
                cause: format!("{:#}", e),
            }
        })?;
        tracing::debug!("copied {} to {}", folder.display(), destination.display());
    }
    Ok(())
}

/// Move test files out of the service and job trees into `<build>/tests`,
/// keeping their path: `services/admin/x.test.sas` goes to
/// `tests/services/admin/x.test.sas`.
fn relocate_tests(build: &Path) -> Result<()> {
    let tests_root = build.join(Category::Test.folder_name());
    for category in [Category::Service, Category::Job] {
        let root = build.join(category.folder_name());
        for path in files_below(&root)? {
            if !is_test_file(&file_name(&path)) {
                continue;
            }
            let destination = tests_root.join(relative_path(build, &path));
            if let Some(parent) = destination.parent() {
                ensure_dir(parent)?;
            }
            std::fs::rename(&path, &destination).with_context(|| {
                format!(
                    "failed to move {} to {}",
                    path.display(),
                    destination.display()
                )
            })?;
        }
    }
    Ok(())
}

/// Scripts to compile in the main pass, services then jobs then tests.
fn pending_files(build: &Path) -> Result<Vec<(Category, PathBuf)>> {
    let mut pending = Vec::new();
    for category in Category::COMPILED {
        for path in files_below(&build.join(category.folder_name()))? {
            if is_script_file(&file_name(&path)) {
                pending.push((category, path));
            }
        }
    }
    Ok(pending)
}

/// Test files in the macro folders, with their destination under
/// `<build>/tests/macros`.
fn macro_tests(build: &Path, macro_folders: &[PathBuf]) -> Result<Vec<(PathBuf, PathBuf)>> {
    let patterns: Vec<String> = MACRO_TEST_PATTERNS.iter().map(|p| p.to_string()).collect();
    let destination_root = build
        .join(Category::Test.folder_name())
        .join(Category::Macro.folder_name());

    let mut tests = Vec::new();
    for folder in macro_folders {
        for path in glob_files(folder, &patterns)? {
            if !is_test_file(&file_name(&path)) {
                continue;
            }
            let destination = destination_root.join(relative_path(folder, &path));
            tests.push((path, destination));
        }
    }
    Ok(tests)
}

fn files_below(root: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    if !root.is_dir() {
        return Ok(files);
    }
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry?;
        if entry.file_type().is_file() {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}

fn artifact(build: &Path, category: Category, path: &Path, content: String) -> CompiledArtifact {
    let category_root = build.join(category.folder_name());
    CompiledArtifact {
        category,
        relative_path: relative_path(&category_root, path),
        content,
    }
}

//! Stale-build detection.
//!
//! A previous build can be reused when every source folder still has its
//! counterpart in the build folder, with the same sub-folders and non-test
//! files by name. Contents are never compared.

use std::path::Path;

use anyhow::Result;

use crate::compiler::errors::BuildError;
use crate::core::test_flow::is_test_file;
use crate::core::Category;
use crate::util::fs::{file_name, list_dir};

/// Folder names skipped when materialising and comparing source folders.
pub const IGNORED_FOLDERS: &[&str] = &[".git", ".svn", "node_modules"];

/// Outcome of comparing a source folder with its built counterpart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FolderComparison {
    /// Whether the destination still mirrors the source by name
    pub equal: bool,

    /// Human-readable explanation
    pub reason: String,
}

impl FolderComparison {
    fn equal() -> Self {
        FolderComparison {
            equal: true,
            reason: String::new(),
        }
    }

    fn not_equal(reason: impl Into<String>) -> Self {
        FolderComparison {
            equal: false,
            reason: reason.into(),
        }
    }
}

/// Compare a source folder against a previously built destination folder.
///
/// Fails with [`BuildError::MissingSourceFolder`] when `source` does not
/// exist. A missing destination is reported as "not equal". Sub-folders named
/// in `exceptions` are ignored; test files are ignored because compilation
/// moves them out of their source folder.
pub fn compare_folders(
    source: &Path,
    destination: &Path,
    exceptions: &[&str],
) -> Result<FolderComparison> {
    if !source.is_dir() {
        return Err(BuildError::MissingSourceFolder {
            path: source.to_path_buf(),
        }
        .into());
    }

    if !destination.is_dir() {
        return Ok(FolderComparison::not_equal(format!(
            "destination folder {} does not exist",
            destination.display()
        )));
    }

    compare_level(source, destination, exceptions, "")
}

fn compare_level(
    source: &Path,
    destination: &Path,
    exceptions: &[&str],
    prefix: &str,
) -> Result<FolderComparison> {
    let (source_files, source_dirs) = list_dir(source)?;
    let (dest_files, dest_dirs) = list_dir(destination)?;

    let source_dirs: Vec<String> = source_dirs
        .into_iter()
        .filter(|d| !exceptions.contains(&d.as_str()))
        .collect();

    let missing_dirs: Vec<String> = source_dirs
        .iter()
        .filter(|d| !dest_dirs.contains(d))
        .map(|d| format!("{}{}", prefix, d))
        .collect();
    if !missing_dirs.is_empty() {
        return Ok(FolderComparison::not_equal(format!(
            "sub-folders missing from build: {}",
            missing_dirs.join(", ")
        )));
    }

    let missing_files: Vec<String> = source_files
        .iter()
        .filter(|f| !is_test_file(f))
        .filter(|f| !dest_files.contains(f))
        .map(|f| format!("{}{}", prefix, f))
        .collect();
    if !missing_files.is_empty() {
        return Ok(FolderComparison::not_equal(format!(
            "files missing from build: {}",
            missing_files.join(", ")
        )));
    }

    for dir in &source_dirs {
        let nested = compare_level(
            &source.join(dir),
            &destination.join(dir),
            exceptions,
            &format!("{}{}/", prefix, dir),
        )?;
        if !nested.equal {
            return Ok(nested);
        }
    }

    Ok(FolderComparison::equal())
}

/// Decide whether the build folder is current for the given source folders.
///
/// Each service folder is compared with `<build>/services/<folder name>` and
/// each job folder with `<build>/jobs/<folder name>`. The first mismatch is
/// returned.
pub fn check_compile_status(
    build_folder: &Path,
    service_folders: &[impl AsRef<Path>],
    job_folders: &[impl AsRef<Path>],
) -> Result<FolderComparison> {
    if !build_folder.is_dir() {
        return Ok(FolderComparison::not_equal(format!(
            "build folder {} does not exist",
            build_folder.display()
        )));
    }

    let groups = [
        (Category::Service, service_folders.iter().map(AsRef::as_ref).collect::<Vec<&Path>>()),
        (Category::Job, job_folders.iter().map(AsRef::as_ref).collect()),
    ];

    for (category, folders) in groups {
        for folder in folders {
            let destination = build_folder
                .join(category.folder_name())
                .join(file_name(folder));
            let comparison = compare_folders(folder, &destination, IGNORED_FOLDERS)?;
            if !comparison.equal {
                tracing::debug!("{} is stale: {}", folder.display(), comparison.reason);
                return Ok(comparison);
            }
        }
    }

    Ok(FolderComparison::equal())
}

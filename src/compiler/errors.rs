//! Build error types and diagnostics.

use std::path::PathBuf;

use chrono::NaiveDate;
use miette::Diagnostic as MietteDiagnostic;
use thiserror::Error;

use crate::util::diagnostic::{suggestions, Diagnostic};

/// Fatal errors raised by the compile and build pipeline.
///
/// Stale builds are not errors; see [`crate::compiler::stale::FolderComparison`].
#[derive(Debug, Error, MietteDiagnostic)]
pub enum BuildError {
    /// A configured source folder does not exist.
    #[error("source folder not found: {}", path.display())]
    #[diagnostic(code(macrobuild::config::missing_source_folder))]
    MissingSourceFolder { path: PathBuf },

    /// A legacy header directive was used past its cutover date.
    #[error("deprecated `{directive}` header in {}", path.display())]
    #[diagnostic(
        code(macrobuild::compile::deprecated_directive),
        help("replace `{directive}` with `{replacement}`")
    )]
    DeprecatedDirective {
        path: PathBuf,
        directive: &'static str,
        replacement: &'static str,
        cutover: NaiveDate,
    },

    /// Copying a source folder into the build folder failed.
    #[error("failed to copy {} into {}", source_folder.display(), destination.display())]
    #[diagnostic(code(macrobuild::compile::folder_copy))]
    FolderCopy {
        source_folder: PathBuf,
        destination: PathBuf,
        cause: String,
    },

    /// The requested target is not declared.
    #[error("target `{name}` not found")]
    #[diagnostic(code(macrobuild::config::missing_target))]
    MissingTarget { name: String, available: Vec<String> },

    /// A dependency named in a header could not be found in any folder.
    #[error("dependency `{name}` not found in any {kind} folder")]
    #[diagnostic(code(macrobuild::compile::missing_dependency))]
    MissingDependency {
        name: String,
        kind: &'static str,
        searched: Vec<PathBuf>,
    },
}

impl BuildError {
    /// Convert to a user-friendly diagnostic.
    pub fn to_diagnostic(&self) -> Diagnostic {
        match self {
            BuildError::MissingSourceFolder { path } => {
                Diagnostic::error(format!("source folder `{}` does not exist", path.display()))
                    .with_location(path)
                    .with_help(suggestions::CHECK_FOLDERS)
            }

            BuildError::DeprecatedDirective {
                path,
                directive,
                replacement,
                cutover,
            } => Diagnostic::error(format!("`{}` is no longer supported", directive))
                .with_location(path)
                .with_note(format!("support ended on {}", cutover))
                .with_help(format!("Replace `{}` with `{}`", directive, replacement)),

            BuildError::FolderCopy {
                source_folder,
                destination,
                cause,
            } => Diagnostic::error(format!(
                "could not copy `{}` into the build folder",
                source_folder.display()
            ))
            .with_location(destination)
            .with_note(cause.clone())
            .with_help(suggestions::CLEAN_BUILD),

            BuildError::MissingTarget { name, available } => {
                let mut diag = Diagnostic::error(format!("target `{}` not found", name));
                diag = diag.with_note(format!(
                    "available targets: {}",
                    if available.is_empty() {
                        "(none)".to_string()
                    } else {
                        available.join(", ")
                    }
                ));
                diag.with_help(suggestions::TARGET_NOT_FOUND)
            }

            BuildError::MissingDependency {
                name,
                kind,
                searched,
            } => {
                let mut diag =
                    Diagnostic::error(format!("{} dependency `{}` not found", kind, name));
                for folder in searched {
                    diag = diag.with_note(format!("searched {}", folder.display()));
                }
                diag.with_help(suggestions::CHECK_FOLDERS)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_folder_message_names_path() {
        let err = BuildError::MissingSourceFolder {
            path: PathBuf::from("/proj/sasjs/services"),
        };
        assert!(err.to_string().contains("/proj/sasjs/services"));
        let diag = err.to_diagnostic().format(false);
        assert!(diag.contains("--> /proj/sasjs/services"));
    }

    #[test]
    fn test_deprecated_directive_diagnostic() {
        let err = BuildError::DeprecatedDirective {
            path: PathBuf::from("services/a.sas"),
            directive: "<h4> Dependencies </h4>",
            replacement: "<h4> SAS Macros </h4>",
            cutover: NaiveDate::from_ymd_opt(2023, 1, 1).unwrap(),
        };
        let diag = err.to_diagnostic().format(false);
        assert!(diag.contains("support ended on 2023-01-01"));
        assert!(diag.contains("<h4> SAS Macros </h4>"));
    }
}

//! Source compilation.
//!
//! This module turns service, job and test sources into self-contained
//! programs:
//! - Folder resolution (root and target folder lists)
//! - Staleness detection against the build folder
//! - Dependency resolution and inlining, backed by a run-scoped ledger

pub mod directives;
pub mod errors;
pub mod folders;
pub mod inliner;
pub mod ledger;
pub mod resolver;
pub mod stale;
pub mod vars;

pub use directives::DirectivePolicy;
pub use errors::BuildError;
pub use folders::{resolve_folders, SourceTree};
pub use inliner::Inliner;
pub use ledger::{DependencyLedger, DependencyRole, LedgerEntry, LEDGER_FILE};
pub use resolver::{DependencyResolver, HeaderResolver, ProgramDependency};
pub use stale::{check_compile_status, compare_folders, FolderComparison, IGNORED_FOLDERS};

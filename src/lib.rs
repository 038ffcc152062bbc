//! macrobuild - a build and packaging tool for SAS macro-language projects
//!
//! This crate provides the library behind the `macrobuild` binary: dependency
//! inlining, stale-build detection, deployment script and artifact tree
//! encoding, and test coverage reporting.

pub mod compiler;
pub mod core;
pub mod coverage;
pub mod encoder;
pub mod ops;
pub mod util;

/// Test utilities for macrobuild unit tests.
///
/// This module is only available when compiling with `--cfg test` or
/// running tests. It writes sample projects to temporary directories.
#[cfg(test)]
pub mod test_support;

pub use compiler::{BuildError, DependencyLedger, DependencyResolver, Inliner};
pub use core::{ArtifactNode, ArtifactTree, Category, CompiledArtifact, ServerType, TestFlow};
pub use coverage::{Coverage, TestReport};
pub use util::context::GlobalContext;

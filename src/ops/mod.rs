//! High-level operations.
//!
//! This module contains the implementation of macrobuild commands.

pub mod macrobuild_build;
pub mod macrobuild_clean;
pub mod macrobuild_compile;

pub use macrobuild_build::{build, BuildOptions, BuildResult};
pub use macrobuild_clean::clean;
pub use macrobuild_compile::{compile, CompileOptions, CompileResult};
pub use macrobuild_test::{check_outcome, test, TestOptions, TestRunResult};

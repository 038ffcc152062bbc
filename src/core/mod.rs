//! Core data structures for macrobuild.
//!
//! This module contains the types shared by compile, build and test:
//! - Source categories and their markers
//! - Server types and deployment styles
//! - Compiled artifacts and the artifact tree
//! - The test flow manifest

pub mod artifact;
pub mod category;
pub mod literal;
pub mod server;
pub mod test_flow;

pub use artifact::{ArtifactNode, ArtifactTree, CompiledArtifact, NodeKind};
pub use category::Category;
pub use server::{Deployment, PayloadEncoding, ServerType};
pub use test_flow::TestFlow;

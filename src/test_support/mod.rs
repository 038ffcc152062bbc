//! Test utilities for macrobuild unit tests.
//!
//! # Example
//!
//! ```rust,ignore
//! use macrobuild::test_support::ProjectFixture;
//!
//! #[test]
//! fn test_example() {
//!     let project = ProjectFixture::sample().write().unwrap();
//!     let target = project.target(None);
//!     // compile, build or test the target...
//! }
//! ```

pub mod fixtures;

pub use fixtures::*;

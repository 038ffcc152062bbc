//! Test execution results.
//!
//! Running a test happens on a remote server; this crate only consumes the
//! assertions a run produced. [`TestExecutor`] is that seam.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::util::fs::read_to_string;

/// Outcome of one assertion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AssertionResult {
    Pass,
    Fail,
}

/// One assertion reported by a test program.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assertion {
    pub test_description: String,
    pub test_result: AssertionResult,
}

/// Overall status of one test file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestStatus {
    Pass,
    Fail,
    /// The run produced no assertions for this test
    #[serde(rename = "not provided")]
    NotProvided,
}

impl TestStatus {
    /// Fold assertions into a status. No assertions means not provided.
    pub fn from_assertions(assertions: &[Assertion]) -> Self {
        if assertions.is_empty() {
            TestStatus::NotProvided
        } else if assertions
            .iter()
            .any(|a| a.test_result == AssertionResult::Fail)
        {
            TestStatus::Fail
        } else {
            TestStatus::Pass
        }
    }
}

impl fmt::Display for TestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TestStatus::Pass => "pass",
            TestStatus::Fail => "fail",
            TestStatus::NotProvided => "not provided",
        })
    }
}

/// Result of one test file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestOutcome {
    /// Test path relative to the build folder
    pub test: String,
    pub status: TestStatus,
    pub assertions: Vec<Assertion>,
}

/// Runs a compiled test and returns its assertions.
pub trait TestExecutor {
    fn execute(&self, test: &str) -> Result<Vec<Assertion>>;
}

/// Reads assertions from a results document of a previous remote run.
///
/// The document maps test paths (relative to the build folder) to their
/// assertions:
///
/// ```json
/// { "tests/services/admin/x.test.sas": [
///     { "test_description": "returns rows", "test_result": "PASS" } ] }
/// ```
#[derive(Debug, Clone, Default)]
pub struct ResultFileExecutor {
    results: BTreeMap<String, Vec<Assertion>>,
}

impl ResultFileExecutor {
    pub fn load(path: &Path) -> Result<Self> {
        let content = read_to_string(path)?;
        Self::parse(&content)
            .with_context(|| format!("failed to parse test results: {}", path.display()))
    }

    pub fn parse(content: &str) -> Result<Self> {
        Ok(ResultFileExecutor {
            results: serde_json::from_str(content)?,
        })
    }
}

impl TestExecutor for ResultFileExecutor {
    fn execute(&self, test: &str) -> Result<Vec<Assertion>> {
        Ok(self.results.get(test).cloned().unwrap_or_default())
    }
}

/// Run every test through `executor`.
///
/// A test the executor fails on is reported as not provided; one broken test
/// never hides the others.
pub fn run_tests(executor: &dyn TestExecutor, tests: &[String]) -> Vec<TestOutcome> {
    tests
        .iter()
        .map(|test| {
            let assertions = executor.execute(test).unwrap_or_else(|e| {
                tracing::warn!("failed to run {}: {:#}", test, e);
                Vec::new()
            });
            TestOutcome {
                test: test.clone(),
                status: TestStatus::from_assertions(&assertions),
                assertions,
            }
        })
        .collect()
}

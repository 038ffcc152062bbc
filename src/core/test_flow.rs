//! Test file naming and the test-execution manifest.

use std::path::Path;
use std::sync::LazyLock;

use anyhow::Result;
use regex::Regex;
use serde::{Deserialize, Serialize};
use walkdir::WalkDir;

use crate::util::fs::{to_slash_path, write_string};

/// File name of the compiled test set-up program.
pub const SET_UP_FILE: &str = "testsetup.sas";

/// File name of the compiled test tear-down program.
pub const TEAR_DOWN_FILE: &str = "testteardown.sas";

/// File name of the manifest inside the build folder.
pub const TEST_FLOW_FILE: &str = "testFlow.json";

/// `<target>.test.sas` or `<target>.test.<n>.sas`
static TEST_SUFFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^(?P<target>.+)\.test(?:\.\d+)?\.sas$").unwrap());

/// Whether a file name follows the test naming convention.
pub fn is_test_file(name: &str) -> bool {
    TEST_SUFFIX.is_match(name)
}

/// Strip the test suffix (and optional numeric disambiguator) from a path.
///
/// `services/admin/x.test.3.sas` becomes `services/admin/x`. Returns `None`
/// when the path is not a test file.
pub fn strip_test_suffix(path: &str) -> Option<String> {
    TEST_SUFFIX
        .captures(path)
        .map(|caps| caps["target"].to_string())
}

/// Ordered test-execution manifest.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestFlow {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test_set_up: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test_tear_down: Option<String>,

    /// Test paths relative to the build folder, in stable order
    pub tests: Vec<String>,
}

impl TestFlow {
    /// Build the flow by listing `<build>/tests`.
    ///
    /// The designated set-up and tear-down files are pulled out by name; every
    /// other test file becomes an entry in `tests`, sorted by path.
    pub fn from_build_folder(build_folder: &Path) -> Result<Self> {
        let tests_root = build_folder.join("tests");
        let mut flow = TestFlow::default();
        if !tests_root.is_dir() {
            return Ok(flow);
        }

        for entry in WalkDir::new(&tests_root).sort_by_file_name() {
            let entry = entry?;
            if !entry.file_type().is_file() {
                continue;
            }
            let relative = entry
                .path()
                .strip_prefix(build_folder)
                .unwrap_or(entry.path());
            let relative = to_slash_path(relative);
            let name = entry.file_name().to_string_lossy();

            if entry.depth() == 1 && name.eq_ignore_ascii_case(SET_UP_FILE) {
                flow.test_set_up = Some(relative);
            } else if entry.depth() == 1 && name.eq_ignore_ascii_case(TEAR_DOWN_FILE) {
                flow.test_tear_down = Some(relative);
            } else if is_test_file(&name) {
                flow.tests.push(relative);
            }
        }

        flow.tests.sort();
        Ok(flow)
    }

    /// Write the manifest as pretty JSON.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        write_string(path, &content)
    }

    /// Load a manifest written by [`TestFlow::save`].
    pub fn load(path: &Path) -> Result<Self> {
        let content = crate::util::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }
}

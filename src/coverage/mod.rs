//! Test coverage.
//!
//! Tests are matched to services, jobs and macros purely by name:
//! - `tests/services/admin/x.test.sas` (or `x.test.3.sas`) covers the service
//!   `services/admin/x`; jobs work the same way
//! - any test under `tests/macros/` covers the macro with the same base name,
//!   wherever either file sits
//!
//! A test that matches nothing is standalone.

pub mod report;
pub mod results;

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::Result;
use serde::{Deserialize, Serialize};
use walkdir::WalkDir;

use crate::compiler::IGNORED_FOLDERS;
use crate::core::server::is_script_file;
use crate::core::test_flow::{is_test_file, strip_test_suffix};
use crate::core::{Category, TestFlow};
use crate::util::fs::to_slash_path;

pub use report::TestReport;
pub use results::{ResultFileExecutor, TestExecutor, TestOutcome, TestStatus};

/// Coverage state of one artifact or test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CoverageState {
    #[serde(rename = "covered")]
    Covered,
    #[serde(rename = "not covered")]
    NotCovered,
    #[serde(rename = "standalone")]
    Standalone,
}

impl fmt::Display for CoverageState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CoverageState::Covered => "covered",
            CoverageState::NotCovered => "not covered",
            CoverageState::Standalone => "standalone",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoverageEntry {
    pub category: Category,
    pub state: CoverageState,
}

/// What a single test was matched to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestMatch {
    /// Test path relative to the build folder
    pub test: String,

    pub category: Category,

    /// Identifier of the covered artifact, `None` for a standalone test
    pub target: Option<String>,

    /// Source file of the covered artifact
    pub source: Option<String>,
}

/// Covered over total, rendered as a rounded percentage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ratio {
    pub covered: usize,
    pub total: usize,
}

impl Ratio {
    /// `round(covered / total * 100)`, and 0 when there is nothing to cover.
    pub fn percent(&self) -> u32 {
        if self.total == 0 {
            return 0;
        }
        (self.covered as f64 / self.total as f64 * 100.0).round() as u32
    }
}

impl fmt::Display for Ratio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.percent())
    }
}

/// Coverage of one compile output.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Coverage {
    /// Keyed by `services/<rel>`, `jobs/<rel>`, `macros/<name>` or, for a
    /// standalone test, its path
    pub entries: BTreeMap<String, CoverageEntry>,

    /// One match per test, in test-flow order
    pub matches: Vec<TestMatch>,
}

impl Coverage {
    /// Ratio of one category, or of all categories when `None`.
    pub fn ratio(&self, category: Option<Category>) -> Ratio {
        let mut ratio = Ratio::default();
        for entry in self.entries.values() {
            if category.is_some_and(|c| c != entry.category) {
                continue;
            }
            match entry.state {
                CoverageState::Covered => {
                    ratio.covered += 1;
                    ratio.total += 1;
                }
                CoverageState::NotCovered => ratio.total += 1,
                CoverageState::Standalone => {}
            }
        }
        ratio
    }

    /// Number of tests that match nothing.
    pub fn standalone_count(&self) -> usize {
        self.matches.iter().filter(|m| m.target.is_none()).count()
    }

    /// Entries of one category in key order.
    pub fn entries_of(&self, category: Category) -> impl Iterator<Item = (&String, &CoverageEntry)> {
        self.entries
            .iter()
            .filter(move |(_, e)| e.category == category)
    }
}

/// Categories tracked for coverage.
pub const COVERED_CATEGORIES: [Category; 3] = [Category::Service, Category::Job, Category::Macro];

/// Artifacts that can be covered, keyed by identifier, valued by source path.
#[derive(Debug, Default)]
struct Inventory {
    artifacts: BTreeMap<String, (Category, String)>,
}

impl Inventory {
    fn collect(build_folder: &Path, macro_folders: &[PathBuf]) -> Result<Self> {
        let mut inventory = Inventory::default();
        for category in [Category::Service, Category::Job] {
            let root = build_folder.join(category.folder_name());
            for relative in script_files(&root)? {
                let source = format!("{}/{}", category.folder_name(), relative);
                let id = source
                    .rsplit_once('.')
                    .map_or(source.as_str(), |(stem, _)| stem)
                    .to_string();
                inventory.artifacts.insert(id, (category, source));
            }
        }

        for folder in macro_folders {
            for relative in script_files(folder)? {
                let file = relative.rsplit('/').next().unwrap_or(relative.as_str());
                let name = file.rsplit_once('.').map_or(file, |(stem, _)| stem);
                let source = to_slash_path(&folder.join(&relative));
                inventory
                    .artifacts
                    .entry(format!("{}/{}", Category::Macro.folder_name(), name))
                    .or_insert((Category::Macro, source));
            }
        }
        Ok(inventory)
    }
}

/// Non-test script files below `root`, as sorted `/`-separated relative paths.
fn script_files(root: &Path) -> Result<Vec<String>> {
    let mut out = Vec::new();
    if !root.is_dir() {
        return Ok(out);
    }
    let walker = WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| {
            let name = e.file_name().to_string_lossy();
            !(e.file_type().is_dir() && IGNORED_FOLDERS.contains(&&*name))
        });
    for entry in walker {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy();
        if entry.file_type().is_file() && is_script_file(&name) && !is_test_file(&name) {
            let relative = entry.path().strip_prefix(root).unwrap_or(entry.path());
            out.push(to_slash_path(relative));
        }
    }
    Ok(out)
}

/// Work out what a test path under `tests/` refers to.
fn classify(test: &str) -> Option<(Category, String)> {
    let within = test.strip_prefix("tests/").unwrap_or(test);
    let stripped = strip_test_suffix(within)?;
    let (first, _) = stripped.split_once('/').unwrap_or(("", stripped.as_str()));

    match Category::from_folder_name(first) {
        Some(Category::Macro) => {
            let name = stripped.rsplit('/').next().unwrap_or(stripped.as_str());
            Some((Category::Macro, format!("macros/{}", name)))
        }
        Some(category @ (Category::Service | Category::Job)) => Some((category, stripped)),
        _ => Some((Category::Service, stripped)),
    }
}

/// Match the tests of `flow` against the compiled services and jobs in
/// `build_folder` and the macros in `macro_folders`.
pub fn compute(build_folder: &Path, flow: &TestFlow, macro_folders: &[PathBuf]) -> Result<Coverage> {
    let inventory = Inventory::collect(build_folder, macro_folders)?;
    let mut coverage = Coverage::default();

    for (id, (category, _)) in &inventory.artifacts {
        coverage.entries.insert(
            id.clone(),
            CoverageEntry {
                category: *category,
                state: CoverageState::NotCovered,
            },
        );
    }

    for test in &flow.tests {
        let Some((category, id)) = classify(test) else {
            continue;
        };

        let matched = inventory.artifacts.get(&id);
        let test_match = match matched {
            Some((category, source)) => {
                if let Some(entry) = coverage.entries.get_mut(&id) {
                    entry.state = CoverageState::Covered;
                }
                TestMatch {
                    test: test.clone(),
                    category: *category,
                    target: Some(id),
                    source: Some(source.clone()),
                }
            }
            None => {
                coverage.entries.insert(
                    test.clone(),
                    CoverageEntry {
                        category,
                        state: CoverageState::Standalone,
                    },
                );
                TestMatch {
                    test: test.clone(),
                    category,
                    target: None,
                    source: None,
                }
            }
        };
        coverage.matches.push(test_match);
    }

    tracing::debug!(
        "coverage: {} artifacts, {} tests, {} standalone",
        inventory.artifacts.len(),
        coverage.matches.len(),
        coverage.standalone_count()
    );
    Ok(coverage)
}

/// [`compute`], but a failure only logs a warning and yields empty coverage.
pub fn compute_or_empty(build_folder: &Path, flow: &TestFlow, macro_folders: &[PathBuf]) -> Coverage {
    compute(build_folder, flow, macro_folders).unwrap_or_else(|e| {
        tracing::warn!("failed to compute test coverage: {:#}", e);
        Coverage::default()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn touch(root: &Path, path: &str) {
        let full = root.join(path);
        fs::create_dir_all(full.parent().unwrap()).unwrap();
        fs::write(full, "").unwrap();
    }

    fn flow(tests: &[&str]) -> TestFlow {
        TestFlow {
            tests: tests.iter().map(|t| t.to_string()).collect(),
            ..TestFlow::default()
        }
    }

    fn fixture() -> (TempDir, PathBuf) {
        let tmp = TempDir::new().unwrap();
        let build = tmp.path().join("build");
        touch(&build, "services/admin/x.sas");
        touch(&build, "services/admin/y.sas");
        touch(&build, "jobs/load.sas");
        touch(&tmp.path().join("macros"), "deep/nested/mf_abort.sas");
        touch(&tmp.path().join("macros"), "mf_other.sas");
        (tmp, build)
    }

    #[test]
    fn test_ratio_zero_total() {
        let ratio = Ratio::default();
        assert_eq!(ratio.percent(), 0);
        assert_eq!(ratio.to_string(), "0%");
        assert_eq!(Ratio { covered: 1, total: 3 }.percent(), 33);
        assert_eq!(Ratio { covered: 2, total: 3 }.percent(), 67);
    }

    #[test]
    fn test_service_matched_with_and_without_number() {
        let (tmp, build) = fixture();
        for test in [
            "tests/services/admin/x.test.sas",
            "tests/services/admin/x.test.7.sas",
        ] {
            let coverage = compute(&build, &flow(&[test]), &[tmp.path().join("macros")]).unwrap();
            assert_eq!(
                coverage.entries["services/admin/x"].state,
                CoverageState::Covered
            );
            assert_eq!(
                coverage.matches[0].source.as_deref(),
                Some("services/admin/x.sas")
            );
        }
    }

    #[test]
    fn test_macro_matched_by_base_name() {
        let (tmp, build) = fixture();
        let coverage = compute(
            &build,
            &flow(&["tests/macros/mf_abort.test.sas"]),
            &[tmp.path().join("macros")],
        )
        .unwrap();
        assert_eq!(
            coverage.entries["macros/mf_abort"].state,
            CoverageState::Covered
        );
        assert_eq!(
            coverage.entries["macros/mf_other"].state,
            CoverageState::NotCovered
        );
        assert!(coverage.matches[0]
            .source
            .as_deref()
            .unwrap()
            .ends_with("deep/nested/mf_abort.sas"));
    }

    #[test]
    fn test_standalone_and_ratios() {
        let (tmp, build) = fixture();
        let coverage = compute(
            &build,
            &flow(&[
                "tests/services/admin/x.test.sas",
                "tests/services/orphan.test.sas",
                "tests/jobs/load.test.1.sas",
            ]),
            &[tmp.path().join("macros")],
        )
        .unwrap();

        let orphan = &coverage.entries["tests/services/orphan.test.sas"];
        assert_eq!(orphan.state, CoverageState::Standalone);
        assert_eq!(orphan.category, Category::Service);
        assert_eq!(coverage.standalone_count(), 1);

        assert_eq!(coverage.ratio(Some(Category::Service)).to_string(), "50%");
        assert_eq!(coverage.ratio(Some(Category::Job)).to_string(), "100%");
        assert_eq!(coverage.ratio(Some(Category::Macro)).to_string(), "0%");
        assert_eq!(
            coverage.ratio(None),
            Ratio {
                covered: 2,
                total: 5
            }
        );
    }

    #[test]
    fn test_empty_build_is_zero_percent() {
        let tmp = TempDir::new().unwrap();
        let coverage = compute(tmp.path(), &TestFlow::default(), &[]).unwrap();
        assert!(coverage.entries.is_empty());
        assert_eq!(coverage.ratio(None).to_string(), "0%");
    }
}

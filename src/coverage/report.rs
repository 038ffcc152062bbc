//! Test and coverage reports.
//!
//! One [`TestReport`] is rendered four ways: `testResults.json`,
//! `coverage.lcov`, `testResults.xml` (JUnit) and a console table.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::Result;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use serde::{Deserialize, Serialize};

use crate::core::Category;
use crate::coverage::results::{AssertionResult, TestOutcome, TestStatus};
use crate::coverage::{Coverage, Ratio, COVERED_CATEGORIES};
use crate::util::fs::write_string;

/// Source reference written for a test that covers nothing.
pub const STANDALONE_SOURCE: &str = "standalone";

pub const JSON_REPORT: &str = "testResults.json";
pub const LCOV_REPORT: &str = "coverage.lcov";
pub const JUNIT_REPORT: &str = "testResults.xml";

/// Aggregated numbers shown at the top of every report.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    /// Coverage ratio per category (`service`, `job`, `macro`)
    pub coverage: BTreeMap<Category, Ratio>,
    pub overall: Ratio,
    pub standalone: usize,
    pub passed: usize,
    pub failed: usize,
    pub not_provided: usize,
}

/// Results and coverage of one test run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestReport {
    pub target: String,
    pub summary: Summary,
    pub outcomes: Vec<TestOutcome>,
    pub coverage: Coverage,
}

/// Paths written by [`TestReport::write_all`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportFiles {
    pub json: PathBuf,
    pub lcov: PathBuf,
    pub junit: PathBuf,
}

impl TestReport {
    pub fn new(target: impl Into<String>, coverage: Coverage, outcomes: Vec<TestOutcome>) -> Self {
        let mut summary = Summary {
            overall: coverage.ratio(None),
            standalone: coverage.standalone_count(),
            ..Summary::default()
        };
        for category in COVERED_CATEGORIES {
            summary.coverage.insert(category, coverage.ratio(Some(category)));
        }
        for outcome in &outcomes {
            match outcome.status {
                TestStatus::Pass => summary.passed += 1,
                TestStatus::Fail => summary.failed += 1,
                TestStatus::NotProvided => summary.not_provided += 1,
            }
        }

        TestReport {
            target: target.into(),
            summary,
            outcomes,
            coverage,
        }
    }

    fn outcome(&self, test: &str) -> Option<&TestOutcome> {
        self.outcomes.iter().find(|o| o.test == test)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// One record per test, referencing the covered source file.
    pub fn to_lcov(&self) -> String {
        let mut out = String::new();
        for test_match in &self.coverage.matches {
            let hit = match self.outcome(&test_match.test).map(|o| o.status) {
                Some(TestStatus::Pass) => 1,
                _ => 0,
            };
            let source = test_match.source.as_deref().unwrap_or(STANDALONE_SOURCE);

            out.push_str(&format!("TN:{}\n", test_match.test));
            out.push_str(&format!("SF:{}\n", source));
            out.push_str(&format!("FN:1,{}\n", test_match.test));
            out.push_str(&format!("FNDA:{},{}\n", hit, test_match.test));
            out.push_str("FNF:1\n");
            out.push_str(&format!("FNH:{}\n", hit));
            out.push_str(&format!("DA:1,{}\n", hit));
            out.push_str("LF:1\n");
            out.push_str(&format!("LH:{}\n", hit));
            out.push_str("end_of_record\n");
        }
        out
    }

    /// JUnit XML: one suite per test file, one case per assertion.
    pub fn to_junit(&self) -> Result<String> {
        let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
        writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;

        let total = self.outcomes.iter().map(|o| o.assertions.len().max(1)).sum::<usize>();
        let failures = self
            .outcomes
            .iter()
            .flat_map(|o| &o.assertions)
            .filter(|a| a.test_result == AssertionResult::Fail)
            .count();
        let total = total.to_string();
        let failures = failures.to_string();
        writer.write_event(Event::Start(BytesStart::new("testsuites").with_attributes([
            ("name", self.target.as_str()),
            ("tests", total.as_str()),
            ("failures", failures.as_str()),
        ])))?;

        for outcome in &self.outcomes {
            let cases = outcome.assertions.len().max(1).to_string();
            let suite_failures = outcome
                .assertions
                .iter()
                .filter(|a| a.test_result == AssertionResult::Fail)
                .count()
                .to_string();
            writer.write_event(Event::Start(BytesStart::new("testsuite").with_attributes([
                ("name", outcome.test.as_str()),
                ("tests", cases.as_str()),
                ("failures", suite_failures.as_str()),
            ])))?;

            if outcome.assertions.is_empty() {
                writer.write_event(Event::Start(BytesStart::new("testcase").with_attributes([
                    ("name", outcome.test.as_str()),
                    ("classname", outcome.test.as_str()),
                ])))?;
                writer.write_event(Event::Empty(
                    BytesStart::new("skipped").with_attributes([("message", "no results provided")]),
                ))?;
                writer.write_event(Event::End(BytesEnd::new("testcase")))?;
            }

            for assertion in &outcome.assertions {
                let case = BytesStart::new("testcase").with_attributes([
                    ("name", assertion.test_description.as_str()),
                    ("classname", outcome.test.as_str()),
                ]);
                match assertion.test_result {
                    AssertionResult::Pass => writer.write_event(Event::Empty(case))?,
                    AssertionResult::Fail => {
                        writer.write_event(Event::Start(case))?;
                        writer.write_event(Event::Start(
                            BytesStart::new("failure").with_attributes([("message", "FAIL")]),
                        ))?;
                        writer.write_event(Event::Text(BytesText::new(
                            &assertion.test_description,
                        )))?;
                        writer.write_event(Event::End(BytesEnd::new("failure")))?;
                        writer.write_event(Event::End(BytesEnd::new("testcase")))?;
                    }
                }
            }

            writer.write_event(Event::End(BytesEnd::new("testsuite")))?;
        }

        writer.write_event(Event::End(BytesEnd::new("testsuites")))?;
        Ok(String::from_utf8(writer.into_inner())?)
    }

    /// Console summary: one row per test, then the coverage ratios.
    pub fn render_table(&self) -> String {
        let width = self
            .coverage
            .matches
            .iter()
            .map(|m| m.test.len())
            .chain(std::iter::once("test".len()))
            .max()
            .unwrap_or(4);

        let mut out = format!("{:<width$}  {:<12}  {}\n", "test", "result", "covers");
        for test_match in &self.coverage.matches {
            let status = self
                .outcome(&test_match.test)
                .map(|o| o.status)
                .unwrap_or(TestStatus::NotProvided);
            let covers = test_match.target.as_deref().unwrap_or(STANDALONE_SOURCE);
            out.push_str(&format!(
                "{:<width$}  {:<12}  {}\n",
                test_match.test,
                status.to_string(),
                covers
            ));
        }

        out.push('\n');
        for (category, ratio) in &self.summary.coverage {
            out.push_str(&format!(
                "{:<9} {:>4}  ({}/{})\n",
                category.folder_name(),
                ratio.to_string(),
                ratio.covered,
                ratio.total
            ));
        }
        out.push_str(&format!(
            "{:<9} {:>4}  ({}/{})\n",
            "overall",
            self.summary.overall.to_string(),
            self.summary.overall.covered,
            self.summary.overall.total
        ));
        out
    }

    /// Write the JSON, LCOV and JUnit reports into `dir`.
    pub fn write_all(&self, dir: &Path) -> Result<ReportFiles> {
        let files = ReportFiles {
            json: dir.join(JSON_REPORT),
            lcov: dir.join(LCOV_REPORT),
            junit: dir.join(JUNIT_REPORT),
        };
        write_string(&files.json, &self.to_json()?)?;
        write_string(&files.lcov, &self.to_lcov())?;
        write_string(&files.junit, &self.to_junit()?)?;
        Ok(files)
    }
}

//! Header directives and their deprecation schedule.
//!
//! Source files declare their dependencies in a doc-comment header:
//!
//! ```text
//! /**
//!   @file
//!   <h4> SAS Macros </h4>
//!   @li mf_abort.sas
//!   <h4> SAS Programs </h4>
//!   @li load_config.sas CONFIG
//! **/
//! ```
//!
//! Two older header spellings are still recognised. Each one has a cutover
//! date: before it a warning is logged, from that day on the file fails to
//! compile.

use std::path::Path;
use std::sync::LazyLock;

use anyhow::Result;
use chrono::{Local, NaiveDate};
use regex::Regex;

use crate::compiler::errors::BuildError;
use crate::util::diagnostic::Diagnostic;

/// Header introducing macro dependencies.
pub const MACROS_HEADER: &str = "<h4> SAS Macros </h4>";

/// Header introducing inline program dependencies.
pub const PROGRAMS_HEADER: &str = "<h4> SAS Programs </h4>";

static MACROS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<h4>\s*SAS\s+Macros\s*</h4>").unwrap());
static PROGRAMS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<h4>\s*SAS\s+Programs\s*</h4>").unwrap());
static LEGACY_MACROS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<h4>\s*Dependencies\s*</h4>").unwrap());
static LEGACY_PROGRAMS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<h4>\s*SAS\s+Includes\s*</h4>").unwrap());
static ANY_HEADER_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)<h4>").unwrap());

/// Section of a header a line belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderSection {
    Macros,
    Programs,
    Other,
}

/// Classify a header line that opens a section, if it does.
///
/// Legacy spellings open the same sections as their replacements.
pub fn section_of(line: &str) -> Option<HeaderSection> {
    if MACROS_RE.is_match(line) || LEGACY_MACROS_RE.is_match(line) {
        Some(HeaderSection::Macros)
    } else if PROGRAMS_RE.is_match(line) || LEGACY_PROGRAMS_RE.is_match(line) {
        Some(HeaderSection::Programs)
    } else if ANY_HEADER_RE.is_match(line) {
        Some(HeaderSection::Other)
    } else {
        None
    }
}

/// A deprecated header spelling.
#[derive(Debug, Clone)]
pub struct LegacyDirective {
    pub directive: &'static str,
    pub replacement: &'static str,
    pub cutover: NaiveDate,
    pattern: &'static LazyLock<Regex>,
}

impl LegacyDirective {
    fn is_used_in(&self, content: &str) -> bool {
        self.pattern.is_match(content)
    }

    /// Warning shown while the spelling still works.
    pub fn warning(&self, path: &Path) -> Diagnostic {
        Diagnostic::warning(format!("`{}` is deprecated", self.directive))
            .with_location(path)
            .with_note(format!("support ends on {}", self.cutover))
            .with_help(format!("Replace `{}` with `{}`", self.directive, self.replacement))
    }
}

/// Deprecation policy applied to every compiled file.
#[derive(Debug, Clone)]
pub struct DirectivePolicy {
    /// Date the cutovers are evaluated against
    pub today: NaiveDate,
    pub legacy: Vec<LegacyDirective>,
}

impl Default for DirectivePolicy {
    fn default() -> Self {
        DirectivePolicy::at(Local::now().date_naive())
    }
}

impl DirectivePolicy {
    /// The standard policy evaluated on a given day.
    pub fn at(today: NaiveDate) -> Self {
        DirectivePolicy {
            today,
            legacy: vec![
                LegacyDirective {
                    directive: "<h4> Dependencies </h4>",
                    replacement: MACROS_HEADER,
                    cutover: NaiveDate::from_ymd_opt(2022, 11, 1).unwrap_or(NaiveDate::MIN),
                    pattern: &LEGACY_MACROS_RE,
                },
                LegacyDirective {
                    directive: "<h4> SAS Includes </h4>",
                    replacement: PROGRAMS_HEADER,
                    cutover: NaiveDate::from_ymd_opt(2023, 6, 1).unwrap_or(NaiveDate::MIN),
                    pattern: &LEGACY_PROGRAMS_RE,
                },
            ],
        }
    }

    /// Check one file. Warns for deprecated headers before their cutover and
    /// fails with [`BuildError::DeprecatedDirective`] on or after it.
    pub fn check(&self, path: &Path, content: &str) -> Result<()> {
        for legacy in &self.legacy {
            if !legacy.is_used_in(content) {
                continue;
            }
            if self.today >= legacy.cutover {
                return Err(BuildError::DeprecatedDirective {
                    path: path.to_path_buf(),
                    directive: legacy.directive,
                    replacement: legacy.replacement,
                    cutover: legacy.cutover,
                }
                .into());
            }
            tracing::warn!("{}", legacy.warning(path).one_line());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    const LEGACY: &str = "/**\n  <h4> Dependencies </h4>\n  @li mf_abort.sas\n**/\n";

    #[test]
    fn test_warning_before_cutover() {
        let policy = DirectivePolicy::at(day(2022, 10, 31));
        assert!(policy.check(Path::new("a.sas"), LEGACY).is_ok());
    }

    #[test]
    fn test_warning_names_file_and_replacement() {
        let policy = DirectivePolicy::at(day(2022, 10, 31));
        let warning = policy.legacy[0].warning(Path::new("services/a.sas"));
        assert_eq!(
            warning.one_line(),
            "services/a.sas: `<h4> Dependencies </h4>` is deprecated; \
             support ends on 2022-11-01; \
             Replace `<h4> Dependencies </h4>` with `<h4> SAS Macros </h4>`"
        );
    }

    #[test]
    fn test_error_on_cutover_day() {
        let policy = DirectivePolicy::at(day(2022, 11, 1));
        let err = policy.check(Path::new("a.sas"), LEGACY).unwrap_err();
        match err.downcast_ref::<BuildError>() {
            Some(BuildError::DeprecatedDirective { replacement, .. }) => {
                assert_eq!(*replacement, MACROS_HEADER);
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_current_headers_pass() {
        let policy = DirectivePolicy::at(day(2030, 1, 1));
        let content = "/**\n  <h4> SAS Macros </h4>\n  <h4> SAS Programs </h4>\n**/";
        assert!(policy.check(Path::new("a.sas"), content).is_ok());
    }

    #[test]
    fn test_each_directive_has_own_cutover() {
        let policy = DirectivePolicy::at(day(2023, 1, 1));
        let includes = "/**\n  <h4> SAS Includes </h4>\n**/";
        assert!(policy.check(Path::new("a.sas"), includes).is_ok());
        assert!(policy.check(Path::new("b.sas"), LEGACY).is_err());
    }

    #[test]
    fn test_section_of() {
        assert_eq!(section_of("  <h4> SAS Macros </h4>"), Some(HeaderSection::Macros));
        assert_eq!(section_of("<h4>Dependencies</h4>"), Some(HeaderSection::Macros));
        assert_eq!(section_of("<h4> SAS Includes </h4>"), Some(HeaderSection::Programs));
        assert_eq!(section_of("<h4> Related Macros </h4>"), Some(HeaderSection::Other));
        assert_eq!(section_of("@li mf_abort.sas"), None);
    }
}

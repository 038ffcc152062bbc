//! Rendering of problems for people rather than logs.
//!
//! A [`Diagnostic`] names the offending file when there is one, adds notes
//! about what was found and help lines about what to change:
//!
//! ```text
//! error: source folder `sasjs/services` does not exist
//!   --> /proj/sasjs/services
//!    = note: listed in target `viya`
//!    = help: Check the folder lists in macrobuild.toml
//! ```

use std::fmt;
use std::path::PathBuf;

/// Help texts shared by several diagnostics and messages.
pub mod suggestions {
    pub const NO_PROJECT: &str = "Create a `macrobuild.toml` at the project root or pass `--project`";

    pub const TARGET_NOT_FOUND: &str = "Declare the target as a `[[target]]` entry in macrobuild.toml";

    /// Missing source, macro or program folder
    pub const CHECK_FOLDERS: &str =
        "Check the folder lists in macrobuild.toml; paths are relative to the project root";

    pub const CLEAN_BUILD: &str = "Run `macrobuild clean` and compile again";

    pub const NO_TESTS: &str = "Name test files `<artifact>.test.sas` next to the artifact they cover";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// The command cannot continue
    Error,
    /// Still works today but needs attention
    Warning,
}

impl Severity {
    fn label(self, color: bool) -> &'static str {
        match (self, color) {
            (Severity::Error, false) => "error",
            (Severity::Warning, false) => "warning",
            (Severity::Error, true) => "\x1b[1;31merror\x1b[0m",
            (Severity::Warning, true) => "\x1b[1;33mwarning\x1b[0m",
        }
    }
}

/// A problem with the file it concerns, notes and help lines.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub severity: Severity,
    pub message: String,
    pub location: Option<PathBuf>,

    /// What was found, one fact per line
    pub notes: Vec<String>,

    /// What to change, in order of preference
    pub help: Vec<String>,
}

impl Diagnostic {
    fn new(severity: Severity, message: impl Into<String>) -> Self {
        Diagnostic {
            severity,
            message: message.into(),
            location: None,
            notes: Vec::new(),
            help: Vec::new(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Diagnostic::new(Severity::Error, message)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Diagnostic::new(Severity::Warning, message)
    }

    pub fn with_location(mut self, path: impl Into<PathBuf>) -> Self {
        self.location = Some(path.into());
        self
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }

    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help.push(help.into());
        self
    }

    /// Multi-line rendering for the terminal.
    pub fn format(&self, color: bool) -> String {
        let mut out = format!("{}: {}\n", self.severity.label(color), self.message);
        if let Some(path) = &self.location {
            out.push_str(&format!("  --> {}\n", path.display()));
        }
        for note in &self.notes {
            out.push_str(&format!("   = note: {}\n", note));
        }
        for help in &self.help {
            out.push_str(&format!("   = help: {}\n", help));
        }
        out
    }

    /// Single-line rendering for log records.
    pub fn one_line(&self) -> String {
        let mut out = match &self.location {
            Some(path) => format!("{}: {}", path.display(), self.message),
            None => self.message.clone(),
        };
        for extra in self.notes.iter().chain(&self.help) {
            out.push_str("; ");
            out.push_str(extra);
        }
        out
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.format(false))
    }
}

/// Print a diagnostic to stderr.
pub fn emit(diagnostic: &Diagnostic, color: bool) {
    eprint!("{}", diagnostic.format(color));
}

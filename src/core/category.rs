//! Artifact categories.
//!
//! Every source file belongs to exactly one category. The category decides
//! which folder it is copied into, which variables and init/term programs are
//! wrapped around it, and how coverage matches it against tests.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Logical category of a source or compiled artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    /// Web service, deployed as a stored process / job definition
    Service,
    /// Batch job
    Job,
    /// Test program
    Test,
    /// Macro library file (never compiled on its own)
    Macro,
    /// Program included as a temp fileref
    Program,
}

impl Category {
    /// Categories that are compiled into the build folder.
    pub const COMPILED: [Category; 3] = [Category::Service, Category::Job, Category::Test];

    /// Get the category name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Service => "service",
            Category::Job => "job",
            Category::Test => "test",
            Category::Macro => "macro",
            Category::Program => "program",
        }
    }

    /// Folder name used for this category inside the build folder.
    pub fn folder_name(&self) -> &'static str {
        match self {
            Category::Service => "services",
            Category::Job => "jobs",
            Category::Test => "tests",
            Category::Macro => "macros",
            Category::Program => "programs",
        }
    }

    /// Parse a build-folder name back into its category.
    pub fn from_folder_name(name: &str) -> Option<Category> {
        match name {
            "services" => Some(Category::Service),
            "jobs" => Some(Category::Job),
            "tests" => Some(Category::Test),
            "macros" => Some(Category::Macro),
            "programs" => Some(Category::Program),
            _ => None,
        }
    }

    /// Title used in the comment markers of compiled output (e.g. `Service`).
    pub fn title(&self) -> &'static str {
        match self {
            Category::Service => "Service",
            Category::Job => "Job",
            Category::Test => "Test",
            Category::Macro => "Macro",
            Category::Program => "Program",
        }
    }

    /// Marker written before the artifact's own content.
    pub fn start_marker(&self) -> String {
        format!("* {} start;", self.title())
    }

    /// Marker written after the artifact's own content.
    pub fn end_marker(&self) -> String {
        format!("* {} end;", self.title())
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_folder_names_round_trip() {
        for category in [
            Category::Service,
            Category::Job,
            Category::Test,
            Category::Macro,
            Category::Program,
        ] {
            assert_eq!(
                Category::from_folder_name(category.folder_name()),
                Some(category)
            );
        }
        assert_eq!(Category::from_folder_name("web"), None);
    }

    #[test]
    fn test_markers() {
        assert_eq!(Category::Service.start_marker(), "* Service start;");
        assert_eq!(Category::Job.end_marker(), "* Job end;");
    }
}

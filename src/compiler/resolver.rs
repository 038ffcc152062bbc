//! Dependency resolution seam.
//!
//! The compile stage only needs "given this content and these folders, which
//! files does it depend on, in order". [`DependencyResolver`] is that
//! contract. [`HeaderResolver`] is the default adapter, reading `@li` lines
//! from the file header.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::sync::LazyLock;

use anyhow::{Context, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use walkdir::WalkDir;

use crate::compiler::directives::{section_of, HeaderSection};
use crate::compiler::errors::BuildError;
use crate::util::fs::read_to_string;

/// An inline program dependency: a file and the fileref it is exposed as.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgramDependency {
    pub path: PathBuf,
    pub fileref: String,
}

/// Turns file content into ordered absolute dependency paths.
///
/// Implementations must be pure with respect to their inputs: the same
/// content and folders always yield the same list.
pub trait DependencyResolver {
    /// Transitive macro dependencies, dependencies before dependents.
    fn resolve_macros(&self, content: &str, folders: &[PathBuf]) -> Result<Vec<PathBuf>>;

    /// Direct program dependencies, in header order.
    fn resolve_programs(&self, content: &str, folders: &[PathBuf])
        -> Result<Vec<ProgramDependency>>;
}

static LI_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*@li\s+(?P<name>\S+)(?:\s+(?P<fileref>\S+))?").unwrap());

/// An `@li` entry from a header section.
#[derive(Debug, Clone, PartialEq, Eq)]
struct HeaderEntry {
    name: String,
    fileref: Option<String>,
}

/// Collect `@li` entries of one section from the leading doc comment.
fn header_entries(content: &str, wanted: HeaderSection) -> Vec<HeaderEntry> {
    let mut entries = Vec::new();
    let mut in_header = false;
    let mut section = HeaderSection::Other;

    for line in content.lines() {
        let trimmed = line.trim();
        if !in_header {
            if trimmed.starts_with("/**") {
                in_header = true;
            } else {
                continue;
            }
        }
        if let Some(next) = section_of(trimmed) {
            section = next;
        } else if section == wanted {
            if let Some(caps) = LI_RE.captures(trimmed) {
                entries.push(HeaderEntry {
                    name: caps["name"].to_string(),
                    fileref: caps.name("fileref").map(|m| m.as_str().to_string()),
                });
            }
        }
        if trimmed.ends_with("**/") || (trimmed.ends_with("*/") && !trimmed.starts_with("/**")) {
            break;
        }
    }

    entries
}

fn with_sas_extension(name: &str) -> String {
    if name.to_ascii_lowercase().ends_with(".sas") {
        name.to_ascii_lowercase()
    } else {
        format!("{}.sas", name.to_ascii_lowercase())
    }
}

/// Default resolver reading `<h4> SAS Macros </h4>` and
/// `<h4> SAS Programs </h4>` header sections.
///
/// Files are looked up by lower-cased file name anywhere below the given
/// folders; the first folder containing a match wins.
///
/// Folder indexes and the macro headers of dependency files are cached for
/// the life of the resolver, so create one per compile run.
#[derive(Debug, Default)]
pub struct HeaderResolver {
    indexes: RefCell<HashMap<Vec<PathBuf>, Rc<FolderIndex>>>,
    headers: RefCell<HashMap<PathBuf, Rc<Vec<HeaderEntry>>>>,
}

/// Lower-cased file name -> first matching path.
type FolderIndex = HashMap<String, PathBuf>;

impl HeaderResolver {
    pub fn new() -> Self {
        HeaderResolver::default()
    }

    fn index(&self, folders: &[PathBuf]) -> Rc<FolderIndex> {
        if let Some(index) = self.indexes.borrow().get(folders) {
            return Rc::clone(index);
        }

        let mut index = FolderIndex::new();
        for folder in folders {
            for entry in WalkDir::new(folder)
                .sort_by_file_name()
                .into_iter()
                .filter_map(|e| e.ok())
                .filter(|e| e.file_type().is_file())
            {
                let name = entry.file_name().to_string_lossy().to_ascii_lowercase();
                index.entry(name).or_insert_with(|| entry.path().to_path_buf());
            }
        }
        tracing::trace!("indexed {} files below {:?}", index.len(), folders);

        let index = Rc::new(index);
        self.indexes
            .borrow_mut()
            .insert(folders.to_vec(), Rc::clone(&index));
        index
    }

    /// Macro entries of a dependency file, read once.
    fn macro_entries(&self, path: &Path) -> Result<Rc<Vec<HeaderEntry>>> {
        if let Some(entries) = self.headers.borrow().get(path) {
            return Ok(Rc::clone(entries));
        }
        let content = read_to_string(path)?;
        let entries = Rc::new(header_entries(&content, HeaderSection::Macros));
        self.headers
            .borrow_mut()
            .insert(path.to_path_buf(), Rc::clone(&entries));
        Ok(entries)
    }

    fn visit(
        &self,
        name: &str,
        index: &FolderIndex,
        folders: &[PathBuf],
        visiting: &mut HashSet<PathBuf>,
        out: &mut Vec<PathBuf>,
    ) -> Result<()> {
        let key = with_sas_extension(name);
        let path = index.get(&key).ok_or_else(|| BuildError::MissingDependency {
            name: key.clone(),
            kind: "macro",
            searched: folders.to_vec(),
        })?;

        if out.contains(path) || !visiting.insert(path.clone()) {
            return Ok(());
        }

        for entry in self.macro_entries(path)?.iter() {
            self.visit(&entry.name, index, folders, visiting, out)
                .with_context(|| format!("required by {}", path.display()))?;
        }
        out.push(path.clone());
        Ok(())
    }
}

impl DependencyResolver for HeaderResolver {
    fn resolve_macros(&self, content: &str, folders: &[PathBuf]) -> Result<Vec<PathBuf>> {
        let entries = header_entries(content, HeaderSection::Macros);
        if entries.is_empty() {
            return Ok(Vec::new());
        }

        let index = self.index(folders);
        let mut visiting = HashSet::new();
        let mut out = Vec::new();
        for entry in entries {
            self.visit(&entry.name, &index, folders, &mut visiting, &mut out)?;
        }
        Ok(out)
    }

    fn resolve_programs(
        &self,
        content: &str,
        folders: &[PathBuf],
    ) -> Result<Vec<ProgramDependency>> {
        let entries = header_entries(content, HeaderSection::Programs);
        if entries.is_empty() {
            return Ok(Vec::new());
        }

        let index = self.index(folders);
        entries
            .into_iter()
            .map(|entry| -> Result<ProgramDependency> {
                let key = entry.name.to_ascii_lowercase();
                let path = index.get(&key).cloned().ok_or_else(|| {
                    BuildError::MissingDependency {
                        name: entry.name.clone(),
                        kind: "program",
                        searched: folders.to_vec(),
                    }
                })?;
                let fileref = entry.fileref.unwrap_or_else(|| default_fileref(&path));
                Ok(ProgramDependency { path, fileref })
            })
            .collect()
    }
}

/// Fileref used when a program entry does not name one: the upper-cased
/// file stem, cut to the eight characters a fileref may hold.
fn default_fileref(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().to_ascii_uppercase())
        .unwrap_or_default()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_')
        .take(8)
        .collect()
}

//! Source folder resolution.
//!
//! Root-level and target-level folder lists are merged per category. The
//! target can add folders but never remove or reorder the root's.

use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

use crate::core::Category;
use crate::util::fs::absolutize;

/// Merge root and target folder lists into absolute, unique paths.
///
/// Empty entries are dropped. Relative entries are resolved against
/// `source_root`. Duplicates after resolution are collapsed; the first
/// occurrence is kept, but callers should treat the result as a set.
pub fn resolve_folders(root: &[String], target: &[String], source_root: &Path) -> Vec<PathBuf> {
    let mut seen = HashSet::new();
    let mut folders = Vec::new();

    for entry in root.iter().chain(target.iter()) {
        let trimmed = entry.trim();
        if trimmed.is_empty() {
            continue;
        }
        let path = absolutize(source_root, Path::new(trimmed));
        if seen.insert(path.clone()) {
            folders.push(path);
        }
    }

    folders
}

/// Resolved folders for every source category.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceTree {
    folders: BTreeMap<Category, Vec<PathBuf>>,
}

impl SourceTree {
    /// Create an empty source tree.
    pub fn new() -> Self {
        SourceTree::default()
    }

    /// Set the folders of a category, replacing any previous value.
    pub fn insert(&mut self, category: Category, folders: Vec<PathBuf>) {
        self.folders.insert(category, folders);
    }

    /// Builder-style variant of [`SourceTree::insert`].
    pub fn with(mut self, category: Category, folders: Vec<PathBuf>) -> Self {
        self.insert(category, folders);
        self
    }

    /// Folders of a category; empty means "nothing of this category".
    pub fn folders(&self, category: Category) -> &[PathBuf] {
        self.folders
            .get(&category)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Whether no category has any folder.
    pub fn is_empty(&self) -> bool {
        self.folders.values().all(Vec::is_empty)
    }
}

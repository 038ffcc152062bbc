//! The run-scoped dependency ledger ("compile tree").
//!
//! Every dependency file loaded during a compile run is recorded here with
//! its content and its own resolved dependencies, so that a file shared by
//! many artifacts is read and resolved once per run. The ledger is a plain
//! value passed by `&mut` into every inlining call; the compile run is
//! strictly sequential, which keeps the check-then-mark step below correct.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::compiler::resolver::ProgramDependency;
use crate::util::fs::{read_to_string, write_string};

/// File name used when the ledger is persisted inside the build folder.
pub const LEDGER_FILE: &str = ".compiletree.json";

/// A dependency file as recorded in the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    /// Raw file content
    pub content: String,

    /// Resolved macro dependencies. Only recorded for files that are
    /// wrapped around artifacts (init and term programs); plain dependency
    /// bodies arrive already flattened by the resolver.
    #[serde(default)]
    pub macros: Vec<PathBuf>,

    /// Resolved program dependencies, recorded like `macros`
    #[serde(default)]
    pub programs: Vec<ProgramDependency>,
}

impl LedgerEntry {
    /// An entry holding only content.
    pub fn body(content: String) -> Self {
        LedgerEntry {
            content,
            macros: Vec::new(),
            programs: Vec::new(),
        }
    }
}

/// How a file is used by the artifacts that reference it.
///
/// The same path may be loaded in more than one role; each role has its own
/// entry because each records different information.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DependencyRole {
    /// Macro body inlined into the `Dependencies` block
    Macro,
    /// Program written to a temp fileref in the `SAS Includes` block
    Program,
    /// Init or term program, recorded with its own dependencies
    Wrapper,
}

/// Set of dependency files already loaded in the current run.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct DependencyLedger {
    #[serde(default)]
    macros: BTreeMap<PathBuf, LedgerEntry>,
    #[serde(default)]
    programs: BTreeMap<PathBuf, LedgerEntry>,
    #[serde(default)]
    wrappers: BTreeMap<PathBuf, LedgerEntry>,
}

impl DependencyLedger {
    /// Create an empty ledger for a new run.
    pub fn new() -> Self {
        DependencyLedger::default()
    }

    fn table(&self, role: DependencyRole) -> &BTreeMap<PathBuf, LedgerEntry> {
        match role {
            DependencyRole::Macro => &self.macros,
            DependencyRole::Program => &self.programs,
            DependencyRole::Wrapper => &self.wrappers,
        }
    }

    fn table_mut(&mut self, role: DependencyRole) -> &mut BTreeMap<PathBuf, LedgerEntry> {
        match role {
            DependencyRole::Macro => &mut self.macros,
            DependencyRole::Program => &mut self.programs,
            DependencyRole::Wrapper => &mut self.wrappers,
        }
    }

    /// Whether `path` has already been loaded in `role` in this run.
    pub fn contains(&self, role: DependencyRole, path: &Path) -> bool {
        self.table(role).contains_key(path)
    }

    /// Get a recorded entry.
    pub fn get(&self, role: DependencyRole, path: &Path) -> Option<&LedgerEntry> {
        self.table(role).get(path)
    }

    /// Record an entry. Returns `false` if the path was already present in
    /// that role, in which case the existing entry is kept.
    pub fn mark(&mut self, role: DependencyRole, path: PathBuf, entry: LedgerEntry) -> bool {
        let table = self.table_mut(role);
        if table.contains_key(&path) {
            return false;
        }
        table.insert(path, entry);
        true
    }

    /// Return the entry for `path` in `role`, loading it with `load` on
    /// first use.
    pub fn get_or_load<F>(
        &mut self,
        role: DependencyRole,
        path: &Path,
        load: F,
    ) -> Result<&LedgerEntry>
    where
        F: FnOnce(&Path) -> Result<LedgerEntry>,
    {
        let table = self.table_mut(role);
        if !table.contains_key(path) {
            let entry = load(path)?;
            tracing::trace!("ledger: loaded {} as {:?}", path.display(), role);
            table.insert(path.to_path_buf(), entry);
        }
        Ok(&table[path])
    }

    /// Number of recorded entries across all roles.
    pub fn len(&self) -> usize {
        self.macros.len() + self.programs.len() + self.wrappers.len()
    }

    /// Whether nothing has been recorded yet.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Persist the ledger so a later phase of the same run can reuse it.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string(self)?;
        write_string(path, &content)
    }

    /// Load a persisted ledger, or start empty if none was saved.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(DependencyLedger::default());
        }
        let content = read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }
}

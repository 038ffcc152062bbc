//! Global context for macrobuild operations.
//!
//! Provides centralized access to the working directory, the user-wide
//! configuration location and project discovery.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};

use crate::util::config::{
    resolve_target, GlobalConfig, Overrides, ProjectFile, ResolvedTarget, PROJECT_FILE,
};
use crate::util::diagnostic::suggestions;

/// Global context containing configuration and paths.
#[derive(Debug, Clone)]
pub struct GlobalContext {
    /// Current working directory
    cwd: PathBuf,

    /// Home directory for user-wide data (~/.macrobuild/)
    home: PathBuf,
}

impl GlobalContext {
    /// Create a new GlobalContext with defaults.
    pub fn new() -> Result<Self> {
        let cwd = std::env::current_dir().context("failed to get current directory")?;
        Ok(Self::with_cwd(cwd))
    }

    /// Create a GlobalContext with a specific working directory.
    pub fn with_cwd(cwd: PathBuf) -> Self {
        let home = directories::BaseDirs::new()
            .map(|b| b.home_dir().join(".macrobuild"))
            .unwrap_or_else(|| PathBuf::from(".macrobuild"));
        GlobalContext { cwd, home }
    }

    /// Override the user-wide data directory.
    pub fn with_home(mut self, home: PathBuf) -> Self {
        self.home = home;
        self
    }

    /// Get the current working directory.
    pub fn cwd(&self) -> &Path {
        &self.cwd
    }

    /// Get the user-wide data directory (~/.macrobuild/).
    pub fn home(&self) -> &Path {
        &self.home
    }

    /// Get the global configuration file path.
    pub fn config_path(&self) -> PathBuf {
        self.home.join("config.toml")
    }

    /// Find `macrobuild.toml` starting from cwd and searching upward.
    pub fn find_project_file(&self) -> Result<PathBuf> {
        let mut current = self.cwd.clone();
        loop {
            let candidate = current.join(PROJECT_FILE);
            if candidate.is_file() {
                return Ok(candidate);
            }
            if !current.pop() {
                bail!(
                    "could not find `{}` in `{}` or any parent directory\nhelp: {}",
                    PROJECT_FILE,
                    self.cwd.display(),
                    suggestions::NO_PROJECT
                );
            }
        }
    }

    /// Load every configuration layer and resolve the selected target.
    pub fn resolve_target(
        &self,
        project_file: Option<&Path>,
        overrides: &Overrides,
    ) -> Result<ResolvedTarget> {
        let project_path = match project_file {
            Some(path) => crate::util::fs::absolutize(&self.cwd, path),
            None => self.find_project_file()?,
        };
        let project_root = project_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| self.cwd.clone());

        let global = GlobalConfig::load_or_default(&self.config_path());
        let project = ProjectFile::load(&project_path)?;
        resolve_target(&global, &project, &project_root, overrides)
    }
}

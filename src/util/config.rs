//! Configuration file support.
//!
//! Settings come from up to four layers, lowest precedence first:
//! - Global: `~/.macrobuild/config.toml` - user-wide defaults
//! - Project: the `[project]` table of `macrobuild.toml`
//! - Target: the selected `[[target]]` entry of `macrobuild.toml`
//! - Command line overrides
//!
//! [`resolve_target`] collapses all layers into one [`ResolvedTarget`]; no
//! other code looks at the raw layers.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::compiler::errors::BuildError;
use crate::compiler::folders::{resolve_folders, SourceTree};
use crate::core::{Category, ServerType};
use crate::util::fs::absolutize;

/// Name of the project configuration file.
pub const PROJECT_FILE: &str = "macrobuild.toml";

/// Default build folder, relative to the project root.
pub const DEFAULT_BUILD_FOLDER: &str = "sasjsbuild";

/// Default base name of the build outputs (`build.sas`, `build.json`).
pub const DEFAULT_BUILD_FILE: &str = "build";

/// User-wide defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GlobalConfig {
    /// Target used when neither the project nor the command line names one
    pub default_target: Option<String>,

    /// Build folder used when the project does not set one
    pub build_folder: Option<String>,
}

impl GlobalConfig {
    /// Load the global configuration with fallback to defaults.
    ///
    /// A broken global file only produces a warning; it must never stop a
    /// project from building.
    pub fn load_or_default(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }
        let parsed = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))
            .and_then(|contents| {
                toml::from_str(&contents)
                    .with_context(|| format!("failed to parse config file: {}", path.display()))
            });
        parsed.unwrap_or_else(|e| {
            tracing::warn!("Failed to load config from {}: {:#}", path.display(), e);
            Self::default()
        })
    }
}

/// Init/term programs and variables of one category, as written in a file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CategoryConfigFile {
    pub init_program: Option<String>,
    pub term_program: Option<String>,
    pub vars: BTreeMap<String, String>,
}

impl CategoryConfigFile {
    /// Merge another layer into this one (other takes precedence).
    pub fn merge(&mut self, other: &CategoryConfigFile) {
        if other.init_program.is_some() {
            self.init_program = other.init_program.clone();
        }
        if other.term_program.is_some() {
            self.term_program = other.term_program.clone();
        }
        for (name, value) in &other.vars {
            self.vars.insert(name.clone(), value.clone());
        }
    }
}

/// Test settings: the category settings plus set-up and tear-down programs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TestConfigFile {
    #[serde(flatten)]
    pub programs: CategoryConfigFile,
    pub set_up: Option<String>,
    pub tear_down: Option<String>,
}

impl TestConfigFile {
    /// Merge another layer into this one (other takes precedence).
    pub fn merge(&mut self, other: &TestConfigFile) {
        self.programs.merge(&other.programs);
        if other.set_up.is_some() {
            self.set_up = other.set_up.clone();
        }
        if other.tear_down.is_some() {
            self.tear_down = other.tear_down.clone();
        }
    }
}

/// The `[project]` table.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectConfig {
    pub build_folder: Option<String>,
    pub build_file: Option<String>,
    pub default_target: Option<String>,
    pub service_folders: Vec<String>,
    pub job_folders: Vec<String>,
    pub macro_folders: Vec<String>,
    pub program_folders: Vec<String>,
    pub service_config: CategoryConfigFile,
    pub job_config: CategoryConfigFile,
    pub test_config: TestConfigFile,
    pub build_config: CategoryConfigFile,
}

/// A `[[target]]` entry. `name` and `server_type` must be given.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetConfig {
    pub name: String,
    pub server_type: ServerType,
    #[serde(default)]
    pub app_loc: String,
    #[serde(default)]
    pub build_file: Option<String>,
    #[serde(default)]
    pub service_folders: Vec<String>,
    #[serde(default)]
    pub job_folders: Vec<String>,
    #[serde(default)]
    pub macro_folders: Vec<String>,
    #[serde(default)]
    pub program_folders: Vec<String>,
    #[serde(default)]
    pub service_config: CategoryConfigFile,
    #[serde(default)]
    pub job_config: CategoryConfigFile,
    #[serde(default)]
    pub test_config: TestConfigFile,
    #[serde(default)]
    pub build_config: CategoryConfigFile,
}

/// Parsed `macrobuild.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectFile {
    pub project: ProjectConfig,

    #[serde(rename = "target")]
    pub targets: Vec<TargetConfig>,
}

impl ProjectFile {
    /// Load the project file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read project file: {}", path.display()))?;
        Self::parse(&contents)
            .with_context(|| format!("failed to parse project file: {}", path.display()))
    }

    /// Parse project file contents.
    pub fn parse(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Names of all declared targets.
    pub fn target_names(&self) -> Vec<String> {
        self.targets.iter().map(|t| t.name.clone()).collect()
    }
}

/// Overrides given on the command line.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub target: Option<String>,
    pub build_folder: Option<PathBuf>,
    pub app_loc: Option<String>,
}

/// Fully merged settings of one category, with absolute paths.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CategoryConfig {
    pub init_program: Option<PathBuf>,
    pub term_program: Option<PathBuf>,
    pub vars: BTreeMap<String, String>,
}

impl CategoryConfig {
    fn from_file(file: &CategoryConfigFile, root: &Path) -> Self {
        CategoryConfig {
            init_program: optional_path(root, file.init_program.as_deref()),
            term_program: optional_path(root, file.term_program.as_deref()),
            vars: file.vars.clone(),
        }
    }
}

fn optional_path(root: &Path, value: Option<&str>) -> Option<PathBuf> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(|v| absolutize(root, Path::new(v)))
}

/// Everything a compile, build or test run needs to know about a target.
#[derive(Debug, Clone)]
pub struct ResolvedTarget {
    pub name: String,
    pub server_type: ServerType,
    pub app_loc: String,
    pub project_root: PathBuf,
    pub build_folder: PathBuf,
    pub build_file: String,
    pub sources: SourceTree,
    pub service: CategoryConfig,
    pub job: CategoryConfig,
    pub test: CategoryConfig,
    pub build: CategoryConfig,
    pub test_set_up: Option<PathBuf>,
    pub test_tear_down: Option<PathBuf>,
}

impl ResolvedTarget {
    /// Settings of a compiled category.
    pub fn category_config(&self, category: Category) -> &CategoryConfig {
        match category {
            Category::Job => &self.job,
            Category::Test => &self.test,
            _ => &self.service,
        }
    }
}

/// Collapse the configuration layers into one [`ResolvedTarget`].
///
/// Target selection: command line, then the project's default target, then
/// the global default, then the only declared target.
pub fn resolve_target(
    global: &GlobalConfig,
    project: &ProjectFile,
    project_root: &Path,
    overrides: &Overrides,
) -> Result<ResolvedTarget> {
    let requested = overrides
        .target
        .as_ref()
        .or(project.project.default_target.as_ref())
        .or(global.default_target.as_ref());

    let target = match requested {
        Some(name) => project.targets.iter().find(|t| &t.name == name),
        None if project.targets.len() == 1 => project.targets.first(),
        None => None,
    };
    let target = target.ok_or_else(|| BuildError::MissingTarget {
        name: requested.cloned().unwrap_or_else(|| "(default)".to_string()),
        available: project.target_names(),
    })?;

    let root = &project.project;
    let sources = SourceTree::new()
        .with(
            Category::Service,
            resolve_folders(&root.service_folders, &target.service_folders, project_root),
        )
        .with(
            Category::Job,
            resolve_folders(&root.job_folders, &target.job_folders, project_root),
        )
        .with(
            Category::Macro,
            resolve_folders(&root.macro_folders, &target.macro_folders, project_root),
        )
        .with(
            Category::Program,
            resolve_folders(&root.program_folders, &target.program_folders, project_root),
        );

    let layered = |base: &CategoryConfigFile, over: &CategoryConfigFile| {
        let mut merged = base.clone();
        merged.merge(over);
        CategoryConfig::from_file(&merged, project_root)
    };

    let mut test = root.test_config.clone();
    test.merge(&target.test_config);

    let build_folder = match &overrides.build_folder {
        Some(folder) => absolutize(project_root, folder),
        None => {
            let folder = root
                .build_folder
                .as_deref()
                .or(global.build_folder.as_deref())
                .unwrap_or(DEFAULT_BUILD_FOLDER);
            absolutize(project_root, Path::new(folder))
        }
    };

    let build_file = target
        .build_file
        .clone()
        .or_else(|| root.build_file.clone())
        .unwrap_or_else(|| DEFAULT_BUILD_FILE.to_string());

    Ok(ResolvedTarget {
        name: target.name.clone(),
        server_type: target.server_type,
        app_loc: overrides
            .app_loc
            .clone()
            .unwrap_or_else(|| target.app_loc.clone()),
        project_root: project_root.to_path_buf(),
        build_folder,
        build_file,
        sources,
        service: layered(&root.service_config, &target.service_config),
        job: layered(&root.job_config, &target.job_config),
        test: CategoryConfig::from_file(&test.programs, project_root),
        build: layered(&root.build_config, &target.build_config),
        test_set_up: optional_path(project_root, test.set_up.as_deref()),
        test_tear_down: optional_path(project_root, test.tear_down.as_deref()),
    })
}

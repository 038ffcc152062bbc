//! Sample projects written to temporary directories.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

use crate::util::config::{
    resolve_target, GlobalConfig, Overrides, ProjectFile, ResolvedTarget, PROJECT_FILE,
};

/// Project file of the sample project.
pub const SAMPLE_PROJECT: &str = r#"
[project]
service_folders = ["sasjs/services/admin"]
job_folders = ["sasjs/jobs/load"]
macro_folders = ["sasjs/macros"]
program_folders = ["sasjs/programs"]

[project.service_config]
init_program = "sasjs/utils/serviceinit.sas"
vars = { env = "dev" }

[project.test_config]
set_up = "sasjs/tests/testsetup.sas"

[[target]]
name = "viya"
server_type = "SASVIYA"
app_loc = "/Public/app"

[[target]]
name = "server"
server_type = "SASJS"
app_loc = "/Public/server"
"#;

/// A project layout: the project file plus source files.
#[derive(Debug, Clone, Default)]
pub struct ProjectFixture {
    /// `macrobuild.toml` content
    pub project_file: String,

    /// Files relative to the project root
    pub files: BTreeMap<PathBuf, Vec<u8>>,
}

impl ProjectFixture {
    pub fn new(project_file: impl Into<String>) -> Self {
        ProjectFixture {
            project_file: project_file.into(),
            files: BTreeMap::new(),
        }
    }

    /// Services with macro and program dependencies, a job, a macro test, a
    /// service test, a service init program and a test set-up program.
    pub fn sample() -> Self {
        ProjectFixture::new(SAMPLE_PROJECT)
            .with_file(
                "sasjs/services/admin/getdata.sas",
                r#"/**
  @file
  @brief Returns the current user
  <h4> SAS Macros </h4>
  @li mf_getuser.sas
  <h4> SAS Programs </h4>
  @li load.sas LOADER
**/
%put user=%mf_getuser();
%inc LOADER;"#,
            )
            .with_file(
                "sasjs/services/admin/report.sas",
                r#"/**
  @file
  <h4> SAS Macros </h4>
  @li mf_getuser.sas
  @li mf_abort.sas
**/
%put 'report';"#,
            )
            .with_file("sasjs/services/admin/getdata.test.sas", "%put testing getdata;")
            .with_file("sasjs/services/admin/logo.png", &[0x89, b'P', b'N', b'G'][..])
            .with_file("sasjs/jobs/load/extract.sas", "data work.extract; run;")
            .with_file(
                "sasjs/macros/mf_getuser.sas",
                r#"/**
  @file
  <h4> SAS Macros </h4>
  @li mf_abort.sas
**/
%macro mf_getuser();&sysuserid%mend;"#,
            )
            .with_file("sasjs/macros/mf_abort.sas", "%macro mf_abort();%mend;")
            .with_file("sasjs/macros/mf_abort.test.sas", "%put testing mf_abort;")
            .with_file("sasjs/programs/load.sas", "data _null_; put 'loaded'; run;")
            .with_file("sasjs/utils/serviceinit.sas", "%put service init;")
            .with_file("sasjs/tests/testsetup.sas", "%put set up;")
    }

    pub fn with_file(mut self, path: impl Into<PathBuf>, content: impl AsRef<[u8]>) -> Self {
        self.files.insert(path.into(), content.as_ref().to_vec());
        self
    }

    pub fn without_file(mut self, path: impl AsRef<Path>) -> Self {
        self.files.remove(path.as_ref());
        self
    }

    pub fn with_project_file(mut self, project_file: impl Into<String>) -> Self {
        self.project_file = project_file.into();
        self
    }

    /// Write the project into a fresh temporary directory.
    pub fn write(&self) -> std::io::Result<WrittenProject> {
        let dir = TempDir::new()?;
        self.write_to(dir.path())?;
        Ok(WrittenProject { dir })
    }

    /// Write the project below `root`.
    pub fn write_to(&self, root: &Path) -> std::io::Result<()> {
        std::fs::create_dir_all(root)?;
        std::fs::write(root.join(PROJECT_FILE), &self.project_file)?;
        for (relative, content) in &self.files {
            let full = root.join(relative);
            if let Some(parent) = full.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(full, content)?;
        }
        Ok(())
    }
}

/// A fixture on disk. The directory is removed on drop.
pub struct WrittenProject {
    dir: TempDir,
}

impl WrittenProject {
    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    /// Resolve a target of the written project, ignoring user-wide config.
    pub fn target(&self, name: Option<&str>) -> ResolvedTarget {
        let project = ProjectFile::load(&self.root().join(PROJECT_FILE)).unwrap();
        let overrides = Overrides {
            target: Some(name.unwrap_or("viya").to_string()),
            ..Overrides::default()
        };
        resolve_target(&GlobalConfig::default(), &project, self.root(), &overrides).unwrap()
    }
}

//! Dependency inlining.
//!
//! Turns one source file into a self-contained program. The output of every
//! compiled file has the same shape:
//!
//! 1. category variables
//! 2. the init program, preceded by its own dependencies
//! 3. the file's macro dependencies, then its program dependencies
//! 4. the file itself between `* <Category> start;` / `* <Category> end;`
//! 5. the term program, preceded by its own dependencies
//!
//! A dependency appears at most once per compiled file, however many
//! segments reference it. Uniqueness is per role: a file listed both as a
//! macro and as a program is inlined once as each.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::compiler::directives::DirectivePolicy;
use crate::compiler::ledger::{DependencyLedger, DependencyRole, LedgerEntry};
use crate::compiler::resolver::{DependencyResolver, ProgramDependency};
use crate::compiler::vars::render_vars;
use crate::core::literal::escape_quotes;
use crate::core::Category;
use crate::util::config::CategoryConfig;
use crate::util::fs::read_to_string;

/// Record length of the temp files program dependencies are written to.
const PROGRAM_LRECL: usize = 32767;

/// Which wrapper program a block belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Wrapper {
    Init,
    Term,
}

impl Wrapper {
    fn label(&self) -> &'static str {
        match self {
            Wrapper::Init => "Init",
            Wrapper::Term => "Term",
        }
    }
}

/// Compiles source files by inlining their dependencies.
///
/// Holds only read-only inputs; the run-scoped [`DependencyLedger`] is passed
/// into every call.
pub struct Inliner<'a> {
    resolver: &'a dyn DependencyResolver,
    macro_folders: &'a [PathBuf],
    program_folders: &'a [PathBuf],
    policy: &'a DirectivePolicy,
}

impl<'a> Inliner<'a> {
    pub fn new(
        resolver: &'a dyn DependencyResolver,
        macro_folders: &'a [PathBuf],
        program_folders: &'a [PathBuf],
        policy: &'a DirectivePolicy,
    ) -> Self {
        Inliner {
            resolver,
            macro_folders,
            program_folders,
            policy,
        }
    }

    /// Compile the file at `path`.
    pub fn compile_file(
        &self,
        ledger: &mut DependencyLedger,
        category: Category,
        path: &Path,
        config: &CategoryConfig,
    ) -> Result<String> {
        let content = read_to_string(path)?;
        self.compile_content(ledger, category, path, &content, config)
    }

    /// Compile already-loaded `content` belonging to `path`.
    pub fn compile_content(
        &self,
        ledger: &mut DependencyLedger,
        category: Category,
        path: &Path,
        content: &str,
        config: &CategoryConfig,
    ) -> Result<String> {
        self.policy.check(path, content)?;

        let mut seen = HashSet::new();
        let mut out = render_vars(category.title(), &config.vars);

        if let Some(init) = &config.init_program {
            out.push_str(&self.wrapper_block(ledger, &mut seen, category, Wrapper::Init, init)?);
        }

        let macros = self
            .resolver
            .resolve_macros(content, self.macro_folders)
            .with_context(|| format!("failed to resolve macros of {}", path.display()))?;
        let programs = self
            .resolver
            .resolve_programs(content, self.program_folders)
            .with_context(|| format!("failed to resolve programs of {}", path.display()))?;
        out.push_str(&self.dependency_blocks(ledger, &mut seen, &macros, &programs)?);

        out.push_str(&wrap(&category.start_marker(), content, &category.end_marker()));

        if let Some(term) = &config.term_program {
            out.push_str(&self.wrapper_block(ledger, &mut seen, category, Wrapper::Term, term)?);
        }

        tracing::debug!(
            "compiled {} ({} macros, {} programs)",
            path.display(),
            macros.len(),
            programs.len()
        );
        Ok(out)
    }

    /// Dependencies of an init/term program followed by the program itself.
    fn wrapper_block(
        &self,
        ledger: &mut DependencyLedger,
        seen: &mut HashSet<(DependencyRole, PathBuf)>,
        category: Category,
        wrapper: Wrapper,
        path: &Path,
    ) -> Result<String> {
        let entry = ledger
            .get_or_load(DependencyRole::Wrapper, path, |p| self.load_wrapper(p))
            .with_context(|| {
                format!(
                    "failed to load {} {} program {}",
                    category,
                    wrapper.label().to_lowercase(),
                    path.display()
                )
            })?
            .clone();

        let mut out = self.dependency_blocks(ledger, seen, &entry.macros, &entry.programs)?;
        out.push_str(&wrap(
            &format!("* {}{} start;", category.title(), wrapper.label()),
            &entry.content,
            &format!("* {}{} end;", category.title(), wrapper.label()),
        ));
        Ok(out)
    }

    fn load_wrapper(&self, path: &Path) -> Result<LedgerEntry> {
        let content = read_to_string(path)?;
        self.policy.check(path, &content)?;
        let macros = self.resolver.resolve_macros(&content, self.macro_folders)?;
        let programs = self.resolver.resolve_programs(&content, self.program_folders)?;
        Ok(LedgerEntry {
            content,
            macros,
            programs,
        })
    }

    /// Render macro bodies and program includes not yet emitted for the
    /// current file. Macros always come before programs.
    fn dependency_blocks(
        &self,
        ledger: &mut DependencyLedger,
        seen: &mut HashSet<(DependencyRole, PathBuf)>,
        macros: &[PathBuf],
        programs: &[ProgramDependency],
    ) -> Result<String> {
        let mut macro_bodies = String::new();
        for dep in macros {
            if !seen.insert((DependencyRole::Macro, dep.clone())) {
                continue;
            }
            let entry = ledger.get_or_load(DependencyRole::Macro, dep, load_body)?;
            push_line_terminated(&mut macro_bodies, &entry.content);
        }

        let mut includes = String::new();
        for program in programs {
            if !seen.insert((DependencyRole::Program, program.path.clone())) {
                continue;
            }
            let entry = ledger.get_or_load(DependencyRole::Program, &program.path, load_body)?;
            includes.push_str(&render_program(&program.fileref, &entry.content));
        }

        let mut out = String::new();
        if !macro_bodies.is_empty() {
            out.push_str("* Dependencies start;\n");
            out.push_str(&macro_bodies);
            out.push_str("* Dependencies end;\n");
        }
        if !includes.is_empty() {
            out.push_str("* SAS Includes start;\n");
            out.push_str(&includes);
            out.push_str("* SAS Includes end;\n");
        }
        Ok(out)
    }
}

fn load_body(path: &Path) -> Result<LedgerEntry> {
    Ok(LedgerEntry::body(read_to_string(path)?))
}

fn push_line_terminated(out: &mut String, text: &str) {
    out.push_str(text);
    if !text.ends_with('\n') {
        out.push('\n');
    }
}

fn wrap(start: &str, content: &str, end: &str) -> String {
    let mut out = format!("{}\n", start);
    push_line_terminated(&mut out, content);
    out.push_str(end);
    out.push('\n');
    out
}

/// Write a program into a temp fileref so the artifact can `%inc` it.
fn render_program(fileref: &str, content: &str) -> String {
    let mut out = format!(
        "filename {fileref} temp;\ndata _null_;\nfile {fileref} lrecl={PROGRAM_LRECL};\n"
    );
    for line in content.lines() {
        out.push_str(&format!(" put '{}';\n", escape_quotes(line)));
    }
    out.push_str("run;\n");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::{BTreeMap, HashMap};
    use std::fs;

    use chrono::NaiveDate;
    use tempfile::TempDir;

    use crate::compiler::errors::BuildError;

    /// Resolver returning canned dependency lists keyed by a marker line.
    #[derive(Default)]
    struct StubResolver {
        macros: HashMap<String, Vec<PathBuf>>,
        programs: HashMap<String, Vec<ProgramDependency>>,
    }

    impl StubResolver {
        fn key(content: &str) -> String {
            content.lines().next().unwrap_or_default().to_string()
        }
    }

    impl DependencyResolver for StubResolver {
        fn resolve_macros(&self, content: &str, _: &[PathBuf]) -> Result<Vec<PathBuf>> {
            Ok(self.macros.get(&Self::key(content)).cloned().unwrap_or_default())
        }

        fn resolve_programs(&self, content: &str, _: &[PathBuf]) -> Result<Vec<ProgramDependency>> {
            Ok(self.programs.get(&Self::key(content)).cloned().unwrap_or_default())
        }
    }

    fn policy() -> DirectivePolicy {
        DirectivePolicy::at(NaiveDate::from_ymd_opt(2030, 1, 1).unwrap())
    }

    struct Fixture {
        _tmp: TempDir,
        root: PathBuf,
    }

    impl Fixture {
        fn new() -> Self {
            let tmp = TempDir::new().unwrap();
            let root = tmp.path().to_path_buf();
            Fixture { _tmp: tmp, root }
        }

        fn file(&self, name: &str, content: &str) -> PathBuf {
            let path = self.root.join(name);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(&path, content).unwrap();
            path
        }
    }

    fn count(haystack: &str, needle: &str) -> usize {
        haystack.matches(needle).count()
    }

    #[test]
    fn test_assembly_order() {
        let fx = Fixture::new();
        let init_dep = fx.file("macros/init_dep.sas", "%macro init_dep;%mend;");
        let own_dep = fx.file("macros/own_dep.sas", "%macro own_dep;%mend;");
        let term_dep = fx.file("macros/term_dep.sas", "%macro term_dep;%mend;");
        let program = fx.file("programs/load.sas", "data a; x='1'; run;");
        let init = fx.file("init.sas", "* init;\n%put init;");
        let term = fx.file("term.sas", "* term;\n%put term;");

        let mut stub = StubResolver::default();
        stub.macros.insert("* init;".into(), vec![init_dep]);
        stub.macros.insert("* term;".into(), vec![term_dep]);
        stub.macros.insert("* svc;".into(), vec![own_dep]);
        stub.programs.insert(
            "* svc;".into(),
            vec![ProgramDependency {
                path: program,
                fileref: "LOAD".into(),
            }],
        );

        let mut vars = BTreeMap::new();
        vars.insert("env".to_string(), "dev".to_string());
        let config = CategoryConfig {
            init_program: Some(init),
            term_program: Some(term),
            vars,
        };

        let policy = policy();
        let inliner = Inliner::new(&stub, &[], &[], &policy);
        let mut ledger = DependencyLedger::new();
        let out = inliner
            .compile_content(
                &mut ledger,
                Category::Service,
                Path::new("svc.sas"),
                "* svc;\n%put svc;\n",
                &config,
            )
            .unwrap();

        let order = [
            "%let env=dev;",
            "%macro init_dep;",
            "* ServiceInit start;",
            "%put init;",
            "* ServiceInit end;",
            "%macro own_dep;",
            "* SAS Includes start;",
            "filename LOAD temp;",
            " put 'data a; x=''1''; run;';",
            "* Service start;",
            "%put svc;",
            "* Service end;",
            "%macro term_dep;",
            "* ServiceTerm start;",
            "%put term;",
            "* ServiceTerm end;",
        ];
        let mut last = 0;
        for needle in order {
            let pos = out[last..]
                .find(needle)
                .unwrap_or_else(|| panic!("`{}` missing or out of order in:\n{}", needle, out));
            last += pos + needle.len();
        }
    }

    #[test]
    fn test_duplicate_dependency_in_one_artifact_collapsed() {
        let fx = Fixture::new();
        let shared = fx.file("macros/shared.sas", "%macro shared;%mend;");
        let init = fx.file("init.sas", "* init;");

        let mut stub = StubResolver::default();
        stub.macros.insert("* init;".into(), vec![shared.clone()]);
        stub.macros
            .insert("* svc;".into(), vec![shared.clone(), shared.clone()]);

        let config = CategoryConfig {
            init_program: Some(init),
            ..CategoryConfig::default()
        };
        let policy = policy();
        let inliner = Inliner::new(&stub, &[], &[], &policy);
        let mut ledger = DependencyLedger::new();
        let out = inliner
            .compile_content(&mut ledger, Category::Job, Path::new("j.sas"), "* svc;", &config)
            .unwrap();

        assert_eq!(count(&out, "%macro shared;"), 1);
    }

    #[test]
    fn test_shared_dependency_inlined_once_per_artifact() {
        let fx = Fixture::new();
        let shared = fx.file("macros/shared.sas", "%macro shared;%mend;");

        let mut stub = StubResolver::default();
        stub.macros.insert("* a;".into(), vec![shared.clone()]);
        stub.macros.insert("* b;".into(), vec![shared.clone()]);

        let policy = policy();
        let inliner = Inliner::new(&stub, &[], &[], &policy);
        let mut ledger = DependencyLedger::new();
        let config = CategoryConfig::default();

        let a = inliner
            .compile_content(&mut ledger, Category::Service, Path::new("a.sas"), "* a;", &config)
            .unwrap();
        let b = inliner
            .compile_content(&mut ledger, Category::Service, Path::new("b.sas"), "* b;", &config)
            .unwrap();

        assert_eq!(count(&a, "%macro shared;"), 1);
        assert_eq!(count(&b, "%macro shared;"), 1);
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn test_ledger_serves_cached_content() {
        let fx = Fixture::new();
        let shared = fx.file("macros/shared.sas", "%macro shared;%mend;");

        let mut stub = StubResolver::default();
        stub.macros.insert("* a;".into(), vec![shared.clone()]);

        let policy = policy();
        let inliner = Inliner::new(&stub, &[], &[], &policy);
        let mut ledger = DependencyLedger::new();
        ledger.mark(
            DependencyRole::Macro,
            shared.clone(),
            LedgerEntry::body("%macro cached;%mend;".into()),
        );

        let out = inliner
            .compile_content(
                &mut ledger,
                Category::Test,
                Path::new("a.test.sas"),
                "* a;",
                &CategoryConfig::default(),
            )
            .unwrap();
        assert!(out.contains("%macro cached;"));
        assert!(out.contains("* Test start;"));
    }

    #[test]
    fn test_deprecated_directive_fails_file() {
        let stub = StubResolver::default();
        let policy = policy();
        let inliner = Inliner::new(&stub, &[], &[], &policy);
        let mut ledger = DependencyLedger::new();

        let err = inliner
            .compile_content(
                &mut ledger,
                Category::Service,
                Path::new("old.sas"),
                "/**\n <h4> Dependencies </h4>\n**/",
                &CategoryConfig::default(),
            )
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<BuildError>(),
            Some(BuildError::DeprecatedDirective { .. })
        ));
    }

    #[test]
    fn test_no_dependencies_no_blocks() {
        let stub = StubResolver::default();
        let policy = policy();
        let inliner = Inliner::new(&stub, &[], &[], &policy);
        let mut ledger = DependencyLedger::new();
        let out = inliner
            .compile_content(
                &mut ledger,
                Category::Service,
                Path::new("a.sas"),
                "%put hi;",
                &CategoryConfig::default(),
            )
            .unwrap();
        assert_eq!(out, "* Service start;\n%put hi;\n* Service end;\n");
    }

    #[test]
    fn test_init_program_used_as_macro_keeps_its_dependencies() {
        let fx = Fixture::new();
        let helper = fx.file("macros/helper.sas", "%macro helper;%mend;");
        let init = fx.file("utils/init.sas", "* init;\n%put init;");

        let mut stub = StubResolver::default();
        stub.macros.insert("* init;".into(), vec![helper]);
        stub.macros.insert("* first;".into(), vec![init.clone()]);

        let policy = policy();
        let inliner = Inliner::new(&stub, &[], &[], &policy);
        let mut ledger = DependencyLedger::new();

        // The init file is first loaded as a plain macro body.
        inliner
            .compile_content(
                &mut ledger,
                Category::Job,
                Path::new("first.sas"),
                "* first;",
                &CategoryConfig::default(),
            )
            .unwrap();

        let config = CategoryConfig {
            init_program: Some(init),
            ..CategoryConfig::default()
        };
        let out = inliner
            .compile_content(&mut ledger, Category::Service, Path::new("svc.sas"), "* svc;", &config)
            .unwrap();

        assert_eq!(count(&out, "%macro helper;"), 1);
        assert!(out.find("%macro helper;").unwrap() < out.find("* ServiceInit start;").unwrap());
        assert_eq!(ledger.len(), 3);
    }

    #[test]
    fn test_file_listed_as_macro_and_program_emitted_in_both_blocks() {
        let fx = Fixture::new();
        let both = fx.file("shared/both.sas", "%macro both;%mend;");

        let mut stub = StubResolver::default();
        stub.macros.insert("* svc;".into(), vec![both.clone()]);
        stub.programs.insert(
            "* svc;".into(),
            vec![ProgramDependency {
                path: both,
                fileref: "BOTH".into(),
            }],
        );

        let policy = policy();
        let inliner = Inliner::new(&stub, &[], &[], &policy);
        let mut ledger = DependencyLedger::new();
        let out = inliner
            .compile_content(
                &mut ledger,
                Category::Service,
                Path::new("svc.sas"),
                "* svc;",
                &CategoryConfig::default(),
            )
            .unwrap();

        assert!(out.contains("* Dependencies start;\n%macro both;%mend;\n* Dependencies end;\n"));
        assert!(out.contains("filename BOTH temp;"));
        assert!(out.contains(" put '%macro both;%mend;';"));
    }

    #[test]
    fn test_header_resolver_shared_across_artifacts() {
        use crate::compiler::resolver::HeaderResolver;

        let fx = Fixture::new();
        fx.file("macros/mf_a.sas", "%macro mf_a;%mend;");
        let macro_folders = vec![fx.root.join("macros")];
        let content = "/**\n  <h4> SAS Macros </h4>\n  @li mf_a.sas\n**/\n%mf_a;";

        let resolver = HeaderResolver::new();
        let policy = policy();
        let inliner = Inliner::new(&resolver, &macro_folders, &[], &policy);
        let mut ledger = DependencyLedger::new();
        let config = CategoryConfig::default();

        let a = inliner
            .compile_content(&mut ledger, Category::Service, Path::new("a.sas"), content, &config)
            .unwrap();
        fs::remove_file(fx.root.join("macros/mf_a.sas")).unwrap();
        let b = inliner
            .compile_content(&mut ledger, Category::Service, Path::new("b.sas"), content, &config)
            .unwrap();

        assert_eq!(count(&a, "%macro mf_a;"), 1);
        assert_eq!(count(&b, "%macro mf_a;"), 1);
    }
}

//! Build stage: package the compiled build folder.
//!
//! The compiled `services`, `jobs` and `tests` folders are walked once. Every
//! folder and file is handed to a set of [`Emitter`]s, so the deployment
//! script and the artifact tree always list artifacts in the same order.

pub mod script;
pub mod tree;

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use flate2::write::GzEncoder;
use flate2::Compression;

use crate::compiler::vars::render_vars;
use crate::compiler::IGNORED_FOLDERS;
use crate::core::{ArtifactTree, Category, ServerType};
use crate::util::config::ResolvedTarget;
use crate::util::fs::{list_dir, read_bytes, read_to_string, write_bytes, write_string};

pub use script::ScriptEmitter;
pub use tree::TreeEmitter;

/// Receives the build folder contents in traversal order.
pub trait Emitter {
    /// A folder is entered. `path` is relative to the build folder.
    fn enter_folder(&mut self, path: &str, name: &str);

    /// The most recently entered folder is complete.
    fn leave_folder(&mut self);

    /// A file inside `folder`.
    fn file(&mut self, folder: &str, name: &str, bytes: &[u8]) -> Result<()>;
}

/// Walk the compiled category folders of `build_folder`.
///
/// Category folders come in service, job, test order. Inside a folder, files
/// come first in name order, then sub-folders in name order.
pub fn walk(build_folder: &Path, emitters: &mut [&mut dyn Emitter]) -> Result<()> {
    for category in Category::COMPILED {
        let root = build_folder.join(category.folder_name());
        if root.is_dir() {
            visit(&root, category.folder_name(), category.folder_name(), emitters)?;
        }
    }
    Ok(())
}

fn visit(dir: &Path, path: &str, name: &str, emitters: &mut [&mut dyn Emitter]) -> Result<()> {
    for emitter in emitters.iter_mut() {
        emitter.enter_folder(path, name);
    }

    let (files, dirs) = list_dir(dir)?;
    for file in &files {
        let bytes = read_bytes(&dir.join(file))?;
        for emitter in emitters.iter_mut() {
            emitter.file(path, file, &bytes)?;
        }
    }
    for sub in dirs.iter().filter(|d| !IGNORED_FOLDERS.contains(&d.as_str())) {
        visit(&dir.join(sub), &format!("{}/{}", path, sub), sub, emitters)?;
    }

    for emitter in emitters.iter_mut() {
        emitter.leave_folder();
    }
    Ok(())
}

/// Text placed before and after the artifacts in the script.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScriptFrame {
    pub preamble: String,
    pub postamble: String,
}

impl ScriptFrame {
    /// Header comment, `appLoc`, build variables and the build init/term
    /// programs of a target.
    pub fn for_target(target: &ResolvedTarget) -> Result<Self> {
        let mut preamble = format!(
            "/* Build of target `{}` ({}), generated by macrobuild {} */\n",
            target.name,
            target.server_type,
            env!("CARGO_PKG_VERSION")
        );
        preamble.push_str(&format!("%let appLoc={};\n", target.app_loc));
        preamble.push_str(&render_vars("Build", &target.build.vars));
        if let Some(init) = &target.build.init_program {
            let content = read_to_string(init).context("failed to read build init program")?;
            preamble.push_str(&wrap_program("BuildInit", &content));
        }
        preamble.push('\n');

        let mut postamble = String::new();
        if let Some(term) = &target.build.term_program {
            let content = read_to_string(term).context("failed to read build term program")?;
            postamble.push_str(&wrap_program("BuildTerm", &content));
        }

        Ok(ScriptFrame {
            preamble,
            postamble,
        })
    }
}

fn wrap_program(label: &str, content: &str) -> String {
    let mut out = format!("* {} start;\n{}", label, content);
    if !content.ends_with('\n') {
        out.push('\n');
    }
    out.push_str(&format!("* {} end;\n", label));
    out
}

/// Script and tree produced from one walk.
#[derive(Debug, Clone)]
pub struct Bundle {
    pub script: String,
    pub tree: ArtifactTree,

    /// Artifact paths relative to the build folder, in emission order
    pub artifacts: Vec<String>,
}

/// Walk `build_folder` once and produce both representations.
pub fn encode(
    build_folder: &Path,
    server_type: ServerType,
    app_loc: &str,
    frame: &ScriptFrame,
) -> Result<Bundle> {
    let mut script = ScriptEmitter::new(server_type, &frame.preamble);
    let mut tree = TreeEmitter::new(root_name(app_loc));
    let emitters: &mut [&mut dyn Emitter] = &mut [&mut script, &mut tree];
    walk(build_folder, emitters)?;

    let artifacts = script.artifacts().to_vec();
    tracing::debug!("encoded {} artifacts", artifacts.len());
    Ok(Bundle {
        script: script.finish(&frame.postamble),
        tree: ArtifactTree {
            app_loc: app_loc.to_string(),
            tree: tree.finish(),
        },
        artifacts,
    })
}

/// Last segment of the deployment location, used to name the tree root.
fn root_name(app_loc: &str) -> &str {
    app_loc
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .filter(|s| !s.is_empty())
        .unwrap_or("root")
}

/// Files written by [`write_bundle`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundleFiles {
    pub script: PathBuf,
    pub tree: PathBuf,
    pub compressed_tree: PathBuf,
}

/// Write `<name>.sas`, `<name>.json` and `<name>.json.gz` into `build_folder`.
pub fn write_bundle(bundle: &Bundle, build_folder: &Path, name: &str) -> Result<BundleFiles> {
    let files = BundleFiles {
        script: build_folder.join(format!("{}.sas", name)),
        tree: build_folder.join(format!("{}.json", name)),
        compressed_tree: build_folder.join(format!("{}.json.gz", name)),
    };

    write_string(&files.script, &bundle.script)?;

    let json = serde_json::to_string(&bundle.tree)?;
    write_string(&files.tree, &json)?;

    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(json.as_bytes())
        .context("failed to compress artifact tree")?;
    let compressed = encoder.finish().context("failed to compress artifact tree")?;
    write_bytes(&files.compressed_tree, &compressed)?;

    Ok(files)
}

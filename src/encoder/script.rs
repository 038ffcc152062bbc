//! The deployment script emitter.
//!
//! Every artifact becomes a `data _null_` step that writes its content into a
//! temp fileref, followed by the server's deployment statement:
//!
//! ```text
//! %let path=services/admin;
//! %let service=getdata;
//! filename sascode temp lrecl=32767;
//! data _null_;
//! file sascode;
//!  put '%put hello;';
//! run;
//! %mv_createwebservice(path=&appLoc/&path, name=&service, code=sascode, replace=YES)
//! ```

use anyhow::{bail, Result};
use base64::{engine::general_purpose::STANDARD, Engine};

use crate::core::literal::{chunk, escape_quotes, unescape_quotes};
use crate::core::server::{Deployment, PayloadEncoding};
use crate::core::ServerType;
use crate::encoder::Emitter;

/// Smallest record length declared for a temp fileref.
pub const MIN_RECORD_LENGTH: usize = 32767;

/// Size of one base64 chunk.
pub const BASE64_CHUNK: usize = 1000;

/// Terminator of every chunk but the last; holds the output line open.
pub const CONTINUATION: &str = " @;";

/// Record length needed to write `content` without truncation.
pub fn record_length(content: &str) -> usize {
    content.len().max(MIN_RECORD_LENGTH)
}

/// `put` statements writing text content, one per line.
pub fn text_puts(content: &str) -> String {
    let mut out = String::new();
    for line in content.split('\n') {
        out.push_str(&format!(" put '{}';\n", escape_quotes(line)));
    }
    out
}

/// `put` statements writing an already-encoded payload in fixed chunks.
pub fn chunked_puts(payload: &str) -> String {
    let pieces = chunk(payload, BASE64_CHUNK);
    let last = pieces.len() - 1;
    let mut out = String::new();
    for (idx, piece) in pieces.iter().enumerate() {
        let end = if idx == last { ";" } else { CONTINUATION };
        out.push_str(&format!(" put '{}'{}\n", escape_quotes(piece), end));
    }
    out
}

/// Recover content from the `put` statements of one data step.
///
/// Statements ending in [`CONTINUATION`] are joined to the next one; other
/// statements are separated by newlines.
pub fn parse_puts(block: &str) -> Result<String> {
    let mut out = String::new();
    let mut first = true;
    let mut continued = false;

    for line in block.lines() {
        let Some(rest) = line.strip_prefix(" put '") else {
            continue;
        };
        let (literal, joins_next) = if let Some(lit) = rest.strip_suffix(&format!("'{}", CONTINUATION)) {
            (lit, true)
        } else if let Some(lit) = rest.strip_suffix("';") {
            (lit, false)
        } else {
            bail!("malformed put statement: {}", line);
        };

        if !first && !continued {
            out.push('\n');
        }
        out.push_str(&unescape_quotes(literal));
        first = false;
        continued = joins_next;
    }
    Ok(out)
}

/// Builds the deployment script as the encoder walks the build folder.
pub struct ScriptEmitter {
    server_type: ServerType,
    out: String,
    pending_path: Option<String>,
    artifacts: Vec<String>,
}

impl ScriptEmitter {
    /// Start a script with `preamble` (header, `appLoc`, build init).
    pub fn new(server_type: ServerType, preamble: &str) -> Self {
        ScriptEmitter {
            server_type,
            out: preamble.to_string(),
            pending_path: None,
            artifacts: Vec::new(),
        }
    }

    /// Paths of the emitted artifacts, in emission order.
    pub fn artifacts(&self) -> &[String] {
        &self.artifacts
    }

    /// Append `postamble` and return the script.
    pub fn finish(mut self, postamble: &str) -> String {
        self.out.push_str(postamble);
        self.out
    }

    fn data_step(&mut self, name: &str, content: &str, puts: String, deployment: Deployment) {
        self.out.push_str(&format!("%let service={};\n", name));
        self.out.push_str(&format!(
            "filename sascode temp lrecl={};\n",
            record_length(content)
        ));
        self.out.push_str("data _null_;\nfile sascode;\n");
        self.out.push_str(&puts);
        self.out.push_str("run;\n");
        if let Some(invocation) = deployment.invocation() {
            self.out.push_str(invocation);
            self.out.push('\n');
        }
        self.out.push('\n');
    }
}

impl Emitter for ScriptEmitter {
    fn enter_folder(&mut self, path: &str, _name: &str) {
        self.pending_path = Some(path.to_string());
    }

    fn leave_folder(&mut self) {
        self.pending_path = None;
    }

    fn file(&mut self, folder: &str, name: &str, bytes: &[u8]) -> Result<()> {
        if let Some(path) = self.pending_path.take() {
            self.out.push_str(&format!("%let path={};\n", path));
        }

        let encoding = PayloadEncoding::for_file_name(name);
        let deployment = Deployment::select(self.server_type, encoding);
        match encoding {
            PayloadEncoding::Text => {
                let content = String::from_utf8_lossy(bytes);
                let stem = name.rsplit_once('.').map_or(name, |(stem, _)| stem);
                self.data_step(stem, &content, text_puts(&content), deployment);
            }
            PayloadEncoding::Base64 => {
                let payload = STANDARD.encode(bytes);
                self.data_step(name, &payload, chunked_puts(&payload), deployment);
            }
        }

        self.artifacts.push(if folder.is_empty() {
            name.to_string()
        } else {
            format!("{}/{}", folder, name)
        });
        Ok(())
    }
}

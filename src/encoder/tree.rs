//! The artifact tree emitter.

use anyhow::Result;
use base64::{engine::general_purpose::STANDARD, Engine};

use crate::core::server::is_script_file;
use crate::core::ArtifactNode;
use crate::encoder::Emitter;

/// Builds an [`ArtifactNode`] tree mirroring the walked folders.
pub struct TreeEmitter {
    /// Open folders, outermost first. Never empty.
    stack: Vec<ArtifactNode>,
}

impl TreeEmitter {
    /// Start a tree under a root folder called `root`.
    pub fn new(root: impl Into<String>) -> Self {
        TreeEmitter {
            stack: vec![ArtifactNode::folder(root)],
        }
    }

    /// Close any folder still open and return the root.
    pub fn finish(mut self) -> ArtifactNode {
        while self.stack.len() > 1 {
            self.leave_folder();
        }
        self.stack.pop().unwrap_or_else(|| ArtifactNode::folder(""))
    }

    fn top(&mut self) -> &mut ArtifactNode {
        let last = self.stack.len() - 1;
        &mut self.stack[last]
    }
}

impl Emitter for TreeEmitter {
    fn enter_folder(&mut self, _path: &str, name: &str) {
        self.stack.push(ArtifactNode::folder(name));
    }

    fn leave_folder(&mut self) {
        if self.stack.len() < 2 {
            return;
        }
        if let Some(folder) = self.stack.pop() {
            self.top().push(folder);
        }
    }

    fn file(&mut self, _folder: &str, name: &str, bytes: &[u8]) -> Result<()> {
        let node = if is_script_file(name) {
            ArtifactNode::service(name, String::from_utf8_lossy(bytes))
        } else {
            ArtifactNode::file(name, STANDARD.encode(bytes))
        };
        self.top().push(node);
        Ok(())
    }
}

//! Compiled artifacts and the hierarchical artifact tree.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::core::Category;

/// One file produced by the compile stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledArtifact {
    /// Logical category (service, job, test or program)
    pub category: Category,

    /// Path relative to the category root in the build folder
    pub relative_path: PathBuf,

    /// Full compiled text
    pub content: String,
}

impl CompiledArtifact {
    /// Path relative to the build folder (`services/admin/x.sas`).
    pub fn build_path(&self) -> PathBuf {
        PathBuf::from(self.category.folder_name()).join(&self.relative_path)
    }
}

/// Node kind in the artifact tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Folder,
    File,
    Service,
}

/// A node of the packaged-payload tree.
///
/// Folder nodes carry children and no body; leaf nodes carry a body and no
/// children. Use the constructors to keep that invariant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactNode {
    pub name: String,

    #[serde(rename = "type")]
    pub kind: NodeKind,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<ArtifactNode>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
}

impl ArtifactNode {
    /// Create an empty folder node.
    pub fn folder(name: impl Into<String>) -> Self {
        ArtifactNode {
            name: name.into(),
            kind: NodeKind::Folder,
            children: Some(Vec::new()),
            body: None,
        }
    }

    /// Create a service leaf holding literal script text.
    pub fn service(name: impl Into<String>, body: impl Into<String>) -> Self {
        ArtifactNode {
            name: name.into(),
            kind: NodeKind::Service,
            children: None,
            body: Some(body.into()),
        }
    }

    /// Create a file leaf holding base64 content.
    pub fn file(name: impl Into<String>, body: impl Into<String>) -> Self {
        ArtifactNode {
            name: name.into(),
            kind: NodeKind::File,
            children: None,
            body: Some(body.into()),
        }
    }

    /// Whether this node is a folder.
    pub fn is_folder(&self) -> bool {
        self.kind == NodeKind::Folder
    }

    /// Append a child to a folder node. Leaf nodes ignore the call.
    pub fn push(&mut self, child: ArtifactNode) {
        if let Some(children) = self.children.as_mut() {
            children.push(child);
        }
    }

    /// Children of a folder node (empty for leaves).
    pub fn children(&self) -> &[ArtifactNode] {
        self.children.as_deref().unwrap_or(&[])
    }

    /// Paths of all leaves, depth-first in emission order.
    pub fn leaf_paths(&self) -> Vec<String> {
        let mut out = Vec::new();
        collect_leaves(self, "", &mut out);
        out
    }

    /// Find a node by a `/`-separated path below this node.
    pub fn find(&self, path: &str) -> Option<&ArtifactNode> {
        let mut node = self;
        for part in path.split('/').filter(|p| !p.is_empty()) {
            node = node.children().iter().find(|c| c.name == part)?;
        }
        Some(node)
    }
}

fn collect_leaves(node: &ArtifactNode, prefix: &str, out: &mut Vec<String>) {
    for child in node.children() {
        let path = if prefix.is_empty() {
            child.name.clone()
        } else {
            format!("{}/{}", prefix, child.name)
        };
        if child.is_folder() {
            collect_leaves(child, &path, out);
        } else {
            out.push(path);
        }
    }
}

/// The artifact-tree document written next to the build script.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtifactTree {
    /// Deployment location on the target server
    pub app_loc: String,

    /// Root folder node; its children mirror the build folder
    pub tree: ArtifactNode,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ArtifactNode {
        let mut root = ArtifactNode::folder("app");
        let mut services = ArtifactNode::folder("services");
        services.push(ArtifactNode::service("a.sas", "%put a;"));
        services.push(ArtifactNode::file("logo.png", "aGVsbG8="));
        root.push(services);
        root
    }

    #[test]
    fn test_leaf_paths() {
        assert_eq!(
            sample().leaf_paths(),
            vec!["services/a.sas".to_string(), "services/logo.png".to_string()]
        );
    }

    #[test]
    fn test_find() {
        let root = sample();
        assert_eq!(root.find("services/a.sas").unwrap().kind, NodeKind::Service);
        assert!(root.find("services/missing.sas").is_none());
    }

    #[test]
    fn test_push_to_leaf_is_ignored() {
        let mut leaf = ArtifactNode::service("a.sas", "x");
        leaf.push(ArtifactNode::folder("nested"));
        assert!(leaf.children.is_none());
    }

    #[test]
    fn test_serialized_shape() {
        let json = serde_json::to_value(sample()).unwrap();
        assert_eq!(json["type"], "folder");
        assert!(json.get("body").is_none());
        let leaf = &json["children"][0]["children"][0];
        assert_eq!(leaf["type"], "service");
        assert_eq!(leaf["body"], "%put a;");
        assert!(leaf.get("children").is_none());
    }
}

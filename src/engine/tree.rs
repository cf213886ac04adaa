//! Arena-backed dependency tree.
//!
//! Nodes live in a `Vec` and refer to each other through [`NodeId`]s. A
//! node's parent is an index, so the tree never forms ownership cycles and
//! the whole structure is dropped at once.

use std::path::PathBuf;

use anyhow::Result;
use serde_json::{Value, json};
use sha2::{Digest, Sha256};

use crate::core::KpmError;
use crate::package::{PackageDefinition, PackageInfo};
use crate::templating::TemplateEnv;

/// Index of a node in its [`DependencyTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

/// A parsed output template of a package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Executable {
    /// Name registered in the node's template environment
    pub name: String,
    /// File name written below the node's output directory
    pub file_name: String,
}

/// Everything computed for a node once its package has been loaded.
#[derive(Debug, Clone)]
pub struct LoadedNode {
    pub package_dir: PathBuf,
    pub env: TemplateEnv,
    /// Output templates in file-name order
    pub executables: Vec<Executable>,
    /// `{package, values}` mapping the templates render against
    pub input: Value,
    pub identity_hash: String,
}

#[derive(Debug, Clone)]
pub struct TreeNode {
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    pub definition: PackageDefinition,
    pub output_name: String,
    loaded: Option<LoadedNode>,
}

impl TreeNode {
    pub fn info(&self) -> &PackageInfo {
        &self.definition.package
    }

    pub fn loaded(&self) -> Option<&LoadedNode> {
        self.loaded.as_ref()
    }

    /// `output (full-name)`, or just the output name when both agree.
    pub fn label(&self) -> String {
        let full_name = self.info().full_name();
        if self.output_name == full_name {
            full_name
        } else {
            format!("{} ({full_name})", self.output_name)
        }
    }
}

/// A rooted tree of package invocations.
#[derive(Debug, Clone)]
pub struct DependencyTree {
    nodes: Vec<TreeNode>,
}

impl DependencyTree {
    pub fn new_root(definition: PackageDefinition, output_name: impl Into<String>) -> Self {
        Self {
            nodes: vec![TreeNode {
                parent: None,
                children: Vec::new(),
                definition,
                output_name: output_name.into(),
                loaded: None,
            }],
        }
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, id: NodeId) -> &TreeNode {
        &self.nodes[id.0]
    }

    /// Append a child of `parent`, after its existing children.
    pub fn push_child(
        &mut self,
        parent: NodeId,
        definition: PackageDefinition,
        output_name: impl Into<String>,
    ) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(TreeNode {
            parent: Some(parent),
            children: Vec::new(),
            definition,
            output_name: output_name.into(),
            loaded: None,
        });
        self.nodes[parent.0].children.push(id);
        id
    }

    /// Record the loaded state of a node. A node is loaded exactly once.
    pub fn set_loaded(&mut self, id: NodeId, loaded: LoadedNode) -> Result<()> {
        let node = &mut self.nodes[id.0];
        if node.loaded.is_some() {
            return Err(KpmError::Other {
                message: format!("Node {} was loaded twice", node.label()),
            }
            .into());
        }
        node.loaded = Some(loaded);
        Ok(())
    }

    /// `id` and its ancestors, root first.
    pub fn lineage(&self, id: NodeId) -> Vec<NodeId> {
        let mut chain = vec![id];
        let mut current = self.node(id).parent;
        while let Some(parent) = current {
            chain.push(parent);
            current = self.node(parent).parent;
        }
        chain.reverse();
        chain
    }

    /// Output names from the root down to `id`.
    pub fn relative_path(&self, id: NodeId) -> Vec<String> {
        self.lineage(id).into_iter().map(|n| self.node(n).output_name.clone()).collect()
    }

    /// Human-readable location of `id`, e.g. `app-1.0.0/db (postgres-2.0.0)`.
    pub fn friendly_path(&self, id: NodeId) -> String {
        self.lineage(id).into_iter().map(|n| self.node(n).label()).collect::<Vec<_>>().join("/")
    }

    /// Pre-order traversal: parents before children, siblings in order.
    pub fn preorder(&self) -> Vec<NodeId> {
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut stack = vec![self.root()];
        while let Some(id) = stack.pop() {
            order.push(id);
            stack.extend(self.node(id).children.iter().rev().copied());
        }
        order
    }
}

/// SHA-256 of the canonical JSON encoding of `{package, input}`, hex encoded.
///
/// `serde_json` maps keep their keys sorted, so equal values always encode to
/// the same bytes.
pub fn identity_hash(info: &PackageInfo, input: &Value) -> Result<String> {
    let identity = json!({
        "package": {"name": info.name, "version": info.version},
        "input": input,
    });
    let canonical = serde_json::to_string(&identity)?;

    let mut hasher = Sha256::new();
    hasher.update(canonical.as_bytes());
    Ok(hex::encode(hasher.finalize()))
}

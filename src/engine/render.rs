//! Rendering a built dependency tree.
//!
//! [`render`] walks the tree parents first and hands each node to a
//! [`NodeConsumer`]. [`FileWriter`] is the consumer used by `kpm run`: it
//! writes a node's output templates to `<output root>/<relative path>/`.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde_json::Value;

use super::tree::{DependencyTree, Executable, NodeId};
use crate::core::KpmError;
use crate::templating::TemplateEnv;
use crate::utils::fs::{ensure_dir, remove_dir_all};

/// A loaded node as seen by a [`NodeConsumer`].
#[derive(Debug)]
pub struct NodeView<'a> {
    /// Output names from the root to this node
    pub relative_path: Vec<String>,
    /// Same path with package names, for messages
    pub friendly_path: String,
    pub env: &'a TemplateEnv,
    pub executables: &'a [Executable],
    pub input: &'a Value,
}

/// Receives every node of a tree, in render order.
pub trait NodeConsumer {
    fn consume(&mut self, node: &NodeView<'_>) -> Result<()>;
}

/// Writes each node's rendered templates below an output root.
#[derive(Debug, Clone)]
pub struct FileWriter {
    output_root: PathBuf,
}

impl FileWriter {
    pub fn new(output_root: impl Into<PathBuf>) -> Self {
        Self {
            output_root: output_root.into(),
        }
    }

    /// Directory a node with this relative path is written to.
    pub fn node_dir(&self, relative_path: &[String]) -> PathBuf {
        relative_path.iter().fold(self.output_root.clone(), |dir, name| dir.join(name))
    }
}

impl NodeConsumer for FileWriter {
    fn consume(&mut self, node: &NodeView<'_>) -> Result<()> {
        let dir = self.node_dir(&node.relative_path);
        ensure_dir(&dir)?;

        for executable in node.executables {
            let location = format!("{}/{}", node.friendly_path, executable.file_name);
            let content = node.env.render_as(&executable.name, node.input, &location)?;
            let target = dir.join(&executable.file_name);
            std::fs::write(&target, content)
                .with_context(|| format!("Failed to write {}", target.display()))?;
        }

        tracing::debug!(
            "Rendered {} file(s) for {} into {}",
            node.executables.len(),
            node.friendly_path,
            dir.display()
        );
        Ok(())
    }
}

/// Feed every node of `tree` to `consumer`, parents before children.
///
/// Returns the number of nodes consumed.
pub fn render(tree: &DependencyTree, consumer: &mut dyn NodeConsumer) -> Result<usize> {
    let mut count = 0;
    for id in tree.preorder() {
        consumer.consume(&view(tree, id)?)?;
        count += 1;
    }
    Ok(count)
}

fn view(tree: &DependencyTree, id: NodeId) -> Result<NodeView<'_>> {
    let friendly_path = tree.friendly_path(id);
    let loaded = tree.node(id).loaded().ok_or_else(|| KpmError::Other {
        message: format!("Node {friendly_path} was never loaded"),
    })?;

    Ok(NodeView {
        relative_path: tree.relative_path(id),
        friendly_path,
        env: &loaded.env,
        executables: &loaded.executables,
        input: &loaded.input,
    })
}

/// Render `tree` into `output_root`.
///
/// Only `output_root/<root output name>` is cleared beforehand; anything else
/// below `output_root` is left alone.
pub fn render_package(tree: &DependencyTree, output_root: &Path) -> Result<usize> {
    let mut writer = FileWriter::new(output_root);
    let root_dir = writer.node_dir(&tree.relative_path(tree.root()));
    remove_dir_all(&root_dir)?;

    let count = render(tree, &mut writer)?;
    tracing::info!("Rendered {count} package(s) into {}", root_dir.display());
    Ok(count)
}

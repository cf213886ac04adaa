//! Package execution engine.
//!
//! Running a package is two passes over the local repository:
//!
//! 1. [`build_tree`] loads the root package, composes its input and follows
//!    its dependency templates depth first, producing a [`DependencyTree`].
//! 2. [`render_package`] walks that tree and writes every node's output
//!    templates below the output root.
//!
//! ```text
//! <output root>/<root output name>/           root package files
//! <output root>/<root output name>/<child>/   files of dependency "child"
//! ```
//!
//! Both passes are deterministic: the same home, parameters and output root
//! always produce the same files.

pub mod builder;
pub mod input;
pub mod render;
pub mod tree;

pub use builder::build_tree;
pub use input::{compose_input, merge_parameters};
pub use render::{FileWriter, NodeConsumer, NodeView, render, render_package};
pub use tree::{DependencyTree, NodeId, identity_hash};

use std::path::Path;

use anyhow::Result;

use crate::package::{PackageInfo, Parameters};

/// Build and render `info` into `output_root/<output_name>`.
///
/// Returns the number of rendered packages.
pub fn run_package(
    home: &Path,
    info: &PackageInfo,
    overrides: Option<Parameters>,
    output_root: &Path,
    output_name: &str,
) -> Result<usize> {
    tracing::info!("Running {info} as '{output_name}'");
    let tree = build_tree(home, &info.name, &info.version, overrides, output_name)?;
    render_package(&tree, output_root)
}

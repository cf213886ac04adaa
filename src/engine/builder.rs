//! Dependency tree construction.
//!
//! The tree is built depth first with an explicit stack. Visiting a node
//! loads its package, composes its template input and renders every file in
//! its `dependencies/` directory into a child [`PackageDefinition`]. The
//! child's output name is the dependency file's stem.
//!
//! Cycles are detected by identity: a node whose `{package, input}` hash
//! already occurs on the path from the root is a cycle. The same package
//! reached along two sibling paths (a diamond) is not.

use std::collections::HashSet;
use std::path::Path;

use anyhow::{Context, Result};

use super::input::compose_layout_input;
use super::tree::{DependencyTree, Executable, LoadedNode, NodeId, identity_hash};
use crate::constants::{DEPENDENCIES_DIR, HELPERS_DIR, TEMPLATES_DIR};
use crate::core::KpmError;
use crate::package::validation::validate_output_name;
use crate::package::yaml::from_yaml_strict;
use crate::package::{PackageDefinition, PackageInfo, Parameters};
use crate::repository::local;
use crate::templating::TemplateEnv;

/// Who asked for the root node, in `PackageMissing` errors.
const ROOT_REQUESTER: &str = "command line";

/// Build the dependency tree rooted at `name-version`.
///
/// `overrides` of `None` and an empty mapping are equivalent. Any failure
/// discards the partially built tree.
pub fn build_tree(
    home: &Path,
    name: &str,
    version: &str,
    overrides: Option<Parameters>,
    output_name: &str,
) -> Result<DependencyTree> {
    let root = PackageDefinition::new(PackageInfo::new(name, version), overrides);
    let mut tree = DependencyTree::new_root(root, output_name);

    // Identity hashes of the ancestors of the node being visited
    let mut path: Vec<(String, NodeId)> = Vec::new();
    let mut stack = vec![tree.root()];

    while let Some(id) = stack.pop() {
        match tree.node(id).parent {
            None => path.clear(),
            Some(parent) => {
                let keep = path.iter().position(|(_, n)| *n == parent).map_or(0, |i| i + 1);
                path.truncate(keep);
            }
        }

        let loaded = load_node(home, &tree, id)?;
        check_cycle(&tree, &path, id, &loaded.identity_hash)?;
        path.push((loaded.identity_hash.clone(), id));

        let children = expand_dependencies(&tree, id, &loaded)?;
        tree.set_loaded(id, loaded)?;

        let first_child = tree.node(id).children.len();
        for (definition, output) in children {
            tree.push_child(id, definition, output);
        }
        let pushed = &tree.node(id).children[first_child..];
        stack.extend(pushed.iter().rev().copied());
    }

    tracing::debug!("Built dependency tree for {name}-{version} with {} nodes", tree.len());
    Ok(tree)
}

/// Load a node's package and compute everything rendering needs.
fn load_node(home: &Path, tree: &DependencyTree, id: NodeId) -> Result<LoadedNode> {
    let node = tree.node(id);
    let info = node.info();
    info.validate().map_err(KpmError::from)?;
    validate_output_name(&node.output_name).map_err(KpmError::from)?;

    if !local::contains(home, info) {
        let required_by = match node.parent {
            Some(parent) => tree.friendly_path(parent),
            None => ROOT_REQUESTER.to_string(),
        };
        return Err(KpmError::PackageMissing {
            full_name: info.full_name(),
            required_by,
        }
        .into());
    }

    tracing::debug!("Visiting {}", tree.friendly_path(id));
    let layout = local::load_installed(home, info)?;

    let mut env = TemplateEnv::new_root();
    env.load_helpers(&layout.dir.join(HELPERS_DIR))?;
    env.bind_package_functions();

    let input = compose_layout_input(&layout, &mut env, &node.definition.parameters)
        .with_context(|| format!("Failed to compose input for '{info}'"))?;

    let mut executables = Vec::with_capacity(layout.templates.len());
    for file in &layout.templates {
        let name = env.add_template_file(TEMPLATES_DIR, file)?;
        executables.push(Executable {
            name,
            file_name: file_name(file),
        });
    }
    for file in &layout.dependencies {
        env.add_template_file(DEPENDENCIES_DIR, file)?;
    }

    let identity_hash = identity_hash(info, &input)?;
    Ok(LoadedNode {
        package_dir: layout.dir,
        env,
        executables,
        input,
        identity_hash,
    })
}

fn check_cycle(
    tree: &DependencyTree,
    path: &[(String, NodeId)],
    id: NodeId,
    hash: &str,
) -> Result<()> {
    let Some(start) = path.iter().position(|(h, _)| h == hash) else {
        return Ok(());
    };

    let mut labels: Vec<String> =
        path[start..].iter().map(|(_, n)| tree.node(*n).info().full_name()).collect();
    labels.push(tree.node(id).info().full_name());
    let last = labels.len() - 1;
    labels[0] = format!("[{}]", labels[0]);
    labels[last] = format!("[{}]", labels[last]);

    Err(KpmError::CycleDetected {
        chain: labels.join(" -> "),
    }
    .into())
}

/// Render the node's dependency files into child definitions, in file order.
fn expand_dependencies(
    tree: &DependencyTree,
    id: NodeId,
    loaded: &LoadedNode,
) -> Result<Vec<(PackageDefinition, String)>> {
    let node = tree.node(id);
    let friendly = tree.friendly_path(id);
    let dependency_dir = loaded.package_dir.join(DEPENDENCIES_DIR);

    let mut names = HashSet::new();
    let mut children = Vec::new();
    for file in dependency_files(&loaded.env) {
        let location = format!("{friendly}/{file}");
        let bad = |reason: String| KpmError::BadDependency {
            path: location.clone(),
            reason,
        };

        let output = Path::new(&file)
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        if !names.insert(output.clone()) {
            return Err(bad(format!("output name '{output}' is used twice")).into());
        }
        if loaded.executables.iter().any(|e| e.file_name == output) {
            return Err(bad(format!(
                "output directory '{output}' clashes with template file 'templates/{output}'"
            ))
            .into());
        }

        let template = format!("{DEPENDENCIES_DIR}/{file}");
        let rendered = loaded.env.render_as(&template, &loaded.input, &location)?;
        if rendered.trim().is_empty() {
            return Err(bad("rendered to an empty document".to_string()).into());
        }
        let definition: PackageDefinition =
            from_yaml_strict(&rendered).map_err(|e| bad(e.to_string()))?;

        tracing::debug!(
            "{} requires {} as '{output}' ({})",
            node.info(),
            definition.package,
            dependency_dir.join(&file).display()
        );
        children.push((definition, output));
    }

    Ok(children)
}

/// Dependency file names registered in `env`, in file-name order.
fn dependency_files(env: &TemplateEnv) -> Vec<String> {
    let prefix = format!("{DEPENDENCIES_DIR}/");
    env.template_names().into_iter().filter_map(|n| n.strip_prefix(&prefix).map(str::to_string)).collect()
}

fn file_name(path: &Path) -> String {
    path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default()
}

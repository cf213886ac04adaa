//! Reading and validating a package directory.
//!
//! [`load_package`] is read-only. Checks run in a fixed order so the first
//! reported problem is stable:
//!
//! 1. the directory exists
//! 2. `package.yaml` exists, decodes strictly and carries a valid identity
//! 3. `interface.yaml` and `parameters.yaml` are regular files
//! 4. `templates/`, `helpers/` and `dependencies/` contain only allowed files

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use super::yaml::{from_yaml_strict, yaml_to_mapping};
use super::{PackageInfo, Parameters};
use crate::constants::{
    DEPENDENCIES_DIR, DEPENDENCY_EXTENSION, HELPER_EXTENSION, HELPERS_DIR, INTERFACE_FILE,
    PACKAGE_FILE, PARAMETERS_FILE, TEMPLATES_DIR,
};
use crate::core::KpmError;

/// A package directory that passed every layout check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageLayout {
    /// Identity from `package.yaml`
    pub info: PackageInfo,
    /// Package root directory
    pub dir: PathBuf,
    /// Files in `templates/`, sorted by file name
    pub templates: Vec<PathBuf>,
    /// `*.tpl` files in `helpers/`, sorted by file name
    pub helpers: Vec<PathBuf>,
    /// `*.yaml` files in `dependencies/`, sorted by file name
    pub dependencies: Vec<PathBuf>,
}

impl PackageLayout {
    pub fn manifest_path(&self) -> PathBuf {
        self.dir.join(PACKAGE_FILE)
    }

    pub fn interface_path(&self) -> PathBuf {
        self.dir.join(INTERFACE_FILE)
    }

    pub fn parameters_path(&self) -> PathBuf {
        self.dir.join(PARAMETERS_FILE)
    }

    /// Read the default parameters. An empty file is an empty mapping.
    pub fn read_parameters(&self) -> Result<Parameters> {
        let path = self.parameters_path();
        let text = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        yaml_to_mapping(&text).map_err(|e| {
            KpmError::BadLayout {
                path: path.display().to_string(),
                reason: format!("default parameters are not a YAML mapping: {e}"),
            }
            .into()
        })
    }

    /// Read the interface template source.
    pub fn read_interface(&self) -> Result<String> {
        let path = self.interface_path();
        fs::read_to_string(&path).with_context(|| format!("Failed to read {}", path.display()))
    }

    /// Every file of the package, relative to its root, sorted.
    pub fn all_files(&self) -> Vec<PathBuf> {
        let mut files = vec![
            PathBuf::from(PACKAGE_FILE),
            PathBuf::from(INTERFACE_FILE),
            PathBuf::from(PARAMETERS_FILE),
        ];
        for path in self.helpers.iter().chain(&self.templates).chain(&self.dependencies) {
            if let Ok(relative) = path.strip_prefix(&self.dir) {
                files.push(relative.to_path_buf());
            }
        }
        files.sort();
        files
    }
}

/// Read and validate the package rooted at `dir`.
pub fn load_package(dir: &Path) -> Result<PackageLayout> {
    if !dir.is_dir() {
        return Err(KpmError::PackageDirNotFound {
            path: dir.display().to_string(),
        }
        .into());
    }

    let info = read_manifest(&dir.join(PACKAGE_FILE))?;

    for required in [INTERFACE_FILE, PARAMETERS_FILE] {
        let path = dir.join(required);
        if !path.is_file() {
            return Err(bad_layout(&path, &format!("{required} is missing or not a file")));
        }
    }

    let templates = scan_flat_dir(&dir.join(TEMPLATES_DIR), None)?;
    let helpers = scan_flat_dir(&dir.join(HELPERS_DIR), Some(HELPER_EXTENSION))?;
    let dependencies = scan_flat_dir(&dir.join(DEPENDENCIES_DIR), Some(DEPENDENCY_EXTENSION))?;

    tracing::debug!(
        "Loaded package {} from {} ({} templates, {} helpers, {} dependencies)",
        info,
        dir.display(),
        templates.len(),
        helpers.len(),
        dependencies.len()
    );

    Ok(PackageLayout {
        info,
        dir: dir.to_path_buf(),
        templates,
        helpers,
        dependencies,
    })
}

/// Read `package.yaml` strictly and validate the identity it declares.
pub fn read_manifest(path: &Path) -> Result<PackageInfo> {
    let bad_manifest = |reason: String| -> anyhow::Error {
        KpmError::BadManifest {
            path: path.display().to_string(),
            reason,
        }
        .into()
    };

    if !path.is_file() {
        return Err(bad_manifest("file is missing".to_string()));
    }
    let text = fs::read_to_string(path).map_err(|e| bad_manifest(e.to_string()))?;
    let info: PackageInfo = from_yaml_strict(&text).map_err(|e| bad_manifest(e.to_string()))?;
    info.validate().map_err(|e| bad_manifest(e.to_string()))?;
    Ok(info)
}

/// List the files of an optional flat directory, sorted by file name.
///
/// A missing directory yields no files. Subdirectories, and files without the
/// required extension when one is given, are layout errors.
fn scan_flat_dir(dir: &Path, extension: Option<&str>) -> Result<Vec<PathBuf>> {
    if !dir.exists() {
        return Ok(Vec::new());
    }
    if !dir.is_dir() {
        return Err(bad_layout(dir, "expected a directory"));
    }

    let mut files = Vec::new();
    let entries =
        fs::read_dir(dir).with_context(|| format!("Failed to read directory {}", dir.display()))?;
    for entry in entries {
        let path = entry?.path();
        if path.is_dir() {
            return Err(bad_layout(&path, "subdirectories are not allowed here"));
        }
        if let Some(extension) = extension {
            if path.extension().and_then(|e| e.to_str()) != Some(extension) {
                return Err(bad_layout(
                    &path,
                    &format!("only *.{extension} files are allowed here"),
                ));
            }
        }
        files.push(path);
    }

    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(files)
}

fn bad_layout(path: &Path, reason: &str) -> anyhow::Error {
    KpmError::BadLayout {
        path: path.display().to_string(),
        reason: reason.to_string(),
    }
    .into()
}

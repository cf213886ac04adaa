//! The local repository under `<home>/packages/`.
//!
//! Packages live at `<home>/packages/<namespace>/.../<tail>-<version>/`. A
//! directory holding a `package.yaml` is a package; any other directory whose
//! basename is a valid namespace segment is descended into. A package whose
//! location disagrees with the identity in its `package.yaml` is reported as
//! corrupted and skipped.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tempfile::TempDir;

use crate::constants::{PACKAGE_FILE, PACKAGES_DIR};
use crate::core::KpmError;
use crate::package::loader::read_manifest;
use crate::package::validation::{
    compare_versions, validate_namespace_segment, validate_package_name,
    validate_package_version,
};
use crate::package::{PackageInfo, PackageLayout, load_package};
use crate::utils::fs::{copy_dir, ensure_dir, prune_empty_parents, remove_dir_all};

/// Root of the local repository.
pub fn packages_dir(home: &Path) -> PathBuf {
    home.join(PACKAGES_DIR)
}

/// Directory where `info` is (or would be) installed.
pub fn package_dir(home: &Path, info: &PackageInfo) -> PathBuf {
    packages_dir(home).join(info.full_name())
}

/// Every installed package, sorted by full name.
pub fn list_packages(home: &Path) -> Result<Vec<PackageInfo>> {
    let root = packages_dir(home);
    let mut found = Vec::new();
    if !root.is_dir() {
        return Ok(found);
    }

    let mut stack = vec![root.clone()];
    while let Some(dir) = stack.pop() {
        let entries = fs::read_dir(&dir)
            .with_context(|| format!("Failed to read directory {}", dir.display()))?;
        for entry in entries {
            let entry = entry?;
            let path = entry.path();
            let file_type = entry.file_type()?;
            if file_type.is_symlink() {
                tracing::warn!("Skipping {}: symbolic links are not followed", path.display());
                continue;
            }
            if !file_type.is_dir() {
                continue;
            }

            if path.join(PACKAGE_FILE).is_file() {
                if let Some(info) = check_package_entry(&root, &path) {
                    found.push(info);
                }
                continue;
            }

            let basename = path.file_name().and_then(|n| n.to_str()).unwrap_or_default();
            if validate_namespace_segment(basename).is_ok() {
                stack.push(path);
            } else {
                tracing::warn!(
                    "Skipping {}: not a package and not a valid namespace",
                    path.display()
                );
            }
        }
    }

    found.sort_by_key(PackageInfo::full_name);
    Ok(found)
}

/// Validate a package directory against its location in the repository.
fn check_package_entry(root: &Path, dir: &Path) -> Option<PackageInfo> {
    let info = match read_manifest(&dir.join(PACKAGE_FILE)) {
        Ok(info) => info,
        Err(e) => {
            tracing::warn!("Skipping corrupted package at {}: {e}", dir.display());
            return None;
        }
    };

    let relative = dir.strip_prefix(root).ok().map(|p| {
        p.components().map(|c| c.as_os_str().to_string_lossy()).collect::<Vec<_>>().join("/")
    });
    if relative.as_deref() != Some(info.full_name().as_str()) {
        tracing::warn!(
            "Skipping corrupted package at {}: package.yaml declares {}",
            dir.display(),
            info
        );
        return None;
    }

    Some(info)
}

/// Full names of every installed package, sorted.
pub fn list_all_full_names(home: &Path) -> Result<Vec<String>> {
    Ok(list_packages(home)?.iter().map(PackageInfo::full_name).collect())
}

/// Installed versions grouped by package name, each list in ascending order.
pub fn versions_by_name(home: &Path) -> Result<BTreeMap<String, Vec<String>>> {
    let mut versions: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for info in list_packages(home)? {
        versions.entry(info.name).or_default().push(info.version);
    }
    for list in versions.values_mut() {
        list.sort_by(|a, b| compare_versions(a, b));
    }
    Ok(versions)
}

/// Highest installed version of `name`.
pub fn highest_version(home: &Path, name: &str) -> Result<String> {
    validate_package_name(name).map_err(KpmError::from)?;
    versions_by_name(home)?
        .remove(name)
        .and_then(|mut versions| versions.pop())
        .ok_or_else(|| {
            KpmError::VersionNotFound {
                name: name.to_string(),
            }
            .into()
        })
}

/// Turn a command line `name [version]` into a validated identity.
///
/// An omitted version resolves to the highest installed one.
pub fn resolve_version(home: &Path, name: &str, version: Option<&str>) -> Result<PackageInfo> {
    validate_package_name(name).map_err(KpmError::from)?;
    let version = match version {
        Some(version) => {
            validate_package_version(version).map_err(KpmError::from)?;
            version.to_string()
        }
        None => highest_version(home, name)?,
    };
    Ok(PackageInfo::new(name, version))
}

/// Whether `info` is installed with a consistent `package.yaml`.
pub fn contains(home: &Path, info: &PackageInfo) -> bool {
    let dir = package_dir(home, info);
    dir.join(PACKAGE_FILE).is_file()
        && check_package_entry(&packages_dir(home), &dir).as_ref() == Some(info)
}

/// Load an installed package, failing with `PackageNotFound` when it is absent.
pub fn load_installed(home: &Path, info: &PackageInfo) -> Result<PackageLayout> {
    if !contains(home, info) {
        return Err(KpmError::PackageNotFound {
            name: info.name.clone(),
            version: info.version.clone(),
        }
        .into());
    }
    load_package(&package_dir(home, info))
        .with_context(|| format!("Failed to load package '{info}'"))
}

/// Copy a validated package directory into the repository, replacing any
/// installed copy of the same version.
///
/// The source is staged in a temporary directory before the installed copy
/// is removed, so `source` may lie inside the repository. Installing a
/// package from its own installed directory does nothing.
pub fn install_package(home: &Path, source: &Path) -> Result<PackageInfo> {
    let layout = load_package(source)?;
    let target = package_dir(home, &layout.info);

    if same_dir(source, &target) {
        tracing::debug!("{} is already installed from {}", layout.info, source.display());
        return Ok(layout.info);
    }

    let staging = TempDir::new().context("Failed to create staging directory")?;
    copy_dir(source, staging.path())
        .with_context(|| format!("Failed to stage package '{}'", layout.info))?;

    remove_dir_all(&target)?;
    ensure_dir(&target)?;
    copy_dir(staging.path(), &target)
        .with_context(|| format!("Failed to install package '{}'", layout.info))?;

    tracing::debug!("Installed {} into {}", layout.info, target.display());
    Ok(layout.info)
}

fn same_dir(a: &Path, b: &Path) -> bool {
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

/// Delete an installed package and any namespace directories left empty.
pub fn remove_package(home: &Path, info: &PackageInfo) -> Result<()> {
    if !contains(home, info) {
        return Err(KpmError::PackageNotFound {
            name: info.name.clone(),
            version: info.version.clone(),
        }
        .into());
    }

    let root = packages_dir(home);
    let dir = package_dir(home, info);
    remove_dir_all(&dir)?;
    if let Some(parent) = dir.parent() {
        prune_empty_parents(parent, &root)?;
    }

    tracing::debug!("Removed {} from {}", info, root.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{PackageFixture, TestHome};

    #[test]
    fn test_empty_home() {
        let home = TestHome::new().unwrap();
        assert!(list_all_full_names(&home.path()).unwrap().is_empty());
        assert!(versions_by_name(&home.path()).unwrap().is_empty());
    }

    #[test]
    fn test_enumeration_is_sorted() {
        let home = TestHome::new().unwrap();
        home.install(&PackageFixture::new("zeta", "1.0.0")).unwrap();
        home.install(&PackageFixture::new("acme/hello", "0.0.1")).unwrap();
        home.install(&PackageFixture::new("acme/team/x", "2.0.0")).unwrap();
        home.install(&PackageFixture::new("alpha", "1.0.0")).unwrap();

        assert_eq!(
            list_all_full_names(&home.path()).unwrap(),
            vec!["acme/hello-0.0.1", "acme/team/x-2.0.0", "alpha-1.0.0", "zeta-1.0.0"]
        );
    }

    #[test]
    fn test_corrupted_entries_are_skipped() {
        let home = TestHome::new().unwrap();
        home.install(&PackageFixture::new("good", "1.0.0")).unwrap();

        // Location says bad-1.0.0, manifest says other-1.0.0
        let misplaced = packages_dir(&home.path()).join("bad-1.0.0");
        PackageFixture::new("other", "1.0.0").write_at(&misplaced).unwrap();

        // Unparseable manifest
        let broken = packages_dir(&home.path()).join("broken-1.0.0");
        fs::create_dir_all(&broken).unwrap();
        fs::write(broken.join(PACKAGE_FILE), "name: [").unwrap();

        assert_eq!(list_all_full_names(&home.path()).unwrap(), vec!["good-1.0.0"]);
        assert!(!contains(&home.path(), &PackageInfo::new("other", "1.0.0")));
    }

    #[test]
    fn test_highest_version_is_numeric() {
        let home = TestHome::new().unwrap();
        home.install(&PackageFixture::new("foo", "1.2.3")).unwrap();
        home.install(&PackageFixture::new("foo", "1.10.0")).unwrap();
        home.install(&PackageFixture::new("foo", "1.9.9")).unwrap();

        assert_eq!(highest_version(&home.path(), "foo").unwrap(), "1.10.0");
        assert_eq!(
            versions_by_name(&home.path()).unwrap()["foo"],
            vec!["1.2.3", "1.9.9", "1.10.0"]
        );
    }

    #[test]
    fn test_highest_version_missing() {
        let home = TestHome::new().unwrap();
        let err = highest_version(&home.path(), "foo").unwrap_err();
        assert_eq!(err.to_string(), "Package 'foo' not found in local repository");
    }

    #[test]
    fn test_resolve_version() {
        let home = TestHome::new().unwrap();
        home.install(&PackageFixture::new("foo", "1.0.0")).unwrap();

        assert_eq!(
            resolve_version(&home.path(), "foo", None).unwrap(),
            PackageInfo::new("foo", "1.0.0")
        );
        assert_eq!(
            resolve_version(&home.path(), "foo", Some("2.0.0")).unwrap(),
            PackageInfo::new("foo", "2.0.0")
        );
        assert!(resolve_version(&home.path(), "foo", Some("1.*")).is_err());
        assert!(resolve_version(&home.path(), "Foo", None).is_err());
    }

    #[test]
    fn test_install_and_remove() {
        let home = TestHome::new().unwrap();
        let info = home.install(&PackageFixture::new("acme/team/hello", "1.0.0")).unwrap();
        assert!(contains(&home.path(), &info));
        assert!(load_installed(&home.path(), &info).is_ok());

        remove_package(&home.path(), &info).unwrap();
        assert!(!contains(&home.path(), &info));
        assert!(!packages_dir(&home.path()).join("acme").exists());
        assert!(packages_dir(&home.path()).exists());

        let err = remove_package(&home.path(), &info).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<KpmError>(),
            Some(KpmError::PackageNotFound { .. })
        ));
    }

    #[test]
    fn test_install_from_installed_dir_keeps_package() {
        let home = TestHome::new().unwrap();
        let info = home.install(&PackageFixture::new("foo", "1.0.0")).unwrap();
        let installed = package_dir(&home.path(), &info);

        assert_eq!(install_package(&home.path(), &installed).unwrap(), info);
        assert!(contains(&home.path(), &info));
        assert!(load_installed(&home.path(), &info).is_ok());
    }

    #[test]
    fn test_reinstall_from_inside_repository() {
        let home = TestHome::new().unwrap();
        let info = home.install(&PackageFixture::new("acme/foo", "1.0.0")).unwrap();

        // A differently spelled path to the same directory
        let installed = packages_dir(&home.path()).join("acme/./foo-1.0.0");
        install_package(&home.path(), &installed).unwrap();
        assert!(contains(&home.path(), &info));

        // A misplaced copy inside the repository installs over the real entry
        let misplaced = packages_dir(&home.path()).join("stray-1.0.0");
        PackageFixture::new("acme/foo", "1.0.0").write_at(&misplaced).unwrap();
        install_package(&home.path(), &misplaced).unwrap();
        assert!(contains(&home.path(), &info));
        assert!(misplaced.join(PACKAGE_FILE).is_file());
    }

    #[cfg(unix)]
    #[test]
    fn test_symlinked_directories_are_not_followed() {
        let home = TestHome::new().unwrap();
        home.install(&PackageFixture::new("good", "1.0.0")).unwrap();

        let root = packages_dir(&home.path());
        fs::create_dir_all(root.join("loop")).unwrap();
        std::os::unix::fs::symlink(&root, root.join("loop/back")).unwrap();
        std::os::unix::fs::symlink(&root, root.join("again")).unwrap();

        assert_eq!(list_all_full_names(&home.path()).unwrap(), vec!["good-1.0.0"]);
    }
}

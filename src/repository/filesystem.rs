//! Repository backed by a directory laid out like a KPM home.
//!
//! Packages are stored at `<path>/packages/<name>-<version>/`, exactly as in
//! the local repository, so a KPM home can itself serve as a mirror.

use std::path::{Path, PathBuf};

use anyhow::Result;

use super::{RepoFuture, Repository, local, repo_error};
use crate::config::FilesystemConnection;
use crate::core::KpmError;
use crate::package::PackageInfo;

/// Type name used in `.kpm.yaml`.
pub const REPO_TYPE: &str = "filesystem";

pub struct FilesystemRepository {
    name: String,
    root: PathBuf,
}

impl FilesystemRepository {
    pub fn new(name: &str, connection: FilesystemConnection) -> Self {
        Self {
            name: name.to_string(),
            root: connection.path,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

/// Copy `info` from the repository at `from` into the one at `to`.
fn transfer(from: &Path, to: &Path, info: &PackageInfo) -> Result<()> {
    if !local::contains(from, info) {
        return Err(KpmError::PackageNotFound {
            name: info.name.clone(),
            version: info.version.clone(),
        }
        .into());
    }
    local::install_package(to, &local::package_dir(from, info))?;
    Ok(())
}

impl Repository for FilesystemRepository {
    fn name(&self) -> &str {
        &self.name
    }

    fn repo_type(&self) -> &str {
        REPO_TYPE
    }

    fn list_packages<'a>(&'a self, filter: Option<&'a str>) -> RepoFuture<'a, Vec<PackageInfo>> {
        let root = self.root.clone();
        let filter = filter.map(str::to_string);
        Box::pin(async move {
            let packages = tokio::task::spawn_blocking(move || local::list_packages(&root))
                .await?
                .map_err(|e| repo_error(&self.name, "list packages", e))?;
            Ok(packages
                .into_iter()
                .filter(|info| filter.as_deref().is_none_or(|f| info.full_name().contains(f)))
                .collect())
        })
    }

    fn versions<'a>(&'a self, name: &'a str) -> RepoFuture<'a, Vec<String>> {
        let root = self.root.clone();
        let name = name.to_string();
        Box::pin(async move {
            let mut versions = tokio::task::spawn_blocking(move || local::versions_by_name(&root))
                .await?
                .map_err(|e| repo_error(&self.name, "list versions", e))?;
            Ok(versions.remove(&name).unwrap_or_default())
        })
    }

    fn push<'a>(&'a self, home: &'a Path, info: &'a PackageInfo) -> RepoFuture<'a, ()> {
        let home = home.to_path_buf();
        let root = self.root.clone();
        let info = info.clone();
        Box::pin(async move {
            tracing::debug!("Pushing {} to {}", info, root.display());
            tokio::task::spawn_blocking(move || transfer(&home, &root, &info))
                .await?
                .map_err(|e| repo_error(&self.name, "push", e))
        })
    }

    fn pull<'a>(&'a self, home: &'a Path, info: &'a PackageInfo) -> RepoFuture<'a, ()> {
        let home = home.to_path_buf();
        let root = self.root.clone();
        let info = info.clone();
        Box::pin(async move {
            tracing::debug!("Pulling {} from {}", info, root.display());
            tokio::task::spawn_blocking(move || transfer(&root, &home, &info))
                .await?
                .map_err(|e| repo_error(&self.name, "pull", e))
        })
    }
}

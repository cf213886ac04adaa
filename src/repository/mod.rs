//! Package repositories.
//!
//! The [`local`] module is the on-disk repository every command works
//! against. Remote repositories implement [`Repository`] and are only used by
//! the `kpm repo` commands to copy packages in and out of the local one.
//!
//! # Repository types
//!
//! | Type | Connection | Storage |
//! |------|------------|---------|
//! | `filesystem` | `{path}` | a directory laid out like a KPM home |
//! | `docker` | `{registry, namespace?}` | one image per package version |
//!
//! A [`RepositoryCollection`] keeps the configured repositories in order.
//! [`RepositoryCollection::pull_first`] asks each in turn and moves on only
//! when a repository reports [`KpmError::PackageNotFound`]; any other failure
//! stops the search.

pub mod docker;
pub mod filesystem;
pub mod local;

use std::collections::BTreeSet;
use std::path::Path;

use anyhow::Result;
use futures::future::{BoxFuture, try_join_all};

use crate::config::RepositoryConfig;
use crate::core::KpmError;
use crate::package::PackageInfo;
use crate::package::validation::compare_versions;

pub use docker::DockerRepository;
pub use filesystem::FilesystemRepository;

/// Boxed future returned by [`Repository`] operations.
pub type RepoFuture<'a, T> = BoxFuture<'a, Result<T>>;

/// A place packages can be pushed to and pulled from.
pub trait Repository: Send + Sync {
    /// Configured name of this repository.
    fn name(&self) -> &str;

    /// Repository type, e.g. `filesystem` or `docker`.
    fn repo_type(&self) -> &str;

    /// Packages whose full name contains `filter`, or all when `None`.
    fn list_packages<'a>(&'a self, filter: Option<&'a str>) -> RepoFuture<'a, Vec<PackageInfo>>;

    /// Available versions of `name`, in no particular order.
    fn versions<'a>(&'a self, name: &'a str) -> RepoFuture<'a, Vec<String>>;

    /// Upload `info` from the local repository under `home`.
    fn push<'a>(&'a self, home: &'a Path, info: &'a PackageInfo) -> RepoFuture<'a, ()>;

    /// Download `info` into the local repository under `home`.
    ///
    /// Must fail with [`KpmError::PackageNotFound`] when this repository does
    /// not have the package.
    fn pull<'a>(&'a self, home: &'a Path, info: &'a PackageInfo) -> RepoFuture<'a, ()>;
}

/// Whether `error` reports a package missing from a repository.
pub fn is_package_not_found(error: &anyhow::Error) -> bool {
    error
        .chain()
        .any(|cause| matches!(cause.downcast_ref::<KpmError>(), Some(KpmError::PackageNotFound { .. })))
}

/// Wrap a failed repository operation, keeping `PackageNotFound` as is.
pub(crate) fn repo_error(repository: &str, operation: &str, error: anyhow::Error) -> anyhow::Error {
    if is_package_not_found(&error) {
        return error;
    }
    KpmError::RepoError {
        repository: repository.to_string(),
        operation: operation.to_string(),
        reason: format!("{error:#}"),
    }
    .into()
}

/// Ordered, uniquely named set of repositories.
#[derive(Default)]
pub struct RepositoryCollection {
    repositories: Vec<Box<dyn Repository>>,
}

impl RepositoryCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build repositories from configuration, keeping their order.
    pub fn from_config(configs: &[RepositoryConfig]) -> Result<Self> {
        let mut collection = Self::new();
        for config in configs {
            collection.add(create_repository(config)?)?;
        }
        Ok(collection)
    }

    /// Append a repository; names must be unique.
    pub fn add(&mut self, repository: Box<dyn Repository>) -> Result<()> {
        if self.repositories.iter().any(|r| r.name() == repository.name()) {
            return Err(KpmError::ConfigError {
                message: format!("Repository '{}' is configured more than once", repository.name()),
            }
            .into());
        }
        self.repositories.push(repository);
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.repositories.is_empty()
    }

    pub fn len(&self) -> usize {
        self.repositories.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &dyn Repository> {
        self.repositories.iter().map(|r| r.as_ref())
    }

    /// Look up a repository by name.
    pub fn get(&self, name: &str) -> Result<&dyn Repository> {
        self.iter().find(|r| r.name() == name).ok_or_else(|| {
            KpmError::UnknownRepository {
                name: name.to_string(),
            }
            .into()
        })
    }

    /// The named repository only, or all of them.
    pub fn select(&self, name: Option<&str>) -> Result<Vec<&dyn Repository>> {
        match name {
            Some(name) => Ok(vec![self.get(name)?]),
            None => Ok(self.iter().collect()),
        }
    }

    /// Pull `info` from the first repository that has it.
    ///
    /// Returns the name of the repository the package came from.
    pub async fn pull_first(&self, home: &Path, info: &PackageInfo) -> Result<String> {
        for repository in self.iter() {
            match repository.pull(home, info).await {
                Ok(()) => {
                    tracing::info!("Pulled {} from repository '{}'", info, repository.name());
                    return Ok(repository.name().to_string());
                }
                Err(e) if is_package_not_found(&e) => {
                    tracing::debug!("{} not found in repository '{}'", info, repository.name());
                }
                Err(e) => return Err(e),
            }
        }

        Err(KpmError::PackageNotFound {
            name: info.name.clone(),
            version: info.version.clone(),
        }
        .into())
    }

    /// Push `info` to the named repository.
    pub async fn push(&self, repository: &str, home: &Path, info: &PackageInfo) -> Result<()> {
        self.get(repository)?.push(home, info).await
    }

    /// Versions of `name` across all repositories, ascending and deduplicated.
    pub async fn versions(&self, name: &str) -> Result<Vec<String>> {
        let per_repository = try_join_all(self.iter().map(|r| r.versions(name))).await?;
        let all: BTreeSet<String> = per_repository.into_iter().flatten().collect();
        let mut versions: Vec<String> = all.into_iter().collect();
        versions.sort_by(|a, b| compare_versions(a, b));
        Ok(versions)
    }
}

/// Instantiate the repository described by `config`.
pub fn create_repository(config: &RepositoryConfig) -> Result<Box<dyn Repository>> {
    match config.repo_type.as_str() {
        filesystem::REPO_TYPE => {
            Ok(Box::new(FilesystemRepository::new(&config.name, config.filesystem_connection()?)))
        }
        docker::REPO_TYPE => {
            Ok(Box::new(DockerRepository::new(&config.name, config.docker_connection()?)))
        }
        other => Err(KpmError::ConfigError {
            message: format!(
                "Repository '{}' has unknown type '{other}' (expected '{}' or '{}')",
                config.name,
                filesystem::REPO_TYPE,
                docker::REPO_TYPE
            ),
        }
        .into()),
    }
}

//! Repository storing each package version as a container image.
//!
//! A package `acme/hello-1.0.0` in a repository with registry `registry.local`
//! and namespace `kpm` becomes the image `registry.local/kpm/acme/hello:1.0.0`.
//! Images are built `FROM scratch` with the package copied to
//! `/kpm/package`. Everything goes through the `docker` CLI.
//!
//! Listing reports the images known to the local docker daemon; KPM does not
//! talk to registry APIs directly.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use anyhow::{Context, Result};
use tempfile::TempDir;
use tokio::process::Command;
use tokio::time::timeout;

use super::{RepoFuture, Repository, local, repo_error};
use crate::config::DockerConnection;
use crate::constants::{DOCKER_COMMAND_TIMEOUT, DOCKER_PACKAGE_PATH};
use crate::core::KpmError;
use crate::package::PackageInfo;
use crate::package::validation::{validate_package_name, validate_package_version};
use crate::utils::fs::copy_dir;

/// Type name used in `.kpm.yaml`.
pub const REPO_TYPE: &str = "docker";

const IMAGE_NOT_FOUND_MARKERS: &[&str] = &[
    "manifest unknown",
    "not found",
    "does not exist",
    "repository does not exist",
    "pull access denied",
];

pub struct DockerRepository {
    name: String,
    connection: DockerConnection,
}

/// Output of a successful docker invocation.
struct DockerOutput {
    stdout: String,
}

/// Failure of a docker invocation.
#[derive(Debug)]
struct DockerFailure {
    args: Vec<String>,
    stderr: String,
}

impl std::fmt::Display for DockerFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "docker {} failed: {}", self.args.join(" "), self.stderr.trim())
    }
}

impl std::error::Error for DockerFailure {}

/// Run `docker <args>` and capture its output.
async fn docker(args: &[&str], duration: Duration) -> Result<DockerOutput> {
    let binary = which::which("docker").map_err(|e| anyhow::anyhow!("docker CLI not found: {e}"))?;
    let args: Vec<String> = args.iter().map(|a| (*a).to_string()).collect();
    tracing::debug!(target: "docker", "Executing command: docker {}", args.join(" "));

    let mut cmd = Command::new(binary);
    cmd.args(&args).stdout(Stdio::piped()).stderr(Stdio::piped()).kill_on_drop(true);

    let output = match timeout(duration, cmd.output()).await {
        Ok(result) => result.with_context(|| format!("Failed to execute docker {}", args.join(" ")))?,
        Err(_) => {
            tracing::warn!(
                target: "docker",
                "Command timed out after {} seconds: docker {}",
                duration.as_secs(),
                args.join(" ")
            );
            return Err(DockerFailure {
                args,
                stderr: format!("timed out after {} seconds", duration.as_secs()),
            }
            .into());
        }
    };

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();
        tracing::debug!(target: "docker", "Command failed with exit code {:?}: {}", output.status.code(), stderr.trim());
        return Err(DockerFailure {
            args,
            stderr,
        }
        .into());
    }

    Ok(DockerOutput {
        stdout: String::from_utf8_lossy(&output.stdout).to_string(),
    })
}

/// Whether a failed pull means the image simply does not exist.
fn is_missing_image(error: &anyhow::Error) -> bool {
    error.downcast_ref::<DockerFailure>().is_some_and(|failure| {
        let stderr = failure.stderr.to_lowercase();
        IMAGE_NOT_FOUND_MARKERS.iter().any(|marker| stderr.contains(marker))
    })
}

impl DockerRepository {
    pub fn new(name: &str, connection: DockerConnection) -> Self {
        Self {
            name: name.to_string(),
            connection,
        }
    }

    /// Image repository prefix, `<registry>[/<namespace>]`.
    pub fn image_prefix(&self) -> String {
        let registry = self.connection.registry.trim_end_matches('/');
        match self.connection.namespace.as_deref().map(|ns| ns.trim_matches('/')) {
            Some(namespace) if !namespace.is_empty() => format!("{registry}/{namespace}"),
            _ => registry.to_string(),
        }
    }

    /// Image reference for a package version.
    pub fn image_ref(&self, info: &PackageInfo) -> String {
        format!("{}/{}:{}", self.image_prefix(), info.name, info.version)
    }

    /// Parse one `<repository> <tag>` line of `docker image ls` output.
    pub fn parse_image_line(&self, line: &str) -> Option<PackageInfo> {
        let (repository, tag) = line.trim().split_once(' ')?;
        let prefix = format!("{}/", self.image_prefix());
        let name = repository.strip_prefix(&prefix)?;
        let tag = tag.trim();
        if validate_package_name(name).is_err() || validate_package_version(tag).is_err() {
            return None;
        }
        Some(PackageInfo::new(name, tag))
    }

    async fn local_images(&self) -> Result<Vec<PackageInfo>> {
        let output = docker(
            &["image", "ls", "--format", "{{.Repository}} {{.Tag}}"],
            DOCKER_COMMAND_TIMEOUT,
        )
        .await?;
        let mut packages: Vec<PackageInfo> =
            output.stdout.lines().filter_map(|line| self.parse_image_line(line)).collect();
        packages.sort_by_key(PackageInfo::full_name);
        packages.dedup();
        Ok(packages)
    }

    async fn push_image(&self, home: &Path, info: &PackageInfo) -> Result<()> {
        if !local::contains(home, info) {
            return Err(KpmError::VersionNotFound {
                name: info.full_name(),
            }
            .into());
        }

        let context_dir = TempDir::new().context("Failed to create docker build context")?;
        copy_dir(&local::package_dir(home, info), &context_dir.path().join("package"))?;
        let dockerfile = format!(
            "FROM scratch\nCOPY package/ {DOCKER_PACKAGE_PATH}/\nLABEL io.kpm.name=\"{}\" io.kpm.version=\"{}\"\n",
            info.name, info.version
        );
        tokio::fs::write(context_dir.path().join("Dockerfile"), dockerfile).await?;

        let image = self.image_ref(info);
        let context_path = context_dir.path().display().to_string();
        docker(&["build", "-t", &image, &context_path], DOCKER_COMMAND_TIMEOUT).await?;
        docker(&["push", &image], DOCKER_COMMAND_TIMEOUT).await?;
        tracing::info!("Pushed {} as {}", info, image);
        Ok(())
    }

    async fn pull_image(&self, home: &Path, info: &PackageInfo) -> Result<()> {
        let image = self.image_ref(info);
        if let Err(e) = docker(&["pull", &image], DOCKER_COMMAND_TIMEOUT).await {
            if is_missing_image(&e) {
                return Err(KpmError::PackageNotFound {
                    name: info.name.clone(),
                    version: info.version.clone(),
                }
                .into());
            }
            return Err(e);
        }

        let created = docker(&["create", &image, "kpm"], DOCKER_COMMAND_TIMEOUT).await?;
        let container = created.stdout.trim().to_string();

        let staging = TempDir::new().context("Failed to create staging directory")?;
        let target: PathBuf = staging.path().join("package");
        let source = format!("{container}:{DOCKER_PACKAGE_PATH}/.");
        let copied =
            docker(&["cp", &source, &target.display().to_string()], DOCKER_COMMAND_TIMEOUT).await;
        let removed = docker(&["rm", &container], DOCKER_COMMAND_TIMEOUT).await;
        copied?;
        if let Err(e) = removed {
            tracing::warn!("Failed to remove container {}: {e}", container);
        }

        let installed = local::install_package(home, &target)?;
        if &installed != info {
            return Err(KpmError::BadManifest {
                path: format!("{image}:{DOCKER_PACKAGE_PATH}"),
                reason: format!("image contains {installed}, expected {info}"),
            }
            .into());
        }
        Ok(())
    }
}

impl Repository for DockerRepository {
    fn name(&self) -> &str {
        &self.name
    }

    fn repo_type(&self) -> &str {
        REPO_TYPE
    }

    fn list_packages<'a>(&'a self, filter: Option<&'a str>) -> RepoFuture<'a, Vec<PackageInfo>> {
        Box::pin(async move {
            let packages =
                self.local_images().await.map_err(|e| repo_error(&self.name, "list packages", e))?;
            Ok(packages
                .into_iter()
                .filter(|info| filter.is_none_or(|f| info.full_name().contains(f)))
                .collect())
        })
    }

    fn versions<'a>(&'a self, name: &'a str) -> RepoFuture<'a, Vec<String>> {
        Box::pin(async move {
            let packages =
                self.local_images().await.map_err(|e| repo_error(&self.name, "list versions", e))?;
            Ok(packages.into_iter().filter(|info| info.name == name).map(|info| info.version).collect())
        })
    }

    fn push<'a>(&'a self, home: &'a Path, info: &'a PackageInfo) -> RepoFuture<'a, ()> {
        Box::pin(async move {
            self.push_image(home, info).await.map_err(|e| repo_error(&self.name, "push", e))
        })
    }

    fn pull<'a>(&'a self, home: &'a Path, info: &'a PackageInfo) -> RepoFuture<'a, ()> {
        Box::pin(async move {
            self.pull_image(home, info).await.map_err(|e| repo_error(&self.name, "pull", e))
        })
    }
}

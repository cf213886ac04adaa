//! Configuration for KPM.
//!
//! # Sources
//!
//! Settings are layered, later sources winning key by key:
//!
//! 1. `<home>/.kpm.yaml`
//! 2. `./.kpm.yaml` in the current working directory
//! 3. `KPM_LOGLEVEL` and `KPM_REPOSITORIES` environment variables
//!
//! The KPM home is `$KPM_HOME` when set, otherwise `~/.kpm`.
//!
//! # Format
//!
//! ```yaml
//! logLevel: info            # none | error | warning | info | verbose | debug
//! repositories:
//!   - name: shared
//!     type: filesystem
//!     connection:
//!       path: /mnt/shared/kpm
//!   - name: images
//!     type: docker
//!     connection:
//!       registry: registry.example.com
//!       namespace: kpm
//! ```
//!
//! Every record is decoded strictly: unknown keys are configuration errors.

pub mod parser;

pub use parser::parse_config;

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::constants::{CONFIG_FILE, DEFAULT_HOME_DIR, ENV_HOME, ENV_LOG_LEVEL, ENV_REPOSITORIES};
use crate::core::KpmError;

/// Log verbosity as written in configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    None,
    Error,
    #[default]
    Warning,
    Info,
    Verbose,
    Debug,
}

impl LogLevel {
    /// `tracing` filter directive for this level.
    pub const fn directive(self) -> &'static str {
        match self {
            Self::None => "off",
            Self::Error => "error",
            Self::Warning => "warn",
            Self::Info => "info",
            Self::Verbose => "debug",
            Self::Debug => "trace",
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Error => "error",
            Self::Warning => "warning",
            Self::Info => "info",
            Self::Verbose => "verbose",
            Self::Debug => "debug",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogLevel {
    type Err = KpmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "none" => Ok(Self::None),
            "error" => Ok(Self::Error),
            "warning" => Ok(Self::Warning),
            "info" => Ok(Self::Info),
            "verbose" => Ok(Self::Verbose),
            "debug" => Ok(Self::Debug),
            other => Err(KpmError::ConfigError {
                message: format!(
                    "Unknown log level '{other}' (expected none, error, warning, info, verbose or debug)"
                ),
            }),
        }
    }
}

/// One configured repository.
///
/// `connection` is kept as raw YAML until the repository is created, since
/// its shape depends on `type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RepositoryConfig {
    pub name: String,
    #[serde(rename = "type")]
    pub repo_type: String,
    #[serde(default)]
    pub connection: serde_yaml::Value,
}

/// Connection of a `filesystem` repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FilesystemConnection {
    /// Directory laid out like a KPM home; `~` is expanded
    pub path: PathBuf,
}

/// Connection of a `docker` repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DockerConnection {
    /// Registry host, optionally with a port
    pub registry: String,
    /// Path prepended to every package image name
    #[serde(default)]
    pub namespace: Option<String>,
}

impl RepositoryConfig {
    fn connection_error(&self, e: impl fmt::Display) -> KpmError {
        KpmError::ConfigError {
            message: format!(
                "Invalid connection for {} repository '{}': {e}",
                self.repo_type, self.name
            ),
        }
    }

    pub fn filesystem_connection(&self) -> Result<FilesystemConnection> {
        let connection: FilesystemConnection = serde_yaml::from_value(self.connection.clone())
            .map_err(|e| self.connection_error(e))?;
        let expanded = shellexpand::tilde(&connection.path.to_string_lossy()).into_owned();
        Ok(FilesystemConnection {
            path: PathBuf::from(expanded),
        })
    }

    pub fn docker_connection(&self) -> Result<DockerConnection> {
        let connection: DockerConnection = serde_yaml::from_value(self.connection.clone())
            .map_err(|e| self.connection_error(e))?;
        if connection.registry.trim().is_empty() {
            return Err(self.connection_error("registry is empty").into());
        }
        Ok(connection)
    }
}

/// Contents of a `.kpm.yaml` file, or the merged result of all layers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct KpmConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_level: Option<LogLevel>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repositories: Option<Vec<RepositoryConfig>>,
}

/// `KPM_*` environment variables relevant to configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnvOverrides {
    pub home: Option<String>,
    pub log_level: Option<String>,
    pub repositories: Option<String>,
}

impl EnvOverrides {
    /// Read the overrides from the process environment. Empty values are ignored.
    pub fn from_env() -> Self {
        let read = |key: &str| std::env::var(key).ok().filter(|v| !v.trim().is_empty());
        Self {
            home: read(ENV_HOME),
            log_level: read(ENV_LOG_LEVEL),
            repositories: read(ENV_REPOSITORIES),
        }
    }

    /// The configuration layer these variables describe.
    pub fn to_config(&self) -> Result<KpmConfig> {
        let log_level = self.log_level.as_deref().map(LogLevel::from_str).transpose()?;
        let repositories = self
            .repositories
            .as_deref()
            .map(|text| {
                serde_yaml::from_str::<Vec<RepositoryConfig>>(text).map_err(|e| {
                    KpmError::ConfigError {
                        message: format!("Invalid {ENV_REPOSITORIES}: {e}"),
                    }
                })
            })
            .transpose()?;
        Ok(KpmConfig {
            log_level,
            repositories,
        })
    }
}

/// Resolve the KPM home directory.
pub fn kpm_home(env: &EnvOverrides) -> Result<PathBuf> {
    if let Some(home) = &env.home {
        return Ok(PathBuf::from(shellexpand::tilde(home).into_owned()));
    }
    let user_home = dirs::home_dir().ok_or_else(|| KpmError::ConfigError {
        message: format!("Unable to determine home directory; set {ENV_HOME}"),
    })?;
    Ok(user_home.join(DEFAULT_HOME_DIR))
}

impl KpmConfig {
    /// Read one config file; a missing file is `None`.
    pub fn load_file(path: &Path) -> Result<Option<Self>> {
        if !path.is_file() {
            return Ok(None);
        }
        tracing::debug!("Loading configuration from {}", path.display());
        parse_config(path).map(Some)
    }

    /// Layer home file, working-directory file and environment.
    pub fn load(home: &Path, cwd: &Path, env: &EnvOverrides) -> Result<Self> {
        let mut config = Self::default();

        let home_file = home.join(CONFIG_FILE);
        let cwd_file = cwd.join(CONFIG_FILE);
        if let Some(layer) = Self::load_file(&home_file)? {
            config = config.merge(layer);
        }
        if cwd_file != home_file {
            if let Some(layer) = Self::load_file(&cwd_file)? {
                config = config.merge(layer);
            }
        }

        Ok(config.merge(env.to_config()?))
    }

    /// Keys present in `other` replace those in `self`.
    #[must_use]
    pub fn merge(self, other: Self) -> Self {
        Self {
            log_level: other.log_level.or(self.log_level),
            repositories: other.repositories.or(self.repositories),
        }
    }

    pub fn log_level(&self) -> LogLevel {
        self.log_level.unwrap_or_default()
    }

    pub fn repositories(&self) -> &[RepositoryConfig] {
        self.repositories.as_deref().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_log_level_directives() {
        assert_eq!(LogLevel::None.directive(), "off");
        assert_eq!(LogLevel::Warning.directive(), "warn");
        assert_eq!(LogLevel::Verbose.directive(), "debug");
        assert_eq!(LogLevel::Debug.directive(), "trace");
        assert_eq!("Verbose".parse::<LogLevel>().unwrap(), LogLevel::Verbose);
        assert!("loud".parse::<LogLevel>().is_err());
    }

    #[test]
    fn test_strict_config() {
        let config: KpmConfig = serde_yaml::from_str("logLevel: debug\n").unwrap();
        assert_eq!(config.log_level(), LogLevel::Debug);

        assert!(serde_yaml::from_str::<KpmConfig>("loglevel: debug\n").is_err());
        assert!(serde_yaml::from_str::<KpmConfig>("logLevel: loud\n").is_err());
        assert!(
            serde_yaml::from_str::<KpmConfig>(
                "repositories:\n  - name: a\n    type: filesystem\n    url: x\n"
            )
            .is_err()
        );
    }

    #[test]
    fn test_layering() {
        let home = TempDir::new().unwrap();
        let cwd = TempDir::new().unwrap();
        fs::write(
            home.path().join(CONFIG_FILE),
            "logLevel: error\nrepositories:\n  - name: shared\n    type: filesystem\n    connection: {path: /srv/kpm}\n",
        )
        .unwrap();
        fs::write(cwd.path().join(CONFIG_FILE), "logLevel: info\n").unwrap();

        let config = KpmConfig::load(home.path(), cwd.path(), &EnvOverrides::default()).unwrap();
        assert_eq!(config.log_level(), LogLevel::Info);
        assert_eq!(config.repositories().len(), 1);

        let env = EnvOverrides {
            log_level: Some("debug".to_string()),
            repositories: Some("[]".to_string()),
            ..EnvOverrides::default()
        };
        let config = KpmConfig::load(home.path(), cwd.path(), &env).unwrap();
        assert_eq!(config.log_level(), LogLevel::Debug);
        assert!(config.repositories().is_empty());
    }

    #[test]
    fn test_invalid_config_file_is_reported() {
        let home = TempDir::new().unwrap();
        fs::write(home.path().join(CONFIG_FILE), "colour: red\n").unwrap();

        let err = KpmConfig::load(home.path(), home.path(), &EnvOverrides::default()).unwrap_err();
        assert!(matches!(err.downcast_ref::<KpmError>(), Some(KpmError::ConfigError { .. })));
    }

    #[test]
    fn test_connections() {
        let fs_repo: RepositoryConfig = serde_yaml::from_str(
            "name: shared\ntype: filesystem\nconnection:\n  path: /srv/kpm\n",
        )
        .unwrap();
        assert_eq!(fs_repo.filesystem_connection().unwrap().path, PathBuf::from("/srv/kpm"));
        assert!(fs_repo.docker_connection().is_err());

        let docker_repo: RepositoryConfig = serde_yaml::from_str(
            "name: images\ntype: docker\nconnection:\n  registry: registry.local\n",
        )
        .unwrap();
        let connection = docker_repo.docker_connection().unwrap();
        assert_eq!(connection.registry, "registry.local");
        assert_eq!(connection.namespace, None);
    }

    #[test]
    fn test_kpm_home_override() {
        let env = EnvOverrides {
            home: Some("/opt/kpm".to_string()),
            ..EnvOverrides::default()
        };
        assert_eq!(kpm_home(&env).unwrap(), PathBuf::from("/opt/kpm"));
    }

    #[test]
    #[serial]
    fn test_env_overrides_from_process_env() {
        // SAFETY: serialized with other env-reading tests
        unsafe {
            std::env::set_var(ENV_LOG_LEVEL, "verbose");
        }
        let env = EnvOverrides::from_env();
        unsafe {
            std::env::remove_var(ENV_LOG_LEVEL);
        }

        assert_eq!(env.log_level.as_deref(), Some("verbose"));
        assert_eq!(env.to_config().unwrap().log_level, Some(LogLevel::Verbose));
    }
}

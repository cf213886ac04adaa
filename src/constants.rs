//! Well-known names used across the KPM codebase.
//!
//! File and directory names of the package format, the local repository
//! layout and the environment variables recognized by the CLI are defined
//! here so they can be referenced from one place.

use std::time::Duration;

/// Package manifest file, a strict `{name, version}` record.
pub const PACKAGE_FILE: &str = "package.yaml";

/// Interface template producing the `values` mapping.
pub const INTERFACE_FILE: &str = "interface.yaml";

/// Default parameters of a package.
pub const PARAMETERS_FILE: &str = "parameters.yaml";

/// Output templates directory.
pub const TEMPLATES_DIR: &str = "templates";

/// Helper templates directory (`*.tpl` files only).
pub const HELPERS_DIR: &str = "helpers";

/// Dependency definition templates directory (`*.yaml` files only).
pub const DEPENDENCIES_DIR: &str = "dependencies";

/// Extension of helper templates.
pub const HELPER_EXTENSION: &str = "tpl";

/// Extension of dependency definition templates.
pub const DEPENDENCY_EXTENSION: &str = "yaml";

/// Sub-directory of the KPM home holding the local repository.
pub const PACKAGES_DIR: &str = "packages";

/// Name of the configuration file looked up in the home and working directory.
pub const CONFIG_FILE: &str = ".kpm.yaml";

/// Default KPM home directory name, relative to the user's home.
pub const DEFAULT_HOME_DIR: &str = ".kpm";

/// Environment variable overriding the KPM home directory.
pub const ENV_HOME: &str = "KPM_HOME";

/// Environment variable overriding `logLevel`.
pub const ENV_LOG_LEVEL: &str = "KPM_LOGLEVEL";

/// Environment variable overriding `repositories` (a YAML list).
pub const ENV_REPOSITORIES: &str = "KPM_REPOSITORIES";

/// Default package name for `kpm new-package`.
pub const DEFAULT_NEW_PACKAGE_NAME: &str = "hello-kpm";

/// Maximum length of an output name.
pub const MAX_OUTPUT_NAME_LEN: usize = 64;

/// Timeout for docker commands issued by the docker repository (5 minutes).
pub const DOCKER_COMMAND_TIMEOUT: Duration = Duration::from_secs(300);

/// Path inside a package image where the package contents live.
pub const DOCKER_PACKAGE_PATH: &str = "/kpm/package";

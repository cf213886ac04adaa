//! Error handling for KPM
//!
//! This module provides the error types and user-facing error reporting for the
//! KPM template package manager. The error system follows two rules:
//! 1. **Strongly-typed errors** so callers can match on the failure kind
//! 2. **User-friendly messages** with a detail line and an actionable suggestion
//!
//! # Architecture
//!
//! - [`KpmError`] - Enumerated error kinds for every failure mode of KPM
//! - [`ErrorContext`] - Wrapper adding details and suggestions for CLI display
//!
//! Engine code propagates `anyhow::Error` values whose root cause is a
//! [`KpmError`], adding path or package context with `anyhow::Context` on the
//! way up. The CLI calls [`user_friendly_error`] exactly once, at the command
//! boundary.
//!
//! # Examples
//!
//! ```rust,no_run
//! use kpm_cli::core::{KpmError, user_friendly_error};
//!
//! let error = KpmError::VersionNotFound {
//!     name: "acme/hello".to_string(),
//! };
//! let ctx = user_friendly_error(anyhow::Error::from(error));
//! ctx.display(); // error, details and suggestion on stderr
//! ```

use colored::Colorize;
use std::fmt;
use thiserror::Error;

use crate::package::validation::ValidationError;

/// The main error type for KPM operations.
///
/// Each variant corresponds to one error kind of the package engine or of the
/// commands composed on top of it. Variants carry the offending entity (a path,
/// a full package name, or a friendly dependency path) so a single line is
/// enough to locate the problem.
#[derive(Error, Debug)]
pub enum KpmError {
    /// A package name, version, output name or namespace segment failed a
    /// lexical rule.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// A package is not available in a repository.
    ///
    /// Repositories return this from `pull` on a miss; the repository
    /// collection treats it as "try the next repository".
    #[error("Package '{name}-{version}' not found")]
    PackageNotFound {
        /// Package name
        name: String,
        /// Package version
        version: String,
    },

    /// No version of the named package exists in the local repository.
    #[error("Package '{name}' not found in local repository")]
    VersionNotFound {
        /// Package name that has no installed versions
        name: String,
    },

    /// A package required while building a dependency tree is not installed.
    #[error("Package '{full_name}' not found in local repository (required by {required_by})")]
    PackageMissing {
        /// Full name (`name-version`) of the missing package
        full_name: String,
        /// Friendly path of the node that referenced it
        required_by: String,
    },

    /// A package directory passed on the command line does not exist.
    #[error("Package directory not found: {path}")]
    PackageDirNotFound {
        /// The missing directory
        path: String,
    },

    /// A package directory is missing a required file or contains a
    /// disallowed entry.
    #[error("Invalid package layout at {path}: {reason}")]
    BadLayout {
        /// Offending path
        path: String,
        /// What is wrong with it
        reason: String,
    },

    /// `package.yaml` is absent, unparseable or carries invalid identity.
    #[error("Invalid package manifest {path}: {reason}")]
    BadManifest {
        /// Path to the manifest
        path: String,
        /// Parse or validation failure
        reason: String,
    },

    /// A dependency template rendered to something that is not a valid
    /// package definition.
    #[error("Invalid dependency definition {path}: {reason}")]
    BadDependency {
        /// Friendly path of the dependency file
        path: String,
        /// Parse or validation failure
        reason: String,
    },

    /// Template parsing or evaluation failed.
    #[error("Template error in {location}: {message}")]
    TemplateError {
        /// Template name, prefixed with the friendly dependency path when rendering
        location: String,
        /// Message extracted from the template engine
        message: String,
    },

    /// The dependency graph contains an identity cycle.
    ///
    /// The chain lists every node from the first occurrence to the repeat.
    #[error("Dependency cycle detected: {chain}")]
    CycleDetected {
        /// Rendered chain, e.g. `[a-1.0.0] -> b-1.0.0 -> [a-1.0.0]`
        chain: String,
    },

    /// A repository operation failed for a reason other than a missing package.
    #[error("Repository '{repository}' failed to {operation}: {reason}")]
    RepoError {
        /// Repository name
        repository: String,
        /// Operation that failed (list, pull, push, ...)
        operation: String,
        /// Underlying failure
        reason: String,
    },

    /// A repository name does not match any configured repository.
    #[error("Repository '{name}' is not configured")]
    UnknownRepository {
        /// Requested repository name
        name: String,
    },

    /// The user declined a confirmation prompt.
    #[error("Aborted: {operation}")]
    UserAbort {
        /// What was not confirmed
        operation: String,
    },

    /// A configuration file or environment variable is invalid.
    #[error("Configuration error: {message}")]
    ConfigError {
        /// Description of the configuration problem
        message: String,
    },

    /// A directory expected to be empty has content.
    #[error("Directory is not empty: {path}")]
    DirectoryNotEmpty {
        /// Path to the directory
        path: String,
    },

    /// IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// YAML error
    #[error("YAML error: {0}")]
    YamlError(#[from] serde_yaml::Error),

    /// Other error
    #[error("{message}")]
    Other {
        /// Generic error message
        message: String,
    },
}

impl Clone for KpmError {
    fn clone(&self) -> Self {
        match self {
            Self::Validation(e) => Self::Validation(e.clone()),
            Self::PackageNotFound {
                name,
                version,
            } => Self::PackageNotFound {
                name: name.clone(),
                version: version.clone(),
            },
            Self::VersionNotFound {
                name,
            } => Self::VersionNotFound {
                name: name.clone(),
            },
            Self::PackageMissing {
                full_name,
                required_by,
            } => Self::PackageMissing {
                full_name: full_name.clone(),
                required_by: required_by.clone(),
            },
            Self::PackageDirNotFound {
                path,
            } => Self::PackageDirNotFound {
                path: path.clone(),
            },
            Self::BadLayout {
                path,
                reason,
            } => Self::BadLayout {
                path: path.clone(),
                reason: reason.clone(),
            },
            Self::BadManifest {
                path,
                reason,
            } => Self::BadManifest {
                path: path.clone(),
                reason: reason.clone(),
            },
            Self::BadDependency {
                path,
                reason,
            } => Self::BadDependency {
                path: path.clone(),
                reason: reason.clone(),
            },
            Self::TemplateError {
                location,
                message,
            } => Self::TemplateError {
                location: location.clone(),
                message: message.clone(),
            },
            Self::CycleDetected {
                chain,
            } => Self::CycleDetected {
                chain: chain.clone(),
            },
            Self::RepoError {
                repository,
                operation,
                reason,
            } => Self::RepoError {
                repository: repository.clone(),
                operation: operation.clone(),
                reason: reason.clone(),
            },
            Self::UnknownRepository {
                name,
            } => Self::UnknownRepository {
                name: name.clone(),
            },
            Self::UserAbort {
                operation,
            } => Self::UserAbort {
                operation: operation.clone(),
            },
            Self::ConfigError {
                message,
            } => Self::ConfigError {
                message: message.clone(),
            },
            Self::DirectoryNotEmpty {
                path,
            } => Self::DirectoryNotEmpty {
                path: path.clone(),
            },
            // io and yaml errors are not Clone
            Self::IoError(e) => Self::Other {
                message: format!("IO error: {e}"),
            },
            Self::YamlError(e) => Self::Other {
                message: format!("YAML error: {e}"),
            },
            Self::Other {
                message,
            } => Self::Other {
                message: message.clone(),
            },
        }
    }
}

/// Error context wrapper that provides user-friendly error information
///
/// `ErrorContext` wraps a [`KpmError`] with optional details and a suggestion.
/// When displayed, the error is printed in red, details in yellow and the
/// suggestion in green.
///
/// ```rust,no_run
/// use kpm_cli::core::{ErrorContext, KpmError};
///
/// let context = ErrorContext::new(KpmError::VersionNotFound {
///     name: "acme/hello".to_string(),
/// })
/// .with_suggestion("Import the package with 'kpm pack <dir>'");
/// context.display();
/// ```
#[derive(Debug)]
pub struct ErrorContext {
    /// The underlying KPM error
    pub error: KpmError,
    /// Optional suggestion for resolving the error
    pub suggestion: Option<String>,
    /// Optional additional details about the error
    pub details: Option<String>,
}

impl ErrorContext {
    /// Create a new error context without details or suggestion.
    #[must_use]
    pub const fn new(error: KpmError) -> Self {
        Self {
            error,
            suggestion: None,
            details: None,
        }
    }

    /// Add a suggestion for resolving the error.
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Add details explaining the error.
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Print the error context to stderr with terminal colors.
    pub fn display(&self) {
        eprintln!("{}: {}", "error".red().bold(), self.error);

        if let Some(details) = &self.details {
            eprintln!("{}: {}", "details".yellow(), details);
        }

        if let Some(suggestion) = &self.suggestion {
            eprintln!("{}: {}", "suggestion".green(), suggestion);
        }
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)?;

        if let Some(details) = &self.details {
            write!(f, "\nDetails: {details}")?;
        }

        if let Some(suggestion) = &self.suggestion {
            write!(f, "\nSuggestion: {suggestion}")?;
        }

        Ok(())
    }
}

impl std::error::Error for ErrorContext {}

/// Extension trait for converting [`KpmError`] to [`anyhow::Error`] with context
pub trait IntoAnyhowWithContext {
    /// Convert the error to an [`anyhow::Error`] with the provided context
    fn into_anyhow_with_context(self, context: ErrorContext) -> anyhow::Error;
}

impl IntoAnyhowWithContext for KpmError {
    fn into_anyhow_with_context(self, context: ErrorContext) -> anyhow::Error {
        anyhow::Error::new(ErrorContext {
            error: self,
            suggestion: context.suggestion,
            details: context.details,
        })
    }
}

/// Convert any error to a user-friendly [`ErrorContext`].
///
/// The error chain is searched for a [`KpmError`] root cause first, so errors
/// that were annotated with `anyhow::Context` on their way up still get their
/// tailored suggestion. The outer context messages become the details line.
#[must_use]
pub fn user_friendly_error(error: anyhow::Error) -> ErrorContext {
    if let Some(ctx) = error.downcast_ref::<ErrorContext>() {
        return ErrorContext {
            error: ctx.error.clone(),
            suggestion: ctx.suggestion.clone(),
            details: ctx.details.clone(),
        };
    }

    let kpm_error = error.chain().find_map(|cause| cause.downcast_ref::<KpmError>());
    if let Some(kpm_error) = kpm_error {
        let mut ctx = create_error_context(kpm_error.clone());

        // Context added by callers (package names, paths) sits above the root cause
        let outer: Vec<String> = error
            .chain()
            .take_while(|cause| cause.downcast_ref::<KpmError>().is_none())
            .map(std::string::ToString::to_string)
            .collect();
        if !outer.is_empty() {
            ctx.details = Some(match ctx.details {
                Some(details) => format!("{}\n{details}", outer.join(": ")),
                None => outer.join(": "),
            });
        }
        return ctx;
    }

    if let Some(io_error) = error.downcast_ref::<std::io::Error>() {
        match io_error.kind() {
            std::io::ErrorKind::PermissionDenied => {
                return ErrorContext::new(KpmError::Other {
                    message: io_error.to_string(),
                })
                .with_suggestion("Check the ownership and permissions of the KPM home directory")
                .with_details("KPM could not read or write a file");
            }
            std::io::ErrorKind::NotFound => {
                return ErrorContext::new(KpmError::Other {
                    message: io_error.to_string(),
                })
                .with_suggestion("Check that the file or directory exists and the path is correct");
            }
            _ => {}
        }
    }

    // Generic error - include the full error chain
    let mut message = error.to_string();
    let chain: Vec<String> =
        error.chain().skip(1).map(std::string::ToString::to_string).collect();

    if !chain.is_empty() {
        message.push_str("\n\nCaused by:");
        for (i, cause) in chain.iter().enumerate() {
            message.push_str(&format!("\n  {}: {}", i + 1, cause));
        }
    }

    ErrorContext::new(KpmError::Other {
        message,
    })
}

/// Map each [`KpmError`] kind to its suggestion and details.
fn create_error_context(error: KpmError) -> ErrorContext {
    match &error {
        KpmError::Validation(validation) => {
            let suggestion = validation.suggestion();
            ErrorContext::new(error).with_suggestion(suggestion)
        }

        KpmError::VersionNotFound { name } => {
            let suggestion = format!(
                "Run 'kpm list' to see installed packages, or import '{name}' with 'kpm pack <dir>' or 'kpm repo pull {name}'"
            );
            ErrorContext::new(error).with_suggestion(suggestion)
        }

        KpmError::PackageNotFound { .. } => ErrorContext::new(error)
            .with_suggestion("Run 'kpm list' or 'kpm repo find' to see which packages are available"),

        KpmError::PackageMissing { full_name, .. } => {
            let suggestion = format!(
                "Import '{full_name}' into the local repository with 'kpm pack' or 'kpm repo pull' before running"
            );
            ErrorContext::new(error)
                .with_suggestion(suggestion)
                .with_details("Every package referenced from a dependencies/ template must be installed locally")
        }

        KpmError::PackageDirNotFound { .. } => ErrorContext::new(error)
            .with_suggestion("Pass the path of a package directory, e.g. one created with 'kpm new-package'"),

        KpmError::BadLayout { .. } => ErrorContext::new(error)
            .with_suggestion("A package needs package.yaml, interface.yaml and parameters.yaml; templates/ holds files only, helpers/ only *.tpl files, dependencies/ only *.yaml files"),

        KpmError::BadManifest { .. } => ErrorContext::new(error)
            .with_suggestion("package.yaml must contain exactly two keys: 'name' and 'version'"),

        KpmError::BadDependency { .. } => ErrorContext::new(error)
            .with_suggestion("A dependency template must render to a mapping with a 'package' block ({name, version}) and an optional 'parameters' mapping"),

        KpmError::TemplateError { .. } => ErrorContext::new(error)
            .with_suggestion("Every referenced key must exist: templates see 'package' and 'values', the interface sees the effective parameters")
            .with_details("Templates are evaluated strictly; a missing key is an error rather than an empty string"),

        KpmError::CycleDetected { .. } => ErrorContext::new(error)
            .with_suggestion("Break the cycle by changing the parameters passed along the chain or removing one of the dependency files")
            .with_details("A package reached again with identical parameters along the same path would recurse forever"),

        KpmError::UnknownRepository { .. } => ErrorContext::new(error)
            .with_suggestion("Run 'kpm repo list' to see configured repositories, or add one under 'repositories' in .kpm.yaml"),

        KpmError::UserAbort { .. } => ErrorContext::new(error)
            .with_suggestion("Re-run with --confirm (-y) to skip the prompt"),

        KpmError::ConfigError { .. } => ErrorContext::new(error)
            .with_suggestion("Check .kpm.yaml in the KPM home and current directory, and the KPM_* environment variables"),

        KpmError::DirectoryNotEmpty { .. } => ErrorContext::new(error)
            .with_suggestion("Choose an empty or non-existing directory with --output-dir"),

        _ => ErrorContext::new(error),
    }
}

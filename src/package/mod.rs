//! Package data model for KPM.
//!
//! A *package* is a directory of templates identified by a name and a version.
//! This module defines the in-memory records used throughout the engine and
//! the submodules that read, validate and create packages on disk.
//!
//! # Package Format
//!
//! ```text
//! <package-dir>/
//! ├── package.yaml        # {name, version}, strict
//! ├── interface.yaml      # template producing the `values` mapping
//! ├── parameters.yaml     # default parameters
//! ├── templates/          # output templates (files only)
//! ├── helpers/            # *.tpl helper templates
//! └── dependencies/       # *.yaml templates rendering to a PackageDefinition
//! ```
//!
//! # Modules
//!
//! - [`validation`] - lexical rules for names, versions and output names
//! - [`loader`] - reading and validating a package directory
//! - [`yaml`] - strict YAML decoding and the YAML/template-value bridge
//! - [`sample`] - the skeleton package written by `kpm new-package`

pub mod loader;
pub mod sample;
pub mod validation;
pub mod yaml;

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

pub use loader::{PackageLayout, load_package};
pub use validation::{ValidationError, join_full_name, split_full_name};

/// Free-form parameter mapping handed to templates.
pub type Parameters = serde_json::Map<String, serde_json::Value>;

/// Identity of a package: `{name, version}`.
///
/// This is the exact content of `package.yaml`. Decoding is strict: any key
/// other than `name` and `version` is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PackageInfo {
    /// Package name, e.g. `acme/hello`
    pub name: String,
    /// Package version, e.g. `1.0.0`
    pub version: String,
}

impl PackageInfo {
    /// Create a package identity without validating it.
    pub fn new(name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
        }
    }

    /// Parse and validate a full name (`name-version`).
    pub fn from_full_name(full_name: &str) -> Result<Self, ValidationError> {
        let (name, version) = split_full_name(full_name)?;
        Ok(Self {
            name,
            version,
        })
    }

    /// The full name, `name-version`.
    #[must_use]
    pub fn full_name(&self) -> String {
        join_full_name(&self.name, &self.version)
    }

    /// Validate both the name and the version.
    pub fn validate(&self) -> Result<(), ValidationError> {
        validation::validate_package_name(&self.name)?;
        validation::validate_package_version(&self.version)
    }
}

impl fmt::Display for PackageInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.name, self.version)
    }
}

/// A package together with the parameters it is invoked with.
///
/// This is what a dependency template renders to, and what the root of a run
/// is built from.
///
/// ```yaml
/// package:
///   name: acme/leaf
///   version: 1.0.0
/// parameters:
///   greeting: hi
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PackageDefinition {
    /// Which package to invoke
    pub package: PackageInfo,
    /// Overrides merged over the package's default parameters
    #[serde(default, deserialize_with = "null_as_empty")]
    pub parameters: Parameters,
}

impl PackageDefinition {
    /// Create a definition; absent overrides are the same as empty ones.
    pub fn new(package: PackageInfo, parameters: Option<Parameters>) -> Self {
        Self {
            package,
            parameters: parameters.unwrap_or_default(),
        }
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Parameters, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Parameters>::deserialize(deserializer)?.unwrap_or_default())
}

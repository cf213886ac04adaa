//! Template input composition.
//!
//! A package's templates see a mapping with two reserved keys:
//!
//! ```yaml
//! package: {name: acme/hello, version: 0.0.1}
//! values: ...   # output of interface.yaml over the effective parameters
//! ```
//!
//! Effective parameters are the package defaults shallow-merged with the
//! caller's overrides: an override replaces the whole top-level value.

use std::path::Path;

use anyhow::{Context, Result};
use serde_json::{Value, json};

use crate::constants::INTERFACE_FILE;
use crate::core::KpmError;
use crate::package::yaml::yaml_to_mapping;
use crate::package::{PackageInfo, PackageLayout, Parameters};
use crate::repository::local;
use crate::templating::TemplateEnv;

/// Shallow merge: every key of `overrides` wins over the same key in `defaults`.
pub fn merge_parameters(defaults: &Parameters, overrides: &Parameters) -> Parameters {
    let mut effective = defaults.clone();
    for (key, value) in overrides {
        effective.insert(key.clone(), value.clone());
    }
    effective
}

/// Compose the template input of an already loaded package.
///
/// Registers `interface.yaml` in `env` as a side effect.
pub fn compose_layout_input(
    layout: &PackageLayout,
    env: &mut TemplateEnv,
    overrides: &Parameters,
) -> Result<Value> {
    let defaults = layout.read_parameters()?;
    let effective = merge_parameters(&defaults, overrides);

    env.add_template(INTERFACE_FILE, &layout.read_interface()?)?;
    let rendered = env.render(INTERFACE_FILE, &Value::Object(effective))?;
    let values = yaml_to_mapping(&rendered).map_err(|e| KpmError::TemplateError {
        location: INTERFACE_FILE.to_string(),
        message: format!("output is not a YAML mapping: {e}"),
    })?;

    tracing::debug!("Composed input for {} ({} values)", layout.info, values.len());
    Ok(json!({
        "package": {
            "name": layout.info.name,
            "version": layout.info.version,
        },
        "values": values,
    }))
}

/// Compose the template input of an installed package.
///
/// `None` overrides behave exactly like an empty mapping.
pub fn compose_input(
    home: &Path,
    info: &PackageInfo,
    env: &mut TemplateEnv,
    overrides: Option<&Parameters>,
) -> Result<Value> {
    let empty = Parameters::new();
    let layout = local::load_installed(home, info)?;
    compose_layout_input(&layout, env, overrides.unwrap_or(&empty))
        .with_context(|| format!("Failed to compose input for '{info}'"))
}

//! Skeleton package written by `kpm new-package`.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};

use super::PackageInfo;
use crate::constants::{INTERFACE_FILE, PACKAGE_FILE, PARAMETERS_FILE, TEMPLATES_DIR};
use crate::core::KpmError;

/// Version every new package starts at.
pub const SAMPLE_VERSION: &str = "0.0.1";

/// Namespace used when the login name sanitizes to nothing usable.
const FALLBACK_NAMESPACE: &str = "kpm";

const SAMPLE_INTERFACE: &str = r#"greeting: {{ greeting | quote }}
target: {{ target | quote }}
"#;

const SAMPLE_PARAMETERS: &str = "greeting: Hello\ntarget: World\n";

const SAMPLE_TEMPLATE: &str = r#"{% set message = values.greeting ~ ", " ~ values.target ~ "!" -%}
apiVersion: v1
kind: ConfigMap
metadata:
  name: {{ package.name | replace(from="/", to="-") | replace(from=".", to="-") }}
data:
  version: {{ package.version | quote }}
  message: {{ message | quote }}
"#;

/// Reduce a login name to a valid namespace segment.
///
/// Lowercases, drops everything outside `[a-z0-9]` and falls back to `kpm`
/// when the result is empty or does not start with a letter.
pub fn sanitize_login(login: Option<&str>) -> String {
    let sanitized: String = login
        .unwrap_or_default()
        .to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
        .collect();

    match sanitized.chars().next() {
        Some(first) if first.is_ascii_lowercase() => sanitized,
        _ => FALLBACK_NAMESPACE.to_string(),
    }
}

/// Namespace derived from the current user's login (`$USER`, then `$USERNAME`).
pub fn login_namespace() -> String {
    let login = std::env::var("USER").or_else(|_| std::env::var("USERNAME")).ok();
    sanitize_login(login.as_deref())
}

/// Qualify a bare package name with `namespace`; qualified names are kept.
pub fn qualified_name(name: &str, namespace: &str) -> String {
    if name.contains('/') { name.to_string() } else { format!("{namespace}/{name}") }
}

/// Write the skeleton package into `target_dir`.
///
/// The directory must be absolute and either empty or absent; it is created
/// when absent. Returns the identity written to `package.yaml`.
pub fn write_sample_package(target_dir: &Path, name: &str, namespace: &str) -> Result<PackageInfo> {
    if !target_dir.is_absolute() {
        bail!("Target directory must be absolute: {}", target_dir.display());
    }

    let info = PackageInfo::new(qualified_name(name, namespace), SAMPLE_VERSION);
    info.validate().map_err(KpmError::from)?;

    if target_dir.exists() {
        let mut entries = fs::read_dir(target_dir)
            .with_context(|| format!("Failed to read directory {}", target_dir.display()))?;
        if entries.next().is_some() {
            return Err(KpmError::DirectoryNotEmpty {
                path: target_dir.display().to_string(),
            }
            .into());
        }
    } else {
        fs::create_dir_all(target_dir)
            .with_context(|| format!("Failed to create directory {}", target_dir.display()))?;
    }

    let manifest = serde_yaml::to_string(&info)?;
    let templates = target_dir.join(TEMPLATES_DIR);
    fs::create_dir_all(&templates)?;

    for (path, content) in [
        (target_dir.join(PACKAGE_FILE), manifest.as_str()),
        (target_dir.join(INTERFACE_FILE), SAMPLE_INTERFACE),
        (target_dir.join(PARAMETERS_FILE), SAMPLE_PARAMETERS),
        (templates.join("hello.yaml"), SAMPLE_TEMPLATE),
    ] {
        fs::write(&path, content).with_context(|| format!("Failed to write {}", path.display()))?;
    }

    tracing::info!("Wrote sample package {} to {}", info, target_dir.display());
    Ok(info)
}

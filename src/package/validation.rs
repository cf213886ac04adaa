//! Lexical rules for package identities and output names.
//!
//! All validators are pure functions returning a precise [`ValidationError`]
//! so the CLI can produce targeted messages.
//!
//! # Grammar
//!
//! ```text
//! namespace-segment = [a-z] ( ("." | "_")? [a-z0-9] )*
//! unqualified-name  = [a-z] ( ("." | "_" | "__" | "-"+)? [a-z0-9] )*
//! package-name      = ( namespace-segment "/" )* unqualified-name
//! version           = MAJOR "." MINOR "." PATCH     (no leading zeros, not 0.0.0)
//! output-name       = 1..64 chars, alphanumerics separated by "/" or runs of "._-"
//! full-name         = package-name "-" version
//! ```

use std::cmp::Ordering;
use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

use crate::constants::MAX_OUTPUT_NAME_LEN;

static NAMESPACE_SEGMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z](?:[._]?[a-z0-9])*$").expect("valid regex"));

static UNQUALIFIED_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z](?:(?:\.|__?|-+)?[a-z0-9])*$").expect("valid regex"));

static VERSION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:0|[1-9][0-9]*)\.(?:0|[1-9][0-9]*)\.(?:0|[1-9][0-9]*)$").expect("valid regex")
});

static OUTPUT_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9]+(?:(?:/|[._-]+)[A-Za-z0-9]+)*$").expect("valid regex")
});

/// A lexical rule violation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Package name does not match the package-name grammar.
    #[error("Invalid package name '{name}': {reason}")]
    InvalidName {
        /// The rejected name
        name: String,
        /// Which rule failed
        reason: String,
    },

    /// Version is not a strict `MAJOR.MINOR.PATCH`.
    #[error("Invalid package version '{version}': {reason}")]
    InvalidVersion {
        /// The rejected version
        version: String,
        /// Which rule failed
        reason: String,
    },

    /// Output name is empty, too long or has disallowed characters.
    #[error("Invalid output name '{name}': {reason}")]
    InvalidOutputName {
        /// The rejected output name
        name: String,
        /// Which rule failed
        reason: String,
    },

    /// A namespace segment does not match the segment grammar.
    #[error("Invalid namespace segment '{segment}'")]
    InvalidNamespace {
        /// The rejected segment
        segment: String,
    },

    /// A full name could not be split into a name and a version.
    #[error("Invalid full package name '{full_name}': {reason}")]
    InvalidFullName {
        /// The rejected full name
        full_name: String,
        /// Which rule failed
        reason: String,
    },
}

impl ValidationError {
    /// A one-line hint on how to write a valid value.
    #[must_use]
    pub fn suggestion(&self) -> String {
        match self {
            Self::InvalidName { .. } | Self::InvalidNamespace { .. } => {
                "Package names are lowercase: namespace segments like 'acme' or 'my_org', then a name like 'hello-world' (e.g. 'acme/hello-world')".to_string()
            }
            Self::InvalidVersion { .. } => {
                "Versions are MAJOR.MINOR.PATCH without leading zeros, e.g. '1.0.0' or '0.10.2'".to_string()
            }
            Self::InvalidOutputName { .. } => format!(
                "Output names are 1-{MAX_OUTPUT_NAME_LEN} alphanumeric characters separated by '/', '.', '-' or '_'"
            ),
            Self::InvalidFullName { .. } => {
                "Full names have the form <name>-<version>, e.g. 'acme/hello-1.0.0'".to_string()
            }
        }
    }
}

/// Validate a single namespace segment.
pub fn validate_namespace_segment(segment: &str) -> Result<(), ValidationError> {
    if NAMESPACE_SEGMENT.is_match(segment) {
        Ok(())
    } else {
        Err(ValidationError::InvalidNamespace {
            segment: segment.to_string(),
        })
    }
}

/// Validate a package name: namespace segments followed by an unqualified name.
pub fn validate_package_name(name: &str) -> Result<(), ValidationError> {
    let invalid = |reason: &str| ValidationError::InvalidName {
        name: name.to_string(),
        reason: reason.to_string(),
    };

    if name.is_empty() {
        return Err(invalid("name is empty"));
    }

    let mut segments: Vec<&str> = name.split('/').collect();
    let tail = segments.pop().unwrap_or_default();

    for segment in segments {
        if segment.is_empty() {
            return Err(invalid("empty namespace segment"));
        }
        if !NAMESPACE_SEGMENT.is_match(segment) {
            return Err(invalid(&format!("namespace segment '{segment}' is not valid")));
        }
    }

    if tail.is_empty() {
        return Err(invalid("unqualified name is empty"));
    }
    if !UNQUALIFIED_NAME.is_match(tail) {
        return Err(invalid(&format!(
            "'{tail}' must start with a lowercase letter and contain only lowercase letters, digits and single '.', '_' or '__' or '-' separators"
        )));
    }

    Ok(())
}

/// Validate a strict `MAJOR.MINOR.PATCH` version.
pub fn validate_package_version(version: &str) -> Result<(), ValidationError> {
    let invalid = |reason: &str| ValidationError::InvalidVersion {
        version: version.to_string(),
        reason: reason.to_string(),
    };

    if !VERSION.is_match(version) {
        return Err(invalid("expected three dot-separated decimal numbers without leading zeros"));
    }
    if version == "0.0.0" {
        return Err(invalid("0.0.0 is not a valid version"));
    }
    if semver::Version::parse(version).is_err() {
        return Err(invalid("version segment out of range"));
    }

    Ok(())
}

/// Validate an output name.
pub fn validate_output_name(name: &str) -> Result<(), ValidationError> {
    let invalid = |reason: String| ValidationError::InvalidOutputName {
        name: name.to_string(),
        reason,
    };

    if name.is_empty() {
        return Err(invalid("output name is empty".to_string()));
    }
    if name.len() > MAX_OUTPUT_NAME_LEN {
        return Err(invalid(format!("longer than {MAX_OUTPUT_NAME_LEN} characters")));
    }
    if !OUTPUT_NAME.is_match(name) {
        return Err(invalid(
            "only alphanumerics separated by '/', '.', '-' or '_' are allowed".to_string(),
        ));
    }

    Ok(())
}

/// Join a name and a version into a full name.
#[must_use]
pub fn join_full_name(name: &str, version: &str) -> String {
    format!("{name}-{version}")
}

/// Split a full name at its last `-` and validate both halves.
pub fn split_full_name(full_name: &str) -> Result<(String, String), ValidationError> {
    let Some((name, version)) = full_name.rsplit_once('-') else {
        return Err(ValidationError::InvalidFullName {
            full_name: full_name.to_string(),
            reason: "missing '-' between name and version".to_string(),
        });
    };

    validate_package_name(name)?;
    validate_package_version(version)?;

    Ok((name.to_string(), version.to_string()))
}

/// Order two validated versions numerically, segment by segment.
///
/// Inputs that fail to parse sort before those that parse, then by their raw
/// string, so the function is total.
#[must_use]
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    match (semver::Version::parse(a), semver::Version::parse(b)) {
        (Ok(a), Ok(b)) => a.cmp(&b),
        (Ok(_), Err(_)) => Ordering::Greater,
        (Err(_), Ok(_)) => Ordering::Less,
        (Err(_), Err(_)) => a.cmp(b),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_namespace_segments() {
        for ok in ["a", "acme", "my_org", "my.org", "a1", "k8s"] {
            assert!(validate_namespace_segment(ok).is_ok(), "{ok} should be valid");
        }
        for bad in ["", "1a", "Acme", "a__b", "a-b", "a.", "a_", "_a", "a..b"] {
            assert!(validate_namespace_segment(bad).is_err(), "{bad} should be invalid");
        }
    }

    #[test]
    fn test_package_names() {
        for ok in [
            "hello",
            "acme/hello",
            "acme/team.x/hello-world",
            "a/b/c/d",
            "foo--bar",
            "foo__bar",
            "foo.bar",
            "pkg-a",
            "x1",
        ] {
            assert!(validate_package_name(ok).is_ok(), "{ok} should be valid");
        }
    }

    #[test]
    fn test_package_names_rejected() {
        for bad in [
            "",
            "/hello",
            "acme/",
            "acme//hello",
            "Hello",
            "acme/Hello",
            "hello-",
            "-hello",
            "hello..x",
            "hello___x",
            "1hello",
            "Acme/hello",
            "acme-corp/hello",
            "he llo",
        ] {
            assert!(validate_package_name(bad).is_err(), "{bad} should be invalid");
        }
    }

    #[test]
    fn test_versions() {
        for ok in ["0.0.1", "1.0.0", "1.2.3", "10.20.30", "0.10.0"] {
            assert!(validate_package_version(ok).is_ok(), "{ok} should be valid");
        }
        for bad in [
            "0.0.0",
            "01.0.0",
            "1.01.0",
            "1.0.00",
            "1.0",
            "1.0.0.0",
            "1..0",
            "",
            "v1.0.0",
            "1.*",
            "*.*.*",
            "1.0.0-beta",
            "99999999999999999999999.0.0",
        ] {
            assert!(validate_package_version(bad).is_err(), "{bad} should be invalid");
        }
    }

    #[test]
    fn test_output_names() {
        for ok in ["a", "child", "acme/hello-0.0.1", "A_b.C-d", "x/y/z", "foo--bar-1.0.0"] {
            assert!(validate_output_name(ok).is_ok(), "{ok} should be valid");
        }
        let too_long = "a".repeat(65);
        for bad in ["", "/a", "a/", "a//b", "-a", "a b", "a/../b", too_long.as_str()] {
            assert!(validate_output_name(bad).is_err(), "{bad} should be invalid");
        }
        assert!(validate_output_name(&"a".repeat(64)).is_ok());
    }

    #[test]
    fn test_split_full_name_roundtrip() {
        let cases = [("acme/hello", "0.0.1"), ("foo--bar", "1.10.0"), ("pkg-a", "1.0.0")];
        for (name, version) in cases {
            let full = join_full_name(name, version);
            assert_eq!(split_full_name(&full).unwrap(), (name.to_string(), version.to_string()));
        }
    }

    #[test]
    fn test_split_full_name_errors() {
        assert!(matches!(
            split_full_name("noversion"),
            Err(ValidationError::InvalidFullName { .. })
        ));
        assert!(matches!(
            split_full_name("foo-01.0.0"),
            Err(ValidationError::InvalidVersion { .. })
        ));
        assert!(matches!(split_full_name("Foo-1.0.0"), Err(ValidationError::InvalidName { .. })));
    }

    #[test]
    fn test_compare_versions_is_numeric() {
        assert_eq!(compare_versions("1.10.0", "1.2.3"), Ordering::Greater);
        assert_eq!(compare_versions("9.0.0", "10.0.0"), Ordering::Less);
        assert_eq!(compare_versions("1.0.0", "1.0.0"), Ordering::Equal);
    }
}

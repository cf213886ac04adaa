//! Template environments for KPM packages.
//!
//! Templates use the [Tera](https://keats.github.io/tera/) language. Each
//! package node in a dependency tree gets its own [`TemplateEnv`]:
//!
//! 1. [`TemplateEnv::new_root`] registers the global functions and filters
//!    (see [`functions`]) with autoescaping disabled.
//! 2. [`TemplateEnv::load_helpers`] parses the package's `helpers/*.tpl`.
//! 3. [`TemplateEnv::bind_package_functions`] makes `include` render
//!    templates of this environment.
//! 4. Interface, output and dependency templates are added and rendered.
//!
//! Rendering is strict: referencing an undefined variable fails. Templates
//! that test a bare variable as a condition are rejected when added, since
//! Tera would read an undefined one as false (see [`strict`]).
//!
//! # Template names
//!
//! Helpers are named by file name (`common.tpl`). The interface is
//! `interface.yaml`. Output and dependency templates are prefixed with their
//! directory (`templates/out.txt`, `dependencies/child.yaml`) so the two sets
//! never collide.

pub mod functions;
pub mod strict;

use std::path::Path;
use std::sync::{Arc, OnceLock};

use anyhow::{Context as _, Result};
use tera::{Context, Tera, Value};

use crate::constants::HELPER_EXTENSION;
use crate::core::KpmError;

/// A package's template set plus the functions bound to it.
#[derive(Clone)]
pub struct TemplateEnv {
    tera: Tera,
    bound: bool,
    /// Frozen copy with `include` bound, rebuilt after every change
    snapshot: OnceLock<Arc<OnceLock<Tera>>>,
}

impl std::fmt::Debug for TemplateEnv {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TemplateEnv")
            .field("templates", &self.template_names())
            .field("bound", &self.bound)
            .finish()
    }
}

impl TemplateEnv {
    /// An empty environment with the global functions registered.
    pub fn new_root() -> Self {
        let mut tera = Tera::default();
        tera.autoescape_on(vec![]);

        tera.register_function("index", functions::index);
        tera.register_function("toYaml", functions::to_yaml);
        tera.register_function("fromYaml", functions::from_yaml);
        tera.register_function("include", functions::unbound_include);

        tera.register_filter("toYaml", functions::to_yaml_filter);
        tera.register_filter("fromYaml", functions::from_yaml_filter);
        tera.register_filter("indent", functions::indent_filter);
        tera.register_filter("nindent", functions::nindent_filter);
        tera.register_filter("quote", functions::quote_filter);

        Self {
            tera,
            bound: false,
            snapshot: OnceLock::new(),
        }
    }

    /// Parse every `*.tpl` file in `dir`, in file-name order.
    ///
    /// A missing directory loads nothing. Returns the number of helpers.
    pub fn load_helpers(&mut self, dir: &Path) -> Result<usize> {
        if !dir.is_dir() {
            return Ok(0);
        }

        let mut helpers = Vec::new();
        for entry in std::fs::read_dir(dir)
            .with_context(|| format!("Failed to read helpers directory {}", dir.display()))?
        {
            let path = entry?.path();
            if path.is_file() && path.extension().and_then(|e| e.to_str()) == Some(HELPER_EXTENSION) {
                helpers.push(path);
            }
        }
        helpers.sort_by(|a, b| a.file_name().cmp(&b.file_name()));

        for path in &helpers {
            let name = file_name(path);
            let source = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read helper {}", path.display()))?;
            self.add_template(&name, &source)?;
        }

        tracing::debug!("Loaded {} helpers from {}", helpers.len(), dir.display());
        Ok(helpers.len())
    }

    /// Bind `include` to this environment's own template set.
    pub fn bind_package_functions(&mut self) {
        self.bound = true;
        self.snapshot = OnceLock::new();
    }

    /// Parse `source` and register it under `name`.
    ///
    /// Fails on syntax errors and on conditions that test a bare variable.
    pub fn add_template(&mut self, name: &str, source: &str) -> Result<()> {
        let parsed =
            tera::Template::new(name, None, source).map_err(|e| template_error(name, &e))?;
        let lenient = strict::lenient_conditions(&parsed);
        if !lenient.is_empty() {
            return Err(KpmError::TemplateError {
                location: name.to_string(),
                message: format!(
                    "condition on `{}` reads an undefined variable as false; \
                     test it with `is defined`, compare it (`== true`) or give it a `default`",
                    lenient.join("`, `")
                ),
            }
            .into());
        }

        self.tera.add_raw_template(name, source).map_err(|e| template_error(name, &e))?;
        self.snapshot = OnceLock::new();
        Ok(())
    }

    /// Read and register a template file under `<prefix>/<file name>`.
    ///
    /// Returns the registered name.
    pub fn add_template_file(&mut self, prefix: &str, path: &Path) -> Result<String> {
        let name = format!("{prefix}/{}", file_name(path));
        let source = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read template {}", path.display()))?;
        self.add_template(&name, &source)?;
        Ok(name)
    }

    pub fn has_template(&self, name: &str) -> bool {
        self.tera.get_template_names().any(|t| t == name)
    }

    /// Registered template names, sorted.
    pub fn template_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tera.get_template_names().map(str::to_string).collect();
        names.sort();
        names
    }

    /// Render template `name` against `input`, which must be a mapping.
    pub fn render(&self, name: &str, input: &Value) -> Result<String> {
        self.render_as(name, input, name)
    }

    /// Like [`TemplateEnv::render`], reporting failures at `location`.
    pub fn render_as(&self, name: &str, input: &Value, location: &str) -> Result<String> {
        let context =
            Context::from_value(input.clone()).map_err(|e| template_error(location, &e))?;
        let templates = self.snapshot.get_or_init(|| self.freeze());
        let tera = templates.get().ok_or_else(|| KpmError::TemplateError {
            location: location.to_string(),
            message: "template set is not initialized".to_string(),
        })?;
        Ok(tera.render(name, &context).map_err(|e| template_error(location, &e))?)
    }

    /// Copy the template set, with `include` bound to the copy when enabled.
    fn freeze(&self) -> Arc<OnceLock<Tera>> {
        let slot = Arc::new(OnceLock::new());
        let mut tera = self.tera.clone();
        if self.bound {
            tera.register_function("include", functions::Include::new(Arc::downgrade(&slot)));
        }
        let _ = slot.set(tera);
        slot
    }
}

fn file_name(path: &Path) -> String {
    path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default()
}

/// Convert a Tera error into [`KpmError::TemplateError`] at `location`.
pub fn template_error(location: &str, error: &tera::Error) -> KpmError {
    KpmError::TemplateError {
        location: location.to_string(),
        message: format_tera_error(error),
    }
}

/// Flatten a Tera error chain into one readable message.
///
/// Tera wraps the useful cause ("Variable `x` not found") in generic
/// "Failed to render" layers; those layers are dropped.
pub fn format_tera_error(error: &tera::Error) -> String {
    use std::error::Error;

    let mut messages = Vec::new();
    let mut current: Option<&dyn Error> = Some(error);
    while let Some(err) = current {
        let message = err.to_string().replace("'__tera_one_off'", "template").trim().to_string();
        let generic = message.starts_with("Failed to render") || message.starts_with("Failed to parse");
        if !message.is_empty() && !generic && !messages.contains(&message) {
            messages.push(message);
        }
        current = err.source();
    }

    if messages.is_empty() { error.to_string() } else { messages.join(": ") }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::fs;
    use tempfile::TempDir;

    fn render_str(env: &mut TemplateEnv, source: &str, input: Value) -> Result<String> {
        env.add_template("test", source)?;
        env.render("test", &input)
    }

    #[test]
    fn test_basic_render() {
        let mut env = TemplateEnv::new_root();
        let out = render_str(&mut env, "Hello, {{ name }}", json!({"name": "World"})).unwrap();
        assert_eq!(out, "Hello, World");
    }

    #[test]
    fn test_missing_key_is_error() {
        let mut env = TemplateEnv::new_root();
        let err = render_str(&mut env, "{{ values.unknown }}", json!({"values": {}})).unwrap_err();
        match err.downcast_ref::<KpmError>() {
            Some(KpmError::TemplateError { location, message }) => {
                assert_eq!(location, "test");
                assert!(message.contains("values.unknown"), "{message}");
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_no_autoescape() {
        let mut env = TemplateEnv::new_root();
        env.add_template("page.html", "{{ s }}").unwrap();
        assert_eq!(env.render("page.html", &json!({"s": "<a & b>"})).unwrap(), "<a & b>");
    }

    #[test]
    fn test_condition_on_missing_key_rejected() {
        let mut env = TemplateEnv::new_root();
        let err = env.add_template("out.txt", "[{% if values.typo_key %}on{% endif %}]").unwrap_err();
        match err.downcast_ref::<KpmError>() {
            Some(KpmError::TemplateError { location, message }) => {
                assert_eq!(location, "out.txt");
                assert!(message.contains("values.typo_key"), "{message}");
            }
            other => panic!("unexpected error {other:?}"),
        }
        assert!(!env.has_template("out.txt"));
    }

    #[test]
    fn test_strict_conditions() {
        let mut env = TemplateEnv::new_root();
        let source = "{% if values.on is defined %}a{% endif %}{% if values.flag == true %}b{% endif %}";
        let out = render_str(&mut env, source, json!({"values": {"flag": true}})).unwrap();
        assert_eq!(out, "b");

        let mut env = TemplateEnv::new_root();
        let err = render_str(&mut env, "{% if values.flag == true %}b{% endif %}", json!({"values": {}}))
            .unwrap_err();
        assert!(err.to_string().contains("values.flag"), "{err}");
    }

    #[test]
    fn test_parse_error_names_template() {
        let mut env = TemplateEnv::new_root();
        let err = env.add_template("broken.txt", "{% if %}").unwrap_err();
        assert!(err.to_string().contains("broken.txt"));
    }

    #[test]
    fn test_global_functions() {
        let mut env = TemplateEnv::new_root();
        let out = render_str(
            &mut env,
            r#"{{ index(map=m, key=["a", "b"]) }}|{{ toYaml(value=m) | nindent(width=2) }}|{% set x = fromYaml(text="k: v") %}{{ x.k | quote }}"#,
            json!({"m": {"a": {"b": "deep"}}}),
        )
        .unwrap();
        assert_eq!(out, "deep|\n  a:\n    b: deep|\"v\"");
    }

    #[test]
    fn test_include_unbound_fails() {
        let mut env = TemplateEnv::new_root();
        env.add_template("h.tpl", "x").unwrap();
        assert!(render_str(&mut env, r#"{{ include(name="h.tpl") }}"#, json!({})).is_err());
    }

    #[test]
    fn test_helpers_and_include() {
        let temp = TempDir::new().unwrap();
        fs::write(temp.path().join("b.tpl"), "[{{ label }}]").unwrap();
        fs::write(temp.path().join("a.tpl"), "<{{ include(name=\"b.tpl\", data=d) }}>").unwrap();
        fs::write(temp.path().join("notes.txt"), "ignored").unwrap();

        let mut env = TemplateEnv::new_root();
        assert_eq!(env.load_helpers(temp.path()).unwrap(), 2);
        env.bind_package_functions();

        let out = render_str(
            &mut env,
            r#"{{ include(name="a.tpl", data=values) }}"#,
            json!({"values": {"d": {"label": "x"}}}),
        )
        .unwrap();
        assert_eq!(out, "<[x]>");

        // Templates added after binding are visible to include
        env.add_template("late.tpl", "late").unwrap();
        let out = render_str(&mut env, r#"{{ include(name="late.tpl") }}"#, json!({})).unwrap();
        assert_eq!(out, "late");
    }

    #[test]
    fn test_include_missing_template() {
        let mut env = TemplateEnv::new_root();
        env.bind_package_functions();
        assert!(render_str(&mut env, r#"{{ include(name="nope.tpl") }}"#, json!({})).is_err());
    }

    #[test]
    fn test_include_recursion_is_bounded() {
        let mut env = TemplateEnv::new_root();
        env.add_template("loop.tpl", r#"{{ include(name="loop.tpl") }}"#).unwrap();
        env.bind_package_functions();
        assert!(env.render("loop.tpl", &json!({})).is_err());
    }

    #[test]
    fn test_environments_are_independent() {
        let mut a = TemplateEnv::new_root();
        let b = TemplateEnv::new_root();
        a.add_template("only-a", "a").unwrap();
        assert!(a.has_template("only-a"));
        assert!(!b.has_template("only-a"));
    }
}

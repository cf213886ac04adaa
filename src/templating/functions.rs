//! Tera functions and filters available to every KPM template.
//!
//! # Functions
//!
//! | Call | Result |
//! |------|--------|
//! | `index(map=m, key="a")` | `m.a`; `key` may be a list for nested lookups |
//! | `toYaml(value=v)` | `v` encoded as YAML, without the trailing newline |
//! | `fromYaml(text=s)` | `s` decoded from YAML |
//! | `include(name="x.tpl", data=m)` | template `x.tpl` rendered against `m` |
//!
//! # Filters
//!
//! `toYaml`, `fromYaml`, `indent(width=n)`, `nindent(width=n)` and `quote`.
//!
//! Every lookup is strict: a missing key is an error, never an empty string.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{OnceLock, Weak};

use tera::{Context, Tera, Value};

use crate::package::yaml::{kind_of, value_to_yaml, yaml_to_value};

/// Deepest allowed chain of nested `include` calls.
pub const MAX_INCLUDE_DEPTH: usize = 16;

fn required_arg<'a>(
    function: &str,
    args: &'a HashMap<String, Value>,
    name: &str,
) -> tera::Result<&'a Value> {
    args.get(name)
        .ok_or_else(|| tera::Error::msg(format!("{function}: missing argument '{name}'")))
}

fn lookup<'a>(value: &'a Value, key: &Value) -> tera::Result<&'a Value> {
    let found = match (value, key) {
        (Value::Object(map), Value::String(k)) => map.get(k),
        (Value::Array(items), Value::Number(n)) => {
            n.as_u64().and_then(|i| usize::try_from(i).ok()).and_then(|i| items.get(i))
        }
        (Value::Array(items), Value::String(k)) => {
            k.parse::<usize>().ok().and_then(|i| items.get(i))
        }
        _ => {
            return Err(tera::Error::msg(format!(
                "index: cannot look up {key} in {}",
                kind_of(value)
            )));
        }
    };
    found.ok_or_else(|| tera::Error::msg(format!("index: key {key} not found")))
}

/// `index(map=m, key=k)`
pub fn index(args: &HashMap<String, Value>) -> tera::Result<Value> {
    let mut current = required_arg("index", args, "map")?;
    match required_arg("index", args, "key")? {
        Value::Array(path) => {
            for key in path {
                current = lookup(current, key)?;
            }
        }
        key => current = lookup(current, key)?,
    }
    Ok(current.clone())
}

fn encode_yaml(value: &Value) -> tera::Result<Value> {
    let text = value_to_yaml(value).map_err(|e| tera::Error::msg(format!("toYaml: {e}")))?;
    Ok(Value::String(text.trim_end_matches('\n').to_string()))
}

fn decode_yaml(text: &Value) -> tera::Result<Value> {
    let text = text.as_str().ok_or_else(|| {
        tera::Error::msg(format!("fromYaml: expected a string, found {}", kind_of(text)))
    })?;
    yaml_to_value(text).map_err(|e| tera::Error::msg(format!("fromYaml: {e}")))
}

/// `toYaml(value=v)`
pub fn to_yaml(args: &HashMap<String, Value>) -> tera::Result<Value> {
    encode_yaml(required_arg("toYaml", args, "value")?)
}

/// `fromYaml(text=s)`
pub fn from_yaml(args: &HashMap<String, Value>) -> tera::Result<Value> {
    decode_yaml(required_arg("fromYaml", args, "text")?)
}

pub fn to_yaml_filter(value: &Value, _args: &HashMap<String, Value>) -> tera::Result<Value> {
    encode_yaml(value)
}

pub fn from_yaml_filter(value: &Value, _args: &HashMap<String, Value>) -> tera::Result<Value> {
    decode_yaml(value)
}

fn width_arg(filter: &str, args: &HashMap<String, Value>) -> tera::Result<usize> {
    match args.get("width") {
        None => Ok(0),
        Some(width) => width
            .as_u64()
            .and_then(|w| usize::try_from(w).ok())
            .ok_or_else(|| tera::Error::msg(format!("{filter}: width must be a non-negative integer"))),
    }
}

fn as_text(filter: &str, value: &Value) -> tera::Result<String> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Number(_) | Value::Bool(_) => Ok(value.to_string()),
        other => Err(tera::Error::msg(format!(
            "{filter}: expected a string, found {}",
            kind_of(other)
        ))),
    }
}

fn indent_text(text: &str, width: usize) -> String {
    let pad = " ".repeat(width);
    text.split('\n').map(|line| format!("{pad}{line}")).collect::<Vec<_>>().join("\n")
}

/// `s | indent(width=n)`: prefix every line with `n` spaces.
pub fn indent_filter(value: &Value, args: &HashMap<String, Value>) -> tera::Result<Value> {
    let width = width_arg("indent", args)?;
    Ok(Value::String(indent_text(&as_text("indent", value)?, width)))
}

/// `s | nindent(width=n)`: a newline, then `s | indent(width=n)`.
pub fn nindent_filter(value: &Value, args: &HashMap<String, Value>) -> tera::Result<Value> {
    let width = width_arg("nindent", args)?;
    Ok(Value::String(format!("\n{}", indent_text(&as_text("nindent", value)?, width))))
}

/// `v | quote`: a double-quoted, escaped scalar.
pub fn quote_filter(value: &Value, _args: &HashMap<String, Value>) -> tera::Result<Value> {
    let text = as_text("quote", value)?;
    let quoted = serde_json::to_string(&text).map_err(|e| tera::Error::msg(format!("quote: {e}")))?;
    Ok(Value::String(quoted))
}

/// `include` before package functions are bound.
pub fn unbound_include(_args: &HashMap<String, Value>) -> tera::Result<Value> {
    Err(tera::Error::msg("include: package functions are not bound in this environment"))
}

/// `include(name=..., data=...)` bound to one package's template set.
///
/// Holds a weak reference so the template set does not keep itself alive.
pub struct Include {
    templates: Weak<OnceLock<Tera>>,
    depth: AtomicUsize,
}

impl Include {
    pub fn new(templates: Weak<OnceLock<Tera>>) -> Self {
        Self {
            templates,
            depth: AtomicUsize::new(0),
        }
    }

    fn render(&self, args: &HashMap<String, Value>) -> tera::Result<Value> {
        let name = required_arg("include", args, "name")?
            .as_str()
            .ok_or_else(|| tera::Error::msg("include: 'name' must be a string"))?;
        let data = match args.get("data") {
            None | Some(Value::Null) => Value::Object(serde_json::Map::new()),
            Some(data @ Value::Object(_)) => data.clone(),
            Some(other) => {
                return Err(tera::Error::msg(format!(
                    "include: 'data' must be a mapping, found {}",
                    kind_of(other)
                )));
            }
        };

        let templates = self
            .templates
            .upgrade()
            .ok_or_else(|| tera::Error::msg("include: template set is no longer available"))?;
        let tera = templates
            .get()
            .ok_or_else(|| tera::Error::msg("include: template set is not initialized"))?;
        if !tera.get_template_names().any(|t| t == name) {
            return Err(tera::Error::msg(format!("include: no template named '{name}'")));
        }

        let context = Context::from_value(data)?;
        tera.render(name, &context).map(Value::String)
    }
}

impl tera::Function for Include {
    fn call(&self, args: &HashMap<String, Value>) -> tera::Result<Value> {
        let depth = self.depth.fetch_add(1, Ordering::SeqCst);
        let result = if depth >= MAX_INCLUDE_DEPTH {
            Err(tera::Error::msg(format!("include: nested more than {MAX_INCLUDE_DEPTH} levels")))
        } else {
            self.render(args)
        };
        self.depth.fetch_sub(1, Ordering::SeqCst);
        result
    }

    fn is_safe(&self) -> bool {
        true
    }
}

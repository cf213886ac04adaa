//! KPM - a template package manager
//!
//! KPM keeps a local repository of versioned *template packages* and renders
//! them, together with the packages they depend on, into a directory tree of
//! generated files (typically Kubernetes manifests).
//!
//! # Architecture Overview
//!
//! - A package is a directory with `package.yaml`, `interface.yaml`,
//!   `parameters.yaml` and optional `templates/`, `helpers/` and
//!   `dependencies/` directories.
//! - Installed packages live under `<home>/packages/<name>-<version>/`.
//! - Running a package merges caller parameters over its defaults, evaluates
//!   the interface template into `values`, follows dependency templates to
//!   child packages and finally renders every output template.
//!
//! # Core Modules
//!
//! ## Package Format
//! - [`package`] - Identities, validation, on-disk layout and the sample package
//! - [`repository`] - Local repository index plus filesystem and docker remotes
//!
//! ## Execution
//! - [`templating`] - Tera environments with the KPM function set
//! - [`engine`] - Input composition, dependency tree building and rendering
//!
//! ## Supporting Modules
//! - [`cli`] - Command-line interface
//! - [`config`] - Home directory and `.kpm.yaml` configuration
//! - [`core`] - Error types and user-facing error reporting
//! - [`utils`] - Filesystem helpers
//!
//! # Package Example
//!
//! ```text
//! hello/
//! ├── package.yaml         name: acme/hello, version: 0.0.1
//! ├── parameters.yaml      name: World
//! ├── interface.yaml       greeting: "Hello, {{ name }}"
//! └── templates/
//!     └── out.txt          {{ values.greeting }}
//! ```
//!
//! `kpm run acme/hello` writes `./acme/hello-0.0.1/out.txt` containing
//! `Hello, World`.

pub mod cli;
pub mod config;
pub mod constants;
pub mod core;
pub mod engine;
pub mod package;
pub mod repository;
pub mod templating;
pub mod utils;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

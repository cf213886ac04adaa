//! Filesystem helpers shared by the repository and CLI layers.
//!
//! # Modules
//!
//! - [`fs`] - directory creation, recursive copy and removal

pub mod fs;

pub use fs::{copy_dir, ensure_dir, is_dir_empty, prune_empty_parents, remove_dir_all};

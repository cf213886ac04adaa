//! Test utilities for KPM
//!
//! Builders for package directories and temporary KPM homes, plus logging
//! setup for tests.
//!
//! # Example
//!
//! ```rust,no_run
//! use kpm_cli::test_utils::{PackageFixture, TestHome};
//!
//! let home = TestHome::new().unwrap();
//! home.install(
//!     &PackageFixture::new("acme/hello", "0.0.1")
//!         .parameters("name: World\n")
//!         .template("out.txt", "{{ values.name }}"),
//! )
//! .unwrap();
//! ```

pub mod fixtures;

pub use fixtures::{PackageFixture, TestHome};

use std::sync::Once;
use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Global flag to ensure logging is only initialized once in tests
static INIT_LOGGING: Once = Once::new();

/// Initialize logging for tests.
///
/// Uses `level` when given, otherwise `RUST_LOG` when set, otherwise stays
/// silent.
///
/// ```bash
/// RUST_LOG=debug cargo test
/// ```
pub fn init_test_logging(level: Option<Level>) {
    INIT_LOGGING.call_once(|| {
        let filter = if let Some(level) = level {
            EnvFilter::new(level.to_string())
        } else if std::env::var("RUST_LOG").is_ok() {
            EnvFilter::from_default_env()
        } else {
            return;
        };

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .try_init();
    });
}

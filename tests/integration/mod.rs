//! Integration test suite for KPM
//!
//! End-to-end tests driving the `kpm` binary against a temporary home.
//!
//! ```bash
//! cargo test --test integration
//! ```
//!
//! # Test Organization
//!
//! - **errors**: exit codes and error reporting
//! - **packages**: new-package, pack, unpack, inspect, list and remove
//! - **purge**: purge scope
//! - **repo**: filesystem repositories configured through the environment
//! - **run**: rendering packages and their dependencies

use assert_cmd::Command;
use kpm_cli::package::PackageInfo;
use kpm_cli::test_utils::PackageFixture;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

mod errors;
mod packages;
mod purge;
mod repo;
mod run;

/// A KPM home and a working directory, both temporary.
pub struct KpmEnv {
    temp: TempDir,
}

impl KpmEnv {
    pub fn new() -> Self {
        let temp = TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join("home")).unwrap();
        fs::create_dir_all(temp.path().join("work")).unwrap();
        Self {
            temp,
        }
    }

    pub fn home(&self) -> PathBuf {
        self.temp.path().join("home")
    }

    pub fn work(&self) -> PathBuf {
        self.temp.path().join("work")
    }

    pub fn root(&self) -> &Path {
        self.temp.path()
    }

    /// `kpm` with the home and working directory set and no ambient config.
    pub fn kpm(&self) -> Command {
        let mut cmd = Command::cargo_bin("kpm").unwrap();
        cmd.current_dir(self.work())
            .env("KPM_HOME", self.home())
            .env("USER", "tester")
            .env("NO_COLOR", "1")
            .env_remove("KPM_LOGLEVEL")
            .env_remove("KPM_REPOSITORIES")
            .env_remove("RUST_LOG");
        cmd
    }

    /// Write `fixture` below the temp root and import it with `kpm pack`.
    pub fn pack(&self, fixture: &PackageFixture) -> PackageInfo {
        let dir = self.root().join("src").join(fixture.info.full_name());
        fixture.write_at(&dir).unwrap();
        self.kpm().arg("pack").arg(&dir).arg("-y").assert().success();
        fixture.info.clone()
    }

    pub fn installed(&self, info: &PackageInfo) -> bool {
        self.home().join("packages").join(info.full_name()).join("package.yaml").is_file()
    }

    pub fn read(&self, relative: &str) -> String {
        fs::read_to_string(self.work().join(relative)).unwrap()
    }
}

/// `acme/hello` greeting `name`, with a single `out.txt`.
pub fn hello(version: &str) -> PackageFixture {
    PackageFixture::new("acme/hello", version)
        .parameters("name: World\n")
        .interface("greeting: \"Hello, {{ name }}\"\n")
        .template("out.txt", "{{ values.greeting }}")
}

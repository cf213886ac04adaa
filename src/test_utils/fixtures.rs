//! Builders for package directories and KPM homes used in tests.

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

use crate::constants::{
    DEPENDENCIES_DIR, HELPERS_DIR, INTERFACE_FILE, PACKAGE_FILE, PARAMETERS_FILE, TEMPLATES_DIR,
};
use crate::package::PackageInfo;
use crate::package::yaml::yaml_to_mapping;
use crate::repository::local::package_dir;

/// Builder for a package directory.
///
/// Unless [`PackageFixture::interface`] is called, the interface re-emits
/// every top-level key of the default parameters unchanged.
#[derive(Clone, Debug)]
pub struct PackageFixture {
    pub info: PackageInfo,
    pub interface: Option<String>,
    pub parameters: String,
    pub templates: Vec<(String, String)>,
    pub helpers: Vec<(String, String)>,
    pub dependencies: Vec<(String, String)>,
}

impl PackageFixture {
    pub fn new(name: &str, version: &str) -> Self {
        Self {
            info: PackageInfo::new(name, version),
            interface: None,
            parameters: String::new(),
            templates: Vec::new(),
            helpers: Vec::new(),
            dependencies: Vec::new(),
        }
    }

    pub fn interface(mut self, content: &str) -> Self {
        self.interface = Some(content.to_string());
        self
    }

    pub fn parameters(mut self, content: &str) -> Self {
        self.parameters = content.to_string();
        self
    }

    pub fn template(mut self, file: &str, content: &str) -> Self {
        self.templates.push((file.to_string(), content.to_string()));
        self
    }

    pub fn helper(mut self, file: &str, content: &str) -> Self {
        self.helpers.push((file.to_string(), content.to_string()));
        self
    }

    pub fn dependency(mut self, file: &str, content: &str) -> Self {
        self.dependencies.push((file.to_string(), content.to_string()));
        self
    }

    /// Add `dependencies/<output>.yaml` invoking `name-version` with `parameters`.
    ///
    /// `parameters` is inserted verbatim as a YAML flow mapping, so it may
    /// contain template expressions.
    pub fn depends_on(self, output: &str, name: &str, version: &str, parameters: &str) -> Self {
        let content = format!(
            "package:\n  name: {name}\n  version: {version}\nparameters: {parameters}\n"
        );
        self.dependency(&format!("{output}.yaml"), &content)
    }

    /// An interface that re-emits the given keys unchanged.
    pub fn identity_interface(keys: &[&str]) -> String {
        keys.iter().map(|key| format!("{key}: {{{{ {key} | json_encode() }}}}\n")).collect()
    }

    /// Write the package into `base/<full-name>` and return that directory.
    pub fn write_to(&self, base: &Path) -> Result<PathBuf> {
        let dir = base.join(self.info.full_name());
        self.write_at(&dir)?;
        Ok(dir)
    }

    /// Write the package into exactly `dir`.
    pub fn write_at(&self, dir: &Path) -> Result<()> {
        fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create fixture dir {}", dir.display()))?;

        let interface = match &self.interface {
            Some(interface) => interface.clone(),
            None => {
                let defaults = yaml_to_mapping(&self.parameters)?;
                let keys: Vec<&str> = defaults.keys().map(String::as_str).collect();
                Self::identity_interface(&keys)
            }
        };

        fs::write(dir.join(PACKAGE_FILE), serde_yaml::to_string(&self.info)?)?;
        fs::write(dir.join(INTERFACE_FILE), interface)?;
        fs::write(dir.join(PARAMETERS_FILE), &self.parameters)?;

        for (sub, files) in [
            (TEMPLATES_DIR, &self.templates),
            (HELPERS_DIR, &self.helpers),
            (DEPENDENCIES_DIR, &self.dependencies),
        ] {
            if files.is_empty() {
                continue;
            }
            let sub_dir = dir.join(sub);
            fs::create_dir_all(&sub_dir)?;
            for (file, content) in files {
                fs::write(sub_dir.join(file), content)?;
            }
        }

        Ok(())
    }
}

/// A temporary KPM home with an output directory next to it.
pub struct TestHome {
    temp: TempDir,
}

impl TestHome {
    /// A fresh home; honours `RUST_LOG` for the test's log output.
    pub fn new() -> Result<Self> {
        super::init_test_logging(None);
        let temp = TempDir::new()?;
        fs::create_dir_all(temp.path().join("home").join(crate::constants::PACKAGES_DIR))?;
        fs::create_dir_all(temp.path().join("out"))?;
        Ok(Self {
            temp,
        })
    }

    /// The KPM home directory.
    pub fn path(&self) -> PathBuf {
        self.temp.path().join("home")
    }

    /// An output root for rendering runs.
    pub fn output_dir(&self) -> PathBuf {
        self.temp.path().join("out")
    }

    /// Scratch space outside the home.
    pub fn scratch(&self) -> &Path {
        self.temp.path()
    }

    /// Write a package straight into the local repository.
    pub fn install(&self, fixture: &PackageFixture) -> Result<PackageInfo> {
        fixture.write_at(&package_dir(&self.path(), &fixture.info))?;
        Ok(fixture.info.clone())
    }

    /// Read a file below the output root.
    pub fn read_output(&self, relative: &str) -> Result<String> {
        let path = self.output_dir().join(relative);
        fs::read_to_string(&path).with_context(|| format!("Failed to read {}", path.display()))
    }
}

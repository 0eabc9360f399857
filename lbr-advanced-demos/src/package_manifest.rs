//! Package manifest registering the demo executables.
//!
//! The manifest tells an installer which data files go where and which
//! console command maps onto which callable. Cargo builds the executables
//! themselves from the `[[bin]]` targets; the manifest carries the rest.

use serde::{Deserialize, Serialize};
use std::{
    fmt, fs,
    path::{Path, PathBuf},
    str::FromStr,
};
use thiserror::Error;
use tracing::debug;

/// Where package markers are placed so the package can be discovered
pub const RESOURCE_INDEX_DESTINATION: &str = "share/ament_index/resource_index/packages";

#[derive(Error, Debug)]
pub enum ManifestError {
    #[error("error while accessing manifest")]
    IoError(#[from] std::io::Error),
    #[error("error while parsing json")]
    JsonError(#[from] serde_json::Error),
    #[error("error while parsing yaml")]
    YamlError(#[from] serde_yaml::Error),
    #[error("package name must not be empty")]
    EmptyName,
    #[error("malformed version {0:?}")]
    InvalidVersion(String),
    #[error("no data file installs the resource marker {0}")]
    MissingResourceMarker(String),
    #[error("malformed entry point {entry:?}: {reason}")]
    InvalidEntryPoint { entry: String, reason: &'static str },
    #[error("data file {0} does not exist")]
    MissingDataFile(PathBuf),
}

type Result<T> = std::result::Result<T, ManifestError>;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct DataFiles {
    pub destination: String,
    pub files: Vec<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct EntryPoints {
    #[serde(default)]
    pub console_scripts: Vec<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct PackageManifest {
    pub name: String,
    pub version: String,
    #[serde(default)]
    pub packages: Vec<String>,
    #[serde(default)]
    pub data_files: Vec<DataFiles>,
    #[serde(default)]
    pub install_requires: Vec<String>,
    #[serde(default)]
    pub zip_safe: bool,
    pub maintainer: String,
    pub maintainer_email: String,
    pub description: String,
    pub license: String,
    #[serde(default)]
    pub tests_require: Vec<String>,
    #[serde(default)]
    pub entry_points: EntryPoints,
}

impl PackageManifest {
    /// The manifest packaged with the binary
    pub fn included() -> Result<PackageManifest> {
        PackageManifest::parse_yaml(include_str!("../package.yaml"))
    }

    /// Directory the included manifest's data file paths are relative to
    pub fn source_root() -> &'static Path {
        Path::new(env!("CARGO_MANIFEST_DIR"))
    }

    pub fn parse_yaml(text: &str) -> Result<PackageManifest> {
        let manifest: PackageManifest = serde_yaml::from_str(text)?;
        manifest.validate()?;
        Ok(manifest)
    }

    pub fn parse_json(text: &str) -> Result<PackageManifest> {
        let manifest: PackageManifest = serde_json::from_str(text)?;
        manifest.validate()?;
        Ok(manifest)
    }

    pub fn load_yaml(path: impl AsRef<Path>) -> Result<PackageManifest> {
        let text = fs::read_to_string(path)?;
        PackageManifest::parse_yaml(&text)
    }

    pub fn serialize_to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn serialize_to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// `resource/<name>`, the empty file announcing the package
    pub fn resource_marker(&self) -> String {
        format!("resource/{}", self.name)
    }

    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(ManifestError::EmptyName);
        }
        let version_ok = !self.version.is_empty()
            && self
                .version
                .split('.')
                .all(|part| !part.is_empty() && part.chars().all(|c| c.is_ascii_digit()));
        if !version_ok {
            return Err(ManifestError::InvalidVersion(self.version.clone()));
        }
        let marker = self.resource_marker();
        let marker_installed = self.data_files.iter().any(|data_files| {
            data_files.destination == RESOURCE_INDEX_DESTINATION
                && data_files.files.iter().any(|file| *file == marker)
        });
        if !marker_installed {
            return Err(ManifestError::MissingResourceMarker(marker));
        }
        self.console_scripts()?;
        Ok(())
    }

    pub fn console_scripts(&self) -> Result<Vec<EntryPoint>> {
        self.entry_points
            .console_scripts
            .iter()
            .map(|entry| entry.parse())
            .collect()
    }

    /// Copies every data file below `prefix`.
    ///
    /// Returns the installed paths in manifest order.
    pub fn install(&self, source_root: &Path, prefix: &Path) -> Result<Vec<PathBuf>> {
        let mut installed = vec![];
        for data_files in &self.data_files {
            let destination = prefix.join(&data_files.destination);
            fs::create_dir_all(&destination)?;
            for file in &data_files.files {
                let source = source_root.join(file);
                if !source.is_file() {
                    return Err(ManifestError::MissingDataFile(source));
                }
                let file_name = source
                    .file_name()
                    .ok_or_else(|| ManifestError::MissingDataFile(source.clone()))?;
                let target = destination.join(file_name);
                fs::copy(&source, &target)?;
                debug!("Installed {:?} to {:?}", source, target);
                installed.push(target);
            }
        }
        Ok(installed)
    }
}

/// Console command bound to a callable, written `name = module.path:callable`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryPoint {
    pub name: String,
    pub module: String,
    pub callable: String,
}

impl FromStr for EntryPoint {
    type Err = ManifestError;

    fn from_str(entry: &str) -> Result<Self> {
        let invalid = |reason| ManifestError::InvalidEntryPoint {
            entry: entry.to_owned(),
            reason,
        };
        let (name, target) = entry
            .split_once('=')
            .ok_or_else(|| invalid("expected `name = module:callable`"))?;
        let (name, target) = (name.trim(), target.trim());
        if name.is_empty() {
            return Err(invalid("command name is empty"));
        }
        if !name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            return Err(invalid("command name has invalid characters"));
        }
        let (module, callable) = target
            .split_once(':')
            .ok_or_else(|| invalid("reference must be `module:callable`"))?;
        if !module.split('.').all(is_identifier) {
            return Err(invalid("module path is not a dotted identifier"));
        }
        if !is_identifier(callable) {
            return Err(invalid("callable is not an identifier"));
        }
        Ok(EntryPoint {
            name: name.to_owned(),
            module: module.to_owned(),
            callable: callable.to_owned(),
        })
    }
}

impl fmt::Display for EntryPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} = {}:{}", self.name, self.module, self.callable)
    }
}

fn is_identifier(text: &str) -> bool {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    }
}

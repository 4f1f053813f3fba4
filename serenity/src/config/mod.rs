//! Configuration for locating the module and for the check runner
//!
//! Loader settings can come from YAML files or be built in code; every field
//! is optional and filled by `with_defaults`. Command-line arguments
//! override the file.

mod args;

pub use args::Args;

use crate::loader::LoaderError;
use scine_core::SettingValue;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_ARTIFACT_NAME: &str = "serenity.module.so";

/// Where to find the plugin artifact and its resources
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct LoaderConfig {
    /// Installation directory of the wrapper
    pub install_dir: Option<PathBuf>,
    pub artifact_name: Option<String>,
    /// How many directories above `install_dir` the fallback candidate sits
    pub parent_levels: Option<usize>,
    /// Resource directory, relative to `install_dir`
    pub resource_subdir: Option<String>,
    /// Export `SERENITY_RESOURCES` for consumers that read the environment
    pub export_environment: Option<bool>,
}

impl LoaderConfig {
    pub fn new(install_dir: impl Into<PathBuf>) -> Self {
        LoaderConfig {
            install_dir: Some(install_dir.into()),
            ..Default::default()
        }
        .with_defaults()
    }

    /// Apply default values to any missing parameters
    pub fn with_defaults(mut self) -> Self {
        if self.artifact_name.is_none() {
            self.artifact_name = Some(DEFAULT_ARTIFACT_NAME.to_string());
        }
        if self.parent_levels.is_none() {
            self.parent_levels = Some(3);
        }
        if self.resource_subdir.is_none() {
            self.resource_subdir = Some("data".to_string());
        }
        if self.export_environment.is_none() {
            self.export_environment = Some(true);
        }
        self
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self, LoaderError> {
        serde_yml::from_str::<LoaderConfig>(yaml)
            .map(LoaderConfig::with_defaults)
            .map_err(|e| LoaderError::Config(e.to_string()))
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, LoaderError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .map_err(|e| LoaderError::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_yaml_str(&content)
    }
}

/// Atomic position configuration, in Angstrom
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Atom {
    pub element: String,
    pub coords: [f64; 3],
}

/// One calculation to run and check
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct JobConfig {
    pub name: String,
    /// Calculator model, e.g. `dft`
    pub calculator: String,
    pub geometry: Vec<Atom>,
    #[serde(default)]
    pub settings: HashMap<String, SettingValue>,
    /// Required properties by name; energy if empty
    #[serde(default)]
    pub properties: Vec<String>,
    pub reference_energy: Option<f64>,
    pub tolerance: Option<f64>,
}

impl JobConfig {
    pub const DEFAULT_TOLERANCE: f64 = 1e-6;

    pub fn tolerance(&self) -> f64 {
        self.tolerance.unwrap_or(Self::DEFAULT_TOLERANCE)
    }
}

/// Configuration of the `serenity_check` runner
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct CheckConfig {
    #[serde(default)]
    pub loader: LoaderConfig,
    /// Reference jobs are used when empty
    #[serde(default)]
    pub jobs: Vec<JobConfig>,
}

impl CheckConfig {
    pub fn with_defaults(mut self) -> Self {
        self.loader = self.loader.with_defaults();
        self
    }
}

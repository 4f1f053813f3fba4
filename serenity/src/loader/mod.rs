//! Locating and registering the Serenity module.
//!
//! The compiled module (`serenity.module.so`) is installed either next to the
//! wrapper or a fixed number of directories above it. Bootstrapping exports
//! the resource root, finds the first existing candidate and hands it to the
//! module registry, unless the registry already knows the module.

use crate::config::LoaderConfig;
use crate::MODULE_NAME;
use scine_core::{ModuleRegistry, PluginConfig};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

/// Environment variable holding the resource root, with trailing separator.
pub const RESOURCES_ENV: &str = "SERENITY_RESOURCES";

#[derive(Debug, Error)]
pub enum LoaderError {
    #[error("the {artifact} could not be located (searched {searched:?})")]
    ArtifactNotFound {
        artifact: String,
        searched: Vec<PathBuf>,
    },

    #[error("{} was found but could not be loaded: {reason}", .path.display())]
    ArtifactLoadFailure { path: PathBuf, reason: String },

    #[error("no installation directory given")]
    MissingInstallDir,

    #[error("invalid loader configuration: {0}")]
    Config(String),
}

/// Candidate artifact paths and the resource root of one installation.
#[derive(Debug, Clone, PartialEq)]
pub struct Locator {
    install_dir: PathBuf,
    artifact_name: String,
    parent_levels: usize,
    resource_subdir: String,
}

impl Locator {
    pub fn new(install_dir: impl Into<PathBuf>) -> Self {
        Self::with_config(install_dir.into(), &LoaderConfig::default().with_defaults())
    }

    pub fn from_config(config: &LoaderConfig) -> Result<Self, LoaderError> {
        let install_dir = config
            .install_dir
            .clone()
            .ok_or(LoaderError::MissingInstallDir)?;
        Ok(Self::with_config(install_dir, &config.clone().with_defaults()))
    }

    fn with_config(install_dir: PathBuf, config: &LoaderConfig) -> Self {
        // Symlinked installs resolve to their real location.
        let install_dir = fs::canonicalize(&install_dir).unwrap_or(install_dir);
        Self {
            install_dir,
            artifact_name: config
                .artifact_name
                .clone()
                .unwrap_or_else(|| crate::config::DEFAULT_ARTIFACT_NAME.to_string()),
            parent_levels: config.parent_levels.unwrap_or(3),
            resource_subdir: config
                .resource_subdir
                .clone()
                .unwrap_or_else(|| "data".to_string()),
        }
    }

    pub fn install_dir(&self) -> &Path {
        &self.install_dir
    }

    pub fn artifact_name(&self) -> &str {
        &self.artifact_name
    }

    pub fn resource_root(&self) -> PathBuf {
        self.install_dir.join(&self.resource_subdir)
    }

    /// The resource root as a string ending in a path separator.
    pub fn resource_root_string(&self) -> String {
        let mut root = self.resource_root().to_string_lossy().into_owned();
        if !root.ends_with(std::path::MAIN_SEPARATOR) {
            root.push(std::path::MAIN_SEPARATOR);
        }
        root
    }

    /// Candidate artifact paths in search order.
    pub fn candidates(&self) -> Vec<PathBuf> {
        let mut candidates = vec![self.install_dir.join(&self.artifact_name)];
        // Shallow install directories stop at the filesystem root.
        let parent = self
            .install_dir
            .ancestors()
            .nth(self.parent_levels)
            .or_else(|| self.install_dir.ancestors().last());
        if let Some(parent) = parent {
            let fallback = parent.join(&self.artifact_name);
            if !candidates.contains(&fallback) {
                candidates.push(fallback);
            }
        }
        candidates
    }

    /// The first existing candidate.
    pub fn locate(&self) -> Result<PathBuf, LoaderError> {
        let candidates = self.candidates();
        for candidate in &candidates {
            debug!("Looking for {} at {}", self.artifact_name, candidate.display());
            if candidate.is_file() {
                return Ok(candidate.clone());
            }
        }
        Err(LoaderError::ArtifactNotFound {
            artifact: self.artifact_name.clone(),
            searched: candidates,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    AlreadyLoaded,
    Loaded(PathBuf),
}

/// Load the module into `registry` unless it is already there.
pub fn register<R: ModuleRegistry + ?Sized>(
    registry: &mut R,
    locator: &Locator,
    config: &PluginConfig,
) -> Result<LoadOutcome, LoaderError> {
    if registry.module_loaded(MODULE_NAME) {
        debug!("{} module already loaded", MODULE_NAME);
        return Ok(LoadOutcome::AlreadyLoaded);
    }

    let path = locator.locate()?;
    registry
        .load_with(&path, config)
        .map_err(|e| LoaderError::ArtifactLoadFailure {
            path: path.clone(),
            reason: e.to_string(),
        })?;
    if !registry.module_loaded(MODULE_NAME) {
        return Err(LoaderError::ArtifactLoadFailure {
            path,
            reason: format!("library did not provide the {MODULE_NAME} module"),
        });
    }

    info!("Loaded {} module from {}", MODULE_NAME, path.display());
    Ok(LoadOutcome::Loaded(path))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bootstrap {
    /// Resource root with trailing separator.
    pub resource_root: String,
    pub outcome: LoadOutcome,
}

/// Export the resource root and make sure the module is registered.
pub fn bootstrap<R: ModuleRegistry + ?Sized>(
    registry: &mut R,
    config: &LoaderConfig,
) -> Result<Bootstrap, LoaderError> {
    let config = config.clone().with_defaults();
    let locator = Locator::from_config(&config)?;
    let resource_root = locator.resource_root_string();

    if config.export_environment.unwrap_or(true) {
        std::env::set_var(RESOURCES_ENV, &resource_root);
    }

    let plugin_config = PluginConfig::with_resource_root(&resource_root);
    let outcome = register(registry, &locator, &plugin_config)?;
    Ok(Bootstrap {
        resource_root,
        outcome,
    })
}

#[cfg(test)]
mod tests;

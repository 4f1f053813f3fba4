//! Error types shared by modules, calculators and the module manager.

use crate::plugin::PluginError;
use crate::settings::SettingsError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, CoreError>;

#[derive(Debug, Error)]
pub enum CoreError {
    /// No loaded module provides the requested (interface, model) pair.
    #[error("no module implements {interface} model '{model}'")]
    ClassNotImplemented { interface: String, model: String },

    #[error("unknown interface '{0}'")]
    UnknownInterface(String),

    #[error("module '{0}' is already loaded")]
    ModuleAlreadyLoaded(String),

    #[error(transparent)]
    Plugin(#[from] PluginError),

    #[error(transparent)]
    Settings(#[from] SettingsError),

    #[error("invalid settings: {0}")]
    InvalidSettings(String),

    #[error("structure has {elements} elements but {positions} positions")]
    StructureMismatch { elements: usize, positions: usize },

    #[error("invalid element symbol: {0}")]
    InvalidElement(String),

    #[error("missing structure in calculator {0}")]
    MissingStructure(String),

    #[error("unavailable properties requested: {0}")]
    UnavailableProperties(String),

    #[error("calculation was not successful: {0}")]
    UnsuccessfulCalculation(String),

    #[error("dimension mismatch: {0}")]
    DimensionMismatch(String),

    #[error("calculator {0} does not support states")]
    StateNotSupported(String),

    /// A state produced by a different kind of calculator was loaded.
    #[error("state cannot be loaded into calculator {0}")]
    StateCasting(String),
}

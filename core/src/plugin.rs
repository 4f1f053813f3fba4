//! Shared-library entry points for modules.
//!
//! A module library exports two C symbols:
//!
//! - `scine_module_abi_version() -> u32`, which must return
//!   [`SCINE_MODULE_ABI_VERSION`];
//! - `scine_module_factory(config_json: *const c_char) -> *mut c_void`, which
//!   receives a [`PluginConfig`] serialized as JSON and returns the pointer
//!   produced by [`modules_into_raw`], or null on failure.
//!
//! Both sides must be built against the same version of this crate, since
//! trait objects cross the boundary.

use crate::module::Module;
use serde::{Deserialize, Serialize};
use std::ffi::c_void;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;

/// Bumped whenever [`Module`] or the factory signature changes.
pub const SCINE_MODULE_ABI_VERSION: u32 = 1;

pub const ABI_VERSION_SYMBOL: &[u8] = b"scine_module_abi_version\0";
pub const FACTORY_SYMBOL: &[u8] = b"scine_module_factory\0";

pub type AbiVersionFn = unsafe extern "C" fn() -> u32;
pub type FactoryFn = unsafe extern "C" fn(config_json: *const std::ffi::c_char) -> *mut c_void;

#[derive(Debug, Error)]
pub enum PluginError {
    #[error("failed to load library: {0}")]
    LoadFailed(String),

    #[error("missing module entry point: {0}")]
    MissingEntryPoint(String),

    #[error("module factory returned null")]
    NullFactory,

    #[error("ABI version mismatch: expected {expected}, got {actual}")]
    AbiMismatch { expected: u32, actual: u32 },

    #[error("invalid plugin configuration: {0}")]
    Config(String),
}

/// Configuration handed to a module factory at load time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PluginConfig {
    /// Directory holding the module's data files (basis sets, ...).
    pub resource_root: Option<PathBuf>,
}

impl PluginConfig {
    pub fn with_resource_root(resource_root: impl Into<PathBuf>) -> Self {
        Self {
            resource_root: Some(resource_root.into()),
        }
    }

    pub fn to_json(&self) -> Result<String, PluginError> {
        serde_json::to_string(self).map_err(|e| PluginError::Config(e.to_string()))
    }

    pub fn from_json(json: &str) -> Result<Self, PluginError> {
        serde_json::from_str(json).map_err(|e| PluginError::Config(e.to_string()))
    }
}

/// Box a list of modules for return from `scine_module_factory`.
pub fn modules_into_raw(modules: Vec<Arc<dyn Module>>) -> *mut c_void {
    Box::into_raw(Box::new(modules)) as *mut c_void
}

/// Reclaim the modules returned by `scine_module_factory`.
///
/// # Safety
///
/// `ptr` must come from [`modules_into_raw`] and must not be reused afterwards.
pub unsafe fn modules_from_raw(ptr: *mut c_void) -> Vec<Arc<dyn Module>> {
    // SAFETY: caller guarantees ptr was produced by modules_into_raw.
    *unsafe { Box::from_raw(ptr as *mut Vec<Arc<dyn Module>>) }
}

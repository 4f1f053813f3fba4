//! Serenity quantum chemistry as a SCINE calculator module.
//!
//! The crate builds two things: the `serenity.module.so` plugin (with the
//! `native` feature), exposing DFT, HF and CC calculators through the
//! `scine_core` module contract, and the loader that finds and registers
//! that plugin from an installed wrapper.

pub mod app;
pub mod calculators;
pub mod config;
pub mod engine;
#[cfg(feature = "native")]
pub mod export;
pub mod io;
pub mod loader;
pub mod method;
pub mod module;
pub mod settings;

/// Name under which the module registers with the module manager.
pub const MODULE_NAME: &str = "Serenity";

pub use calculators::{CcCalculator, DftCalculator, HfCalculator, SerenityCalculator};
pub use config::{CheckConfig, JobConfig, LoaderConfig};
pub use loader::{bootstrap, register, Bootstrap, LoadOutcome, LoaderError, Locator, RESOURCES_ENV};
pub use method::{CcLevel, Dispersion, ScfMode};
pub use module::{CalculatorModel, SerenityModule};

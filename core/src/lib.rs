//! Host-side contract for SCINE modules.
//!
//! A module is a named bundle of implementations (currently only calculators)
//! that the [`ModuleManager`] either receives directly or loads from a shared
//! library at runtime. Everything a calculator consumes and produces lives here:
//! structures, settings, required properties and results.

pub mod atoms;
pub mod bond_orders;
pub mod calculator;
pub mod error;
pub mod manager;
pub mod module;
pub mod plugin;
pub mod property;
pub mod results;
pub mod settings;
pub mod state;
pub mod thermochemistry;

pub use atoms::{AtomCollection, ANGSTROM_TO_BOHR};
pub use bond_orders::mayer_bond_orders;
pub use calculator::Calculator;
pub use error::{CoreError, Result};
pub use manager::{ModuleManager, ModuleRegistry};
pub use module::{Interface, Module};
pub use plugin::{PluginConfig, PluginError};
pub use property::{Property, PropertyList};
pub use results::{AtomsOrbitalsIndexes, DensityMatrix, ElectronicOccupation, Results};
pub use settings::{Descriptor, SettingValue, Settings, SettingsError};
pub use state::State;
pub use thermochemistry::{ThermochemicalSummary, Thermochemistry};

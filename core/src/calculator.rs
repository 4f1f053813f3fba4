//! The calculator interface.

use crate::atoms::AtomCollection;
use crate::error::{CoreError, Result};
use crate::property::PropertyList;
use crate::results::Results;
use crate::settings::Settings;
use crate::state::State;
use nalgebra::Vector3;
use std::sync::Arc;

/// An electronic-structure calculator bound to one molecular structure.
///
/// Calculators are configured through [`Calculator::settings_mut`] and the
/// required properties, then [`Calculator::calculate`] fills the results for
/// the current structure.
pub trait Calculator: Send {
    fn name(&self) -> &str;

    /// Replace the structure. Any previous electronic structure is discarded.
    fn set_structure(&mut self, structure: AtomCollection) -> Result<()>;

    fn structure(&self) -> Option<&AtomCollection>;

    /// Move atoms without changing the composition of the structure.
    fn modify_positions(&mut self, positions: Vec<Vector3<f64>>) -> Result<()>;

    fn positions(&self) -> Option<&[Vector3<f64>]> {
        self.structure().map(AtomCollection::positions)
    }

    fn set_required_properties(&mut self, properties: PropertyList);

    fn required_properties(&self) -> PropertyList;

    fn possible_properties(&self) -> PropertyList;

    fn settings(&self) -> &Settings;

    fn settings_mut(&mut self) -> &mut Settings;

    fn calculate(&mut self, description: &str) -> Result<&Results>;

    fn results(&self) -> &Results;

    /// True if `family` (e.g. `"DFT"`) names a method family this calculator
    /// implements. Case-insensitive.
    fn supports_method_family(&self, family: &str) -> bool;

    /// Snapshot the structure and electronic structure.
    fn get_state(&self) -> Result<Arc<dyn State>> {
        Err(CoreError::StateNotSupported(self.name().to_string()))
    }

    /// Restore a snapshot taken with [`Calculator::get_state`]. Results are
    /// cleared.
    fn load_state(&mut self, _state: Arc<dyn State>) -> Result<()> {
        Err(CoreError::StateNotSupported(self.name().to_string()))
    }

    fn clone_box(&self) -> Box<dyn Calculator>;
}

impl Clone for Box<dyn Calculator> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}

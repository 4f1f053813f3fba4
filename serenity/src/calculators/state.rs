use crate::engine::ElectronicStructure;
use crate::method::ScfMode;
use scine_core::{AtomCollection, State};
use std::any::Any;

/// Structure and electronic structures of a Serenity calculator.
///
/// Loading a state builds a fresh system from the loading calculator's
/// settings and installs the stored orbitals as its starting point.
#[derive(Debug, Clone)]
pub struct SerenityState {
    structure: AtomCollection,
    electronic_structures: Vec<ElectronicStructure>,
}

impl SerenityState {
    pub fn new(structure: AtomCollection, electronic_structures: Vec<ElectronicStructure>) -> Self {
        Self {
            structure,
            electronic_structures,
        }
    }

    pub fn structure(&self) -> &AtomCollection {
        &self.structure
    }

    pub fn electronic_structures(&self) -> &[ElectronicStructure] {
        &self.electronic_structures
    }

    pub fn electronic_structure(&self, mode: ScfMode) -> Option<&ElectronicStructure> {
        self.electronic_structures.iter().find(|es| es.mode() == mode)
    }
}

impl State for SerenityState {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

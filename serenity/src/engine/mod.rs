//! The boundary to the Serenity library.
//!
//! Everything electronic-structure related happens behind [`Engine`] and
//! [`System`]. The calculators only sequence calls and collect results, so
//! they can be exercised against any implementation of these traits.

#[cfg(feature = "native")]
pub mod native;

use crate::method::{CcLevel, EnergyContribution, Localization, ScfMode};
use crate::settings::SystemSettings;
use nalgebra::DMatrix;
use nalgebra::Vector3;
use scine_core::{AtomCollection, DensityMatrix};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    /// Error raised inside Serenity.
    #[error("{0}")]
    Serenity(String),

    #[error("no {0} electronic structure available")]
    MissingElectronicStructure(ScfMode),

    #[error("engine protocol error: {0}")]
    Protocol(String),
}

/// Electron counts per spin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElectronCount {
    pub alpha: usize,
    pub beta: usize,
}

impl ElectronCount {
    pub fn total(&self) -> usize {
        self.alpha + self.beta
    }
}

/// Molecular orbitals of one spin.
#[derive(Debug, Clone, PartialEq)]
pub struct OrbitalSet {
    /// AO x MO coefficients.
    pub coefficients: DMatrix<f64>,
    pub eigenvalues: Vec<f64>,
    pub n_occupied: usize,
}

/// A converged electronic structure that can be copied between systems
/// sharing the same basis.
#[derive(Debug, Clone, PartialEq)]
pub enum ElectronicStructure {
    Restricted(OrbitalSet),
    Unrestricted { alpha: OrbitalSet, beta: OrbitalSet },
}

impl ElectronicStructure {
    pub fn mode(&self) -> ScfMode {
        match self {
            ElectronicStructure::Restricted(_) => ScfMode::Restricted,
            ElectronicStructure::Unrestricted { .. } => ScfMode::Unrestricted,
        }
    }
}

/// Creates Serenity systems.
pub trait Engine: Send + Sync {
    fn create_system(
        &self,
        settings: &SystemSettings,
        structure: &AtomCollection,
    ) -> Result<Box<dyn System>, EngineError>;
}

/// One Serenity system: geometry, basis and (after an SCF) an electronic
/// structure per SCF mode. Positions are in Bohr.
pub trait System: Send {
    fn settings(&self) -> &SystemSettings;

    fn set_positions(&mut self, positions: &[Vector3<f64>]) -> Result<(), EngineError>;

    /// Drop the restricted and unrestricted electronic structures.
    fn reset_electronic_structure(&mut self);

    fn run_scf(&mut self, mode: ScfMode) -> Result<(), EngineError>;

    fn energy(&self, mode: ScfMode, contribution: EnergyContribution) -> Result<f64, EngineError>;

    /// Nuclear gradients of the SCF energy, N x 3.
    fn gradients(&mut self, mode: ScfMode) -> Result<DMatrix<f64>, EngineError>;

    /// Gradient of the dispersion correction, N x 3.
    fn dispersion_gradient(&self) -> Result<DMatrix<f64>, EngineError>;

    /// Numerical Hessian, 3N x 3N.
    fn hessian(&mut self, mode: ScfMode) -> Result<DMatrix<f64>, EngineError>;

    /// Mulliken electron population per atom, summed over spins.
    fn mulliken_populations(&self, mode: ScfMode) -> Result<Vec<f64>, EngineError>;

    /// Effective (core) nuclear charge per atom.
    fn effective_charges(&self) -> Result<Vec<f64>, EngineError>;

    /// Half-open basis function ranges `[first, end)` per atom.
    fn basis_indices(&self) -> Result<Vec<(usize, usize)>, EngineError>;

    fn overlap(&self) -> Result<DMatrix<f64>, EngineError>;

    fn density_matrix(&self, mode: ScfMode) -> Result<DensityMatrix, EngineError>;

    fn n_electrons(&self, mode: ScfMode) -> Result<ElectronCount, EngineError>;

    fn localize_orbitals(&mut self, mode: ScfMode, method: Localization) -> Result<(), EngineError>;

    fn coupled_cluster(&mut self, level: CcLevel) -> Result<(), EngineError>;

    /// The electronic structure for `mode`, if one has been computed or set.
    fn electronic_structure(&self, mode: ScfMode) -> Result<Option<ElectronicStructure>, EngineError>;

    /// Install orbitals as the electronic structure of their SCF mode.
    fn set_electronic_structure(&mut self, structure: &ElectronicStructure) -> Result<(), EngineError>;
}

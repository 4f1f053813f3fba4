//! Results container filled by calculators.

use crate::property::{Property, PropertyList};
use crate::thermochemistry::ThermochemicalSummary;
use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};
use std::ops::Range;

/// Maps atoms to contiguous ranges of atomic orbitals.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AtomsOrbitalsIndexes {
    first_orbital: Vec<usize>,
    n_orbitals: Vec<usize>,
}

impl AtomsOrbitalsIndexes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append the next atom owning `n_orbitals` orbitals.
    pub fn add_atom(&mut self, n_orbitals: usize) {
        let first = self.n_atomic_orbitals();
        self.first_orbital.push(first);
        self.n_orbitals.push(n_orbitals);
    }

    pub fn first_orbital_index(&self, atom: usize) -> Option<usize> {
        self.first_orbital.get(atom).copied()
    }

    pub fn n_orbitals(&self, atom: usize) -> Option<usize> {
        self.n_orbitals.get(atom).copied()
    }

    pub fn n_atoms(&self) -> usize {
        self.n_orbitals.len()
    }

    pub fn n_atomic_orbitals(&self) -> usize {
        self.n_orbitals.iter().sum()
    }

    /// Orbital index range of each atom, in atom order.
    pub fn ranges(&self) -> impl Iterator<Item = Range<usize>> + '_ {
        self.first_orbital
            .iter()
            .zip(&self.n_orbitals)
            .map(|(&first, &n)| first..first + n)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DensityMatrix {
    Restricted(DMatrix<f64>),
    Unrestricted {
        alpha: DMatrix<f64>,
        beta: DMatrix<f64>,
    },
}

impl DensityMatrix {
    pub fn is_unrestricted(&self) -> bool {
        matches!(self, DensityMatrix::Unrestricted { .. })
    }

    /// Total density; alpha plus beta for the unrestricted case.
    pub fn total(&self) -> DMatrix<f64> {
        match self {
            DensityMatrix::Restricted(p) => p.clone(),
            DensityMatrix::Unrestricted { alpha, beta } => alpha + beta,
        }
    }
}

/// Number of occupied orbitals, filled from the lowest energy up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ElectronicOccupation {
    Restricted { n_occupied: usize },
    Unrestricted { n_alpha: usize, n_beta: usize },
}

impl ElectronicOccupation {
    pub fn n_electrons(&self) -> usize {
        let (alpha, beta) = self.spin_counts();
        alpha + beta
    }

    /// Occupied (alpha, beta) orbital counts.
    pub fn spin_counts(&self) -> (usize, usize) {
        match *self {
            ElectronicOccupation::Restricted { n_occupied } => (n_occupied, n_occupied),
            ElectronicOccupation::Unrestricted { n_alpha, n_beta } => (n_alpha, n_beta),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Results {
    pub successful_calculation: Option<bool>,
    pub energy: Option<f64>,
    /// N x 3, Hartree/Bohr.
    pub gradients: Option<DMatrix<f64>>,
    pub hessian: Option<DMatrix<f64>>,
    pub overlap_matrix: Option<DMatrix<f64>>,
    pub density_matrix: Option<DensityMatrix>,
    pub atomic_charges: Option<Vec<f64>>,
    pub ao_to_atom_mapping: Option<AtomsOrbitalsIndexes>,
    pub electronic_occupation: Option<ElectronicOccupation>,
    /// Mayer bond orders, N x N.
    pub bond_orders: Option<DMatrix<f64>>,
    pub thermochemistry: Option<ThermochemicalSummary>,
    pub program_name: Option<String>,
}

impl Results {
    pub fn has(&self, property: Property) -> bool {
        match property {
            Property::Energy => self.energy.is_some(),
            Property::Gradients => self.gradients.is_some(),
            Property::Hessian => self.hessian.is_some(),
            Property::AtomicCharges => self.atomic_charges.is_some(),
            Property::AoToAtomMapping => self.ao_to_atom_mapping.is_some(),
            Property::DensityMatrix => self.density_matrix.is_some(),
            Property::OverlapMatrix => self.overlap_matrix.is_some(),
            Property::ElectronicOccupation => self.electronic_occupation.is_some(),
            Property::BondOrderMatrix => self.bond_orders.is_some(),
            Property::Thermochemistry => self.thermochemistry.is_some(),
            Property::SuccessfulCalculation => self.successful_calculation.is_some(),
            Property::ProgramName => self.program_name.is_some(),
        }
    }

    /// Properties currently present.
    pub fn available(&self) -> PropertyList {
        Property::ALL
            .iter()
            .copied()
            .filter(|p| self.has(*p))
            .fold(PropertyList::empty(), |list, p| list | p)
    }

    pub fn successful(&self) -> bool {
        self.successful_calculation.unwrap_or(false)
    }
}

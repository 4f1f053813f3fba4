//! Ideal-gas, rigid-rotor, harmonic-oscillator thermochemistry.
//!
//! Works on a Cartesian Hessian in Hartree/Bohr^2. Translations and
//! rotations are projected out of the mass-weighted Hessian before the
//! vibrational frequencies are taken from its eigenvalues.

use crate::atoms::AtomCollection;
use crate::error::{CoreError, Result};
use nalgebra::{DMatrix, DVector, Matrix3, Vector3};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Boltzmann constant in Hartree/K.
pub const BOLTZMANN_HARTREE: f64 = 3.166_811_563e-6;
/// Unified atomic mass unit in electron masses.
pub const AMU_TO_ELECTRON_MASS: f64 = 1_822.888_486_209;
pub const HARTREE_TO_WAVENUMBER: f64 = 219_474.631_363_2;
pub const HARTREE_TO_JOULE: f64 = 4.359_744_722_207_1e-18;

const BOLTZMANN_SI: f64 = 1.380_649e-23;
const PLANCK_SI: f64 = 6.626_070_15e-34;
const AMU_SI: f64 = 1.660_539_066_60e-27;

pub const DEFAULT_TEMPERATURE: f64 = 298.15;
/// Pa.
pub const DEFAULT_PRESSURE: f64 = 101_325.0;

/// Thermodynamic quantities of one structure. Energies are in Hartree,
/// entropy and heat capacity in Hartree/K.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThermochemicalSummary {
    pub temperature: f64,
    pub pressure: f64,
    /// cm^-1, ascending; imaginary modes are negative.
    pub vibrational_frequencies: Vec<f64>,
    pub zero_point_vibrational_energy: f64,
    pub enthalpy: f64,
    pub entropy: f64,
    pub heat_capacity_p: f64,
    pub heat_capacity_v: f64,
    pub gibbs_free_energy: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Rotor {
    Atom,
    Linear,
    NonLinear,
}

/// Thermochemistry of `structure` from its Hessian.
pub struct Thermochemistry<'a> {
    structure: &'a AtomCollection,
    hessian: &'a DMatrix<f64>,
    temperature: f64,
    pressure: f64,
    multiplicity: usize,
    symmetry_number: usize,
}

impl<'a> Thermochemistry<'a> {
    pub fn new(structure: &'a AtomCollection, hessian: &'a DMatrix<f64>) -> Self {
        Self {
            structure,
            hessian,
            temperature: DEFAULT_TEMPERATURE,
            pressure: DEFAULT_PRESSURE,
            multiplicity: 1,
            symmetry_number: 1,
        }
    }

    /// Kelvin.
    pub fn temperature(mut self, temperature: f64) -> Self {
        self.temperature = temperature;
        self
    }

    /// Pa.
    pub fn pressure(mut self, pressure: f64) -> Self {
        self.pressure = pressure;
        self
    }

    pub fn multiplicity(mut self, multiplicity: usize) -> Self {
        self.multiplicity = multiplicity.max(1);
        self
    }

    pub fn symmetry_number(mut self, symmetry_number: usize) -> Self {
        self.symmetry_number = symmetry_number.max(1);
        self
    }

    /// Harmonic frequencies in atomic units (Hartree), ascending. Imaginary
    /// modes are returned as negative values.
    pub fn harmonic_frequencies(&self) -> Result<Vec<f64>> {
        let n = 3 * self.structure.len();
        if self.hessian.shape() != (n, n) {
            return Err(CoreError::DimensionMismatch(format!(
                "Hessian is {}x{}, expected {n}x{n}",
                self.hessian.nrows(),
                self.hessian.ncols()
            )));
        }

        let masses = self.masses();
        let inv_sqrt_mass: DVector<f64> =
            DVector::from_iterator(n, masses.iter().flat_map(|m| [1.0 / m.sqrt(); 3]));
        let mut weighted = self.hessian.clone();
        for i in 0..n {
            for j in 0..n {
                weighted[(i, j)] *= inv_sqrt_mass[i] * inv_sqrt_mass[j];
            }
        }

        let internal = internal_basis(&self.external_modes(&masses), n);
        if internal.ncols() == 0 {
            return Ok(Vec::new());
        }
        let projected = internal.transpose() * weighted * &internal;
        let eigen = projected.symmetric_eigen();

        let mut frequencies: Vec<f64> = eigen
            .eigenvalues
            .iter()
            .map(|&lambda| lambda.signum() * (lambda.abs() / AMU_TO_ELECTRON_MASS).sqrt())
            .collect();
        frequencies.sort_by(|a, b| a.total_cmp(b));
        Ok(frequencies)
    }

    pub fn compute(&self, electronic_energy: f64) -> Result<ThermochemicalSummary> {
        if !(self.temperature > 0.0) {
            return Err(CoreError::InvalidSettings(format!(
                "thermochemistry needs a positive temperature, got {}",
                self.temperature
            )));
        }
        if !(self.pressure > 0.0) {
            return Err(CoreError::InvalidSettings(format!(
                "thermochemistry needs a positive pressure, got {}",
                self.pressure
            )));
        }

        let frequencies = self.harmonic_frequencies()?;
        let t = self.temperature;
        let kt = BOLTZMANN_HARTREE * t;

        let mut zpve = 0.0;
        let mut vib_energy = 0.0;
        let mut vib_entropy = 0.0;
        let mut vib_cv = 0.0;
        for &omega in &frequencies {
            if omega <= 0.0 {
                warn!(
                    "Skipping imaginary mode of {:.1} cm^-1 in thermochemistry",
                    omega * HARTREE_TO_WAVENUMBER
                );
                continue;
            }
            let x = omega / kt;
            let boltzmann = (-x).exp();
            let one_minus = -(-x).exp_m1();
            zpve += 0.5 * omega;
            vib_energy += omega * boltzmann / one_minus;
            vib_entropy += x * boltzmann / one_minus - one_minus.ln();
            vib_cv += x * x * boltzmann / (one_minus * one_minus);
        }

        let masses = self.masses();
        let total_mass: f64 = masses.iter().sum();
        let translational_entropy = {
            let m = total_mass * AMU_SI;
            let kt_si = BOLTZMANN_SI * t;
            let q = (2.0 * std::f64::consts::PI * m * kt_si / (PLANCK_SI * PLANCK_SI)).powf(1.5)
                * kt_si
                / self.pressure;
            q.ln() + 2.5
        };

        let moments = self.principal_moments(&masses);
        let sigma = self.symmetry_number as f64;
        let (rot_energy, rot_entropy, rot_cv) = match rotor(&moments, self.structure.len()) {
            Rotor::Atom => (0.0, 0.0, 0.0),
            Rotor::Linear => {
                let theta = rotational_temperature(moments[2]);
                (kt, (t / (sigma * theta)).ln() + 1.0, 1.0)
            }
            Rotor::NonLinear => {
                let product: f64 = moments.iter().map(|&i| rotational_temperature(i)).product();
                let q = std::f64::consts::PI.sqrt() / sigma * (t.powi(3) / product).sqrt();
                (1.5 * kt, q.ln() + 1.5, 1.5)
            }
        };

        let electronic_entropy = (self.multiplicity as f64).ln();

        let internal_energy = electronic_energy + zpve + vib_energy + 1.5 * kt + rot_energy;
        let enthalpy = internal_energy + kt;
        let entropy = BOLTZMANN_HARTREE
            * (translational_entropy + rot_entropy + vib_entropy + electronic_entropy);
        let heat_capacity_v = BOLTZMANN_HARTREE * (1.5 + rot_cv + vib_cv);

        Ok(ThermochemicalSummary {
            temperature: t,
            pressure: self.pressure,
            vibrational_frequencies: frequencies
                .iter()
                .map(|w| w * HARTREE_TO_WAVENUMBER)
                .collect(),
            zero_point_vibrational_energy: zpve,
            enthalpy,
            entropy,
            heat_capacity_p: heat_capacity_v + BOLTZMANN_HARTREE,
            heat_capacity_v,
            gibbs_free_energy: enthalpy - t * entropy,
        })
    }

    fn masses(&self) -> Vec<f64> {
        self.structure
            .elements()
            .iter()
            .map(|e| e.get_atomic_mass() as f64)
            .collect()
    }

    fn center_of_mass(&self, masses: &[f64]) -> Vector3<f64> {
        let total: f64 = masses.iter().sum();
        self.structure
            .positions()
            .iter()
            .zip(masses)
            .fold(Vector3::zeros(), |acc, (r, m)| acc + r * *m)
            / total
    }

    /// Ascending principal moments of inertia in amu Bohr^2.
    fn principal_moments(&self, masses: &[f64]) -> [f64; 3] {
        let com = self.center_of_mass(masses);
        let mut inertia = Matrix3::zeros();
        for (r, m) in self.structure.positions().iter().zip(masses) {
            let d = r - com;
            inertia += (Matrix3::identity() * d.norm_squared() - d * d.transpose()) * *m;
        }
        let mut moments: Vec<f64> = inertia.symmetric_eigenvalues().iter().copied().collect();
        moments.sort_by(|a, b| a.total_cmp(b));
        [moments[0].max(0.0), moments[1].max(0.0), moments[2].max(0.0)]
    }

    /// Mass-weighted translation and rotation vectors.
    fn external_modes(&self, masses: &[f64]) -> Vec<DVector<f64>> {
        let n = 3 * masses.len();
        let com = self.center_of_mass(masses);
        let mut modes = Vec::with_capacity(6);
        for axis in 0..3 {
            let mut translation = DVector::zeros(n);
            for (atom, m) in masses.iter().enumerate() {
                translation[3 * atom + axis] = m.sqrt();
            }
            modes.push(translation);
        }
        for axis in 0..3 {
            let unit = Vector3::ith(axis, 1.0);
            let mut rotation = DVector::zeros(n);
            for (atom, (r, m)) in self.structure.positions().iter().zip(masses).enumerate() {
                let v = unit.cross(&(r - com)) * m.sqrt();
                for k in 0..3 {
                    rotation[3 * atom + k] = v[k];
                }
            }
            modes.push(rotation);
        }
        modes
    }
}

/// Orthonormal basis of the complement of `external` in R^n.
fn internal_basis(external: &[DVector<f64>], n: usize) -> DMatrix<f64> {
    let mut orthonormal: Vec<DVector<f64>> = Vec::new();
    for mode in external {
        let mut v = mode.clone();
        for u in &orthonormal {
            let overlap = u.dot(&v);
            v -= u * overlap;
        }
        let norm = v.norm();
        if norm > 1e-6 {
            orthonormal.push(v / norm);
        }
    }

    let mut projector = DMatrix::identity(n, n);
    for u in &orthonormal {
        projector -= u * u.transpose();
    }
    let eigen = projector.symmetric_eigen();
    let columns: Vec<DVector<f64>> = eigen
        .eigenvalues
        .iter()
        .enumerate()
        .filter(|(_, value)| **value > 0.5)
        .map(|(i, _)| eigen.eigenvectors.column(i).into_owned())
        .collect();
    if columns.is_empty() {
        return DMatrix::zeros(n, 0);
    }
    DMatrix::from_columns(&columns)
}

fn rotor(moments: &[f64; 3], n_atoms: usize) -> Rotor {
    if n_atoms < 2 || moments[2] < 1e-8 {
        Rotor::Atom
    } else if moments[0] < 1e-6 * moments[2] {
        Rotor::Linear
    } else {
        Rotor::NonLinear
    }
}

/// Rotational temperature in K for a moment of inertia in amu Bohr^2.
fn rotational_temperature(moment: f64) -> f64 {
    1.0 / (2.0 * moment * AMU_TO_ELECTRON_MASS * BOLTZMANN_HARTREE)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Harmonic bond of force constant `k` along x between two atoms.
    fn diatomic(symbol: &str, distance: f64, k: f64) -> (AtomCollection, DMatrix<f64>) {
        let structure = AtomCollection::from_symbols(
            &[symbol, symbol],
            vec![Vector3::zeros(), Vector3::new(distance, 0.0, 0.0)],
        )
        .unwrap();
        let mut hessian = DMatrix::zeros(6, 6);
        hessian[(0, 0)] = k;
        hessian[(3, 3)] = k;
        hessian[(0, 3)] = -k;
        hessian[(3, 0)] = -k;
        (structure, hessian)
    }

    #[test]
    fn test_diatomic_has_one_vibration() {
        let (h2, hessian) = diatomic("H", 1.4, 0.37);
        let frequencies = Thermochemistry::new(&h2, &hessian)
            .harmonic_frequencies()
            .unwrap();
        assert_eq!(frequencies.len(), 1);

        let mass = h2.elements()[0].get_atomic_mass() as f64;
        let expected = (0.37 / (0.5 * mass) / AMU_TO_ELECTRON_MASS).sqrt();
        assert!((frequencies[0] - expected).abs() < 1e-8);
        assert!((frequencies[0] * HARTREE_TO_WAVENUMBER - 4404.4).abs() < 1.0);
    }

    #[test]
    fn test_zero_point_energy_and_enthalpy() {
        let (h2, hessian) = diatomic("H", 1.4, 0.37);
        let summary = Thermochemistry::new(&h2, &hessian)
            .temperature(300.0)
            .compute(-1.0)
            .unwrap();
        let omega = summary.vibrational_frequencies[0] / HARTREE_TO_WAVENUMBER;
        assert!((summary.zero_point_vibrational_energy - 0.5 * omega).abs() < 1e-10);

        // The vibration is frozen at 300 K; linear rotor and translation are classical.
        let kt = BOLTZMANN_HARTREE * 300.0;
        let expected = -1.0 + 0.5 * omega + 1.5 * kt + kt + kt;
        assert!((summary.enthalpy - expected).abs() < 1e-8);
        assert!((summary.gibbs_free_energy - (summary.enthalpy - 300.0 * summary.entropy)).abs() < 1e-12);
        assert!((summary.heat_capacity_p - summary.heat_capacity_v - BOLTZMANN_HARTREE).abs() < 1e-15);
    }

    #[test]
    fn test_argon_translational_entropy() {
        let argon = AtomCollection::from_symbols(&["Ar"], vec![Vector3::zeros()]).unwrap();
        let hessian = DMatrix::zeros(3, 3);
        let summary = Thermochemistry::new(&argon, &hessian)
            .temperature(298.15)
            .pressure(1.0e5)
            .compute(0.0)
            .unwrap();
        assert!(summary.vibrational_frequencies.is_empty());
        assert_eq!(summary.zero_point_vibrational_energy, 0.0);

        // Sackur-Tetrode: 154.8 J/(mol K) at 1 bar.
        let molar = summary.entropy * HARTREE_TO_JOULE * 6.022_140_76e23;
        assert!((molar - 154.83).abs() < 0.05, "{molar}");
        let kt = BOLTZMANN_HARTREE * 298.15;
        assert!((summary.enthalpy - 2.5 * kt).abs() < 1e-12);
    }

    #[test]
    fn test_triplet_adds_electronic_entropy() {
        let (o2, hessian) = diatomic("O", 2.28, 0.7);
        let singlet = Thermochemistry::new(&o2, &hessian).compute(0.0).unwrap();
        let triplet = Thermochemistry::new(&o2, &hessian)
            .multiplicity(3)
            .compute(0.0)
            .unwrap();
        let diff = triplet.entropy - singlet.entropy;
        assert!((diff - BOLTZMANN_HARTREE * 3.0_f64.ln()).abs() < 1e-15);
    }

    #[test]
    fn test_rejects_bad_input() {
        let (h2, hessian) = diatomic("H", 1.4, 0.37);
        assert!(matches!(
            Thermochemistry::new(&h2, &hessian).temperature(0.0).compute(0.0),
            Err(CoreError::InvalidSettings(_))
        ));
        let wrong = DMatrix::zeros(3, 3);
        assert!(matches!(
            Thermochemistry::new(&h2, &wrong).compute(0.0),
            Err(CoreError::DimensionMismatch(_))
        ));
    }
}

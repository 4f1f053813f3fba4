//! [`Engine`] backed by the compiled Serenity library.
//!
//! The library is reached through a small C bridge (`libserenity_bridge`)
//! that owns Serenity `SystemController`s and answers JSON requests:
//!
//! - `serenity_bridge_create(settings, structure)` returns a handle or null;
//! - `serenity_bridge_command(handle, request)` returns a JSON response
//!   `{"ok": <value>}` or `{"error": "<message>"}`;
//! - strings returned by the bridge are released with
//!   `serenity_bridge_free_string`, handles with `serenity_bridge_destroy`;
//! - `serenity_bridge_last_error()` describes the last failed `create`.

use super::{ElectronCount, ElectronicStructure, Engine, EngineError, OrbitalSet, System};
use crate::method::{CcLevel, EnergyContribution, Localization, ScfMode};
use crate::settings::SystemSettings;
use nalgebra::{DMatrix, Vector3};
use scine_core::{AtomCollection, DensityMatrix};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::ffi::{c_char, c_void, CStr, CString};
use tracing::debug;

extern "C" {
    fn serenity_bridge_create(settings_json: *const c_char, structure_json: *const c_char) -> *mut c_void;
    fn serenity_bridge_command(handle: *mut c_void, request_json: *const c_char) -> *mut c_char;
    fn serenity_bridge_free_string(s: *mut c_char);
    fn serenity_bridge_destroy(handle: *mut c_void);
    fn serenity_bridge_last_error() -> *mut c_char;
}

#[derive(Serialize)]
struct StructurePayload<'a> {
    symbols: Vec<String>,
    /// Bohr.
    positions: &'a [Vector3<f64>],
}

#[derive(Serialize)]
#[serde(tag = "command", rename_all = "snake_case")]
enum Request<'a> {
    SetPositions { positions: &'a [Vector3<f64>] },
    ResetElectronicStructure,
    RunScf { mode: ScfMode },
    Energy { mode: ScfMode, contribution: EnergyContribution },
    Gradients { mode: ScfMode },
    DispersionGradient,
    Hessian { mode: ScfMode },
    MullikenPopulations { mode: ScfMode },
    EffectiveCharges,
    BasisIndices,
    Overlap,
    DensityMatrix { mode: ScfMode },
    NElectrons { mode: ScfMode },
    Localize { mode: ScfMode, method: Localization },
    CoupledCluster { level: CcLevel },
    ElectronicStructure { mode: ScfMode },
    SetElectronicStructure { structure: OrbitalsPayload },
}

#[derive(Deserialize)]
#[serde(rename_all = "snake_case")]
enum Response {
    Ok(Value),
    Error(String),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum DensityPayload {
    Restricted(Vec<Vec<f64>>),
    Unrestricted { alpha: Vec<Vec<f64>>, beta: Vec<Vec<f64>> },
}

#[derive(Serialize, Deserialize)]
struct OrbitalSetPayload {
    coefficients: Vec<Vec<f64>>,
    eigenvalues: Vec<f64>,
    n_occupied: usize,
}

impl OrbitalSetPayload {
    fn from_orbitals(orbitals: &OrbitalSet) -> Self {
        Self {
            coefficients: matrix_to_rows(&orbitals.coefficients),
            eigenvalues: orbitals.eigenvalues.clone(),
            n_occupied: orbitals.n_occupied,
        }
    }

    fn into_orbitals(self) -> Result<OrbitalSet, EngineError> {
        Ok(OrbitalSet {
            coefficients: matrix_from_rows(self.coefficients)?,
            eigenvalues: self.eigenvalues,
            n_occupied: self.n_occupied,
        })
    }
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum OrbitalsPayload {
    Restricted(OrbitalSetPayload),
    Unrestricted {
        alpha: OrbitalSetPayload,
        beta: OrbitalSetPayload,
    },
}

impl OrbitalsPayload {
    fn from_structure(structure: &ElectronicStructure) -> Self {
        match structure {
            ElectronicStructure::Restricted(orbitals) => {
                OrbitalsPayload::Restricted(OrbitalSetPayload::from_orbitals(orbitals))
            }
            ElectronicStructure::Unrestricted { alpha, beta } => OrbitalsPayload::Unrestricted {
                alpha: OrbitalSetPayload::from_orbitals(alpha),
                beta: OrbitalSetPayload::from_orbitals(beta),
            },
        }
    }

    fn into_structure(self) -> Result<ElectronicStructure, EngineError> {
        Ok(match self {
            OrbitalsPayload::Restricted(orbitals) => {
                ElectronicStructure::Restricted(orbitals.into_orbitals()?)
            }
            OrbitalsPayload::Unrestricted { alpha, beta } => ElectronicStructure::Unrestricted {
                alpha: alpha.into_orbitals()?,
                beta: beta.into_orbitals()?,
            },
        })
    }
}

fn matrix_to_rows(matrix: &DMatrix<f64>) -> Vec<Vec<f64>> {
    matrix
        .row_iter()
        .map(|row| row.iter().copied().collect())
        .collect()
}

fn matrix_from_rows(rows: Vec<Vec<f64>>) -> Result<DMatrix<f64>, EngineError> {
    let n_rows = rows.len();
    let n_cols = rows.first().map_or(0, Vec::len);
    if rows.iter().any(|r| r.len() != n_cols) {
        return Err(EngineError::Protocol("ragged matrix".to_string()));
    }
    Ok(DMatrix::from_row_iterator(
        n_rows,
        n_cols,
        rows.into_iter().flatten(),
    ))
}

fn json_cstring<T: Serialize>(value: &T) -> Result<CString, EngineError> {
    let json = serde_json::to_string(value).map_err(|e| EngineError::Protocol(e.to_string()))?;
    CString::new(json).map_err(|e| EngineError::Protocol(e.to_string()))
}

/// Copy and release a string owned by the bridge.
unsafe fn take_bridge_string(ptr: *mut c_char) -> Option<String> {
    if ptr.is_null() {
        return None;
    }
    // SAFETY: non-null strings from the bridge are NUL-terminated.
    let text = unsafe { CStr::from_ptr(ptr) }.to_string_lossy().into_owned();
    unsafe { serenity_bridge_free_string(ptr) };
    Some(text)
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NativeEngine;

impl NativeEngine {
    pub fn new() -> Self {
        Self
    }
}

impl Engine for NativeEngine {
    fn create_system(
        &self,
        settings: &SystemSettings,
        structure: &AtomCollection,
    ) -> Result<Box<dyn System>, EngineError> {
        let settings_json = json_cstring(settings)?;
        let structure_json = json_cstring(&StructurePayload {
            symbols: structure.symbols(),
            positions: structure.positions(),
        })?;
        // SAFETY: both arguments are valid NUL-terminated strings.
        let handle = unsafe { serenity_bridge_create(settings_json.as_ptr(), structure_json.as_ptr()) };
        if handle.is_null() {
            // SAFETY: last_error returns null or a bridge-owned string.
            let message = unsafe { take_bridge_string(serenity_bridge_last_error()) }
                .unwrap_or_else(|| "system creation failed".to_string());
            return Err(EngineError::Serenity(message));
        }
        debug!("Created Serenity system {}", settings.name);
        Ok(Box::new(NativeSystem {
            handle,
            settings: settings.clone(),
        }))
    }
}

pub struct NativeSystem {
    handle: *mut c_void,
    settings: SystemSettings,
}

// SAFETY: the handle is only used through &mut self or &self on one thread at
// a time; the bridge does not keep thread-local state per handle.
unsafe impl Send for NativeSystem {}

impl NativeSystem {
    fn call(&self, request: &Request<'_>) -> Result<Value, EngineError> {
        let request_json = json_cstring(request)?;
        // SAFETY: handle is live until drop; request is NUL-terminated.
        let raw = unsafe { serenity_bridge_command(self.handle, request_json.as_ptr()) };
        let text = unsafe { take_bridge_string(raw) }
            .ok_or_else(|| EngineError::Protocol("empty response".to_string()))?;
        match serde_json::from_str::<Response>(&text) {
            Ok(Response::Ok(value)) => Ok(value),
            Ok(Response::Error(message)) => Err(EngineError::Serenity(message)),
            Err(e) => Err(EngineError::Protocol(e.to_string())),
        }
    }

    fn query<T: DeserializeOwned>(&self, request: &Request<'_>) -> Result<T, EngineError> {
        let value = self.call(request)?;
        serde_json::from_value(value).map_err(|e| EngineError::Protocol(e.to_string()))
    }

    fn query_matrix(&self, request: &Request<'_>) -> Result<DMatrix<f64>, EngineError> {
        matrix_from_rows(self.query(request)?)
    }
}

impl Drop for NativeSystem {
    fn drop(&mut self) {
        // SAFETY: handle came from serenity_bridge_create and is released once.
        unsafe { serenity_bridge_destroy(self.handle) };
    }
}

impl System for NativeSystem {
    fn settings(&self) -> &SystemSettings {
        &self.settings
    }

    fn set_positions(&mut self, positions: &[Vector3<f64>]) -> Result<(), EngineError> {
        self.call(&Request::SetPositions { positions }).map(|_| ())
    }

    fn reset_electronic_structure(&mut self) {
        if let Err(e) = self.call(&Request::ResetElectronicStructure) {
            tracing::warn!("Could not reset electronic structure: {}", e);
        }
    }

    fn run_scf(&mut self, mode: ScfMode) -> Result<(), EngineError> {
        self.call(&Request::RunScf { mode }).map(|_| ())
    }

    fn energy(&self, mode: ScfMode, contribution: EnergyContribution) -> Result<f64, EngineError> {
        self.query(&Request::Energy { mode, contribution })
    }

    fn gradients(&mut self, mode: ScfMode) -> Result<DMatrix<f64>, EngineError> {
        self.query_matrix(&Request::Gradients { mode })
    }

    fn dispersion_gradient(&self) -> Result<DMatrix<f64>, EngineError> {
        self.query_matrix(&Request::DispersionGradient)
    }

    fn hessian(&mut self, mode: ScfMode) -> Result<DMatrix<f64>, EngineError> {
        self.query_matrix(&Request::Hessian { mode })
    }

    fn mulliken_populations(&self, mode: ScfMode) -> Result<Vec<f64>, EngineError> {
        self.query(&Request::MullikenPopulations { mode })
    }

    fn effective_charges(&self) -> Result<Vec<f64>, EngineError> {
        self.query(&Request::EffectiveCharges)
    }

    fn basis_indices(&self) -> Result<Vec<(usize, usize)>, EngineError> {
        self.query(&Request::BasisIndices)
    }

    fn overlap(&self) -> Result<DMatrix<f64>, EngineError> {
        self.query_matrix(&Request::Overlap)
    }

    fn density_matrix(&self, mode: ScfMode) -> Result<DensityMatrix, EngineError> {
        match self.query(&Request::DensityMatrix { mode })? {
            DensityPayload::Restricted(rows) => Ok(DensityMatrix::Restricted(matrix_from_rows(rows)?)),
            DensityPayload::Unrestricted { alpha, beta } => Ok(DensityMatrix::Unrestricted {
                alpha: matrix_from_rows(alpha)?,
                beta: matrix_from_rows(beta)?,
            }),
        }
    }

    fn n_electrons(&self, mode: ScfMode) -> Result<ElectronCount, EngineError> {
        self.query(&Request::NElectrons { mode })
    }

    fn localize_orbitals(&mut self, mode: ScfMode, method: Localization) -> Result<(), EngineError> {
        self.call(&Request::Localize { mode, method }).map(|_| ())
    }

    fn coupled_cluster(&mut self, level: CcLevel) -> Result<(), EngineError> {
        self.call(&Request::CoupledCluster { level }).map(|_| ())
    }

    fn electronic_structure(&self, mode: ScfMode) -> Result<Option<ElectronicStructure>, EngineError> {
        self.query::<Option<OrbitalsPayload>>(&Request::ElectronicStructure { mode })?
            .map(OrbitalsPayload::into_structure)
            .transpose()
    }

    fn set_electronic_structure(&mut self, structure: &ElectronicStructure) -> Result<(), EngineError> {
        let structure = OrbitalsPayload::from_structure(structure);
        self.call(&Request::SetElectronicStructure { structure }).map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_encoding() {
        let json = serde_json::to_string(&Request::Energy {
            mode: ScfMode::Restricted,
            contribution: EnergyContribution::CcsdCorrection,
        })
        .unwrap();
        assert_eq!(
            json,
            r#"{"command":"energy","mode":"restricted","contribution":"CCSD_CORRECTION"}"#
        );
    }

    #[test]
    fn test_matrix_rows() {
        let m = matrix_from_rows(vec![vec![1.0, 2.0], vec![3.0, 4.0]]).unwrap();
        assert_eq!(m[(1, 0)], 3.0);
        assert_eq!(matrix_to_rows(&m), vec![vec![1.0, 2.0], vec![3.0, 4.0]]);
        assert!(matrix_from_rows(vec![vec![1.0], vec![1.0, 2.0]]).is_err());
    }

    #[test]
    fn test_orbitals_payload() {
        let orbitals = OrbitalSet {
            coefficients: DMatrix::from_row_slice(2, 2, &[0.5, 0.5, 0.5, -0.5]),
            eigenvalues: vec![-0.6, 0.2],
            n_occupied: 1,
        };
        let json = serde_json::to_value(OrbitalsPayload::from_structure(
            &ElectronicStructure::Unrestricted {
                alpha: orbitals.clone(),
                beta: orbitals.clone(),
            },
        ))
        .unwrap();
        assert_eq!(json["alpha"]["coefficients"][1][1], -0.5);

        let restricted: Option<OrbitalsPayload> = serde_json::from_str(
            r#"{"coefficients":[[0.5,0.5],[0.5,-0.5]],"eigenvalues":[-0.6,0.2],"n_occupied":1}"#,
        )
        .unwrap();
        let structure = restricted.unwrap().into_structure().unwrap();
        assert_eq!(structure, ElectronicStructure::Restricted(orbitals));

        let none: Option<OrbitalsPayload> = serde_json::from_str("null").unwrap();
        assert!(none.is_none());
    }
}

use crate::config::{Atom, JobConfig};
use crate::settings::{BASIS_SET, METHOD, SPIN_MODE};
use color_eyre::eyre::{eyre, Result};
use scine_core::{AtomCollection, SettingValue};
use std::collections::HashMap;
use tracing::info;

/// H2 with a bond length of 0.7 Angstrom.
fn h2() -> Vec<Atom> {
    vec![
        Atom {
            element: "H".to_string(),
            coords: [0.0, 0.0, 0.0],
        },
        Atom {
            element: "H".to_string(),
            coords: [0.7, 0.0, 0.0],
        },
    ]
}

fn h2_job(name: &str, calculator: &str, method: &str, spin_mode: Option<&str>, reference: f64) -> JobConfig {
    let mut settings = HashMap::new();
    settings.insert(METHOD.to_string(), SettingValue::from(method));
    settings.insert(BASIS_SET.to_string(), SettingValue::from("def2-tzvp"));
    if let Some(mode) = spin_mode {
        settings.insert(SPIN_MODE.to_string(), SettingValue::from(mode));
    }
    JobConfig {
        name: name.to_string(),
        calculator: calculator.to_string(),
        geometry: h2(),
        settings,
        properties: Vec::new(),
        reference_energy: Some(reference),
        tolerance: None,
    }
}

/// The H2/def2-TZVP energies every installation is checked against.
pub fn reference_jobs() -> Vec<JobConfig> {
    vec![
        h2_job("dft restricted", "dft", "pbe-d3bj", None, -1.166043),
        h2_job("dft unrestricted", "dft", "pbe-d3bj", Some("unrestricted"), -1.166043),
        h2_job("hf restricted", "hf", "hf", None, -1.132535),
        h2_job("hf unrestricted", "hf", "hf", Some("unrestricted"), -1.132535),
        h2_job("ccsd(t) restricted", "cc", "ccsd(t)", None, -1.168261),
        h2_job("dlpno-ccsd(t0) restricted", "cc", "dlpno-ccsd(t0)", None, -1.168311),
    ]
}

/// Build the structure of a job from its geometry in Angstrom.
pub fn build_structure(job: &JobConfig) -> Result<AtomCollection> {
    info!("Preparing geometry for {}", job.name);

    let symbols: Vec<&str> = job.geometry.iter().map(|atom| atom.element.as_str()).collect();
    let coords: Vec<[f64; 3]> = job.geometry.iter().map(|atom| atom.coords).collect();
    AtomCollection::from_angstrom(&symbols, &coords)
        .map_err(|e| eyre!("Invalid geometry in job '{}': {}", job.name, e))
}

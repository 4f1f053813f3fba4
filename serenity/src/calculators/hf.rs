use super::base::{Job, Method};
use super::dft::{run_scf_pipeline, scf_properties};
use crate::method::{split_method_and_dispersion, Dispersion, Theory};
use crate::settings::{SystemSettings, METHOD};
use scine_core::{PropertyList, Result, Settings};

/// Hartree-Fock. A dispersion suffix on `method` (`HF-D3BJ`) is honoured.
#[derive(Debug, Clone, Copy, Default)]
pub struct Hf;

impl Method for Hf {
    const NAME: &'static str = "SerenityHFCalculator";
    const FAMILY: &'static str = "HF";

    fn possible_properties(&self) -> PropertyList {
        scf_properties()
    }

    fn solvation_models(&self) -> &'static [&'static str] {
        &["cpcm", "iefpcm"]
    }

    fn apply_fixed_settings(&self, settings: &Settings, system: &mut SystemSettings) -> Result<()> {
        system.method = Theory::Hf;
        let (_, dispersion) = split_method_and_dispersion(settings.get_string(METHOD)?);
        system.dft.dispersion = dispersion
            .map(|d| d.parse::<Dispersion>())
            .transpose()?;
        Ok(())
    }

    fn calculate_impl(&self, job: Job<'_>) -> Result<()> {
        run_scf_pipeline(job)
    }
}

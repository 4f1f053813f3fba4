use super::base::{Job, Method};
use crate::method::{CcLevel, EnergyContribution, Localization, ScfMode, Theory};
use crate::settings::{SystemSettings, METHOD};
use scine_core::{CoreError, Property, PropertyList, Result, Settings};
use tracing::debug;

/// Coupled cluster on top of a restricted Hartree-Fock reference. `method`
/// selects the level: `ccsd`, `ccsd(t)`, `dlpno-ccsd` or `dlpno-ccsd(t0)`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Cc;

impl Method for Cc {
    const NAME: &'static str = "SerenityCCCalculator";
    const FAMILY: &'static str = "CC";

    fn possible_properties(&self) -> PropertyList {
        Property::Energy | Property::AtomicCharges | Property::OverlapMatrix | Property::AoToAtomMapping
    }

    fn solvation_models(&self) -> &'static [&'static str] {
        &[]
    }

    fn apply_fixed_settings(&self, _settings: &Settings, system: &mut SystemSettings) -> Result<()> {
        system.method = Theory::Hf;
        Ok(())
    }

    fn calculate_impl(&self, job: Job<'_>) -> Result<()> {
        if job.mode == ScfMode::Unrestricted {
            return Err(CoreError::UnsuccessfulCalculation(
                "unrestricted coupled cluster calculations are not supported by Serenity".to_string(),
            ));
        }
        let level: CcLevel = job.settings.get_string(METHOD)?.parse()?;

        if *job.moved {
            job.system.run_scf(job.mode)?;
            if level.needs_localization() {
                debug!("Localizing orbitals (IBO) for {:?}", level);
                job.system.localize_orbitals(job.mode, Localization::Ibo)?;
            }
            job.system.coupled_cluster(level)?;
            *job.moved = false;
        }
        job.results.successful_calculation = Some(true);

        let hf = job.system.energy(job.mode, EnergyContribution::HfEnergy)?;
        let doubles = job.system.energy(job.mode, EnergyContribution::CcsdCorrection)?;
        let triples = if level.has_triples() {
            job.system.energy(job.mode, EnergyContribution::TriplesCorrection)?
        } else {
            0.0
        };
        job.results.energy = Some(hf + doubles + triples);

        if job.requires(Property::AtomicCharges) {
            job.results.atomic_charges = Some(job.atomic_charges()?);
        }
        job.results.ao_to_atom_mapping = Some(job.ao_to_atom_mapping()?);
        job.results.overlap_matrix = Some(job.system.overlap()?);
        Ok(())
    }
}

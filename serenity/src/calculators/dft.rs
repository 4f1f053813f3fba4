use super::base::{Job, Method};
use crate::method::{split_method_and_dispersion, Dispersion, EnergyContribution, Theory};
use crate::settings::{SystemSettings, METHOD};
use scine_core::{mayer_bond_orders, Property, PropertyList, Result, Settings};

/// Kohn-Sham DFT; `method` is a functional with an optional dispersion
/// suffix, e.g. `PBE-D3BJ`.
#[derive(Debug, Clone, Copy, Default)]
pub struct Dft;

impl Method for Dft {
    const NAME: &'static str = "SerenityDFTCalculator";
    const FAMILY: &'static str = "DFT";

    fn possible_properties(&self) -> PropertyList {
        scf_properties()
    }

    fn solvation_models(&self) -> &'static [&'static str] {
        &["cpcm", "iefpcm"]
    }

    fn apply_fixed_settings(&self, settings: &Settings, system: &mut SystemSettings) -> Result<()> {
        system.method = Theory::Dft;
        let (functional, dispersion) = split_method_and_dispersion(settings.get_string(METHOD)?);
        system.dft.functional = functional.to_uppercase();
        system.dft.dispersion = dispersion
            .map(|d| d.parse::<Dispersion>())
            .transpose()?;
        Ok(())
    }

    fn calculate_impl(&self, job: Job<'_>) -> Result<()> {
        run_scf_pipeline(job)
    }
}

pub(super) fn scf_properties() -> PropertyList {
    PropertyList::from_properties(&[
        Property::Energy,
        Property::Gradients,
        Property::Hessian,
        Property::BondOrderMatrix,
        Property::Thermochemistry,
        Property::AtomicCharges,
        Property::AoToAtomMapping,
        Property::DensityMatrix,
        Property::OverlapMatrix,
        Property::ElectronicOccupation,
    ])
}

/// SCF energy and the properties derived from a converged SCF.
pub(super) fn run_scf_pipeline(mut job: Job<'_>) -> Result<()> {
    let mode = job.mode;
    if *job.moved {
        job.system.run_scf(mode)?;
        *job.moved = false;
    }
    let energy = job.system.energy(mode, EnergyContribution::Total)?;
    job.results.energy = Some(energy);

    if job.requires(Property::Gradients) {
        job.results.gradients = Some(job.gradients()?);
    }

    let hessian = if job.requires(Property::Hessian) || job.requires(Property::Thermochemistry) {
        Some(job.hessian()?)
    } else {
        None
    };
    job.results.successful_calculation = Some(true);

    if job.requires(Property::AtomicCharges) {
        job.results.atomic_charges = Some(job.atomic_charges()?);
    }

    let mapping = job.ao_to_atom_mapping()?;
    let overlap = job.system.overlap()?;
    let density = job.system.density_matrix(mode)?;
    if job.requires(Property::BondOrderMatrix) {
        job.results.bond_orders = Some(mayer_bond_orders(&density, &overlap, &mapping)?);
    }
    if let Some(hessian) = &hessian {
        if job.requires(Property::Thermochemistry) {
            job.results.thermochemistry = Some(job.thermochemistry(hessian, energy)?);
        }
    }

    job.results.hessian = hessian;
    job.results.ao_to_atom_mapping = Some(mapping);
    job.results.overlap_matrix = Some(overlap);
    job.results.density_matrix = Some(density);
    job.results.electronic_occupation = Some(job.occupation()?);
    Ok(())
}

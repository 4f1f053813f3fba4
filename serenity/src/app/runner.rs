use crate::app::jobs::build_structure;
use crate::config::JobConfig;
use color_eyre::eyre::{eyre, Result, WrapErr};
use scine_core::{ModuleManager, Property, PropertyList};
use tracing::info;

/// Energy of one job and how it compares with its reference.
#[derive(Debug, Clone, PartialEq)]
pub struct JobOutcome {
    pub name: String,
    pub energy: f64,
    pub reference: Option<f64>,
    pub tolerance: f64,
}

impl JobOutcome {
    pub fn deviation(&self) -> Option<f64> {
        self.reference.map(|r| (self.energy - r).abs())
    }

    /// Jobs without a reference pass whenever they finish.
    pub fn passed(&self) -> bool {
        self.deviation().map_or(true, |d| d <= self.tolerance)
    }
}

fn required_properties(job: &JobConfig) -> Result<PropertyList> {
    if job.properties.is_empty() {
        return Ok(Property::Energy.into());
    }
    let mut list = PropertyList::empty();
    for name in &job.properties {
        let property = name
            .parse::<Property>()
            .map_err(|e| eyre!("Job '{}': {}", job.name, e))?;
        list.insert(property);
    }
    list.insert(Property::Energy);
    Ok(list)
}

/// Create the job's calculator from `manager`, run it and report the energy.
pub fn run_job(manager: &ModuleManager, job: &JobConfig) -> Result<JobOutcome> {
    info!("\nRunning job '{}' with the {} calculator", job.name, job.calculator);

    let mut calculator = manager
        .get("calculator", &job.calculator)
        .wrap_err_with(|| format!("No calculator for job '{}'", job.name))?;
    calculator.set_structure(build_structure(job)?)?;
    calculator
        .settings_mut()
        .apply_overrides(&job.settings)
        .wrap_err_with(|| format!("Invalid settings in job '{}'", job.name))?;
    calculator.set_required_properties(required_properties(job)?);

    let results = calculator
        .calculate(&job.name)
        .wrap_err_with(|| format!("Calculation '{}' failed", job.name))?;
    if !results.successful() {
        return Err(eyre!("Calculation '{}' was not successful", job.name));
    }
    let energy = results
        .energy
        .ok_or_else(|| eyre!("Calculation '{}' produced no energy", job.name))?;
    info!("{} energy: {:.10} au", calculator.name(), energy);

    Ok(JobOutcome {
        name: job.name.clone(),
        energy,
        reference: job.reference_energy,
        tolerance: job.tolerance(),
    })
}

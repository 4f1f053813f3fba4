mod jobs;
mod runner;

pub use jobs::{build_structure, reference_jobs};
pub use runner::{run_job, JobOutcome};

use crate::config::{Args, CheckConfig};
use crate::io::{setup_output, write_summary};
use crate::loader::{bootstrap, LoadOutcome};
use clap::Parser;
use color_eyre::eyre::{eyre, Result, WrapErr};
use scine_core::ModuleManager;
use std::fs;
use std::io;
use std::path::PathBuf;
use tracing::{error, info};

pub struct CheckApplication {
    args: Args,
    config: CheckConfig,
}

impl CheckApplication {
    pub fn from_cli() -> Result<Self> {
        let args = Args::parse();
        let config = load_config(&args)?;
        Ok(Self { args, config })
    }

    pub fn run(self) -> Result<()> {
        setup_output(self.args.output.as_ref());

        let mut manager = ModuleManager::new();
        let loaded = bootstrap(&mut manager, &self.config.loader)
            .wrap_err("Unable to register the Serenity module")?;
        info!("Resource root: {}", loaded.resource_root);
        if let LoadOutcome::Loaded(path) = &loaded.outcome {
            info!("Module library: {}", path.display());
        }

        let jobs = selected_jobs(&self.config, self.args.filter.as_deref());
        if jobs.is_empty() {
            return Err(eyre!("No jobs to run"));
        }

        let mut outcomes = Vec::with_capacity(jobs.len());
        let mut failures = 0;
        for job in &jobs {
            match run_job(&manager, job) {
                Ok(outcome) => {
                    if !outcome.passed() {
                        failures += 1;
                    }
                    outcomes.push(outcome);
                }
                Err(e) => {
                    error!("{:?}", e);
                    failures += 1;
                }
            }
        }

        write_summary(&mut io::stdout().lock(), &outcomes).wrap_err("Unable to write summary")?;

        if failures > 0 {
            return Err(eyre!("{} of {} jobs failed", failures, jobs.len()));
        }
        Ok(())
    }
}

fn load_config(args: &Args) -> Result<CheckConfig> {
    let mut config = match &args.config_file {
        Some(path) => {
            let content = fs::read_to_string(path)
                .wrap_err_with(|| format!("Unable to read configuration file: {}", path))?;
            serde_yml::from_str::<CheckConfig>(&content)
                .wrap_err("Failed to parse configuration file")?
        }
        None => CheckConfig::default(),
    };

    if let Some(dir) = &args.install_dir {
        config.loader.install_dir = Some(dir.clone());
    }
    if config.loader.install_dir.is_none() {
        config.loader.install_dir = Some(default_install_dir()?);
    }
    if let Some(name) = &args.artifact_name {
        config.loader.artifact_name = Some(name.clone());
    }
    if args.no_export_env {
        config.loader.export_environment = Some(false);
    }

    Ok(config.with_defaults())
}

/// The directory holding the running executable.
fn default_install_dir() -> Result<PathBuf> {
    let exe = std::env::current_exe().wrap_err("Unable to locate the executable")?;
    exe.parent()
        .map(PathBuf::from)
        .ok_or_else(|| eyre!("Executable {} has no parent directory", exe.display()))
}

fn selected_jobs(config: &CheckConfig, filter: Option<&str>) -> Vec<crate::config::JobConfig> {
    let jobs = if config.jobs.is_empty() {
        reference_jobs()
    } else {
        config.jobs.clone()
    };
    match filter {
        Some(pattern) => jobs
            .into_iter()
            .filter(|job| job.name.contains(pattern))
            .collect(),
        None => jobs,
    }
}

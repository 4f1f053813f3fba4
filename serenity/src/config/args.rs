//! Command-line argument parsing for the Serenity module check

use clap::Parser;
use std::path::PathBuf;

/// Load the Serenity module and check calculator energies against references
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to a YAML configuration file (reference jobs if omitted)
    #[arg(short, long)]
    pub config_file: Option<String>,

    /// Override the wrapper installation directory
    #[arg(long)]
    pub install_dir: Option<PathBuf>,

    /// Override the plugin artifact file name
    #[arg(long)]
    pub artifact_name: Option<String>,

    /// Override output file: (default stdout)
    #[arg(short, long)]
    pub output: Option<String>,

    /// Do not export SERENITY_RESOURCES
    #[arg(long)]
    pub no_export_env: bool,

    /// Only run jobs whose name contains this string
    #[arg(long)]
    pub filter: Option<String>,
}

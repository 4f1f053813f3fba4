//! Logging setup and result output for the check runner

mod output;

pub use output::{setup_output, write_summary};

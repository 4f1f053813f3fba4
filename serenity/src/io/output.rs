//! Output formatting and logging utilities

use crate::app::JobOutcome;
use std::fmt;
use std::fs::File;
use std::io::{self, Write};
use std::time::SystemTime as StdSystemTime;
use tracing::info;
use tracing_subscriber::{
    fmt::format::Writer, fmt::layer, fmt::time::FormatTime, layer::SubscriberExt,
    util::SubscriberInitExt, Registry,
};

/// Time formatter with second precision
struct SecondPrecisionTimer;

impl FormatTime for SecondPrecisionTimer {
    fn format_time(&self, w: &mut Writer<'_>) -> fmt::Result {
        let total_seconds = StdSystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();
        let hours = (total_seconds / 3600) % 24;
        let minutes = (total_seconds / 60) % 60;
        let seconds = total_seconds % 60;

        write!(w, "{:02}:{:02}:{:02}", hours, minutes, seconds)
    }
}

/// Setup output logging to file or stdout
pub fn setup_output(output_path: Option<&String>) {
    match output_path {
        Some(path) => match File::create(path) {
            Ok(log) => {
                let file_layer = layer()
                    .with_writer(log)
                    .with_timer(SecondPrecisionTimer)
                    .with_ansi(false);
                Registry::default().with(file_layer).init();
                info!("Output will be written to: {}", path);
            }
            Err(e) => eprintln!("Could not create output file {}: {}", path, e),
        },
        None => {
            let stdout_layer = layer()
                .with_writer(std::io::stdout)
                .with_timer(SecondPrecisionTimer)
                .with_ansi(true);
            Registry::default().with(stdout_layer).init();
        }
    }
}

/// Write one line per job: name, energy, reference and verdict
pub fn write_summary<W: Write>(writer: &mut W, outcomes: &[JobOutcome]) -> io::Result<()> {
    writeln!(writer, "{:<28} {:>16} {:>16} {:>12}  status", "job", "energy", "reference", "deviation")?;
    for outcome in outcomes {
        let reference = outcome
            .reference
            .map(|r| format!("{r:.6}"))
            .unwrap_or_else(|| "-".to_string());
        let deviation = outcome
            .deviation()
            .map(|d| format!("{d:.2e}"))
            .unwrap_or_else(|| "-".to_string());
        let status = if outcome.passed() { "ok" } else { "FAILED" };
        writeln!(
            writer,
            "{:<28} {:>16.8} {:>16} {:>12}  {}",
            outcome.name, outcome.energy, reference, deviation, status
        )?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_lines() {
        let outcomes = vec![
            JobOutcome {
                name: "dft pbe-d3bj".to_string(),
                energy: -1.1660431,
                reference: Some(-1.166043),
                tolerance: 1e-6,
            },
            JobOutcome {
                name: "hf".to_string(),
                energy: -1.0,
                reference: Some(-1.132535),
                tolerance: 1e-6,
            },
        ];
        let mut buffer = Vec::new();
        write_summary(&mut buffer, &outcomes).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[1].starts_with("dft pbe-d3bj"));
        assert!(lines[1].ends_with("ok"));
        assert!(lines[2].ends_with("FAILED"));
    }
}

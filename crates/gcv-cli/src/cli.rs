use clap::{CommandFactory, Parser, Subcommand, ValueHint};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "gcv", author, version, about, long_about = None)]
pub struct Cli {
    /// Set the logging level
    #[arg(long, default_value = "info")]
    pub log_level: tracing::Level,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Score simulated curves against reference curves
    Compare {
        /// Simulated curve file (time column first, then V, P, Q, ...)
        #[arg(long, value_hint = ValueHint::FilePath)]
        sim: PathBuf,
        /// Reference curve file
        #[arg(long, value_hint = ValueHint::FilePath)]
        reference: PathBuf,
        /// Event start (s)
        #[arg(long)]
        t_fault: f64,
        /// Fault duration (s); 0 for a step
        #[arg(long, default_value_t = 0.0)]
        duration: f64,
        /// Setpoint-tracking test (no physical fault)
        #[arg(long)]
        setpoint_tracking: bool,
        /// The reference is a field measurement
        #[arg(long)]
        field: bool,
        /// Comma-separated signals to score (default: all shared ones)
        #[arg(long)]
        signals: Option<String>,
        /// Validation configuration (TOML or JSON)
        #[arg(long, value_hint = ValueHint::FilePath)]
        config: Option<PathBuf>,
        /// Write the JSON report here instead of stdout
        #[arg(short, long)]
        out: Option<PathBuf>,
        /// Also write the metric table as `;`-separated CSV
        #[arg(long, value_hint = ValueHint::FilePath)]
        metrics_csv: Option<PathBuf>,
    },
    /// Compute grid-forming envelopes
    Envelope {
        /// phase-jump, amplitude-step, rocof or scr-jump
        #[arg(long)]
        test: String,
        /// Grid-forming parameters (TOML or JSON)
        #[arg(long, value_hint = ValueHint::FilePath)]
        params: Option<PathBuf>,
        /// Damping constant D (pu)
        #[arg(long)]
        damping: f64,
        /// Inertia constant H (s)
        #[arg(long)]
        inertia: f64,
        /// Effective reactance Xeff (pu)
        #[arg(long)]
        xeff: f64,
        /// End of the time axis (s)
        #[arg(long, default_value_t = 10.0)]
        t_end: f64,
        /// Time step (s)
        #[arg(long, default_value_t = 0.001)]
        dt: f64,
        /// Event instant (s)
        #[arg(long, default_value_t = 1.0)]
        event_time: f64,
        /// Output directory
        #[arg(short, long, value_hint = ValueHint::DirPath)]
        out: PathBuf,
        /// Skip the PNG plot
        #[arg(long)]
        no_plot: bool,
    },
    /// Score many scenarios in parallel
    Batch {
        /// JSON job file
        #[arg(long, value_hint = ValueHint::FilePath)]
        jobs: PathBuf,
        /// Output directory for reports and the manifest
        #[arg(short, long, value_hint = ValueHint::DirPath)]
        out: PathBuf,
        /// Worker threads (0 = one per CPU)
        #[arg(long, default_value_t = 0)]
        threads: usize,
        /// Validation configuration (TOML or JSON)
        #[arg(long, value_hint = ValueHint::FilePath)]
        config: Option<PathBuf>,
    },
    /// Print the default validation configuration as TOML
    Config {
        /// Write to a file instead of stdout
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
}

pub fn build_cli_command() -> clap::Command {
    Cli::command()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        build_cli_command().debug_assert();
    }

    #[test]
    fn envelope_defaults() {
        let cli = Cli::parse_from([
            "gcv", "envelope", "--test", "rocof", "--damping", "100", "--inertia", "5",
            "--xeff", "0.2", "--out", "env",
        ]);
        match cli.command {
            Some(Commands::Envelope {
                t_end, dt, event_time, no_plot, ..
            }) => {
                assert_eq!((t_end, dt, event_time), (10.0, 0.001, 1.0));
                assert!(!no_plot);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }
}

use clap::Parser;
use gcv_cli::{Cli, Commands};
use tracing::{error, info};
use tracing_subscriber::FmtSubscriber;

mod commands;

use commands::compare::CompareArgs;
use commands::envelope::EnvelopeArgs;

fn run(command: &Commands) -> anyhow::Result<()> {
    match command {
        Commands::Compare {
            sim,
            reference,
            t_fault,
            duration,
            setpoint_tracking,
            field,
            signals,
            config,
            out,
            metrics_csv,
        } => {
            info!("Comparing {} against {}", sim.display(), reference.display());
            commands::compare::handle(&CompareArgs {
                sim,
                reference,
                t_fault: *t_fault,
                duration: *duration,
                setpoint_tracking: *setpoint_tracking,
                field: *field,
                signals: signals.as_deref(),
                config: config.as_deref(),
                out: out.as_deref(),
                metrics_csv: metrics_csv.as_deref(),
            })
        }
        Commands::Envelope {
            test,
            params,
            damping,
            inertia,
            xeff,
            t_end,
            dt,
            event_time,
            out,
            no_plot,
        } => {
            info!("Computing {} envelope", test);
            commands::envelope::handle(&EnvelopeArgs {
                test,
                params: params.as_deref(),
                damping: *damping,
                inertia: *inertia,
                xeff: *xeff,
                t_end: *t_end,
                dt: *dt,
                event_time: *event_time,
                out,
                plot: !*no_plot,
            })
        }
        Commands::Batch {
            jobs,
            out,
            threads,
            config,
        } => {
            info!("Running batch from {}", jobs.display());
            commands::batch::handle(jobs, out, *threads, config.as_deref())
        }
        Commands::Config { out } => commands::config::handle(out.as_deref()),
    }
}

fn main() {
    let cli = Cli::parse();

    // Logs go to stderr so reports on stdout stay machine-readable.
    let subscriber = FmtSubscriber::builder()
        .with_max_level(cli.log_level)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    let Some(command) = &cli.command else {
        info!("No subcommand provided. Use `gcv --help` for more information.");
        return;
    };
    if let Err(e) = run(command) {
        error!("Command failed: {:?}", e);
        std::process::exit(1);
    }
}

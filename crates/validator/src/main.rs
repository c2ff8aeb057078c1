use anyhow::Result;
use clap::Parser;
use station_latency::DateWindow;
use station_validator::{
    cli::{Cli, Commands, StationArgs},
    orchestrator::{Orchestrator, StationTarget},
    settings::Settings,
};
use tracing::error;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut settings = match &cli.config {
        Some(config_path) => Settings::from_path(config_path)?,
        None => Settings::from_env()?,
    };

    // Apply CLI overrides (if any)
    if let Some(log_level) = &cli.log_level {
        settings.log_level = log_level.clone();
    }
    init_logging(&settings.log_level)?;

    match run(cli.command, &settings) {
        Ok(true) => Ok(()),
        // Station checked fine but did not pass
        Ok(false) => std::process::exit(2),
        Err(err) => {
            error!("{err:#}");
            std::process::exit(1);
        }
    }
}

/// Returns whether the station passed.
fn run(command: Commands, settings: &Settings) -> Result<bool> {
    let orchestrator = Orchestrator::new(settings)?;

    match command {
        Commands::Validate {
            station,
            latency,
            metrics,
            soh,
            output_dir,
        } => {
            let report = orchestrator.validate(
                &target(&station)?,
                latency.instrument,
                &latency.latency_dir,
                metrics.as_deref(),
                soh.as_deref(),
                &output_dir,
            )?;
            Ok(report.passed)
        }
        Commands::Latency {
            station,
            latency,
            output_dir,
        } => {
            let run = orchestrator.latency(
                &target(&station)?,
                latency.instrument,
                &latency.latency_dir,
                &output_dir,
            )?;
            Ok(run.station.timely_passed)
        }
        Commands::Evaluate { station, metrics } => {
            let report = orchestrator.evaluate(&target(&station)?, &metrics)?;
            Ok(report.passed)
        }
    }
}

fn target(args: &StationArgs) -> Result<StationTarget> {
    let window = DateWindow::new(args.start, args.end)?;
    Ok(StationTarget::new(&args.network, &args.station, window))
}

fn init_logging(log_level: &str) -> Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level)))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_thread_ids(false)
                .with_thread_names(false),
        )
        .init();

    Ok(())
}

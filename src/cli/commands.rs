//! Command implementations for the city importer CLI
//!
//! This module contains the command execution logic: logging setup,
//! layered configuration, progress reporting, and the final summary.

use crate::app::models::PipelineReport;
use crate::app::services::ingestion::IngestionCoordinator;
use crate::app::services::record_client::HttpRecordClient;
use crate::cli::args::{Args, CitiesArgs, Commands, ImportTarget};
use crate::config::{IngestConfig, MalformedRowPolicy};
use crate::constants::PROGRESS_REFRESH_MS;
use crate::{Error, Result};
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Main command runner
///
/// Dispatches to the selected subcommand. A cancelled run still returns its
/// partial report.
pub async fn run(args: Args, cancel: CancellationToken) -> Result<PipelineReport> {
    match args.command {
        Some(Commands::Import(import)) => match import.target {
            ImportTarget::Cities(cities) => run_import_cities(cities, cancel).await,
        },
        None => Err(Error::configuration("No command given")),
    }
}

/// Import a cities file
pub async fn run_import_cities(
    args: CitiesArgs,
    cancel: CancellationToken,
) -> Result<PipelineReport> {
    setup_logging(&args)?;

    info!("Starting city import");
    debug!("Command line arguments: {:?}", args);

    args.validate()?;
    let path = args.input_path()?.clone();

    let config = load_configuration(&args)?;
    debug!("Loaded configuration: {:?}", config);
    info!(
        url = %config.service.base_url(),
        subpath = %config.service.subpath,
        "Submitting records"
    );

    let client = Arc::new(HttpRecordClient::new(&config.service)?);
    let mut coordinator = IngestionCoordinator::from_config(client, &config);

    if args.progress {
        coordinator = coordinator.with_progress(create_spinner());
    }

    let report = coordinator.run_path(&path, cancel).await?;

    if !args.quiet {
        print_summary(&report);
    }

    Ok(report)
}

/// Set up structured logging based on CLI arguments
pub fn setup_logging(args: &CitiesArgs) -> Result<()> {
    use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

    let log_level = args.get_log_level();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("city_ingest={}", log_level)));

    let result = if args.quiet {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_level(true)
                    .with_writer(std::io::stderr)
                    .compact(),
            )
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_level(true)
                    .with_timer(fmt::time::uptime())
                    .with_writer(std::io::stderr),
            )
            .try_init()
    };

    result.map_err(|e| Error::configuration(format!("Failed to initialize logging: {}", e)))?;

    debug!("Logging initialized at level: {}", log_level);
    Ok(())
}

/// Load configuration using layered approach (file -> env -> args)
pub fn load_configuration(args: &CitiesArgs) -> Result<IngestConfig> {
    let default_config_path = if args.config_file.is_none() {
        IngestConfig::default_config_path().ok()
    } else {
        None
    };

    let config_file = match &args.config_file {
        Some(path) => Some(path.as_path()),
        None => default_config_path
            .as_ref()
            .filter(|path| path.exists())
            .map(|path| path.as_path()),
    };

    if let Some(config_path) = config_file {
        info!("Using config file: {}", config_path.display());
    } else {
        debug!("No config file found, using defaults and environment variables");
    }

    let mut config = IngestConfig::load_layered(config_file)?;
    apply_cli_overrides(&mut config, args);
    config.validate()?;

    Ok(config)
}

/// Apply CLI argument overrides to configuration
pub fn apply_cli_overrides(config: &mut IngestConfig, args: &CitiesArgs) {
    let pipeline = &mut config.pipeline;

    if let Some(schema) = args.schema {
        pipeline.schema = schema;
    }
    if let Some(delimiter) = args.delimiter {
        pipeline.delimiter = delimiter;
    }
    if args.no_quoting {
        pipeline.quoting = false;
    }
    if args.has_headers {
        pipeline.has_headers = true;
    }
    if args.skip_malformed {
        pipeline.malformed_rows = MalformedRowPolicy::Skip;
    }
    if let Some(workers) = args.workers {
        pipeline.max_in_flight = workers;
    }
    if let Some(queue_depth) = args.queue_depth {
        pipeline.queue_depth = queue_depth;
    }
    if let Some(rate_limit) = args.rate_limit {
        pipeline.rate_limit = Some(rate_limit);
    }
    if let Some(deadline_secs) = args.deadline_secs {
        pipeline.deadline_secs = Some(deadline_secs);
    }

    let service = &mut config.service;

    if let Some(endpoint) = &args.endpoint {
        service.endpoint = endpoint.clone();
    }
    if let Some(container) = &args.container {
        service.container = container.clone();
    }
    if let Some(environment) = &args.environment {
        service.environment = environment.clone();
    }
    if let Some(database) = &args.database {
        service.database = database.clone();
    }
}

fn create_spinner() -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    let style = ProgressStyle::default_spinner()
        .template("{spinner:.green} [{elapsed_precise}] {pos} rows {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner());
    spinner.set_style(style);
    spinner.set_message("starting...");
    spinner.enable_steady_tick(Duration::from_millis(PROGRESS_REFRESH_MS));
    spinner
}

fn print_summary(report: &PipelineReport) {
    println!();
    println!("{}", "Import Summary".bold().underline());
    println!(
        "  {} rows decoded, {} dispatched, {} skipped",
        report.rows_decoded, report.rows_dispatched, report.rows_skipped
    );
    println!(
        "  {} {}",
        "Submitted:".green(),
        format!("{} ({:.1}%)", report.rows_submitted, report.success_rate()).green()
    );

    let failed = format!(
        "{} ({} transport, {} rejected)",
        report.rows_failed, report.transport_failures, report.rejected
    );
    if report.rows_failed > 0 {
        println!("  {} {}", "Failed:".red(), failed.red());
    } else {
        println!("  {} {}", "Failed:".dimmed(), failed.dimmed());
    }

    println!(
        "  Duration: {:.2}s ({:.1} rows/sec)",
        report.elapsed.as_secs_f64(),
        report.rows_per_second()
    );

    if report.cancelled {
        warn!("Import stopped before the end of input");
        println!("  {}", "Cancelled before end of input".yellow());
    }
}

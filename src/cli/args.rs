//! Command-line argument definitions for the city importer
//!
//! This module defines the CLI interface using the clap derive API. Every
//! pipeline and service flag is optional so that unset flags fall through to
//! the config file and environment layers.

use crate::app::models::SchemaKind;
use crate::config::Delimiter;
use crate::{Error, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// CLI arguments for the city importer
///
/// Streams delimited city or gazetteer files into a remote record-storage
/// service, one create request per row.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "city-ingest",
    version,
    about = "Import city and gazetteer files into a remote record store",
    long_about = "Reads a delimited city file row by row, converts each row into a record \
                  creation request, and submits the requests concurrently with a bounded \
                  number in flight. Reports how many rows were submitted and how many failed."
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands
#[derive(Debug, Clone, Subcommand)]
pub enum Commands {
    /// Import data into the record store
    Import(ImportArgs),
}

/// Arguments for the import command
#[derive(Debug, Clone, Parser)]
pub struct ImportArgs {
    #[command(subcommand)]
    pub target: ImportTarget,
}

/// What to import
#[derive(Debug, Clone, Subcommand)]
pub enum ImportTarget {
    /// Import a cities file
    Cities(CitiesArgs),
}

/// Arguments for `import cities`
#[derive(Debug, Clone, Parser)]
pub struct CitiesArgs {
    /// Path to the cities file
    #[arg(short = 'p', long = "path", value_name = "FILE")]
    pub path: Option<PathBuf>,

    /// Row layout: minimal (7 columns) or gazetteer (18+ columns)
    #[arg(long = "schema", value_name = "SCHEMA")]
    pub schema: Option<SchemaKind>,

    /// Field separator (`,`, `;`, `tab`, or any single ASCII character)
    #[arg(long = "delimiter", value_name = "CHAR")]
    pub delimiter: Option<Delimiter>,

    /// Treat double quotes as ordinary characters
    #[arg(long = "no-quoting")]
    pub no_quoting: bool,

    /// Skip the first row as a header
    #[arg(long = "has-headers")]
    pub has_headers: bool,

    /// Skip rows with too few columns instead of aborting
    #[arg(long = "skip-malformed")]
    pub skip_malformed: bool,

    /// Maximum number of submissions in flight
    #[arg(short = 'j', long = "workers", value_name = "COUNT")]
    pub workers: Option<usize>,

    /// Capacity of the queue between the decoder and the submitters
    #[arg(long = "queue-depth", value_name = "ROWS")]
    pub queue_depth: Option<usize>,

    /// Maximum submissions started per second
    #[arg(long = "rate-limit", value_name = "PER_SEC")]
    pub rate_limit: Option<f64>,

    /// Stop dispatching new rows after this many seconds
    #[arg(long = "deadline-secs", value_name = "SECS")]
    pub deadline_secs: Option<u64>,

    /// Service base URL
    #[arg(long = "endpoint", value_name = "URL")]
    pub endpoint: Option<String>,

    /// Container identifier
    #[arg(long = "container", value_name = "ID")]
    pub container: Option<String>,

    /// Container environment (development or production)
    #[arg(long = "environment", value_name = "ENV")]
    pub environment: Option<String>,

    /// Database scope
    #[arg(long = "database", value_name = "SCOPE")]
    pub database: Option<String>,

    /// Path to configuration file
    ///
    /// TOML configuration file. If not specified, looks for
    /// ~/.config/city-ingest/config.toml
    #[arg(
        short = 'c',
        long = "config",
        value_name = "FILE",
        help = "Path to configuration file (TOML format)"
    )]
    pub config_file: Option<PathBuf>,

    /// Logging verbosity level
    #[arg(
        short = 'v',
        long = "verbose",
        action = clap::ArgAction::Count,
        help = "Increase logging verbosity (-v: info, -vv: debug, -vvv: trace)"
    )]
    pub verbose: u8,

    /// Only show errors
    #[arg(
        short = 'q',
        long = "quiet",
        help = "Suppress output except errors",
        conflicts_with = "verbose"
    )]
    pub quiet: bool,

    /// Show a progress spinner while importing
    #[arg(long = "progress", conflicts_with = "quiet")]
    pub progress: bool,
}

impl CitiesArgs {
    /// Validate the arguments for consistency
    pub fn validate(&self) -> Result<()> {
        let path = self.input_path()?;
        if !path.exists() {
            return Err(Error::file_not_found(path.display().to_string()));
        }
        if !path.is_file() {
            return Err(Error::configuration(format!(
                "Input path is not a file: {}",
                path.display()
            )));
        }

        if self.workers == Some(0) {
            return Err(Error::configuration(
                "Number of workers must be greater than 0",
            ));
        }

        if let Some(rate) = self.rate_limit
            && !(rate.is_finite() && rate > 0.0)
        {
            return Err(Error::configuration(format!(
                "Rate limit must be a positive number, got {}",
                rate
            )));
        }

        Ok(())
    }

    /// The input path, or a usage error when it was not given
    pub fn input_path(&self) -> Result<&PathBuf> {
        self.path.as_ref().ok_or_else(|| {
            Error::configuration(
                "`path` is missing. Please provide a path `--path|-p <path to cities.csv>`",
            )
        })
    }

    /// Log level derived from verbosity flags
    pub fn get_log_level(&self) -> &'static str {
        if self.quiet {
            return "error";
        }

        match self.verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    }
}

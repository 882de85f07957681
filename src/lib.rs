//! City Ingest Library
//!
//! A Rust library for streaming delimited city and gazetteer files into a
//! remote record-storage service.
//!
//! This library provides tools for:
//! - Decoding delimited input lazily with a configurable separator
//! - Mapping rows onto typed city records for two schema variants
//! - Rendering records into the `operations` wire payload
//! - Submitting records through a bounded, throttled worker pool
//! - Tracking completion so every dispatched row is observed before returning

pub mod config;
pub mod constants;

// Core application modules
pub mod app {
    pub mod models;
    pub mod services {
        pub mod ingestion;
        pub mod record_client;
        pub mod record_transformer;
        pub mod row_decoder;
        pub mod submission;
    }
}

// CLI modules
pub mod cli {
    pub mod args;
    pub mod commands;
}

// Re-export commonly used types
pub use app::models::{CityRecord, PipelineReport, RawRow, SchemaKind, SubmissionOutcome};
pub use app::services::ingestion::IngestionCoordinator;
pub use app::services::record_client::{HttpRecordClient, RecordClient};
pub use config::IngestConfig;

/// Result type alias for the city importer
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for city ingestion operations
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// I/O operation failed
    #[error("I/O error: {message}")]
    Io {
        message: String,
        #[source]
        source: std::io::Error,
    },

    /// CSV framing or encoding error
    #[error("CSV parsing error: {message}")]
    CsvParsing {
        message: String,
        #[source]
        source: Option<csv::Error>,
    },

    /// Row does not carry enough columns for the selected schema
    #[error("Malformed row at line {line}: expected at least {expected} columns, found {found}")]
    MalformedRow {
        line: u64,
        expected: usize,
        found: usize,
    },

    /// Payload could not be rendered from a record
    #[error("Payload rendering error: {message}")]
    PayloadRender {
        message: String,
        #[source]
        source: Option<serde_json::Error>,
    },

    /// Write request could not be constructed
    #[error("Failed to build write request for '{subpath}': {message}")]
    RequestBuild { subpath: String, message: String },

    /// Configuration error
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// Configuration file could not be parsed
    #[error("Invalid configuration file '{path}': {message}")]
    ConfigFile { path: String, message: String },

    /// Input file not found
    #[error("File not found: {path}")]
    FileNotFound { path: String },

    /// A pipeline task failed outside of per-row handling
    #[error("Pipeline task failed: {message}")]
    TaskFailed { message: String },
}

impl Error {
    /// Create an I/O error with context
    pub fn io(message: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            message: message.into(),
            source,
        }
    }

    /// Create a CSV parsing error with context
    pub fn csv_parsing(message: impl Into<String>, source: Option<csv::Error>) -> Self {
        Self::CsvParsing {
            message: message.into(),
            source,
        }
    }

    /// Create a malformed row error
    pub fn malformed_row(line: u64, expected: usize, found: usize) -> Self {
        Self::MalformedRow {
            line,
            expected,
            found,
        }
    }

    /// Create a payload rendering error
    pub fn payload_render(message: impl Into<String>, source: Option<serde_json::Error>) -> Self {
        Self::PayloadRender {
            message: message.into(),
            source,
        }
    }

    /// Create a request build error
    pub fn request_build(subpath: impl Into<String>, message: impl Into<String>) -> Self {
        Self::RequestBuild {
            subpath: subpath.into(),
            message: message.into(),
        }
    }

    /// Create a configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create a configuration file error
    pub fn config_file(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigFile {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a file not found error
    pub fn file_not_found(path: impl Into<String>) -> Self {
        Self::FileNotFound { path: path.into() }
    }

    /// Create a task failure error
    pub fn task_failed(message: impl Into<String>) -> Self {
        Self::TaskFailed {
            message: message.into(),
        }
    }
}

// Automatic conversions from common error types
impl From<std::io::Error> for Error {
    fn from(error: std::io::Error) -> Self {
        Self::Io {
            message: "I/O operation failed".to_string(),
            source: error,
        }
    }
}

impl From<csv::Error> for Error {
    fn from(error: csv::Error) -> Self {
        Self::CsvParsing {
            message: "CSV parsing failed".to_string(),
            source: Some(error),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(error: serde_json::Error) -> Self {
        Self::PayloadRender {
            message: "JSON serialization failed".to_string(),
            source: Some(error),
        }
    }
}

impl From<tokio::task::JoinError> for Error {
    fn from(error: tokio::task::JoinError) -> Self {
        Self::TaskFailed {
            message: error.to_string(),
        }
    }
}

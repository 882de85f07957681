//! Application constants for the city importer
//!
//! This module contains default values, schema widths, and wire-format
//! tags used throughout the importer.

// =============================================================================
// Input Defaults
// =============================================================================

/// Default field separator for city files
pub const DEFAULT_DELIMITER: u8 = b',';

/// How long a cancelled run waits for the decoder thread to stop
pub const DECODER_CANCEL_GRACE: std::time::Duration = std::time::Duration::from_millis(200);

/// Default depth of the queue between the decoder and the coordinator
pub const DEFAULT_QUEUE_DEPTH: usize = 64;

/// In-flight submissions per CPU core when no worker count is configured
pub const WORKERS_PER_CORE: usize = 4;

// =============================================================================
// Schema Layout
// =============================================================================

/// Column count of the minimal city schema
pub const MINIMAL_COLUMNS: usize = 7;

/// Column count of the gazetteer schema (the trailing modification date is optional)
pub const GAZETTEER_COLUMNS: usize = 18;

/// Record type tags written into the payload
pub mod record_types {
    /// Minimal city rows
    pub const MINIMAL: &str = "city";

    /// Gazetteer rows
    pub const GAZETTEER: &str = "geoname";
}

/// Operation type for every submitted record
pub const OPERATION_CREATE: &str = "create";

// =============================================================================
// Remote Service Defaults
// =============================================================================

/// Default service endpoint
pub const DEFAULT_ENDPOINT: &str = "https://api.apple-cloudkit.com";

/// Default API version path segment
pub const DEFAULT_API_VERSION: &str = "1";

/// Default container identifier
pub const DEFAULT_CONTAINER: &str = "iCloud.com.elbedev.bish";

/// Default container environment
pub const DEFAULT_ENVIRONMENT: &str = "development";

/// Default database scope
pub const DEFAULT_DATABASE: &str = "public";

/// Subpath for record writes
pub const DEFAULT_SUBPATH: &str = "records/modify";

/// Per-request timeout in seconds
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Idle connections kept per host by the HTTP client
pub const DEFAULT_POOL_MAX_IDLE_PER_HOST: usize = 8;

// =============================================================================
// Environment and Files
// =============================================================================

/// Environment variable overriding the service endpoint
pub const ENV_ENDPOINT: &str = "CITY_INGEST_ENDPOINT";

/// Environment variable overriding the container identifier
pub const ENV_CONTAINER: &str = "CITY_INGEST_CONTAINER";

/// Environment variable carrying the API token
pub const ENV_API_TOKEN: &str = "CITY_INGEST_API_TOKEN";

/// Directory name under the user config dir
pub const CONFIG_DIR_NAME: &str = "city-ingest";

/// Default configuration file name
pub const CONFIG_FILE_NAME: &str = "config.toml";

// =============================================================================
// Reporting
// =============================================================================

/// Interval between progress refreshes in milliseconds
pub const PROGRESS_REFRESH_MS: u64 = 500;

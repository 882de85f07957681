//! Configuration management and validation.
//!
//! Provides configuration structures for the ingestion pipeline and the remote
//! record service, with layered loading (defaults, TOML file, environment) and
//! validation rules applied before a run starts.

use crate::app::models::SchemaKind;
use crate::constants::{self, CONFIG_DIR_NAME, CONFIG_FILE_NAME};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use tracing::debug;

// =============================================================================
// Input Options
// =============================================================================

/// Single-byte field separator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Delimiter(u8);

impl Delimiter {
    pub const COMMA: Delimiter = Delimiter(b',');
    pub const SEMICOLON: Delimiter = Delimiter(b';');
    pub const TAB: Delimiter = Delimiter(b'\t');

    /// Raw separator byte
    pub fn as_byte(&self) -> u8 {
        self.0
    }
}

impl Default for Delimiter {
    fn default() -> Self {
        Delimiter(constants::DEFAULT_DELIMITER)
    }
}

impl FromStr for Delimiter {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "tab" | "\\t" | "\t" => return Ok(Delimiter::TAB),
            "comma" => return Ok(Delimiter::COMMA),
            "semicolon" => return Ok(Delimiter::SEMICOLON),
            _ => {}
        }

        let bytes = s.as_bytes();
        if bytes.len() == 1 && bytes[0].is_ascii() && bytes[0] != b'\n' && bytes[0] != b'"' {
            Ok(Delimiter(bytes[0]))
        } else {
            Err(Error::configuration(format!(
                "Invalid delimiter '{}': expected a single ASCII character or 'tab'",
                s.escape_default()
            )))
        }
    }
}

impl TryFrom<String> for Delimiter {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<Delimiter> for String {
    fn from(delimiter: Delimiter) -> Self {
        match delimiter.0 {
            b'\t' => "tab".to_string(),
            other => (other as char).to_string(),
        }
    }
}

impl fmt::Display for Delimiter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&String::from(*self))
    }
}

/// What to do with rows that are too short for the schema
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MalformedRowPolicy {
    /// Stop the run once in-flight rows have drained
    #[default]
    Abort,
    /// Log the row, count it as skipped, and keep going
    Skip,
}

// =============================================================================
// Pipeline Configuration
// =============================================================================

/// Settings for decoding and dispatching rows
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Field mapping and payload template
    pub schema: SchemaKind,

    /// Field separator
    pub delimiter: Delimiter,

    /// Honour double-quote framing (gazetteer dumps are unquoted)
    pub quoting: bool,

    /// Skip the first row as a header
    pub has_headers: bool,

    /// Handling of rows with too few columns
    pub malformed_rows: MalformedRowPolicy,

    /// Maximum number of submissions in flight
    pub max_in_flight: usize,

    /// Capacity of the queue between the decoder and the coordinator
    pub queue_depth: usize,

    /// Submissions started per second (unthrottled if unset)
    pub rate_limit: Option<f64>,

    /// Stop dispatching after this many seconds
    pub deadline_secs: Option<u64>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            schema: SchemaKind::default(),
            delimiter: Delimiter::default(),
            quoting: true,
            has_headers: false,
            malformed_rows: MalformedRowPolicy::default(),
            max_in_flight: (num_cpus::get() * constants::WORKERS_PER_CORE).max(1),
            queue_depth: constants::DEFAULT_QUEUE_DEPTH,
            rate_limit: None,
            deadline_secs: None,
        }
    }
}

impl PipelineConfig {
    /// Interval between submission starts, if throttled
    ///
    /// `None` when unthrottled or when the interval does not fit a
    /// [`Duration`]; `validate` rejects the latter.
    pub fn throttle_interval(&self) -> Option<Duration> {
        self.rate_limit
            .filter(|rate| *rate > 0.0)
            .and_then(|rate| Duration::try_from_secs_f64(1.0 / rate).ok())
    }

    /// Run deadline, if configured
    pub fn deadline(&self) -> Option<Duration> {
        self.deadline_secs.map(Duration::from_secs)
    }

    /// Create configuration with a different schema
    pub fn with_schema(mut self, schema: SchemaKind) -> Self {
        self.schema = schema;
        self
    }

    /// Create configuration with a different delimiter
    pub fn with_delimiter(mut self, delimiter: Delimiter) -> Self {
        self.delimiter = delimiter;
        self
    }

    /// Create configuration with a custom in-flight limit
    pub fn with_max_in_flight(mut self, max_in_flight: usize) -> Self {
        self.max_in_flight = max_in_flight;
        self
    }

    /// Create configuration with a custom queue depth
    pub fn with_queue_depth(mut self, queue_depth: usize) -> Self {
        self.queue_depth = queue_depth;
        self
    }

    /// Throttle submission starts to `per_second`
    pub fn with_rate_limit(mut self, per_second: f64) -> Self {
        self.rate_limit = Some(per_second);
        self
    }

    /// Skip malformed rows instead of aborting
    pub fn with_skip_malformed(mut self) -> Self {
        self.malformed_rows = MalformedRowPolicy::Skip;
        self
    }

    /// Treat the first row as a header
    pub fn with_headers(mut self) -> Self {
        self.has_headers = true;
        self
    }

    /// Disable quote handling
    pub fn without_quoting(mut self) -> Self {
        self.quoting = false;
        self
    }

    /// Stop dispatching after `secs` seconds
    pub fn with_deadline_secs(mut self, secs: u64) -> Self {
        self.deadline_secs = Some(secs);
        self
    }

    /// Validate pipeline settings
    pub fn validate(&self) -> Result<()> {
        if self.max_in_flight == 0 {
            return Err(Error::configuration("max_in_flight must be at least 1"));
        }
        if self.queue_depth == 0 {
            return Err(Error::configuration("queue_depth must be at least 1"));
        }
        if let Some(rate) = self.rate_limit {
            if !(rate.is_finite() && rate > 0.0) {
                return Err(Error::configuration(format!(
                    "rate_limit must be a positive number of submissions per second, got {}",
                    rate
                )));
            }
            Duration::try_from_secs_f64(1.0 / rate).map_err(|e| {
                Error::configuration(format!(
                    "rate_limit {} is too small to schedule: {}",
                    rate, e
                ))
            })?;
        }
        Ok(())
    }
}

// =============================================================================
// Service Configuration
// =============================================================================

/// Remote record service settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Base URL of the service
    pub endpoint: String,

    /// API version path segment
    pub api_version: String,

    /// Container identifier
    pub container: String,

    /// Container environment (development or production)
    pub environment: String,

    /// Database scope
    pub database: String,

    /// Subpath for record writes
    pub subpath: String,

    /// Static bearer token, if the service needs one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_token: Option<String>,

    /// Per-request timeout in seconds
    pub request_timeout_secs: u64,

    /// Ask the server to close each connection after use
    pub close_connections: bool,

    /// Idle connections kept per host
    pub pool_max_idle_per_host: usize,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            endpoint: constants::DEFAULT_ENDPOINT.to_string(),
            api_version: constants::DEFAULT_API_VERSION.to_string(),
            container: constants::DEFAULT_CONTAINER.to_string(),
            environment: constants::DEFAULT_ENVIRONMENT.to_string(),
            database: constants::DEFAULT_DATABASE.to_string(),
            subpath: constants::DEFAULT_SUBPATH.to_string(),
            api_token: None,
            request_timeout_secs: constants::DEFAULT_REQUEST_TIMEOUT_SECS,
            close_connections: true,
            pool_max_idle_per_host: constants::DEFAULT_POOL_MAX_IDLE_PER_HOST,
        }
    }
}

impl ServiceConfig {
    /// Request timeout as a Duration
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Base URL that subpaths are appended to
    pub fn base_url(&self) -> String {
        format!(
            "{}/database/{}/{}/{}/{}",
            self.endpoint.trim_end_matches('/'),
            self.api_version,
            self.container,
            self.environment,
            self.database
        )
    }

    /// Validate service settings
    pub fn validate(&self) -> Result<()> {
        let required = [
            ("endpoint", &self.endpoint),
            ("api_version", &self.api_version),
            ("container", &self.container),
            ("environment", &self.environment),
            ("database", &self.database),
            ("subpath", &self.subpath),
        ];
        for (name, value) in required {
            if value.trim().is_empty() {
                return Err(Error::configuration(format!("{} cannot be empty", name)));
            }
        }

        if !(self.endpoint.starts_with("http://") || self.endpoint.starts_with("https://")) {
            return Err(Error::configuration(format!(
                "endpoint must be an http(s) URL, got '{}'",
                self.endpoint
            )));
        }

        if self.request_timeout_secs == 0 {
            return Err(Error::configuration("request_timeout_secs must be at least 1"));
        }

        Ok(())
    }
}

// =============================================================================
// Top-level Configuration
// =============================================================================

/// Complete importer configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    pub pipeline: PipelineConfig,
    pub service: ServiceConfig,
}

impl IngestConfig {
    /// Default config file location (`<config dir>/city-ingest/config.toml`)
    pub fn default_config_path() -> Result<PathBuf> {
        dirs::config_dir()
            .map(|dir| dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
            .ok_or_else(|| Error::configuration("Could not determine user config directory"))
    }

    /// Parse configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::io(format!("Failed to read config file {}", path.display()), e)
        })?;
        Self::from_toml_str(&content)
            .map_err(|e| Error::config_file(path.display().to_string(), e.to_string()))
    }

    /// Parse configuration from TOML text
    pub fn from_toml_str(content: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Load configuration: defaults, then file, then environment
    pub fn load_layered(config_file: Option<&Path>) -> Result<Self> {
        let mut config = match config_file {
            Some(path) => {
                debug!("Loading configuration from {}", path.display());
                Self::from_file(path)?
            }
            None => Self::default(),
        };

        config.apply_env_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Apply environment overrides using `lookup` to read variables
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(endpoint) = lookup(constants::ENV_ENDPOINT) {
            debug!("Endpoint overridden from {}", constants::ENV_ENDPOINT);
            self.service.endpoint = endpoint;
        }
        if let Some(container) = lookup(constants::ENV_CONTAINER) {
            debug!("Container overridden from {}", constants::ENV_CONTAINER);
            self.service.container = container;
        }
        if let Some(token) = lookup(constants::ENV_API_TOKEN).filter(|t| !t.is_empty()) {
            self.service.api_token = Some(token);
        }
    }

    /// Configure pipeline settings
    pub fn with_pipeline(mut self, pipeline: PipelineConfig) -> Self {
        self.pipeline = pipeline;
        self
    }

    /// Configure service settings
    pub fn with_service(mut self, service: ServiceConfig) -> Self {
        self.service = service;
        self
    }

    /// Validate the whole configuration
    pub fn validate(&self) -> Result<()> {
        self.pipeline.validate()?;
        self.service.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_delimiter_parsing() {
        assert_eq!(",".parse::<Delimiter>().unwrap(), Delimiter::COMMA);
        assert_eq!(";".parse::<Delimiter>().unwrap(), Delimiter::SEMICOLON);
        assert_eq!("tab".parse::<Delimiter>().unwrap(), Delimiter::TAB);
        assert_eq!("\\t".parse::<Delimiter>().unwrap(), Delimiter::TAB);
        assert_eq!("|".parse::<Delimiter>().unwrap().as_byte(), b'|');

        assert!(",,".parse::<Delimiter>().is_err());
        assert!("".parse::<Delimiter>().is_err());
        assert!("é".parse::<Delimiter>().is_err());
    }

    #[test]
    fn test_defaults_are_valid() {
        let config = IngestConfig::default();
        config.validate().unwrap();

        assert_eq!(config.pipeline.schema, SchemaKind::Minimal);
        assert_eq!(config.pipeline.delimiter, Delimiter::COMMA);
        assert!(config.pipeline.max_in_flight >= 1);
        assert_eq!(config.pipeline.throttle_interval(), None);
        assert!(config.service.close_connections);
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let zero_workers = PipelineConfig::default().with_max_in_flight(0);
        assert!(zero_workers.validate().is_err());

        let zero_queue = PipelineConfig::default().with_queue_depth(0);
        assert!(zero_queue.validate().is_err());

        let negative_rate = PipelineConfig::default().with_rate_limit(-2.0);
        assert!(negative_rate.validate().is_err());

        let service = ServiceConfig {
            container: "  ".to_string(),
            ..Default::default()
        };
        assert!(service.validate().is_err());

        let service = ServiceConfig {
            endpoint: "ftp://example.com".to_string(),
            ..Default::default()
        };
        assert!(service.validate().is_err());
    }

    #[test]
    fn test_throttle_interval() {
        let config = PipelineConfig::default().with_rate_limit(4.0);
        assert_eq!(config.throttle_interval(), Some(Duration::from_millis(250)));
    }

    #[test]
    fn test_unschedulable_rate_limit_rejected() {
        let config = PipelineConfig::default().with_rate_limit(1e-20);

        assert_eq!(config.throttle_interval(), None);
        assert!(matches!(
            config.validate(),
            Err(Error::Configuration { .. })
        ));

        let slow = PipelineConfig::default().with_rate_limit(0.01);
        assert!(slow.validate().is_ok());
        assert_eq!(slow.throttle_interval(), Some(Duration::from_secs(100)));
    }

    #[test]
    fn test_base_url() {
        let service = ServiceConfig {
            endpoint: "https://records.example.com/".to_string(),
            container: "iCloud.test".to_string(),
            ..Default::default()
        };
        assert_eq!(
            service.base_url(),
            "https://records.example.com/database/1/iCloud.test/development/public"
        );
    }

    #[test]
    fn test_toml_partial_file() {
        let config = IngestConfig::from_toml_str(
            r#"
            [pipeline]
            schema = "gazetteer"
            delimiter = "tab"
            quoting = false
            max_in_flight = 16
            rate_limit = 20.0

            [service]
            container = "iCloud.com.example.cities"
            "#,
        )
        .unwrap();

        assert_eq!(config.pipeline.schema, SchemaKind::Gazetteer);
        assert_eq!(config.pipeline.delimiter, Delimiter::TAB);
        assert!(!config.pipeline.quoting);
        assert_eq!(config.pipeline.max_in_flight, 16);
        assert_eq!(config.pipeline.queue_depth, constants::DEFAULT_QUEUE_DEPTH);
        assert_eq!(config.service.container, "iCloud.com.example.cities");
        assert_eq!(config.service.subpath, constants::DEFAULT_SUBPATH);
    }

    #[test]
    fn test_from_file_reports_path_on_error() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[pipeline]\ndelimiter = \"::\"").unwrap();

        match IngestConfig::from_file(file.path()) {
            Err(Error::ConfigFile { path, .. }) => {
                assert_eq!(path, file.path().display().to_string());
            }
            other => panic!("Expected ConfigFile error, got {:?}", other),
        }
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = HashMap::from([
            (constants::ENV_ENDPOINT, "http://localhost:8080"),
            (constants::ENV_API_TOKEN, "secret"),
        ]);

        let mut config = IngestConfig::default();
        config.apply_env_overrides(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.service.endpoint, "http://localhost:8080");
        assert_eq!(config.service.api_token.as_deref(), Some("secret"));
        assert_eq!(config.service.container, constants::DEFAULT_CONTAINER);
    }
}

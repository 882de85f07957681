//! Data models for city ingestion
//!
//! This module contains the row, record, payload, and outcome types that flow
//! through the ingestion pipeline, plus the aggregate report returned to callers.

use crate::constants::{self, record_types};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

// =============================================================================
// Raw Rows
// =============================================================================

/// One decoded row of the input file
///
/// Fields are positional only. The line number is kept for diagnostics and is
/// 1-based, as reported by the CSV reader.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRow {
    /// Line the row started on
    pub line: u64,

    /// Field values in column order
    pub fields: Vec<String>,
}

impl RawRow {
    /// Create a row from anything yielding string-like fields
    pub fn new<I, S>(line: u64, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            line,
            fields: fields.into_iter().map(Into::into).collect(),
        }
    }

    /// Field at `index`, or an empty string past the end of the row
    pub fn field(&self, index: usize) -> &str {
        self.fields.get(index).map(String::as_str).unwrap_or("")
    }

    /// Number of columns in the row
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether the row has no columns
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

// =============================================================================
// Schema Variants
// =============================================================================

/// Field mapping and payload template used to interpret a row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SchemaKind {
    /// Country, city, accent city, region, population, latitude, longitude
    #[default]
    Minimal,
    /// Full gazetteer dump layout
    #[serde(alias = "geonames")]
    Gazetteer,
}

impl SchemaKind {
    /// Tag written into `record.recordType`
    pub fn record_type(&self) -> &'static str {
        match self {
            SchemaKind::Minimal => record_types::MINIMAL,
            SchemaKind::Gazetteer => record_types::GAZETTEER,
        }
    }

    /// Minimum number of columns a row must carry
    pub fn min_columns(&self) -> usize {
        match self {
            SchemaKind::Minimal => constants::MINIMAL_COLUMNS,
            SchemaKind::Gazetteer => constants::GAZETTEER_COLUMNS,
        }
    }
}

impl FromStr for SchemaKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "minimal" | "city" | "cities" => Ok(SchemaKind::Minimal),
            "gazetteer" | "geonames" | "geoname" => Ok(SchemaKind::Gazetteer),
            other => Err(Error::configuration(format!(
                "Unknown schema '{}'. Expected 'minimal' or 'gazetteer'",
                other
            ))),
        }
    }
}

impl fmt::Display for SchemaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchemaKind::Minimal => write!(f, "minimal"),
            SchemaKind::Gazetteer => write!(f, "gazetteer"),
        }
    }
}

// =============================================================================
// City Records
// =============================================================================

/// City row in the minimal layout
#[derive(Debug, Clone, PartialEq)]
pub struct MinimalCity {
    pub country_code: String,
    pub city: String,
    /// Display name with diacritics
    pub accent_city: String,
    pub region: String,
    pub population: i64,
    pub latitude: f64,
    pub longitude: f64,
}

/// City row in the gazetteer layout
#[derive(Debug, Clone, PartialEq)]
pub struct GazetteerCity {
    pub geoname_id: String,
    pub name: String,
    pub ascii_name: String,
    /// Comma-joined alternate names, kept verbatim
    pub alternate_names: String,
    pub latitude: f64,
    pub longitude: f64,
    pub feature_class: String,
    pub feature_code: String,
    pub country_code: String,
    /// Secondary country codes, comma-joined
    pub cc2: String,
    pub admin1_code: String,
    pub admin2_code: String,
    pub admin3_code: String,
    pub admin4_code: String,
    pub population: i64,
    /// Elevation in meters
    pub elevation: i64,
    /// Digital elevation model source tag
    pub dem: String,
    /// IANA timezone id
    pub timezone: String,
}

/// Typed city record, tagged by schema variant
#[derive(Debug, Clone, PartialEq)]
pub enum CityRecord {
    Minimal(MinimalCity),
    Gazetteer(GazetteerCity),
}

impl CityRecord {
    /// Schema variant this record was built from
    pub fn schema(&self) -> SchemaKind {
        match self {
            CityRecord::Minimal(_) => SchemaKind::Minimal,
            CityRecord::Gazetteer(_) => SchemaKind::Gazetteer,
        }
    }

    /// Name used in log lines
    pub fn name(&self) -> &str {
        match self {
            CityRecord::Minimal(city) => &city.city,
            CityRecord::Gazetteer(city) => &city.name,
        }
    }

    /// Country code of the record
    pub fn country_code(&self) -> &str {
        match self {
            CityRecord::Minimal(city) => &city.country_code,
            CityRecord::Gazetteer(city) => &city.country_code,
        }
    }

    /// Population after coercion
    pub fn population(&self) -> i64 {
        match self {
            CityRecord::Minimal(city) => city.population,
            CityRecord::Gazetteer(city) => city.population,
        }
    }
}

// =============================================================================
// Wire Payloads and Responses
// =============================================================================

/// Serialized request body for exactly one record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionPayload {
    record_type: &'static str,
    body: String,
}

impl SubmissionPayload {
    pub(crate) fn new(record_type: &'static str, body: String) -> Self {
        Self { record_type, body }
    }

    /// Record type tag embedded in the body
    pub fn record_type(&self) -> &'static str {
        self.record_type
    }

    /// Serialized JSON body
    pub fn as_str(&self) -> &str {
        &self.body
    }

    /// Consume the payload, returning the body
    pub fn into_body(self) -> String {
        self.body
    }
}

/// Response observed from the remote service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionResponse {
    /// HTTP status code
    pub status: u16,

    /// Response body, possibly empty
    pub body: String,
}

impl SubmissionResponse {
    /// Whether the status is in the 2xx range
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

// =============================================================================
// Outcomes
// =============================================================================

/// Why a row failed to submit
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureCause {
    /// The call never produced a response
    Transport(String),
    /// The service answered with a non-2xx status
    Rejected { status: u16 },
}

impl fmt::Display for FailureCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureCause::Transport(message) => write!(f, "transport error: {}", message),
            FailureCause::Rejected { status } => write!(f, "rejected with status {}", status),
        }
    }
}

/// Classified result of a single submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmissionOutcome {
    Submitted { status: u16 },
    Failed { cause: FailureCause },
}

impl SubmissionOutcome {
    pub fn is_submitted(&self) -> bool {
        matches!(self, SubmissionOutcome::Submitted { .. })
    }
}

// =============================================================================
// Pipeline Reporting
// =============================================================================

/// Phase of a pipeline run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelinePhase {
    Idle,
    /// Rows are still being read
    Decoding,
    /// Input finished; in-flight submissions are completing
    Draining,
    Done,
}

impl fmt::Display for PipelinePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PipelinePhase::Idle => "idle",
            PipelinePhase::Decoding => "decoding",
            PipelinePhase::Draining => "draining",
            PipelinePhase::Done => "done",
        };
        f.write_str(name)
    }
}

/// Aggregate result of one pipeline run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PipelineReport {
    /// Rows read from the input, including skipped ones
    pub rows_decoded: usize,

    /// Rows handed to a submission worker
    pub rows_dispatched: usize,

    /// Rows the service accepted
    pub rows_submitted: usize,

    /// Rows that failed for any reason
    pub rows_failed: usize,

    /// Failures where no response was observed
    pub transport_failures: usize,

    /// Failures where the service answered with a non-2xx status
    pub rejected: usize,

    /// Malformed rows dropped under the skip policy
    pub rows_skipped: usize,

    /// Whether the run stopped early on cancellation or deadline
    pub cancelled: bool,

    /// Wall-clock duration of the run
    pub elapsed: Duration,
}

impl PipelineReport {
    /// Fold a worker outcome into the totals
    pub fn record(&mut self, outcome: &SubmissionOutcome) {
        match outcome {
            SubmissionOutcome::Submitted { .. } => self.rows_submitted += 1,
            SubmissionOutcome::Failed { cause } => {
                self.rows_failed += 1;
                match cause {
                    FailureCause::Transport(_) => self.transport_failures += 1,
                    FailureCause::Rejected { .. } => self.rejected += 1,
                }
            }
        }
    }

    /// Rows whose outcome has been observed
    pub fn rows_completed(&self) -> usize {
        self.rows_submitted + self.rows_failed
    }

    /// Percentage of dispatched rows that were accepted
    pub fn success_rate(&self) -> f64 {
        if self.rows_dispatched == 0 {
            0.0
        } else {
            (self.rows_submitted as f64 / self.rows_dispatched as f64) * 100.0
        }
    }

    /// Submissions per second over the whole run
    pub fn rows_per_second(&self) -> f64 {
        if self.elapsed.as_secs_f64() > 0.0 {
            self.rows_completed() as f64 / self.elapsed.as_secs_f64()
        } else {
            0.0
        }
    }

    /// Generate human-readable summary
    pub fn summary(&self) -> String {
        format!(
            "Import Summary:\n\
             Rows: {} decoded, {} dispatched, {} skipped\n\
             Submitted: {} ({:.1}% success rate)\n\
             Failed: {} ({} transport, {} rejected)\n\
             Duration: {:.2}s ({:.1} rows/sec){}",
            self.rows_decoded,
            self.rows_dispatched,
            self.rows_skipped,
            self.rows_submitted,
            self.success_rate(),
            self.rows_failed,
            self.transport_failures,
            self.rejected,
            self.elapsed.as_secs_f64(),
            self.rows_per_second(),
            if self.cancelled { "\nCancelled before end of input" } else { "" }
        )
    }
}

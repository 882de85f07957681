//! Row decoder implementation
//!
//! Reads records one at a time into a reused buffer and checks each against
//! the column count required by the selected schema.

use std::io::Read;
use tracing::trace;

use crate::app::models::{RawRow, SchemaKind};
use crate::config::PipelineConfig;
use crate::{Error, Result};
use csv::StringRecord;

/// Reader settings for one input stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecoderConfig {
    /// Field separator byte
    pub delimiter: u8,

    /// Honour double-quote framing
    pub quoting: bool,

    /// Skip the first row
    pub has_headers: bool,

    /// Rows with fewer columns are malformed
    pub min_columns: usize,
}

impl DecoderConfig {
    /// Quoted, headerless reader for `schema`
    pub fn new(delimiter: u8, schema: SchemaKind) -> Self {
        Self {
            delimiter,
            quoting: true,
            has_headers: false,
            min_columns: schema.min_columns(),
        }
    }

    /// Derive reader settings from pipeline configuration
    pub fn from_pipeline(config: &PipelineConfig) -> Self {
        Self {
            delimiter: config.delimiter.as_byte(),
            quoting: config.quoting,
            has_headers: config.has_headers,
            min_columns: config.schema.min_columns(),
        }
    }
}

/// Lazy, non-restartable sequence of rows over a byte stream
pub struct RowDecoder<R: Read> {
    reader: csv::Reader<R>,
    record: StringRecord,
    min_columns: usize,
    rows_read: u64,
}

impl<R: Read> RowDecoder<R> {
    /// Wrap `reader` with the given settings
    pub fn new(reader: R, config: &DecoderConfig) -> Self {
        // Column counts are checked per row in `next_row`, not by the reader.
        let reader = csv::ReaderBuilder::new()
            .delimiter(config.delimiter)
            .quoting(config.quoting)
            .has_headers(config.has_headers)
            .flexible(true)
            .from_reader(reader);

        Self {
            reader,
            record: StringRecord::new(),
            min_columns: config.min_columns,
            rows_read: 0,
        }
    }

    /// Read the next row
    ///
    /// Returns `Ok(None)` at end-of-stream. A row with too few columns yields
    /// [`Error::MalformedRow`] and leaves the decoder positioned on the next
    /// row, so callers may choose to skip it. Framing and encoding problems
    /// yield [`Error::CsvParsing`].
    pub fn next_row(&mut self) -> Result<Option<RawRow>> {
        let has_record = self.reader.read_record(&mut self.record).map_err(|e| {
            Error::csv_parsing(
                format!("Failed to read row after line {}", self.rows_read),
                Some(e),
            )
        })?;

        if !has_record {
            return Ok(None);
        }

        self.rows_read += 1;
        let line = self
            .record
            .position()
            .map(|position| position.line())
            .unwrap_or(self.rows_read);

        if self.record.len() < self.min_columns {
            return Err(Error::malformed_row(
                line,
                self.min_columns,
                self.record.len(),
            ));
        }

        trace!(line, columns = self.record.len(), "decoded row");
        Ok(Some(RawRow::new(line, self.record.iter())))
    }

    /// Number of records read so far, including malformed ones
    pub fn rows_read(&self) -> u64 {
        self.rows_read
    }
}

impl<R: Read> Iterator for RowDecoder<R> {
    type Item = Result<RawRow>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_row().transpose()
    }
}

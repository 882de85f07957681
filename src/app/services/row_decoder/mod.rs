//! Streaming decoder for delimited city files
//!
//! Wraps any byte stream in a `csv` reader configured with an explicit field
//! separator and yields [`RawRow`](crate::app::models::RawRow)s lazily, in file
//! order, until end-of-stream.
//!
//! ## Usage
//!
//! ```rust
//! use city_ingest::app::services::row_decoder::{DecoderConfig, RowDecoder};
//! use city_ingest::SchemaKind;
//!
//! # fn example() -> city_ingest::Result<()> {
//! let input = "US,Springfield,Springfield,IL,12345,39.8,-89.6\n";
//! let config = DecoderConfig::new(b',', SchemaKind::Minimal);
//! let mut decoder = RowDecoder::new(input.as_bytes(), &config);
//!
//! while let Some(row) = decoder.next_row()? {
//!     println!("line {}: {} fields", row.line, row.len());
//! }
//! # Ok(())
//! # }
//! ```

pub mod decoder;

#[cfg(test)]
pub mod tests;

pub use decoder::{DecoderConfig, RowDecoder};

//! Test utilities for the row decoder
//!
//! Shared fixtures for decoder tests: sample rows in both schema layouts and a
//! helper for writing them to temporary files.

use std::io::Write;
use tempfile::NamedTempFile;


/// Three minimal rows, comma separated
pub fn minimal_csv() -> &'static str {
    "US,springfield,Springfield,IL,12345,39.8,-89.6\n\
     fr,paris,Paris,A8,2138551,48.8566,2.3522\n\
     de,koln,Köln,07,963395,50.9333,6.95\n"
}

/// One gazetteer row, tab separated, with a trailing modification date
pub fn gazetteer_tsv() -> String {
    [
        "123",
        "Springfield",
        "Springfield",
        "SF,\"Springf.\"",
        "39.8",
        "-89.6",
        "P",
        "PPL",
        "US",
        "",
        "IL",
        "167",
        "",
        "",
        "12345",
        "180",
        "SRTM3",
        "America/Chicago",
        "2024-03-01",
    ]
    .join("\t")
        + "\n"
}

/// Write `content` to a temporary file
pub fn create_temp_file(content: &str) -> NamedTempFile {
    let mut temp_file = NamedTempFile::new().unwrap();
    write!(temp_file, "{}", content).unwrap();
    temp_file
}

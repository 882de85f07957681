//! Test utilities for record transformation

use crate::app::models::RawRow;
use serde_json::Value;


/// The Springfield row in the minimal layout
pub fn minimal_row() -> RawRow {
    RawRow::new(
        1,
        ["US", "Springfield", "Springfield", "IL", "12345", "39.8", "-89.6"],
    )
}

/// The Springfield row in the gazetteer layout
pub fn gazetteer_row() -> RawRow {
    RawRow::new(
        1,
        [
            "123",
            "Springfield",
            "Spring-field",
            "SF,Springf.",
            "39.8",
            "-89.6",
            "P",
            "PPL",
            "US",
            "",
            "IL",
            "",
            "",
            "",
            "12345",
            "180",
            "SRTM3",
            "America/Chicago",
        ],
    )
}

/// Parse a rendered body back into JSON
pub fn parse_body(body: &str) -> Value {
    serde_json::from_str(body).unwrap()
}

/// The `fields` object of the first operation
pub fn fields(document: &Value) -> &Value {
    &document["operations"][0]["record"]["fields"]
}

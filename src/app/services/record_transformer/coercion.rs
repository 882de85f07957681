//! Numeric coercion helpers
//!
//! Input files are not validated beyond type coercion: a value that does not
//! parse becomes zero and the row continues through the pipeline.

use tracing::trace;

/// Parse a trimmed integer, defaulting to 0
pub fn coerce_i64(value: &str, field_name: &str) -> i64 {
    let trimmed = value.trim();
    trimmed.parse::<i64>().unwrap_or_else(|_| {
        if !trimmed.is_empty() {
            trace!(field = field_name, value = trimmed, "non-numeric value coerced to 0");
        }
        0
    })
}

/// Parse a trimmed finite float, defaulting to 0.0
pub fn coerce_f64(value: &str, field_name: &str) -> f64 {
    let trimmed = value.trim();
    match trimmed.parse::<f64>() {
        Ok(parsed) if parsed.is_finite() => parsed,
        _ => {
            if !trimmed.is_empty() {
                trace!(field = field_name, value = trimmed, "non-numeric value coerced to 0.0");
            }
            0.0
        }
    }
}

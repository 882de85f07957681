//! Record transformation for decoded city rows
//!
//! Turns positional [`RawRow`](crate::app::models::RawRow)s into typed
//! [`CityRecord`](crate::app::models::CityRecord)s and renders those into the
//! JSON body expected by the record service.
//!
//! ## Architecture
//!
//! - [`mapping`] - Positional column layout per schema variant
//! - [`coercion`] - Best-effort numeric parsing (failures become zero)
//! - [`payload`] - Field-to-JSON templates for each variant
//!
//! Everything here is pure: no I/O and no shared state, so workers call it
//! concurrently without synchronization.

pub mod coercion;
pub mod mapping;
pub mod payload;

#[cfg(test)]
pub mod tests;

pub use mapping::transform;
pub use payload::render;

//! Concurrent ingestion pipeline
//!
//! This module ties the decoder, transformer, and submission worker together
//! into one run with bounded concurrency and explicit completion tracking.
//!
//! # Architecture
//!
//! - [`coordinator`] - Run lifecycle: decode, dispatch, drain, report
//! - [`pending`] - Guard-based pending count used as the completion signal
//! - [`throttle`] - Fixed-interval gate on submission starts
//!
//! # Run Lifecycle
//!
//! 1. **Decoding**: rows flow from a blocking decoder thread through a bounded
//!    queue; each row waits for the throttle and a worker permit before a
//!    submission task is spawned for it
//! 2. **Draining**: input has ended (or the run was cancelled or hit a fatal
//!    error); no new tasks are spawned and the pending count is awaited
//! 3. **Done**: every dispatched row has reported an outcome
//!
//! # Example Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use city_ingest::{HttpRecordClient, IngestConfig, IngestionCoordinator};
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() -> city_ingest::Result<()> {
//! let config = IngestConfig::default();
//! let client = Arc::new(HttpRecordClient::new(&config.service)?);
//! let coordinator = IngestionCoordinator::from_config(client, &config);
//!
//! let report = coordinator
//!     .run_path(std::path::Path::new("cities.csv"), CancellationToken::new())
//!     .await?;
//! println!("{}", report.summary());
//! # Ok(())
//! # }
//! ```

pub mod coordinator;
pub mod pending;
pub mod throttle;

#[cfg(test)]
pub mod tests;

pub use coordinator::{DecodeSummary, IngestionCoordinator, pump_rows};
pub use pending::{PendingCount, PendingGuard};
pub use throttle::SubmissionThrottle;

//! Ingestion coordinator
//!
//! Drives one pipeline run: a blocking decoder thread feeds a bounded row
//! queue; the coordinator pulls rows, waits for the throttle and a worker
//! permit, and spawns one submission task per row. Once input ends (or the
//! run is cancelled, or a fatal error is seen) it stops dispatching and waits
//! for the pending count to drain before returning.

use indicatif::ProgressBar;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{Semaphore, mpsc};
use tokio::task::{JoinError, JoinHandle, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::pending::PendingCount;
use super::throttle::SubmissionThrottle;
use crate::app::models::{FailureCause, PipelinePhase, PipelineReport, RawRow, SubmissionOutcome};
use crate::app::services::record_client::RecordClient;
use crate::app::services::row_decoder::{DecoderConfig, RowDecoder};
use crate::app::services::submission::SubmissionWorker;
use crate::config::{IngestConfig, MalformedRowPolicy, PipelineConfig};
use crate::constants::DECODER_CANCEL_GRACE;
use crate::{Error, Result};

/// Counts reported by the decoder thread
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DecodeSummary {
    /// Rows read, including malformed ones
    pub rows_read: u64,

    /// Malformed rows dropped under the skip policy
    pub rows_skipped: usize,
}

/// Runs the decode, dispatch, and drain cycle for one input
pub struct IngestionCoordinator<C: RecordClient> {
    client: Arc<C>,
    config: PipelineConfig,
    subpath: String,
    progress: Option<ProgressBar>,
    pending: PendingCount,
}

impl<C: RecordClient> IngestionCoordinator<C> {
    /// Create a coordinator around a shared client
    pub fn new(client: Arc<C>, config: PipelineConfig, subpath: impl Into<String>) -> Self {
        Self {
            client,
            config,
            subpath: subpath.into(),
            progress: None,
            pending: PendingCount::new(),
        }
    }

    /// Create a coordinator from the full importer configuration
    pub fn from_config(client: Arc<C>, config: &IngestConfig) -> Self {
        Self::new(client, config.pipeline.clone(), config.service.subpath.clone())
    }

    /// Report completed rows on `progress`
    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Pending count shared with this coordinator's workers
    pub fn pending(&self) -> &PendingCount {
        &self.pending
    }

    /// Open `path` and run the pipeline over it
    pub async fn run_path(&self, path: &Path, cancel: CancellationToken) -> Result<PipelineReport> {
        if !path.exists() {
            return Err(Error::file_not_found(path.display().to_string()));
        }

        let file = File::open(path)
            .map_err(|e| Error::io(format!("Failed to open {}", path.display()), e))?;

        info!("Importing cities from {}", path.display());
        self.run(BufReader::new(file), cancel).await
    }

    /// Run the pipeline over `reader`
    ///
    /// Returns once every dispatched row has completed. Fatal errors (framing
    /// errors, malformed rows under the abort policy, payload or request
    /// construction failures) are returned only after in-flight rows drain.
    ///
    /// After cancellation the decoder gets a short grace period to stop. A
    /// reader still blocked past it (a pipe or terminal with no data) is left
    /// running on its blocking thread, and `rows_decoded` in the report falls
    /// back to the number of dispatched rows.
    pub async fn run<R>(&self, reader: R, cancel: CancellationToken) -> Result<PipelineReport>
    where
        R: Read + Send + 'static,
    {
        self.config.validate()?;

        let start_time = Instant::now();
        let cancel = cancel.child_token();
        let deadline_task = self.spawn_deadline(&cancel);

        let mut phase = PipelinePhase::Idle;
        let mut report = PipelineReport::default();
        let mut fatal: Option<Error> = None;

        info!(
            schema = %self.config.schema,
            delimiter = %self.config.delimiter,
            max_in_flight = self.config.max_in_flight,
            queue_depth = self.config.queue_depth,
            rate_limit = ?self.config.rate_limit,
            "Starting ingestion pipeline"
        );

        let (row_tx, mut row_rx) = mpsc::channel::<RawRow>(self.config.queue_depth);
        let decoder = self.spawn_decoder(reader, row_tx);

        // Held by the dispatch loop so the count cannot reach zero while rows
        // may still arrive.
        let decoding = self.pending.enter();
        let permits = Arc::new(Semaphore::new(self.config.max_in_flight));
        let mut throttle = SubmissionThrottle::new(self.config.throttle_interval());
        let mut workers: JoinSet<Result<SubmissionOutcome>> = JoinSet::new();
        let worker = SubmissionWorker::new(
            Arc::clone(&self.client),
            self.config.schema,
            self.subpath.as_str(),
        );

        transition(&mut phase, PipelinePhase::Decoding);

        loop {
            while let Some(joined) = workers.try_join_next() {
                self.absorb(joined, &mut report, &mut fatal);
            }
            if fatal.is_some() {
                warn!("Fatal error seen, no further rows will be dispatched");
                break;
            }

            let row = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    report.cancelled = true;
                    break;
                }
                row = row_rx.recv() => row,
            };
            let Some(row) = row else {
                debug!("Row queue closed by decoder");
                break;
            };

            let permit = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    report.cancelled = true;
                    break;
                }
                permit = Arc::clone(&permits).acquire_owned() => permit,
            };
            let permit = match permit {
                Ok(permit) => permit,
                Err(e) => {
                    fatal = Some(Error::task_failed(format!(
                        "Worker permits unavailable: {}",
                        e
                    )));
                    break;
                }
            };

            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    report.cancelled = true;
                    break;
                }
                _ = throttle.ready() => {}
            }

            let guard = self.pending.enter();
            let worker = worker.clone();
            report.rows_dispatched += 1;

            workers.spawn(async move {
                let _permit = permit;
                let _guard = guard;
                worker.submit(row).await
            });
        }

        if report.cancelled {
            warn!(
                dispatched = report.rows_dispatched,
                "Ingestion cancelled, waiting for in-flight submissions"
            );
        }

        // Stop the decoder: its next send fails once the receiver is gone.
        drop(row_rx);
        drop(decoding);
        transition(&mut phase, PipelinePhase::Draining);

        self.pending.wait_for_zero().await;
        while let Some(joined) = workers.join_next().await {
            self.absorb(joined, &mut report, &mut fatal);
        }

        let decoded = if report.cancelled {
            // A reader blocked in `read` only notices the closed queue after
            // its read returns.
            match tokio::time::timeout(DECODER_CANCEL_GRACE, decoder).await {
                Ok(decoded) => Some(decoded),
                Err(_) => {
                    warn!(
                        "Decoder still blocked on input after {:?}, not waiting for it",
                        DECODER_CANCEL_GRACE
                    );
                    None
                }
            }
        } else {
            Some(decoder.await)
        };

        match decoded {
            None => report.rows_decoded = report.rows_dispatched,
            Some(Ok(Ok(summary))) => {
                report.rows_decoded = summary.rows_read as usize;
                report.rows_skipped = summary.rows_skipped;
            }
            Some(Ok(Err(e))) => {
                if fatal.is_none() {
                    fatal = Some(e);
                }
            }
            Some(Err(e)) => {
                if fatal.is_none() {
                    fatal = Some(Error::task_failed(format!("Decoder task failed: {}", e)));
                }
            }
        }

        if let Some(task) = deadline_task {
            task.abort();
        }

        report.elapsed = start_time.elapsed();
        transition(&mut phase, PipelinePhase::Done);

        if let Some(progress) = &self.progress {
            progress.finish_with_message(format!(
                "{} submitted, {} failed",
                report.rows_submitted, report.rows_failed
            ));
        }

        if let Some(e) = fatal {
            error!(
                completed = report.rows_completed(),
                "Ingestion aborted: {}", e
            );
            return Err(e);
        }

        info!(
            "Ingestion complete: {} submitted, {} failed, {} skipped in {:.2}s",
            report.rows_submitted,
            report.rows_failed,
            report.rows_skipped,
            report.elapsed.as_secs_f64()
        );

        Ok(report)
    }

    /// Decode on a blocking thread, pushing rows into the bounded queue
    fn spawn_decoder<R>(
        &self,
        reader: R,
        row_tx: mpsc::Sender<RawRow>,
    ) -> JoinHandle<Result<DecodeSummary>>
    where
        R: Read + Send + 'static,
    {
        let decoder_config = DecoderConfig::from_pipeline(&self.config);
        let policy = self.config.malformed_rows;

        tokio::task::spawn_blocking(move || {
            pump_rows(RowDecoder::new(reader, &decoder_config), row_tx, policy)
        })
    }

    /// Cancel the run once the configured deadline passes
    fn spawn_deadline(&self, cancel: &CancellationToken) -> Option<JoinHandle<()>> {
        let deadline = self.config.deadline()?;
        let cancel = cancel.clone();

        Some(tokio::spawn(async move {
            tokio::time::sleep(deadline).await;
            warn!("Deadline of {:?} reached, stopping dispatch", deadline);
            cancel.cancel();
        }))
    }

    /// Fold a finished worker into the report
    fn absorb(
        &self,
        joined: std::result::Result<Result<SubmissionOutcome>, JoinError>,
        report: &mut PipelineReport,
        fatal: &mut Option<Error>,
    ) {
        match joined {
            Ok(Ok(outcome)) => report.record(&outcome),
            Ok(Err(e)) => {
                error!("Submission could not be prepared: {}", e);
                if fatal.is_none() {
                    *fatal = Some(e);
                }
            }
            Err(e) => {
                error!("Submission task failed: {}", e);
                report.record(&SubmissionOutcome::Failed {
                    cause: FailureCause::Transport(format!("worker task failed: {}", e)),
                });
            }
        }

        if let Some(progress) = &self.progress {
            progress.inc(1);
            progress.set_message(format!(
                "{} submitted, {} failed",
                report.rows_submitted, report.rows_failed
            ));
        }
    }
}

/// Read rows until end-of-stream, a fatal error, or the queue closing
pub fn pump_rows<R: Read>(
    mut decoder: RowDecoder<R>,
    row_tx: mpsc::Sender<RawRow>,
    policy: MalformedRowPolicy,
) -> Result<DecodeSummary> {
    let mut summary = DecodeSummary::default();

    loop {
        match decoder.next_row() {
            Ok(Some(row)) => {
                if row_tx.blocking_send(row).is_err() {
                    debug!("Row queue closed, decoder stopping early");
                    break;
                }
            }
            Ok(None) => break,
            Err(Error::MalformedRow {
                line,
                expected,
                found,
            }) if policy == MalformedRowPolicy::Skip => {
                warn!(line, expected, found, "Skipping malformed row");
                summary.rows_skipped += 1;
            }
            Err(e) => {
                error!("Decoding stopped after {} rows: {}", decoder.rows_read(), e);
                return Err(e);
            }
        }
    }

    summary.rows_read = decoder.rows_read();
    Ok(summary)
}

fn transition(phase: &mut PipelinePhase, next: PipelinePhase) {
    debug!("Pipeline phase {} -> {}", phase, next);
    *phase = next;
}

//! Submission worker implementation

use std::sync::Arc;
use tracing::{debug, warn};

use crate::Result;
use crate::app::models::{
    FailureCause, RawRow, SchemaKind, SubmissionOutcome, SubmissionResponse,
};
use crate::app::services::record_client::{RecordClient, TransportError};
use crate::app::services::record_transformer::{render, transform};

/// Transforms and submits rows through a shared client
///
/// Cheap to clone: the client and subpath are reference counted.
pub struct SubmissionWorker<C: RecordClient> {
    client: Arc<C>,
    schema: SchemaKind,
    subpath: Arc<str>,
}

impl<C: RecordClient> Clone for SubmissionWorker<C> {
    fn clone(&self) -> Self {
        Self {
            client: Arc::clone(&self.client),
            schema: self.schema,
            subpath: Arc::clone(&self.subpath),
        }
    }
}

impl<C: RecordClient> SubmissionWorker<C> {
    pub fn new(client: Arc<C>, schema: SchemaKind, subpath: impl Into<Arc<str>>) -> Self {
        Self {
            client,
            schema,
            subpath: subpath.into(),
        }
    }

    /// Submit one row
    ///
    /// Performs exactly one remote call. Transport failures and non-2xx
    /// responses come back as [`SubmissionOutcome::Failed`]; an `Err` means the
    /// payload or request could not be built at all and the run should stop.
    pub async fn submit(&self, row: RawRow) -> Result<SubmissionOutcome> {
        let record = transform(self.schema, &row);
        let payload = render(&record)?;

        debug!(
            line = row.line,
            record_type = payload.record_type(),
            country_code = record.country_code(),
            city = record.name(),
            population = record.population(),
            "submitting record"
        );

        let request = self
            .client
            .build_write_request(&self.subpath, payload.into_body())?;

        let outcome = classify(self.client.execute(request).await);

        match &outcome {
            SubmissionOutcome::Submitted { status } => {
                debug!(line = row.line, city = record.name(), status, "record submitted");
            }
            SubmissionOutcome::Failed { cause } => {
                warn!(line = row.line, city = record.name(), error = %cause, "record submission failed");
            }
        }

        Ok(outcome)
    }
}

/// Classify the result of an executed request
///
/// Only 2xx responses count as submitted.
pub fn classify(
    result: std::result::Result<SubmissionResponse, TransportError>,
) -> SubmissionOutcome {
    match result {
        Ok(response) if response.is_success() => SubmissionOutcome::Submitted {
            status: response.status,
        },
        Ok(response) => {
            debug!(status = response.status, body = %response.body, "record rejected");
            SubmissionOutcome::Failed {
                cause: FailureCause::Rejected {
                    status: response.status,
                },
            }
        }
        Err(error) => SubmissionOutcome::Failed {
            cause: FailureCause::Transport(error.message),
        },
    }
}

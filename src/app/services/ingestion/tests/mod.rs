//! Test utilities and stub record client for pipeline testing
//!
//! [`StubClient`] stands in for the remote service: it records every body it
//! receives, tracks how many calls overlap, and can be told to fail, reject, or
//! panic on bodies containing a marker string.

use async_trait::async_trait;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use crate::Error;
use crate::app::models::SubmissionResponse;
use crate::app::services::record_client::{RecordClient, TransportError};


/// In-process record client
#[derive(Debug, Default)]
pub struct StubClient {
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
    bodies: Mutex<Vec<String>>,
    latency: Duration,
    fail_marker: Option<String>,
    reject_marker: Option<(String, u16)>,
    panic_marker: Option<String>,
    fail_build: bool,
}

impl StubClient {
    /// Client that accepts every request with 200
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay each call by `latency`
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Transport failure for bodies containing `marker`
    pub fn failing_on(mut self, marker: &str) -> Self {
        self.fail_marker = Some(marker.to_string());
        self
    }

    /// Respond with `status` for bodies containing `marker`
    pub fn rejecting_on(mut self, marker: &str, status: u16) -> Self {
        self.reject_marker = Some((marker.to_string(), status));
        self
    }

    /// Panic inside `execute` for bodies containing `marker`
    pub fn panicking_on(mut self, marker: &str) -> Self {
        self.panic_marker = Some(marker.to_string());
        self
    }

    /// Fail every request build
    pub fn with_broken_builder(mut self) -> Self {
        self.fail_build = true;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn peak_in_flight(&self) -> usize {
        self.peak_in_flight.load(Ordering::SeqCst)
    }

    pub fn bodies(&self) -> Vec<String> {
        self.bodies.lock().unwrap().clone()
    }
}

#[async_trait]
impl RecordClient for StubClient {
    type Request = String;

    fn build_write_request(&self, subpath: &str, body: String) -> crate::Result<String> {
        if self.fail_build {
            return Err(Error::request_build(subpath, "stub builder is broken"));
        }
        Ok(body)
    }

    async fn execute(&self, request: String) -> Result<SubmissionResponse, TransportError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(current, Ordering::SeqCst);

        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        } else {
            tokio::task::yield_now().await;
        }

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.bodies.lock().unwrap().push(request.clone());

        if let Some(marker) = &self.panic_marker
            && request.contains(marker.as_str())
        {
            panic!("stub client panicked on {}", marker);
        }
        if let Some(marker) = &self.fail_marker
            && request.contains(marker.as_str())
        {
            return Err(TransportError::new("connection reset by stub"));
        }
        if let Some((marker, status)) = &self.reject_marker
            && request.contains(marker.as_str())
        {
            return Ok(SubmissionResponse {
                status: *status,
                body: "{\"serverErrorCode\":\"BAD_REQUEST\"}".to_string(),
            });
        }

        Ok(SubmissionResponse {
            status: 200,
            body: "{\"records\":[]}".to_string(),
        })
    }
}

/// `count` minimal rows named city-0, city-1, ...
pub fn minimal_rows(count: usize) -> String {
    (0..count)
        .map(|i| format!("US,city-{i},City {i},IL,{},39.8,-89.6\n", 1000 + i))
        .collect()
}

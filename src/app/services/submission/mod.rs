//! Submission of individual city rows
//!
//! A [`SubmissionWorker`] owns the per-row path from decoded row to observed
//! response: transform, render, build the write request, execute it, and
//! classify the result.

pub mod worker;


pub use worker::{SubmissionWorker, classify};

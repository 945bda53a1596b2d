//! Metric instrument factories for trackq.
//!
//! Uses the OTel Meter API with the globally-registered `MeterProvider`.
//! All instruments are created lazily from the `"trackq"` meter.

use opentelemetry::metrics::{Counter, Histogram, Meter};

/// Returns the shared meter for trackq instruments.
fn meter() -> Meter {
    opentelemetry::global::meter("trackq")
}

/// Counter: jobs enqueued.
/// Labels: `job_type`.
pub fn jobs_enqueued() -> Counter<u64> {
    meter()
        .u64_counter("trackq.jobs.enqueued")
        .with_description("Number of jobs enqueued")
        .build()
}

/// Counter: claim attempts.
/// Labels: `result` ("claimed" | "empty").
pub fn job_claims() -> Counter<u64> {
    meter()
        .u64_counter("trackq.jobs.claims")
        .with_description("Number of claim attempts against the job queue")
        .build()
}

/// Counter: job state transitions.
/// Labels: `from`, `to`.
pub fn job_state_transitions() -> Counter<u64> {
    meter()
        .u64_counter("trackq.jobs.state_transitions")
        .with_description("Number of job state transitions")
        .build()
}

/// Counter: track records written or skipped by ingestion.
/// Labels: `outcome` ("inserted" | "skipped").
pub fn tracks_ingested() -> Counter<u64> {
    meter()
        .u64_counter("trackq.tracks.ingested")
        .with_description("Track records processed by dataset ingestion")
        .build()
}

/// Histogram: handler duration in milliseconds.
/// Labels: `job_type`, `status`.
pub fn job_duration_ms() -> Histogram<f64> {
    meter()
        .f64_histogram("trackq.job.duration_ms")
        .with_description("Job handler duration in milliseconds")
        .with_unit("ms")
        .build()
}

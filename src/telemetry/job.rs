//! Job execution span helpers.

use tracing::Span;

use crate::model::{JobId, JobType};

/// Start a span covering one claimed job from dispatch to finalize.
///
/// The `job.status` field is declared empty and is filled by
/// [`record_state_transition`].
pub fn start_job_span(job_type: JobType, id: JobId) -> Span {
    tracing::info_span!(
        "job.execute",
        "job.type" = job_type.as_str(),
        "job.id" = %id.0,
        "job.status" = tracing::field::Empty,
    )
}

/// Record a state transition on the span and emit it as an event.
pub fn record_state_transition(span: &Span, from: &str, to: &str) {
    span.record("job.status", to);
    span.in_scope(|| {
        tracing::info!(from = from, to = to, "state_transition");
    });
}

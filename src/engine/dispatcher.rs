//! Dispatcher: claims the next job, routes it to its handler, finalizes it.
//!
//! One dispatcher runs per worker process, single-threaded with respect to
//! jobs. Any number of worker processes can share one job store; claim
//! exclusivity comes from the store's skip-locked claim, not from here.

use std::any::Any;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use opentelemetry::KeyValue;
use tokio::sync::Notify;
use tracing::{Instrument, error, info, warn};

use crate::config::DEFAULT_POLL_INTERVAL;
use crate::db::Db;
use crate::error::Result;
use crate::handler::{HandlerError, HandlerRegistry, HandlerResult};
use crate::model::{ClaimedJob, JobId, Status};
use crate::telemetry::job::{record_state_transition, start_job_span};
use crate::telemetry::metrics;

/// Configuration for the dispatcher.
#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    /// Sleep between polls while the queue is empty or the store is failing.
    pub poll_interval: Duration,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

/// The worker poll loop.
#[derive(Clone)]
pub struct Dispatcher {
    db: Arc<Db>,
    registry: Arc<HandlerRegistry>,
    config: DispatcherConfig,
    shutdown: Arc<Notify>,
    stopping: Arc<AtomicBool>,
}

impl Dispatcher {
    pub fn new(db: Arc<Db>, registry: Arc<HandlerRegistry>, config: DispatcherConfig) -> Self {
        Self {
            db,
            registry,
            config,
            shutdown: Arc::new(Notify::new()),
            stopping: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Ask the loop to stop. A job already claimed is finished and finalized
    /// first; no new job is claimed afterwards.
    pub fn shutdown(&self) {
        self.stopping.store(true, Ordering::SeqCst);
        self.shutdown.notify_one();
    }

    pub fn is_stopping(&self) -> bool {
        self.stopping.load(Ordering::SeqCst)
    }

    /// Run until [`shutdown`](Self::shutdown) is called.
    ///
    /// Handler failures finalize their job as failed. Store errors are logged
    /// and retried after the poll interval. Neither ends the loop.
    pub async fn run(&self) -> Result<()> {
        info!(
            poll_interval_ms = self.config.poll_interval.as_millis() as u64,
            "dispatcher started, polling for jobs"
        );

        while !self.is_stopping() {
            let idle = match self.run_once().await {
                Ok(Some(_)) => false,
                Ok(None) => true,
                Err(e) => {
                    error!("dispatch error: {e}");
                    true
                }
            };

            if idle {
                tokio::select! {
                    _ = self.shutdown.notified() => {}
                    _ = tokio::time::sleep(self.config.poll_interval) => {}
                }
            }
        }

        info!("dispatcher shutting down");
        Ok(())
    }

    /// Claim and run every claimable job, returning how many were processed.
    pub async fn drain(&self) -> Result<usize> {
        let mut processed = 0;
        while self.run_once().await?.is_some() {
            processed += 1;
        }
        Ok(processed)
    }

    /// Claim at most one job, run it, and finalize it.
    ///
    /// Returns `None` when nothing was claimable.
    pub async fn run_once(&self) -> Result<Option<(JobId, Status)>> {
        let Some(job) = self.db.claim_next().await? else {
            return Ok(None);
        };

        let id = job.id;
        let job_type = job.job_type;
        let span = start_job_span(job_type, id);
        record_state_transition(&span, "queued", "running");

        async {
            let start = Instant::now();
            let outcome = self.execute(job).await;
            let duration_ms = start.elapsed().as_millis() as u64;

            let status = match outcome {
                Ok(result) => {
                    self.db.complete_job(id, &result).await?;
                    info!(%id, duration_ms, "job succeeded");
                    Status::Succeeded
                }
                Err(e) => {
                    warn!(%id, kind = e.kind(), error = %e, duration_ms, "job failed");
                    self.db.finalize(id, Status::Failed, &e.to_result()).await?;
                    Status::Failed
                }
            };

            record_state_transition(&span, "running", status.as_str());
            metrics::job_duration_ms().record(
                duration_ms as f64,
                &[
                    KeyValue::new("job_type", job_type.as_str()),
                    KeyValue::new("status", status.as_str()),
                ],
            );

            Ok::<_, crate::error::Error>(Some((id, status)))
        }
        .instrument(span.clone())
        .await
    }

    /// Route to the registered handler. The handler runs in its own task so
    /// a panic surfaces here as an error instead of unwinding the loop.
    async fn execute(&self, job: ClaimedJob) -> HandlerResult {
        let Some(handler) = self.registry.get(job.job_type) else {
            return Err(HandlerError::Unroutable(job.job_type));
        };

        match tokio::spawn(async move { handler.handle(&job).await }).await {
            Ok(result) => result,
            Err(e) if e.is_panic() => Err(HandlerError::Panicked(panic_message(e.into_panic()))),
            Err(e) => Err(HandlerError::Panicked(e.to_string())),
        }
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

//! Delay/echo handler: sleeps, then echoes its message.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use tracing::debug;

use super::{Handler, HandlerResult, decode_payload};
use crate::model::{ClaimedJob, DelayPayload, JobType};

/// Models a long-running task. The sleep is the whole job.
pub struct DelayHandler;

#[async_trait]
impl Handler for DelayHandler {
    fn job_type(&self) -> JobType {
        JobType::Delay
    }

    async fn handle(&self, job: &ClaimedJob) -> HandlerResult {
        let payload: DelayPayload = decode_payload(&job.payload)?;
        debug!(id = %job.id, seconds = payload.sleep_seconds, "sleeping");

        tokio::time::sleep(Duration::from_secs(payload.sleep_seconds)).await;

        Ok(json!({
            "slept_for": payload.sleep_seconds,
            "echo": payload.message,
        }))
    }
}

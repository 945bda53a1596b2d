//! Find-comparables handler: nearest neighbors of one track in the dataset.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use super::{Handler, HandlerError, HandlerResult, decode_payload};
use crate::db::Db;
use crate::model::{ClaimedJob, ComparablesPayload, JobType};
use crate::similarity::{self, DEFAULT_LIMIT};

pub struct ComparablesHandler {
    db: Arc<Db>,
    limit: usize,
}

impl ComparablesHandler {
    pub fn new(db: Arc<Db>) -> Self {
        Self {
            db,
            limit: DEFAULT_LIMIT,
        }
    }
}

#[async_trait]
impl Handler for ComparablesHandler {
    fn job_type(&self) -> JobType {
        JobType::FindComparables
    }

    async fn handle(&self, job: &ClaimedJob) -> HandlerResult {
        let payload: ComparablesPayload = decode_payload(&job.payload)?;
        info!(id = %job.id, track = %payload.track_name, "finding comparables");

        let tracks = self.db.load_tracks().await?;
        let found = similarity::find_comparables(&tracks, &payload.track_name, self.limit)?;

        serde_json::to_value(&found)
            .map_err(|e| HandlerError::Internal(format!("encoding comparables: {e}")))
    }
}

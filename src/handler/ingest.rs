//! Dataset ingestion handler: replaces the track table from a CSV source.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;
use tracing::info;

use super::{Handler, HandlerError, HandlerResult, decode_payload};
use crate::dataset;
use crate::db::Db;
use crate::model::{ClaimedJob, IngestPayload, JobType};

pub struct IngestHandler {
    db: Arc<Db>,
    default_path: PathBuf,
}

impl IngestHandler {
    pub fn new(db: Arc<Db>, default_path: PathBuf) -> Self {
        Self { db, default_path }
    }
}

#[async_trait]
impl Handler for IngestHandler {
    fn job_type(&self) -> JobType {
        JobType::IngestDataset
    }

    async fn handle(&self, job: &ClaimedJob) -> HandlerResult {
        let payload: IngestPayload = decode_payload(&job.payload)?;
        let path = payload
            .csv_path
            .map(PathBuf::from)
            .unwrap_or_else(|| self.default_path.clone());

        info!(id = %job.id, path = %path.display(), "ingesting dataset");

        // Read the whole source before touching the table, so an unreadable
        // source leaves the current dataset in place.
        let batch = dataset::load(path.clone())
            .await
            .map_err(|e| HandlerError::Source(format!("{}: {e}", path.display())))?;

        let counts = self.db.replace_tracks(&batch.tracks).await?;
        let rows_skipped = batch.skipped + counts.rows_skipped;

        info!(
            id = %job.id,
            rows_inserted = counts.rows_inserted,
            rows_skipped,
            "dataset replaced"
        );

        Ok(json!({
            "csv_path": path.display().to_string(),
            "rows_inserted": counts.rows_inserted,
            "rows_skipped": rows_skipped,
        }))
    }
}

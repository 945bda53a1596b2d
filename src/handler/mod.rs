//! Job handlers and the registry that routes each job type to one.
//!
//! Adding a job type means adding a [`JobType`] variant, a [`Handler`]
//! implementation, and one `register` call in [`HandlerRegistry::standard`].

pub mod comparables;
pub mod delay;
pub mod ingest;

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::db::Db;
use crate::model::{ClaimedJob, JobType, error_result};
use crate::similarity::SearchError;

pub use comparables::ComparablesHandler;
pub use delay::DelayHandler;
pub use ingest::IngestHandler;

/// Why a handler could not produce a result. Every variant ends the job as
/// `failed`; none of them stop the dispatcher.
#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("invalid payload: {0}")]
    InvalidPayload(String),

    #[error("track dataset is empty, run ingest_dataset first")]
    DatasetEmpty,

    #[error("track '{0}' not found in dataset")]
    TrackNotFound(String),

    #[error("dataset source unreadable: {0}")]
    Source(String),

    #[error("store error: {0}")]
    Store(#[from] crate::error::Error),

    #[error("no handler registered for job type {0}")]
    Unroutable(JobType),

    #[error("handler panicked: {0}")]
    Panicked(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl HandlerError {
    /// Stable machine-readable kind stored in the job result.
    pub fn kind(&self) -> &'static str {
        match self {
            HandlerError::InvalidPayload(_) => "invalid_payload",
            HandlerError::DatasetEmpty => "dataset_empty",
            HandlerError::TrackNotFound(_) => "track_not_found",
            HandlerError::Source(_) => "source",
            HandlerError::Store(_) => "store",
            HandlerError::Unroutable(_) => "unroutable",
            HandlerError::Panicked(_) => "panicked",
            HandlerError::Internal(_) => "internal",
        }
    }

    /// `{"error": {"kind": ..., "message": ...}}`
    pub fn to_result(&self) -> serde_json::Value {
        error_result(self.kind(), &self.to_string())
    }
}

impl From<SearchError> for HandlerError {
    fn from(e: SearchError) -> Self {
        match e {
            SearchError::DatasetEmpty => HandlerError::DatasetEmpty,
            SearchError::TrackNotFound(name) => HandlerError::TrackNotFound(name),
        }
    }
}

pub type HandlerResult = std::result::Result<serde_json::Value, HandlerError>;

/// Executes one job type.
#[async_trait]
pub trait Handler: Send + Sync {
    /// The job type this handler is registered for.
    fn job_type(&self) -> JobType;

    /// Run the job and return its result payload.
    async fn handle(&self, job: &ClaimedJob) -> HandlerResult;
}

/// Decode a stored payload. A null payload decodes as `{}`.
pub(crate) fn decode_payload<T: DeserializeOwned>(
    payload: &serde_json::Value,
) -> Result<T, HandlerError> {
    let value = if payload.is_null() {
        serde_json::json!({})
    } else {
        payload.clone()
    };
    serde_json::from_value(value).map_err(|e| HandlerError::InvalidPayload(e.to_string()))
}

/// Maps each job type to its handler.
#[derive(Clone, Default)]
pub struct HandlerRegistry {
    handlers: HashMap<JobType, Arc<dyn Handler>>,
}

impl HandlerRegistry {
    /// Create an empty registry with no handlers.
    pub fn empty() -> Self {
        Self::default()
    }

    /// The registry a worker process runs with: one handler per job type.
    pub fn standard(db: Arc<Db>, default_dataset: PathBuf) -> Self {
        let mut registry = Self::empty();
        registry
            .register(Arc::new(DelayHandler))
            .register(Arc::new(IngestHandler::new(Arc::clone(&db), default_dataset)))
            .register(Arc::new(ComparablesHandler::new(db)));
        registry
    }

    /// Register a handler under its job type, replacing any previous one.
    pub fn register(&mut self, handler: Arc<dyn Handler>) -> &mut Self {
        self.handlers.insert(handler.job_type(), handler);
        self
    }

    /// Look up the handler for a job type.
    pub fn get(&self, job_type: JobType) -> Option<Arc<dyn Handler>> {
        self.handlers.get(&job_type).cloned()
    }
}

//! Job types, lifecycle states, and producer-facing payloads.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Error, Result};

// ---------------------------------------------------------------------------
// Job
// ---------------------------------------------------------------------------

/// A unit of work tracked in the job store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,

    /// Which handler runs this job. Immutable after creation.
    pub job_type: JobType,

    /// Current lifecycle state.
    pub status: Status,

    /// Type-specific input. Immutable after creation.
    pub payload: serde_json::Value,

    /// Present once the job is succeeded or failed. On failure holds
    /// `{"error": {"kind": ..., "message": ...}}`.
    pub result: Option<serde_json::Value>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Newtype for job IDs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobId(pub Uuid);

impl JobId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Short display: first 8 chars of UUID
        write!(f, "{}", &self.0.to_string()[..8])
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

/// A job as handed to the dispatcher by a successful claim.
#[derive(Debug, Clone)]
pub struct ClaimedJob {
    pub id: JobId,
    pub job_type: JobType,
    pub payload: serde_json::Value,
}

// ---------------------------------------------------------------------------
// Job type
// ---------------------------------------------------------------------------

/// The closed set of job variants. Each maps to exactly one handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobType {
    Delay,
    IngestDataset,
    FindComparables,
}

impl JobType {
    pub const ALL: [JobType; 3] = [
        JobType::Delay,
        JobType::IngestDataset,
        JobType::FindComparables,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            JobType::Delay => "delay",
            JobType::IngestDataset => "ingest_dataset",
            JobType::FindComparables => "find_comparables",
        }
    }
}

impl std::fmt::Display for JobType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for JobType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            // "sleep" is the name older producers used for delay jobs
            "delay" | "sleep" => Ok(JobType::Delay),
            "ingest_dataset" => Ok(JobType::IngestDataset),
            "find_comparables" => Ok(JobType::FindComparables),
            other => Err(Error::Validation(format!("unknown job type: {other}"))),
        }
    }
}

// ---------------------------------------------------------------------------
// Status
// ---------------------------------------------------------------------------

/// Lifecycle state of a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    /// Waiting for a worker to claim it.
    Queued,
    /// Claimed by exactly one worker, handler executing.
    Running,
    /// Handler returned a result. Terminal.
    Succeeded,
    /// Handler failed. Terminal, never retried.
    Failed,
}

impl Status {
    /// Can transition from self to `to`?
    pub fn can_transition_to(self, to: Status) -> bool {
        use Status::*;
        matches!(
            (self, to),
            (Queued, Running) | (Running, Succeeded) | (Running, Failed)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Status::Succeeded | Status::Failed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Status::Queued => "queued",
            Status::Running => "running",
            Status::Succeeded => "succeeded",
            Status::Failed => "failed",
        }
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Status {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "queued" => Ok(Status::Queued),
            "running" => Ok(Status::Running),
            "succeeded" => Ok(Status::Succeeded),
            "failed" => Ok(Status::Failed),
            other => Err(Error::Other(format!("unknown job status: {other}"))),
        }
    }
}

// ---------------------------------------------------------------------------
// Payloads
// ---------------------------------------------------------------------------

fn default_sleep_seconds() -> u64 {
    3
}

/// Input for a delay job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelayPayload {
    #[serde(default = "default_sleep_seconds")]
    pub sleep_seconds: u64,
    #[serde(default)]
    pub message: Option<String>,
}

/// Input for a dataset ingestion job. `None` means the worker's configured path.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestPayload {
    #[serde(default)]
    pub csv_path: Option<String>,
}

/// Input for a comparable-track search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComparablesPayload {
    pub track_name: String,
}

/// A producer's request to create a job, tagged by `job_type`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "job_type", rename_all = "snake_case")]
pub enum JobRequest {
    #[serde(alias = "sleep")]
    Delay(DelayPayload),
    IngestDataset(IngestPayload),
    FindComparables(ComparablesPayload),
}

impl JobRequest {
    pub fn delay(sleep_seconds: u64, message: Option<String>) -> Self {
        JobRequest::Delay(DelayPayload {
            sleep_seconds,
            message,
        })
    }

    pub fn ingest(csv_path: Option<String>) -> Self {
        JobRequest::IngestDataset(IngestPayload { csv_path })
    }

    pub fn find_comparables(track_name: impl Into<String>) -> Self {
        JobRequest::FindComparables(ComparablesPayload {
            track_name: track_name.into(),
        })
    }

    pub fn job_type(&self) -> JobType {
        match self {
            JobRequest::Delay(_) => JobType::Delay,
            JobRequest::IngestDataset(_) => JobType::IngestDataset,
            JobRequest::FindComparables(_) => JobType::FindComparables,
        }
    }

    /// Reject malformed requests before anything is queued.
    pub fn validate(&self) -> Result<()> {
        match self {
            JobRequest::Delay(_) => Ok(()),
            JobRequest::IngestDataset(p) => match p.csv_path.as_deref() {
                Some(path) if path.trim().is_empty() => Err(Error::Validation(
                    "csv_path must not be blank when given".to_string(),
                )),
                _ => Ok(()),
            },
            JobRequest::FindComparables(p) => {
                if p.track_name.trim().is_empty() {
                    Err(Error::Validation("track_name is required".to_string()))
                } else {
                    Ok(())
                }
            }
        }
    }

    /// The structured payload stored with the job, without the type tag.
    pub fn payload(&self) -> Result<serde_json::Value> {
        let value = match self {
            JobRequest::Delay(p) => serde_json::to_value(p)?,
            JobRequest::IngestDataset(p) => serde_json::to_value(p)?,
            JobRequest::FindComparables(p) => serde_json::to_value(p)?,
        };
        Ok(value)
    }
}

/// The `result` stored on a failed job.
pub fn error_result(kind: &str, message: &str) -> serde_json::Value {
    serde_json::json!({
        "error": {
            "kind": kind,
            "message": message,
        }
    })
}

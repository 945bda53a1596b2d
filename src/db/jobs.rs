//! Job store: enqueue, claim with skip-locked, finalize, and inspection.

use crate::error::{Error, Result};
use crate::model::job::*;
use crate::telemetry::metrics;
use opentelemetry::KeyValue;
use uuid::Uuid;

/// Validate a state transition, returning an error if disallowed.
fn validate_transition(from: Status, to: Status) -> Result<()> {
    if from.can_transition_to(to) {
        Ok(())
    } else {
        Err(Error::InvalidTransition {
            from: from.to_string(),
            to: to.to_string(),
        })
    }
}

impl super::Db {
    /// Validate a producer request and enqueue it.
    pub async fn submit(&self, request: JobRequest) -> Result<Job> {
        request.validate()?;
        let id = self.enqueue(request.job_type(), request.payload()?).await?;
        self.get_job(id).await
    }

    /// Insert a new job in `queued`.
    pub async fn enqueue(&self, job_type: JobType, payload: serde_json::Value) -> Result<JobId> {
        let id = Uuid::new_v4();
        let now = chrono::Utc::now();

        sqlx::query(
            "INSERT INTO jobs (id, job_type, status, payload, created_at, updated_at)
             VALUES ($1, $2, 'queued', $3, $4, $4)",
        )
        .bind(id)
        .bind(job_type.as_str())
        .bind(&payload)
        .bind(now)
        .execute(self.pool())
        .await?;

        metrics::jobs_enqueued().add(1, &[KeyValue::new("job_type", job_type.as_str())]);

        Ok(JobId(id))
    }

    /// Claim the oldest queued job not locked by another claimer.
    ///
    /// Selection and the queued → running transition commit in one
    /// transaction. `SKIP LOCKED` makes rows held by a concurrent claimer
    /// invisible instead of blocking on them, so this never waits for
    /// another worker. Returns `None` when nothing is claimable.
    pub async fn claim_next(&self) -> Result<Option<ClaimedJob>> {
        let mut tx = self.pool().begin().await?;

        let row: Option<(Uuid, String, serde_json::Value)> = sqlx::query_as(
            "SELECT id, job_type, payload FROM jobs
             WHERE status = 'queued'
             ORDER BY created_at, id
             LIMIT 1
             FOR UPDATE SKIP LOCKED",
        )
        .fetch_optional(&mut *tx)
        .await?;

        let Some((id, job_type, payload)) = row else {
            tx.rollback().await?;
            metrics::job_claims().add(1, &[KeyValue::new("result", "empty")]);
            return Ok(None);
        };

        let job_type: JobType = job_type.parse()?;

        let rows_affected = sqlx::query(
            "UPDATE jobs SET status = 'running', updated_at = $1
             WHERE id = $2 AND status = 'queued'",
        )
        .bind(chrono::Utc::now())
        .bind(id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        // Dropping `tx` rolls back.
        if rows_affected == 0 {
            return Err(Error::InvalidTransition {
                from: Status::Queued.to_string(),
                to: Status::Running.to_string(),
            });
        }

        tx.commit().await?;

        metrics::job_claims().add(1, &[KeyValue::new("result", "claimed")]);
        metrics::job_state_transitions().add(
            1,
            &[
                KeyValue::new("from", "queued"),
                KeyValue::new("to", "running"),
            ],
        );

        Ok(Some(ClaimedJob {
            id: JobId(id),
            job_type,
            payload,
        }))
    }

    /// Finalize a running job as succeeded or failed with its result.
    pub async fn finalize(&self, id: JobId, status: Status, result: &serde_json::Value) -> Result<()> {
        validate_transition(Status::Running, status)?;

        let rows_affected = sqlx::query(
            "UPDATE jobs SET status = $1, result = $2, updated_at = $3
             WHERE id = $4 AND status = 'running'",
        )
        .bind(status.as_str())
        .bind(result)
        .bind(chrono::Utc::now())
        .bind(id.0)
        .execute(self.pool())
        .await?
        .rows_affected();

        if rows_affected == 0 {
            return Err(Error::InvalidTransition {
                from: "running".to_string(),
                to: status.to_string(),
            });
        }

        metrics::job_state_transitions().add(
            1,
            &[
                KeyValue::new("from", "running"),
                KeyValue::new("to", status.as_str()),
            ],
        );

        Ok(())
    }

    /// Running → Succeeded.
    pub async fn complete_job(&self, id: JobId, result: &serde_json::Value) -> Result<()> {
        self.finalize(id, Status::Succeeded, result).await
    }

    /// Running → Failed with a structured error description.
    pub async fn fail_job(&self, id: JobId, kind: &str, message: &str) -> Result<()> {
        self.finalize(id, Status::Failed, &error_result(kind, message))
            .await
    }

    /// Fail `running` jobs whose last transition is older than `older_than`.
    ///
    /// A worker that dies mid-handler leaves its job in `running` forever.
    /// This is the operator's way to close those out; it never re-queues.
    pub async fn fail_stale_running(&self, older_than: std::time::Duration) -> Result<u64> {
        let older_than = chrono::Duration::from_std(older_than)
            .map_err(|e| Error::Validation(format!("stale threshold out of range: {e}")))?;
        let now = chrono::Utc::now();
        let cutoff = now - older_than;
        let result = error_result(
            "abandoned",
            &format!("worker stopped before finalizing; running since before {cutoff}"),
        );

        let rows_affected = sqlx::query(
            "UPDATE jobs SET status = 'failed', result = $1, updated_at = $2
             WHERE status = 'running' AND updated_at < $3",
        )
        .bind(&result)
        .bind(now)
        .bind(cutoff)
        .execute(self.pool())
        .await?
        .rows_affected();

        if rows_affected > 0 {
            metrics::job_state_transitions().add(
                rows_affected,
                &[
                    KeyValue::new("from", "running"),
                    KeyValue::new("to", "failed"),
                ],
            );
        }

        Ok(rows_affected)
    }

    /// Get a job by ID.
    pub async fn get_job(&self, id: JobId) -> Result<Job> {
        let row: Option<JobRow> = sqlx::query_as(
            "SELECT id, job_type, status, payload, result, created_at, updated_at
             FROM jobs WHERE id = $1",
        )
        .bind(id.0)
        .fetch_optional(self.pool())
        .await?;

        row.ok_or_else(|| Error::NotFound(format!("job {id}")))?
            .try_into_job()
    }

    /// List jobs, newest first.
    pub async fn list_jobs(&self, limit: i64) -> Result<Vec<Job>> {
        let rows: Vec<JobRow> = sqlx::query_as(
            "SELECT id, job_type, status, payload, result, created_at, updated_at
             FROM jobs
             ORDER BY created_at DESC
             LIMIT $1",
        )
        .bind(limit)
        .fetch_all(self.pool())
        .await?;

        rows.into_iter().map(JobRow::try_into_job).collect()
    }
}

/// Internal row type for sqlx::FromRow.
#[derive(sqlx::FromRow)]
struct JobRow {
    id: Uuid,
    job_type: String,
    status: String,
    payload: serde_json::Value,
    result: Option<serde_json::Value>,
    created_at: chrono::DateTime<chrono::Utc>,
    updated_at: chrono::DateTime<chrono::Utc>,
}

impl JobRow {
    fn try_into_job(self) -> Result<Job> {
        Ok(Job {
            id: JobId(self.id),
            job_type: self.job_type.parse()?,
            status: self.status.parse()?,
            payload: self.payload,
            result: self.result,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

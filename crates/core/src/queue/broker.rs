//! Broker trait and errors.

use async_trait::async_trait;
use thiserror::Error;

use super::{ConversionJob, ConversionResult, JobKind, JobOptions, QueueCounts, QueuedJob};

/// Errors raised by the queue.
#[derive(Debug, Error)]
pub enum QueueError {
    /// The submitted payload or job type is not acceptable.
    #[error("Invalid job payload: {0}")]
    InvalidPayload(String),

    /// No job with this id.
    #[error("Job not found: {0}")]
    NotFound(String),

    /// The job is not in the state the operation requires.
    #[error("Job {job_id} is {actual}, expected {expected}")]
    InvalidState {
        job_id: String,
        actual: String,
        expected: String,
    },

    /// Backing store failure.
    #[error("Queue database error: {0}")]
    Database(String),

    /// The backing store could not be opened.
    #[error("Queue connection failed: {0}")]
    Connection(String),
}

impl From<rusqlite::Error> for QueueError {
    fn from(e: rusqlite::Error) -> Self {
        QueueError::Database(e.to_string())
    }
}

/// Durable job store used by the queue client and the worker.
///
/// Jobs move `pending → active → completed | failed`. A failed attempt with
/// attempts remaining goes back to `pending` with a delayed `run_at`.
#[async_trait]
pub trait JobBroker: Send + Sync {
    /// Broker name for logging.
    fn name(&self) -> &str;

    /// Insert a job. An existing job with the same id is returned unchanged.
    async fn enqueue(
        &self,
        kind: JobKind,
        payload: ConversionJob,
        options: JobOptions,
    ) -> Result<QueuedJob, QueueError>;

    async fn get(&self, id: &str) -> Result<Option<QueuedJob>, QueueError>;

    /// Atomically claim the oldest due `pending` job of `kind`, marking it `active`.
    async fn claim_next(&self, kind: JobKind) -> Result<Option<QueuedJob>, QueueError>;

    /// Raise the job's progress. Lower values are ignored.
    async fn update_progress(&self, id: &str, progress: u8) -> Result<(), QueueError>;

    /// Mark an active job completed with its result.
    async fn complete(&self, id: &str, result: &ConversionResult)
        -> Result<QueuedJob, QueueError>;

    /// Record a failed attempt. Reschedules with backoff while attempts remain,
    /// unless `permanent`, otherwise marks the job failed.
    async fn fail_attempt(
        &self,
        id: &str,
        reason: &str,
        permanent: bool,
    ) -> Result<QueuedJob, QueueError>;

    /// Return jobs left `active` by a previous process to `pending`.
    async fn recover_stalled(&self) -> Result<usize, QueueError>;

    async fn counts(&self) -> Result<QueueCounts, QueueError>;
}

//! SQLite-backed job broker.

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};

use super::{
    Backoff, ConversionJob, ConversionResult, JobBroker, JobKind, JobOptions, JobState,
    QueueCounts, QueueError, QueuedJob,
};

const JOB_COLUMNS: &str = "id, kind, payload, state, progress, attempts_made, max_attempts, \
     backoff, result, error, run_at, created_at, updated_at, finished_at";

/// SQLite-backed job broker.
pub struct SqliteJobBroker {
    conn: Mutex<Connection>,
}

impl SqliteJobBroker {
    /// Open (or create) a broker database file.
    pub fn new(path: &Path) -> Result<Self, QueueError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    QueueError::Connection(format!("{}: {}", parent.display(), e))
                })?;
            }
        }
        let conn = Connection::open(path).map_err(|e| QueueError::Connection(e.to_string()))?;
        conn.busy_timeout(std::time::Duration::from_secs(5))?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory broker (useful for testing).
    pub fn in_memory() -> Result<Self, QueueError> {
        let conn =
            Connection::open_in_memory().map_err(|e| QueueError::Connection(e.to_string()))?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn initialize_schema(conn: &Connection) -> Result<(), QueueError> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS jobs (
                id TEXT PRIMARY KEY,
                kind TEXT NOT NULL,
                payload TEXT NOT NULL,
                state TEXT NOT NULL,
                progress INTEGER NOT NULL DEFAULT 0,
                attempts_made INTEGER NOT NULL DEFAULT 0,
                max_attempts INTEGER NOT NULL,
                backoff TEXT NOT NULL,
                result TEXT,
                error TEXT,
                run_at TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                finished_at TEXT
            );

            CREATE INDEX IF NOT EXISTS idx_jobs_claim ON jobs(kind, state, run_at);
            CREATE INDEX IF NOT EXISTS idx_jobs_state ON jobs(state);
            "#,
        )?;
        Ok(())
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, QueueError> {
        self.conn
            .lock()
            .map_err(|_| QueueError::Database("connection mutex poisoned".to_string()))
    }

    fn row_to_job(row: &rusqlite::Row) -> rusqlite::Result<RawJob> {
        Ok(RawJob {
            id: row.get(0)?,
            kind: row.get(1)?,
            payload: row.get(2)?,
            state: row.get(3)?,
            progress: row.get(4)?,
            attempts_made: row.get(5)?,
            max_attempts: row.get(6)?,
            backoff: row.get(7)?,
            result: row.get(8)?,
            error: row.get(9)?,
            run_at: row.get(10)?,
            created_at: row.get(11)?,
            updated_at: row.get(12)?,
            finished_at: row.get(13)?,
        })
    }

    fn fetch(conn: &Connection, id: &str) -> Result<Option<QueuedJob>, QueueError> {
        let raw = conn
            .query_row(
                &format!("SELECT {JOB_COLUMNS} FROM jobs WHERE id = ?1"),
                params![id],
                Self::row_to_job,
            )
            .optional()?;
        raw.map(RawJob::into_job).transpose()
    }

    fn fetch_required(conn: &Connection, id: &str) -> Result<QueuedJob, QueueError> {
        Self::fetch(conn, id)?.ok_or_else(|| QueueError::NotFound(id.to_string()))
    }
}

/// Row as stored; decoded into a `QueuedJob` outside the rusqlite closure.
struct RawJob {
    id: String,
    kind: String,
    payload: String,
    state: String,
    progress: u8,
    attempts_made: u32,
    max_attempts: u32,
    backoff: String,
    result: Option<String>,
    error: Option<String>,
    run_at: String,
    created_at: String,
    updated_at: String,
    finished_at: Option<String>,
}

impl RawJob {
    fn into_job(self) -> Result<QueuedJob, QueueError> {
        let decode = |what: &str, e: serde_json::Error| {
            QueueError::Database(format!("corrupt {what} for job {}: {e}", self.id))
        };
        let payload: ConversionJob =
            serde_json::from_str(&self.payload).map_err(|e| decode("payload", e))?;
        let backoff: Backoff =
            serde_json::from_str(&self.backoff).map_err(|e| decode("backoff", e))?;
        let result: Option<ConversionResult> = match self.result.as_deref() {
            Some(json) => Some(serde_json::from_str(json).map_err(|e| decode("result", e))?),
            None => None,
        };

        Ok(QueuedJob {
            kind: self.kind.parse()?,
            state: self.state.parse()?,
            progress: self.progress,
            attempts_made: self.attempts_made,
            max_attempts: self.max_attempts,
            payload,
            backoff,
            result,
            error: self.error,
            run_at: parse_timestamp(&self.run_at)?,
            created_at: parse_timestamp(&self.created_at)?,
            updated_at: parse_timestamp(&self.updated_at)?,
            finished_at: self.finished_at.as_deref().map(parse_timestamp).transpose()?,
            id: self.id,
        })
    }
}

fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn parse_timestamp(s: &str) -> Result<DateTime<Utc>, QueueError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| QueueError::Database(format!("invalid timestamp {s:?}: {e}")))
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<String, QueueError> {
    serde_json::to_string(value).map_err(|e| QueueError::Database(e.to_string()))
}

#[async_trait]
impl JobBroker for SqliteJobBroker {
    fn name(&self) -> &str {
        "sqlite"
    }

    async fn enqueue(
        &self,
        kind: JobKind,
        payload: ConversionJob,
        options: JobOptions,
    ) -> Result<QueuedJob, QueueError> {
        payload.validate()?;
        if options.attempts == 0 {
            return Err(QueueError::InvalidPayload(
                "attempts must be at least 1".to_string(),
            ));
        }

        let id = options
            .job_id
            .clone()
            .unwrap_or_else(|| payload.conversion_id.clone());
        let now = timestamp(Utc::now());
        let conn = self.conn()?;

        conn.execute(
            "INSERT OR IGNORE INTO jobs \
             (id, kind, payload, state, progress, attempts_made, max_attempts, backoff, \
              run_at, created_at, updated_at) \
             VALUES (?1, ?2, ?3, 'pending', 0, 0, ?4, ?5, ?6, ?6, ?6)",
            params![
                id,
                kind.as_str(),
                to_json(&payload)?,
                options.attempts,
                to_json(&options.backoff)?,
                now,
            ],
        )?;

        Self::fetch_required(&conn, &id)
    }

    async fn get(&self, id: &str) -> Result<Option<QueuedJob>, QueueError> {
        let conn = self.conn()?;
        Self::fetch(&conn, id)
    }

    async fn claim_next(&self, kind: JobKind) -> Result<Option<QueuedJob>, QueueError> {
        let mut conn = self.conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let now = timestamp(Utc::now());

        let id: Option<String> = tx
            .query_row(
                "SELECT id FROM jobs \
                 WHERE kind = ?1 AND state = 'pending' AND run_at <= ?2 \
                 ORDER BY run_at ASC, created_at ASC LIMIT 1",
                params![kind.as_str(), now],
                |row| row.get(0),
            )
            .optional()?;

        let Some(id) = id else {
            return Ok(None);
        };

        tx.execute(
            "UPDATE jobs SET state = 'active', updated_at = ?2 WHERE id = ?1",
            params![id, now],
        )?;
        let job = Self::fetch_required(&tx, &id)?;
        tx.commit()?;
        Ok(Some(job))
    }

    async fn update_progress(&self, id: &str, progress: u8) -> Result<(), QueueError> {
        let conn = self.conn()?;
        let changed = conn.execute(
            "UPDATE jobs SET progress = MAX(progress, ?2), updated_at = ?3 WHERE id = ?1",
            params![id, progress.min(100), timestamp(Utc::now())],
        )?;
        if changed == 0 {
            return Err(QueueError::NotFound(id.to_string()));
        }
        Ok(())
    }

    async fn complete(
        &self,
        id: &str,
        result: &ConversionResult,
    ) -> Result<QueuedJob, QueueError> {
        let conn = self.conn()?;
        let job = Self::fetch_required(&conn, id)?;
        if job.state != JobState::Active {
            return Err(QueueError::InvalidState {
                job_id: id.to_string(),
                actual: job.state.to_string(),
                expected: JobState::Active.to_string(),
            });
        }

        let now = timestamp(Utc::now());
        conn.execute(
            "UPDATE jobs SET state = 'completed', progress = 100, result = ?2, error = NULL, \
             updated_at = ?3, finished_at = ?3 WHERE id = ?1",
            params![id, to_json(result)?, now],
        )?;
        Self::fetch_required(&conn, id)
    }

    async fn fail_attempt(
        &self,
        id: &str,
        reason: &str,
        permanent: bool,
    ) -> Result<QueuedJob, QueueError> {
        let conn = self.conn()?;
        let job = Self::fetch_required(&conn, id)?;
        if job.state != JobState::Active {
            return Err(QueueError::InvalidState {
                job_id: id.to_string(),
                actual: job.state.to_string(),
                expected: JobState::Active.to_string(),
            });
        }

        let attempts_made = job.attempts_made + 1;
        let now = Utc::now();

        if permanent || attempts_made >= job.max_attempts {
            conn.execute(
                "UPDATE jobs SET state = 'failed', attempts_made = ?2, error = ?3, \
                 updated_at = ?4, finished_at = ?4 WHERE id = ?1",
                params![id, attempts_made, reason, timestamp(now)],
            )?;
        } else {
            let delay = job.backoff.delay_for(attempts_made);
            let run_at = now
                + chrono::Duration::from_std(delay).unwrap_or_else(|_| chrono::Duration::zero());
            conn.execute(
                "UPDATE jobs SET state = 'pending', attempts_made = ?2, error = ?3, \
                 run_at = ?4, updated_at = ?5 WHERE id = ?1",
                params![id, attempts_made, reason, timestamp(run_at), timestamp(now)],
            )?;
        }

        Self::fetch_required(&conn, id)
    }

    async fn recover_stalled(&self) -> Result<usize, QueueError> {
        let conn = self.conn()?;
        let recovered = conn.execute(
            "UPDATE jobs SET state = 'pending', updated_at = ?1 WHERE state = 'active'",
            params![timestamp(Utc::now())],
        )?;
        Ok(recovered)
    }

    async fn counts(&self) -> Result<QueueCounts, QueueError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare("SELECT state, COUNT(*) FROM jobs GROUP BY state")?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
        })?;

        let mut counts = QueueCounts::default();
        for row in rows {
            let (state, count) = row?;
            let count = count.max(0) as u64;
            match state.parse::<JobState>()? {
                JobState::Pending => counts.pending = count,
                JobState::Active => counts.active = count,
                JobState::Completed => counts.completed = count,
                JobState::Failed => counts.failed = count,
            }
        }
        Ok(counts)
    }
}

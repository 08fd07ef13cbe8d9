//! Lazily-connected queue handle shared by the HTTP surface and the worker.

use std::sync::Arc;

use tokio::sync::OnceCell;
use tracing::info;

use super::{
    ConversionJob, JobBroker, JobKind, JobOptions, JobStatusView, QueueConfig, QueueCounts,
    QueueError, QueuedJob, SqliteJobBroker,
};

/// Handle to the durable queue.
///
/// Built once at startup and passed to whoever needs it. The backing store is
/// opened on first use, not at construction.
pub struct QueueClient {
    config: QueueConfig,
    broker: OnceCell<Arc<dyn JobBroker>>,
}

impl QueueClient {
    pub fn new(config: QueueConfig) -> Self {
        Self {
            config,
            broker: OnceCell::new(),
        }
    }

    /// Wrap an already-open broker.
    pub fn with_broker(config: QueueConfig, broker: Arc<dyn JobBroker>) -> Self {
        Self {
            config,
            broker: OnceCell::new_with(Some(broker)),
        }
    }

    pub fn config(&self) -> &QueueConfig {
        &self.config
    }

    /// Whether the backing store has been opened yet.
    pub fn is_connected(&self) -> bool {
        self.broker.initialized()
    }

    /// The broker, opening it on first call.
    pub async fn broker(&self) -> Result<Arc<dyn JobBroker>, QueueError> {
        let broker = self
            .broker
            .get_or_try_init(|| async {
                let broker: Arc<dyn JobBroker> = if self.config.is_in_memory() {
                    Arc::new(SqliteJobBroker::in_memory()?)
                } else {
                    Arc::new(SqliteJobBroker::new(&self.config.database_path)?)
                };
                info!(
                    broker = broker.name(),
                    path = %self.config.database_path.display(),
                    "Opened job queue"
                );
                Ok::<_, QueueError>(broker)
            })
            .await?;
        Ok(Arc::clone(broker))
    }

    /// Submit a job. `options` defaults to the configured attempts and backoff.
    pub async fn enqueue(
        &self,
        kind: JobKind,
        payload: ConversionJob,
        options: Option<JobOptions>,
    ) -> Result<QueuedJob, QueueError> {
        let options = options.unwrap_or_else(|| self.config.default_job_options());
        self.broker().await?.enqueue(kind, payload, options).await
    }

    pub async fn get_job(&self, conversion_id: &str) -> Result<Option<QueuedJob>, QueueError> {
        self.broker().await?.get(conversion_id).await
    }

    pub async fn status(&self, conversion_id: &str) -> Result<Option<JobStatusView>, QueueError> {
        Ok(self
            .get_job(conversion_id)
            .await?
            .map(|job| job.status_view()))
    }

    pub async fn counts(&self) -> Result<QueueCounts, QueueError> {
        self.broker().await?.counts().await
    }
}

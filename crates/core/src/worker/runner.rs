//! Job worker: claims queued jobs and drives them through the pipeline.
//!
//! One claim loop per job kind, each bounded by its own semaphore:
//! - `convert-skp-to-glb`: slow, external-process bound
//! - `store-glb`: quick copies, kept apart so they never wait behind conversions

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::{broadcast, Semaphore};
use tracing::{debug, error, info, warn};

use crate::queue::{JobBroker, JobKind, QueueClient, QueueError, QueuedJob};

use super::{Attempt, ConversionPipeline, ProgressReporter, Stage};

/// Persists stage checkpoints to the broker.
struct BrokerProgress {
    broker: Arc<dyn JobBroker>,
    job_id: String,
}

#[async_trait]
impl ProgressReporter for BrokerProgress {
    async fn report(&self, stage: Stage) {
        debug!(job_id = %self.job_id, stage = %stage, "Stage started");
        if let Err(e) = self
            .broker
            .update_progress(&self.job_id, stage.progress())
            .await
        {
            warn!(job_id = %self.job_id, error = %e, "Failed to record job progress");
        }
    }
}

/// Snapshot of the worker for health reporting.
#[derive(Debug, Clone, Default, Serialize)]
pub struct WorkerStatus {
    pub running: bool,
    pub concurrency: usize,
    /// Executions in flight, by job kind.
    pub in_flight: HashMap<String, usize>,
}

/// Background job worker.
pub struct JobWorker {
    queue: Arc<QueueClient>,
    pipeline: Arc<ConversionPipeline>,
    worker_id: String,
    concurrency: usize,
    slots: HashMap<JobKind, Arc<Semaphore>>,

    running: Arc<AtomicBool>,
    shutdown_tx: broadcast::Sender<()>,
}

impl JobWorker {
    pub fn new(queue: Arc<QueueClient>, pipeline: Arc<ConversionPipeline>) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        let concurrency = queue.config().concurrency.max(1);
        let slots = JobKind::ALL
            .iter()
            .map(|kind| (*kind, Arc::new(Semaphore::new(concurrency))))
            .collect();

        Self {
            queue,
            pipeline,
            worker_id: uuid::Uuid::new_v4().to_string(),
            concurrency,
            slots,
            running: Arc::new(AtomicBool::new(false)),
            shutdown_tx,
        }
    }

    pub fn worker_id(&self) -> &str {
        &self.worker_id
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }

    pub fn status(&self) -> WorkerStatus {
        WorkerStatus {
            running: self.is_running(),
            concurrency: self.concurrency,
            in_flight: self
                .slots
                .iter()
                .map(|(kind, slots)| {
                    (
                        kind.to_string(),
                        self.concurrency - slots.available_permits(),
                    )
                })
                .collect(),
        }
    }

    /// Recover stalled jobs, then spawn the claim loops.
    pub async fn start(&self) -> Result<(), QueueError> {
        if self.running.swap(true, Ordering::SeqCst) {
            warn!(worker_id = %self.worker_id, "Job worker already running");
            return Ok(());
        }

        info!(
            worker_id = %self.worker_id,
            concurrency = self.concurrency,
            "Starting job worker"
        );

        let recovered = match self.queue.broker().await {
            Ok(broker) => broker.recover_stalled().await,
            Err(e) => Err(e),
        };
        match recovered {
            Ok(0) => {}
            Ok(n) => info!(recovered = n, "Returned stalled jobs to the queue"),
            Err(e) => {
                self.running.store(false, Ordering::SeqCst);
                return Err(e);
            }
        }

        for kind in JobKind::ALL {
            self.spawn_claim_loop(kind);
        }

        info!(worker_id = %self.worker_id, "Job worker started");
        Ok(())
    }

    /// Stop claiming and wait, up to the configured grace period, for
    /// in-flight executions to finish.
    pub async fn stop(&self) {
        if !self.running.swap(false, Ordering::SeqCst) {
            warn!(worker_id = %self.worker_id, "Job worker not running");
            return;
        }

        info!(worker_id = %self.worker_id, "Stopping job worker");
        let _ = self.shutdown_tx.send(());

        let grace = Duration::from_secs(self.queue.config().shutdown_grace_secs);
        let drained = tokio::time::timeout(grace, async {
            for slots in self.slots.values() {
                // Closed semaphores only happen on drop; nothing to wait for then.
                let _ = slots.acquire_many(self.concurrency as u32).await;
            }
        })
        .await;

        match drained {
            Ok(()) => info!(worker_id = %self.worker_id, "Job worker stopped"),
            Err(_) => warn!(
                worker_id = %self.worker_id,
                grace_secs = grace.as_secs(),
                "Job worker stopped with executions still in flight"
            ),
        }
    }

    fn spawn_claim_loop(&self, kind: JobKind) {
        let running = Arc::clone(&self.running);
        let queue = Arc::clone(&self.queue);
        let pipeline = Arc::clone(&self.pipeline);
        let slots = self
            .slots
            .get(&kind)
            .cloned()
            .unwrap_or_else(|| Arc::new(Semaphore::new(self.concurrency)));
        let poll_interval = Duration::from_millis(queue.config().poll_interval_ms);
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        tokio::spawn(async move {
            info!(kind = %kind, "Claim loop started");
            loop {
                tokio::select! {
                    _ = shutdown_rx.recv() => {
                        info!(kind = %kind, "Claim loop received shutdown signal");
                        break;
                    }
                    _ = tokio::time::sleep(poll_interval) => {
                        if !running.load(Ordering::Relaxed) {
                            break;
                        }
                        Self::claim_available(&queue, &pipeline, &slots, kind).await;
                    }
                }
            }
            info!(kind = %kind, "Claim loop stopped");
        });
    }

    /// Claim jobs while there are free slots and pending work.
    async fn claim_available(
        queue: &Arc<QueueClient>,
        pipeline: &Arc<ConversionPipeline>,
        slots: &Arc<Semaphore>,
        kind: JobKind,
    ) {
        loop {
            let Ok(permit) = Arc::clone(slots).try_acquire_owned() else {
                return;
            };

            let claimed = match queue.broker().await {
                Ok(broker) => broker.claim_next(kind).await,
                Err(e) => Err(e),
            };

            match claimed {
                Ok(Some(job)) => {
                    let queue = Arc::clone(queue);
                    let pipeline = Arc::clone(pipeline);
                    tokio::spawn(async move {
                        let job_id = job.id.clone();
                        if let Err(e) = Self::run_job(&queue, &pipeline, job).await {
                            error!(job_id = %job_id, error = %e, "Failed to record job outcome");
                        }
                        drop(permit);
                    });
                }
                Ok(None) => return,
                Err(e) => {
                    warn!(kind = %kind, error = %e, "Failed to claim job");
                    return;
                }
            }
        }
    }

    /// Claim and run one job of `kind` inline. Returns the job in its state
    /// after the execution, or `None` when nothing was claimable.
    pub async fn process_next(&self, kind: JobKind) -> Result<Option<QueuedJob>, QueueError> {
        let Some(job) = self.queue.broker().await?.claim_next(kind).await? else {
            return Ok(None);
        };
        Self::run_job(&self.queue, &self.pipeline, job).await.map(Some)
    }

    async fn run_job(
        queue: &QueueClient,
        pipeline: &ConversionPipeline,
        job: QueuedJob,
    ) -> Result<QueuedJob, QueueError> {
        let broker = queue.broker().await?;
        let attempt = Attempt::new(job.attempts_made + 1, job.max_attempts);
        let progress = BrokerProgress {
            broker: Arc::clone(&broker),
            job_id: job.id.clone(),
        };

        match pipeline
            .execute(job.kind, &job.payload, attempt, &progress)
            .await
        {
            Ok(result) => broker.complete(&job.id, &result).await,
            Err(e) => {
                let updated = broker
                    .fail_attempt(&job.id, &e.to_string(), e.is_permanent())
                    .await?;
                if updated.state.is_terminal() {
                    error!(
                        job_id = %job.id,
                        attempts = updated.attempts_made,
                        error = %e,
                        "Job failed"
                    );
                } else {
                    info!(
                        job_id = %job.id,
                        attempts = updated.attempts_made,
                        max_attempts = updated.max_attempts,
                        retry_at = %updated.run_at,
                        "Job scheduled for retry"
                    );
                }
                Ok(updated)
            }
        }
    }
}

use std::sync::Arc;

use glbforge_core::{
    Config, ConversionPipeline, JobWorker, QueueClient, SanitizedConfig, StorageKind,
    StorageResolver,
};

/// Shared application state
pub struct AppState {
    config: Config,
    queue: Arc<QueueClient>,
    pipeline: Arc<ConversionPipeline>,
    worker: Arc<JobWorker>,
}

impl AppState {
    pub fn new(
        config: Config,
        queue: Arc<QueueClient>,
        pipeline: Arc<ConversionPipeline>,
        worker: Arc<JobWorker>,
    ) -> Self {
        Self {
            config,
            queue,
            pipeline,
            worker,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn sanitized_config(&self) -> SanitizedConfig {
        SanitizedConfig::from(&self.config)
    }

    pub fn queue(&self) -> &Arc<QueueClient> {
        &self.queue
    }

    pub fn storage(&self) -> &StorageResolver {
        self.pipeline.storage()
    }

    pub fn worker(&self) -> &Arc<JobWorker> {
        &self.worker
    }

    /// Whether published artifacts are served by this process.
    pub fn serves_artifacts(&self) -> bool {
        self.storage().kind() == StorageKind::Local
    }
}

//! Durable job queue.
//!
//! Jobs carry a [`ConversionJob`] payload tagged with a [`JobKind`]. The
//! [`QueueClient`] is the handle the HTTP surface and the worker share; it
//! opens its [`JobBroker`] lazily. The bundled broker is SQLite-backed.
//!
//! # Example
//!
//! ```ignore
//! use glbforge_core::queue::{ConversionJob, JobKind, QueueClient, QueueConfig};
//!
//! let client = QueueClient::new(QueueConfig::default());
//! let job = client
//!     .enqueue(
//!         JobKind::ConvertSkpToGlb,
//!         ConversionJob::new("file-1", "conv-1", "/uploads/abc", "house.skp"),
//!         None,
//!     )
//!     .await?;
//! assert_eq!(job.id, "conv-1");
//! ```

mod broker;
mod client;
mod config;
mod sqlite;
mod types;

pub use broker::{JobBroker, QueueError};
pub use client::QueueClient;
pub use config::QueueConfig;
pub use sqlite::SqliteJobBroker;
pub use types::{
    Backoff, ConversionJob, ConversionResult, JobKind, JobOptions, JobState, JobStatusView,
    QueueCounts, QueuedJob,
};

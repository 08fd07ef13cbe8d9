//! Compressor trait.

use async_trait::async_trait;
use std::path::Path;

/// What the compression step did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompressionOutcome {
    /// The container was replaced by its compressed version.
    Compressed {
        original_bytes: u64,
        compressed_bytes: u64,
    },
    /// Compression was attempted and abandoned; the original is untouched.
    Skipped { reason: String },
    /// Compression is turned off.
    Disabled,
}

impl CompressionOutcome {
    pub fn is_compressed(&self) -> bool {
        matches!(self, CompressionOutcome::Compressed { .. })
    }
}

/// In-place geometry compression of a GLB container.
///
/// Never fails: any problem leaves the original file as it was.
#[async_trait]
pub trait Compressor: Send + Sync {
    fn name(&self) -> &str;

    async fn compress(&self, path: &Path) -> CompressionOutcome;
}

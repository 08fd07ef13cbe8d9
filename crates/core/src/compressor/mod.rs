//! Optional geometry compression of produced containers.
//!
//! Compression is an optimization: a failing or missing tool is logged and
//! the uncompressed container is kept.

mod config;
mod draco;
mod traits;

pub use config::CompressorConfig;
pub use draco::DracoCompressor;
pub use traits::{CompressionOutcome, Compressor};

//! HTTP surface and worker host for the glbforge conversion pipeline.

pub mod api;
pub mod metrics;
pub mod state;

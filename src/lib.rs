//! duraq - durable job queue service.
//!
//! This library exposes the queue engine and HTTP surface for testing.

pub mod config;
pub mod http;
pub mod queue;
pub mod telemetry;

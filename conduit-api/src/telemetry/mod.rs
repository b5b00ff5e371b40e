//! CONDUIT Telemetry
//!
//! Structured logging through `tracing`. Every event emitted while a request
//! context is active carries its correlation id.

pub mod tracer;

pub use tracer::{init_tracing, LogFormat, TelemetryConfig};

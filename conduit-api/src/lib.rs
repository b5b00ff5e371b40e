//! CONDUIT API - inbound entry point and service composition
//!
//! - [`middleware`]: axum middleware that seeds the request context
//! - [`telemetry`]: tracing subscriber bootstrap
//! - [`Orchestrator`]: the shared gate, cache and clients built from one config

pub mod middleware;
pub mod orchestrator;
pub mod telemetry;

pub use middleware::{correlation_middleware, with_correlation, UserId};
pub use orchestrator::Orchestrator;
pub use telemetry::{init_tracing, TelemetryConfig};

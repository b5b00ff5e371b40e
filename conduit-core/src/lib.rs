//! CONDUIT Core - request orchestration primitives
//!
//! Error taxonomy, configuration and the request-scoped context store shared
//! by every other crate in the workspace.

pub mod config;
pub mod context;
mod error;

pub use config::{
    ConduitConfig, EndpointConfig, DEFAULT_CACHE_TTL, DEFAULT_CONCURRENCY_LIMIT,
    DEFAULT_ENDPOINT_TIMEOUT, DEFAULT_LANGUAGE, DEFAULT_RETRY_COUNT,
};
pub use context::{generate_correlation_id, RequestContext, CORRELATION_HEADER};
pub use error::{ConduitError, ConduitResult, ConfigError, TerminalError, TransientError};

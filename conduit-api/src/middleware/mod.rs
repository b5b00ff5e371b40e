//! Axum middleware for CONDUIT

pub mod correlation;

pub use correlation::{correlation_middleware, with_correlation, UserId};

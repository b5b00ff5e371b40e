//! AI query-parsing provider
//!
//! Turns free-text shopping queries into structured intent.

pub mod client;
pub mod types;

pub use client::AiParseClient;
pub use types::{AiParseRequest, AiParseResult};

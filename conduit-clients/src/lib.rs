//! CONDUIT Clients - typed upstream callers
//!
//! Thin shims over the retrying remote caller for the AI query-parsing and
//! purchase-optimization services. Each call stamps the active correlation id
//! into its payload (or generates one for that call alone) and decodes the
//! typed response. These clients bypass the cache and the concurrency gate.

pub mod providers;

pub use providers::ai_parse::{AiParseClient, AiParseRequest, AiParseResult};
pub use providers::purchase::{
    Offer, OptimizationOverrides, OptimizationPayload, OptimizationResult, PurchaseClient,
    PurchaseRequest,
};
pub use providers::RemoteClient;

//! Purchase-optimization provider

pub mod client;
pub mod types;

pub use client::PurchaseClient;
pub use types::{Offer, OptimizationOverrides, OptimizationPayload, OptimizationResult, PurchaseRequest};

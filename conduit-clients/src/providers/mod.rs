//! Upstream service clients
//!
//! Each provider pairs a request/response type module with a client built on
//! the shared [`RemoteClient`].

pub mod ai_parse;
pub mod purchase;
mod remote;

pub use ai_parse::AiParseClient;
pub use purchase::PurchaseClient;
pub use remote::RemoteClient;

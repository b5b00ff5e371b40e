//! CONDUIT Fetch - outbound call orchestration
//!
//! The building blocks every outbound call is composed from:
//!
//! - [`ConcurrencyGate`]: FIFO-fair cap on in-flight calls
//! - [`CacheAsideStore`]: TTL cache consulted before the gate
//! - [`RetryingCaller`]: bounded retry with counted attempts
//! - [`Transport`]: the HTTP seam, with [`HttpTransport`] for production
//!
//! [`ResourceFetcher`] wires them together for the generic data backend:
//! cache lookup, then (on miss) a gate slot, then the retried remote call,
//! then cache populate.

pub mod cache;
pub mod fetcher;
pub mod gate;
pub mod retry;
pub mod transport;

pub use cache::{CacheAsideStore, CacheEntry, CacheStats, SweeperHandle};
pub use fetcher::ResourceFetcher;
pub use gate::ConcurrencyGate;
pub use retry::{AttemptObserver, RetryPolicy, RetryingCaller};
pub use transport::{HttpTransport, Method, RemoteRequest, Transport};

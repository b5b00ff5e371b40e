//! Cache-aside store for remote resources.
//!
//! Callers ask [`CacheAsideStore::get_or_load`] for a key; a live entry is
//! served directly, otherwise the supplied loader runs and its successful
//! result is stored with a fixed TTL. Expiry is evaluated lazily on lookup.
//! [`CacheAsideStore::spawn_sweeper`] optionally purges dead entries in the
//! background to bound memory, but correctness never depends on it.
//!
//! Concurrent misses on the same key are not coalesced: each caller runs its
//! own loader and the last write wins. Entries are re-derivations of the same
//! remote resource, so this only costs an extra upstream call.

pub mod entry;
pub mod store;

pub use entry::{CacheEntry, CacheStats};
pub use store::{CacheAsideStore, SweeperHandle};

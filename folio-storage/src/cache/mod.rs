//! Process-wide lookup caches.
//!
//! Caches are derived, non-authoritative projections of the backing store.
//! The coordinator distinguishes a cold miss from a cached "this does not
//! exist" result, because repeatedly re-querying the backing store for
//! nonexistent names is exactly the load these caches remove.

mod lookup;
mod manager;

pub use lookup::{CacheResult, CacheStats, LookupCache};
pub use manager::{CacheManager, NAMESPACE_LIST_KEY};

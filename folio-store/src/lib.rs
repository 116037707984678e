//! Folio Store - Versioned Content Store
//!
//! The core of Folio: topic and revision lifecycle (create, update, move,
//! delete, undelete, purge), the name-resolution and lookup algorithm with
//! shared-tenant fallback, change/audit log emission, and the cache
//! coherence rules that tie them together. Runs against any
//! [`folio_storage::BackingStore`].

pub mod changelog;
pub mod name;
pub mod search;
pub mod store;

pub use name::{NameResolver, ParsedName};
pub use search::{NullSearchIndexer, SearchIndexer};
pub use store::{redirect_marker, VersionedContentStore};

//! Folio Core - Entity Types
//!
//! Pure data structures for the versioned content store. All other crates
//! depend on this. This crate contains only data types, identifiers, the
//! error taxonomy, configuration, and field validation - no storage logic.

pub mod config;
pub mod entities;
pub mod enums;
pub mod error;
pub mod identity;
pub mod validation;

pub use config::FolioConfig;
pub use entities::{
    Category, LogItem, Namespace, RecentChange, Topic, TopicLink, VirtualWiki,
};
pub use enums::{namespace_id, EditType, LogType, Sequence, TopicType};
pub use error::{ConfigError, FolioError, FolioResult, StorageError, ValidationError};
pub use identity::{
    NamespaceId, Timestamp, TopicId, TopicVersionId, UserId, VirtualWikiId,
};

// TopicVersion lives in its own module because the chain-maintenance rules
// around it are the heart of the store.
pub use entities::TopicVersion;

//! Identity types for Folio entities.
//!
//! All primary keys are backing-store-allocated integers drawn from named
//! sequences, so ids are stable across renames: a topic keeps its id for
//! life even as its name changes through moves.

use chrono::{DateTime, Utc};

/// Primary key of a topic row. Permanent once assigned.
pub type TopicId = i32;

/// Primary key of a topic version (revision) row.
pub type TopicVersionId = i32;

/// Primary key of a virtual wiki (tenant).
pub type VirtualWikiId = i32;

/// Namespace identifier. Well-known namespaces use fixed ids (see
/// [`crate::enums::namespace_id`]); custom namespaces allocate from 200 up.
pub type NamespaceId = i32;

/// Registered user id. Anonymous authors carry a display string instead.
pub type UserId = i32;

/// Timestamp type using UTC timezone.
pub type Timestamp = DateTime<Utc>;

//! Enumerations shared across the store.
//!
//! Discriminant values match the relational schema the store was designed
//! against, so they are stable and must not be renumbered.

use serde::{Deserialize, Serialize};

use crate::identity::NamespaceId;

/// Well-known namespace ids. Custom namespaces allocate ids of
/// [`namespace_id::CUSTOM_START`] and above.
pub mod namespace_id {
    use crate::identity::NamespaceId;

    /// Direct media links. Never a storage namespace of its own; resolves
    /// against the File namespace.
    pub const MEDIA: NamespaceId = -2;
    /// Special pages. Never a valid storage namespace.
    pub const SPECIAL: NamespaceId = -1;
    /// The default (article) namespace.
    pub const MAIN: NamespaceId = 0;
    /// Comments companion of Main.
    pub const COMMENTS: NamespaceId = 1;
    pub const USER: NamespaceId = 2;
    pub const USER_COMMENTS: NamespaceId = 3;
    /// Binary-asset namespace, subject to shared-tenant fallback.
    pub const FILE: NamespaceId = 6;
    pub const FILE_COMMENTS: NamespaceId = 7;
    pub const TEMPLATE: NamespaceId = 10;
    pub const TEMPLATE_COMMENTS: NamespaceId = 11;
    pub const CATEGORY: NamespaceId = 14;
    pub const CATEGORY_COMMENTS: NamespaceId = 15;
    /// First id available to tenant-defined namespaces.
    pub const CUSTOM_START: NamespaceId = 200;
}

/// Returns true for the namespaces that participate in shared-tenant
/// (shared upload repository) fallback.
pub fn is_upload_namespace(id: NamespaceId) -> bool {
    id == namespace_id::FILE || id == namespace_id::MEDIA
}

/// Classification of a topic record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(i32)]
pub enum TopicType {
    Article = 1,
    Redirect = 2,
    Image = 4,
    Category = 5,
    File = 6,
    SystemFile = 7,
    Template = 8,
}

impl TopicType {
    pub fn as_i32(&self) -> i32 {
        *self as i32
    }

    pub fn from_i32(value: i32) -> Option<TopicType> {
        match value {
            1 => Some(TopicType::Article),
            2 => Some(TopicType::Redirect),
            4 => Some(TopicType::Image),
            5 => Some(TopicType::Category),
            6 => Some(TopicType::File),
            7 => Some(TopicType::SystemFile),
            8 => Some(TopicType::Template),
            _ => None,
        }
    }
}

/// Classification of a single edit, stored on the topic version row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(i32)]
pub enum EditType {
    Normal = 1,
    Minor = 2,
    Revert = 3,
    Move = 4,
    Delete = 5,
    Permission = 6,
    Undelete = 7,
    Import = 8,
}

impl EditType {
    pub fn as_i32(&self) -> i32 {
        *self as i32
    }

    pub fn from_i32(value: i32) -> Option<EditType> {
        match value {
            1 => Some(EditType::Normal),
            2 => Some(EditType::Minor),
            3 => Some(EditType::Revert),
            4 => Some(EditType::Move),
            5 => Some(EditType::Delete),
            6 => Some(EditType::Permission),
            7 => Some(EditType::Undelete),
            8 => Some(EditType::Import),
            _ => None,
        }
    }
}

/// Classification of an audit log item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(i32)]
pub enum LogType {
    /// Ordinary content edit. Not present in the legacy schema; added so
    /// every content-visible mutation produces exactly one log item.
    Edit = 0,
    Delete = 1,
    Import = 2,
    Move = 3,
    Permission = 4,
    Upload = 5,
    UserCreation = 6,
    Block = 7,
    Purge = 8,
}

impl LogType {
    pub fn as_i32(&self) -> i32 {
        *self as i32
    }

    pub fn from_i32(value: i32) -> Option<LogType> {
        match value {
            0 => Some(LogType::Edit),
            1 => Some(LogType::Delete),
            2 => Some(LogType::Import),
            3 => Some(LogType::Move),
            4 => Some(LogType::Permission),
            5 => Some(LogType::Upload),
            6 => Some(LogType::UserCreation),
            7 => Some(LogType::Block),
            8 => Some(LogType::Purge),
            _ => None,
        }
    }

    /// The log type recorded for a revision of the given edit type.
    pub fn for_edit(edit_type: EditType) -> LogType {
        match edit_type {
            EditType::Normal | EditType::Minor | EditType::Revert => LogType::Edit,
            EditType::Move => LogType::Move,
            // Undeletion is audited under the deletion log, mirroring the
            // delete/undelete pairing in the revision chain.
            EditType::Delete | EditType::Undelete => LogType::Delete,
            EditType::Permission => LogType::Permission,
            EditType::Import => LogType::Import,
        }
    }
}

/// Named id sequences managed by the backing store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Sequence {
    Topic,
    TopicVersion,
    VirtualWiki,
    Namespace,
}

impl Sequence {
    /// The relational sequence name for SQL backends.
    pub fn sql_name(&self) -> &'static str {
        match self {
            Sequence::Topic => "folio_topic_seq",
            Sequence::TopicVersion => "folio_topic_version_seq",
            Sequence::VirtualWiki => "folio_virtual_wiki_seq",
            Sequence::Namespace => "folio_namespace_seq",
        }
    }

    /// The first value the sequence yields. Namespace ids below
    /// [`namespace_id::CUSTOM_START`] are reserved for well-known
    /// namespaces.
    pub fn initial_value(&self) -> i32 {
        match self {
            Sequence::Namespace => namespace_id::CUSTOM_START,
            _ => 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upload_namespace_detection() {
        assert!(is_upload_namespace(namespace_id::FILE));
        assert!(is_upload_namespace(namespace_id::MEDIA));
        assert!(!is_upload_namespace(namespace_id::MAIN));
        assert!(!is_upload_namespace(namespace_id::FILE_COMMENTS));
    }

    #[test]
    fn test_log_type_for_edit() {
        assert_eq!(LogType::for_edit(EditType::Normal), LogType::Edit);
        assert_eq!(LogType::for_edit(EditType::Move), LogType::Move);
        assert_eq!(LogType::for_edit(EditType::Delete), LogType::Delete);
        assert_eq!(LogType::for_edit(EditType::Undelete), LogType::Delete);
        assert_eq!(LogType::for_edit(EditType::Import), LogType::Import);
    }

    #[test]
    fn test_namespace_sequence_starts_above_reserved_range() {
        assert_eq!(Sequence::Namespace.initial_value(), 200);
        assert_eq!(Sequence::Topic.initial_value(), 1);
    }
}

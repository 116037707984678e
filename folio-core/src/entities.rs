//! Core entity structures.
//!
//! These are plain data records mirroring the relational schema. Lifecycle
//! rules (who sets which field when) live in the store crate; the only
//! behavior here is construction and trivial derived accessors.

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::enums::{EditType, LogType, TopicType};
use crate::identity::{
    NamespaceId, Timestamp, TopicId, TopicVersionId, UserId, VirtualWikiId,
};

/// A virtual wiki: an isolated tenant namespace of topics.
///
/// Name and id are immutable once created; the display metadata fields may
/// be updated at any time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VirtualWiki {
    /// Backing-store-allocated id; `None` until first persisted.
    pub virtual_wiki_id: Option<VirtualWikiId>,
    pub name: String,
    /// The topic shown as the wiki's front page.
    pub root_topic_name: String,
    pub site_name: String,
    pub logo_image_url: Option<String>,
    pub meta_description: Option<String>,
}

impl VirtualWiki {
    pub fn new(name: impl Into<String>, root_topic_name: impl Into<String>) -> Self {
        let name = name.into();
        VirtualWiki {
            virtual_wiki_id: None,
            site_name: name.clone(),
            name,
            root_topic_name: root_topic_name.into(),
            logo_image_url: None,
            meta_description: None,
        }
    }
}

/// A typed name-prefix partition scoped per tenant.
///
/// Namespace identity (the id) is immutable; the label may be translated
/// per virtual wiki. A non-default namespace may declare the main namespace
/// it is the comments companion of.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Namespace {
    pub id: NamespaceId,
    /// The untranslated label, e.g. "File" or "Comments".
    pub default_label: String,
    /// For comments namespaces, the namespace they attach to.
    pub main_namespace_id: Option<NamespaceId>,
    /// Whether page names in this namespace are case-sensitive. When false
    /// the lookup path retries with a case-flipped page name on a miss.
    pub case_sensitive: bool,
    /// Per-tenant label translations, as (virtual wiki name, label) pairs.
    pub translations: Vec<(String, String)>,
}

impl Namespace {
    pub fn new(id: NamespaceId, default_label: impl Into<String>) -> Self {
        Namespace {
            id,
            default_label: default_label.into(),
            main_namespace_id: None,
            case_sensitive: false,
            translations: Vec::new(),
        }
    }

    /// The label to display for the given virtual wiki, falling back to the
    /// default label when no translation exists.
    pub fn label(&self, virtual_wiki: &str) -> &str {
        self.translations
            .iter()
            .find(|(vw, _)| vw == virtual_wiki)
            .map(|(_, label)| label.as_str())
            .unwrap_or(&self.default_label)
    }
}

/// The mutable head record for one document.
///
/// `current_version_id` always references a version belonging to this topic;
/// `topic_content` denormalizes that version's content for read performance
/// and is kept synchronized by the store's write path only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Topic {
    /// Backing-store-allocated id; `None` until first persisted. Permanent
    /// once assigned - moves change the name, never the id.
    pub topic_id: Option<TopicId>,
    pub virtual_wiki_id: VirtualWikiId,
    /// Tenant name, denormalized for key building and display.
    pub virtual_wiki: String,
    pub namespace_id: NamespaceId,
    /// Page name within the namespace, without the namespace prefix.
    pub page_name: String,
    pub topic_type: TopicType,
    /// The authoritative revision. `None` only before the first revision of
    /// a brand-new topic has been written.
    pub current_version_id: Option<TopicVersionId>,
    /// Denormalized copy of the current version's content.
    pub topic_content: String,
    /// When set, this topic is a redirect to the named topic.
    pub redirect_to: Option<String>,
    /// Soft-delete marker. Set means DELETED; the row and its revision
    /// history remain.
    pub delete_date: Option<Timestamp>,
    pub read_only: bool,
    pub admin_only: bool,
}

impl Topic {
    pub fn new(
        virtual_wiki_id: VirtualWikiId,
        virtual_wiki: impl Into<String>,
        namespace_id: NamespaceId,
        page_name: impl Into<String>,
    ) -> Self {
        Topic {
            topic_id: None,
            virtual_wiki_id,
            virtual_wiki: virtual_wiki.into(),
            namespace_id,
            page_name: page_name.into(),
            topic_type: TopicType::Article,
            current_version_id: None,
            topic_content: String::new(),
            redirect_to: None,
            delete_date: None,
            read_only: false,
            admin_only: false,
        }
    }

    /// True when the soft-delete marker is set.
    pub fn is_deleted(&self) -> bool {
        self.delete_date.is_some()
    }
}

/// An immutable content snapshot linked into a chronological chain.
///
/// Once written a version never changes, except for two administrative
/// back-links: `previous_topic_version_id` (maintained on purge splicing and
/// import reordering) and the pointer repoint performed during purge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicVersion {
    /// Backing-store-allocated id; `None` until persisted.
    pub topic_version_id: Option<TopicVersionId>,
    /// Owning topic; set by the write path.
    pub topic_id: Option<TopicId>,
    pub edit_type: EditType,
    pub version_content: String,
    /// Registered author, or `None` for anonymous edits.
    pub author_id: Option<UserId>,
    /// Display string for the author (login or IP address).
    pub author_display: String,
    pub edit_date: Timestamp,
    pub edit_comment: Option<String>,
    /// Signed character delta against the previous version.
    pub characters_changed: i32,
    /// Chain pointer to the prior revision; `None` for the first revision
    /// of a topic. There is no stored `next` pointer - "next" is derived by
    /// scanning for the version that points back at this one.
    pub previous_topic_version_id: Option<TopicVersionId>,
    /// Free-text parameters, used by imports.
    pub version_params: Option<String>,
    /// When false, this version does not produce a recent-change row. Used
    /// when one logical action writes two versions and only the second
    /// should be user-visible (move).
    pub recent_change_allowed: bool,
}

impl TopicVersion {
    pub fn new(
        author_id: Option<UserId>,
        author_display: impl Into<String>,
        edit_comment: Option<String>,
        content: impl Into<String>,
        characters_changed: i32,
    ) -> Self {
        TopicVersion {
            topic_version_id: None,
            topic_id: None,
            edit_type: EditType::Normal,
            version_content: content.into(),
            author_id,
            author_display: author_display.into(),
            edit_date: Utc::now(),
            edit_comment,
            characters_changed,
            previous_topic_version_id: None,
            version_params: None,
            recent_change_allowed: true,
        }
    }
}

/// Category association: one topic filed under one category name.
///
/// Associations are fully replaced on every content-affecting write and are
/// never chained to revisions - only the current content's categories exist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub virtual_wiki_id: VirtualWikiId,
    pub child_topic_id: TopicId,
    /// The category page name, without the Category: prefix.
    pub name: String,
    pub sort_key: Option<String>,
}

/// Link association: one outbound link from a topic to a target name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicLink {
    pub topic_id: TopicId,
    pub target_namespace_id: NamespaceId,
    pub target_page_name: String,
}

/// Append-only audit record for a content-visible mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogItem {
    pub log_type: LogType,
    pub virtual_wiki_id: VirtualWikiId,
    pub user_id: Option<UserId>,
    pub user_display: String,
    pub log_date: Timestamp,
    pub log_comment: Option<String>,
    /// JSON-encoded list of free-text parameters (e.g. move destination).
    pub log_params: Option<String>,
    pub topic_id: Option<TopicId>,
    pub topic_version_id: Option<TopicVersionId>,
}

/// Denormalized display projection of a change, kept alongside log items.
///
/// Unlike the revision chain this is a live projection: deleting a topic
/// removes its recent changes, and purging a version removes rows that
/// reference it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecentChange {
    pub virtual_wiki_id: VirtualWikiId,
    pub virtual_wiki: String,
    pub topic_id: Option<TopicId>,
    pub topic_name: Option<String>,
    pub topic_version_id: Option<TopicVersionId>,
    pub previous_topic_version_id: Option<TopicVersionId>,
    pub edit_type: Option<EditType>,
    pub log_type: Option<LogType>,
    pub author_id: Option<UserId>,
    pub author_display: String,
    pub change_date: Timestamp,
    pub change_comment: Option<String>,
    pub characters_changed: i32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enums::namespace_id;

    #[test]
    fn test_namespace_label_translation() {
        let mut ns = Namespace::new(namespace_id::FILE, "File");
        ns.translations.push(("de".to_string(), "Datei".to_string()));
        assert_eq!(ns.label("de"), "Datei");
        assert_eq!(ns.label("en"), "File");
    }

    #[test]
    fn test_new_topic_is_active() {
        let topic = Topic::new(1, "en", namespace_id::MAIN, "Test");
        assert!(!topic.is_deleted());
        assert!(topic.topic_id.is_none());
        assert!(topic.current_version_id.is_none());
    }

    #[test]
    fn test_new_version_defaults() {
        let version = TopicVersion::new(None, "127.0.0.1", None, "hello", 5);
        assert_eq!(version.edit_type, EditType::Normal);
        assert!(version.recent_change_allowed);
        assert!(version.previous_topic_version_id.is_none());
    }
}

//! Folio Test Utilities
//!
//! Centralized test infrastructure for the Folio workspace:
//! - A seeded in-memory backing store fixture
//! - The default namespace set
//! - Builders for common test entities

// Re-export the reference backend from its source crate
pub use folio_storage::MemoryBackingStore;

// Re-export core types for convenience
pub use folio_core::{
    namespace_id, Category, EditType, FolioConfig, FolioError, FolioResult, LogItem, LogType,
    Namespace, NamespaceId, RecentChange, Sequence, Topic, TopicId, TopicLink, TopicType,
    TopicVersion, TopicVersionId, ValidationError, VirtualWiki, VirtualWikiId,
};

use std::sync::Arc;

use folio_storage::BackingStore;

/// The tenant every fixture seeds.
pub const TEST_WIKI: &str = "en";

/// The shared upload tenant every fixture seeds.
pub const SHARED_WIKI: &str = "shared";

/// The namespace set a freshly initialized store carries.
pub fn default_namespaces() -> Vec<Namespace> {
    fn ns(id: NamespaceId, label: &str, main: Option<NamespaceId>) -> Namespace {
        let mut namespace = Namespace::new(id, label);
        namespace.main_namespace_id = main;
        namespace
    }
    vec![
        ns(namespace_id::MEDIA, "Media", None),
        ns(namespace_id::SPECIAL, "Special", None),
        ns(namespace_id::MAIN, "", None),
        ns(namespace_id::COMMENTS, "Comments", Some(namespace_id::MAIN)),
        ns(namespace_id::USER, "User", None),
        ns(
            namespace_id::USER_COMMENTS,
            "User comments",
            Some(namespace_id::USER),
        ),
        ns(namespace_id::FILE, "File", None),
        ns(
            namespace_id::FILE_COMMENTS,
            "File comments",
            Some(namespace_id::FILE),
        ),
        ns(namespace_id::TEMPLATE, "Template", None),
        ns(
            namespace_id::TEMPLATE_COMMENTS,
            "Template comments",
            Some(namespace_id::TEMPLATE),
        ),
        ns(namespace_id::CATEGORY, "Category", None),
        ns(
            namespace_id::CATEGORY_COMMENTS,
            "Category comments",
            Some(namespace_id::CATEGORY),
        ),
    ]
}

/// An in-memory backing store seeded with the default namespaces and two
/// tenants, [`TEST_WIKI`] and [`SHARED_WIKI`].
pub fn seeded_backing() -> Arc<MemoryBackingStore> {
    let backing = Arc::new(MemoryBackingStore::new());
    seed(&backing).expect("seeding the fixture backing store");
    backing
}

fn seed(backing: &MemoryBackingStore) -> FolioResult<()> {
    let mut txn = backing.transaction()?;
    for namespace in default_namespaces() {
        txn.save_namespace(&namespace)?;
    }
    for name in [TEST_WIKI, SHARED_WIKI] {
        let mut virtual_wiki = VirtualWiki::new(name, "Home");
        virtual_wiki.virtual_wiki_id = Some(txn.next_id(Sequence::VirtualWiki)?);
        txn.insert_virtual_wiki(&virtual_wiki)?;
    }
    txn.commit()
}

/// A topic in the [`TEST_WIKI`] main namespace, not yet persisted.
pub fn sample_topic(page_name: &str) -> Topic {
    // the fixture seeds TEST_WIKI first, so its id is the sequence start
    Topic::new(1, TEST_WIKI, namespace_id::MAIN, page_name)
}

/// An anonymous-author version carrying the given content.
pub fn sample_version(content: &str) -> TopicVersion {
    TopicVersion::new(
        None,
        "127.0.0.1",
        Some("test edit".to_string()),
        content,
        content.chars().count() as i32,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use folio_storage::StoreReader;

    #[test]
    fn test_fixture_seeds_tenants_and_namespaces() {
        let backing = seeded_backing();
        let en = backing.lookup_virtual_wiki(TEST_WIKI).unwrap().unwrap();
        assert_eq!(en.virtual_wiki_id, Some(1));
        let shared = backing.lookup_virtual_wiki(SHARED_WIKI).unwrap().unwrap();
        assert_eq!(shared.virtual_wiki_id, Some(2));
        let namespaces = backing.namespaces().unwrap();
        assert!(namespaces.iter().any(|ns| ns.id == namespace_id::FILE));
        assert!(namespaces.iter().any(|ns| ns.id == namespace_id::MAIN));
    }
}

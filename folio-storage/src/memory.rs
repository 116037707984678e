//! In-memory reference implementation of the backing store.
//!
//! Transactions take an exclusive guard over the table set for their whole
//! lifetime and mutate a working copy; commit swaps the working copy in,
//! drop discards it. That gives the same observable contract as a
//! serializable relational backend: no partial writes are ever visible and
//! rollback restores every row, while sequence values are never reused.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, RwLock, RwLockWriteGuard};

use folio_core::{
    Category, FolioError, FolioResult, LogItem, LogType, Namespace, NamespaceId, RecentChange,
    Sequence, StorageError, Topic, TopicId, TopicLink, TopicVersion, TopicVersionId, VirtualWiki,
    VirtualWikiId,
};

use crate::{BackingStore, StoreReader, StoreTransaction};

fn poisoned() -> FolioError {
    StorageError::LockPoisoned.into()
}

/// The full table set. Cloned wholesale at transaction begin.
#[derive(Debug, Default, Clone)]
struct Tables {
    virtual_wikis: BTreeMap<VirtualWikiId, VirtualWiki>,
    namespaces: BTreeMap<NamespaceId, Namespace>,
    topics: BTreeMap<TopicId, Topic>,
    topic_versions: BTreeMap<TopicVersionId, TopicVersion>,
    categories: Vec<Category>,
    topic_links: Vec<TopicLink>,
    log_items: Vec<LogItem>,
    recent_changes: Vec<RecentChange>,
}

impl Tables {
    fn lookup_virtual_wiki(&self, name: &str) -> Option<VirtualWiki> {
        self.virtual_wikis.values().find(|vw| vw.name == name).cloned()
    }

    fn lookup_topic(
        &self,
        virtual_wiki_id: VirtualWikiId,
        namespace_id: NamespaceId,
        page_name: &str,
    ) -> Option<Topic> {
        self.topics
            .values()
            .find(|t| {
                t.virtual_wiki_id == virtual_wiki_id
                    && t.namespace_id == namespace_id
                    && t.page_name == page_name
            })
            .cloned()
    }

    fn topic_count(
        &self,
        virtual_wiki_id: VirtualWikiId,
        namespace_id: Option<NamespaceId>,
    ) -> i64 {
        self.topics
            .values()
            .filter(|t| {
                t.virtual_wiki_id == virtual_wiki_id
                    && !t.is_deleted()
                    && namespace_id.map_or(true, |ns| t.namespace_id == ns)
            })
            .count() as i64
    }

    fn topic_names(
        &self,
        virtual_wiki_id: VirtualWikiId,
        include_deleted: bool,
    ) -> Vec<(TopicId, NamespaceId, String)> {
        self.topics
            .values()
            .filter(|t| {
                t.virtual_wiki_id == virtual_wiki_id && (include_deleted || !t.is_deleted())
            })
            .filter_map(|t| t.topic_id.map(|id| (id, t.namespace_id, t.page_name.clone())))
            .collect()
    }

    fn next_topic_version_id(
        &self,
        topic_version_id: TopicVersionId,
    ) -> Option<TopicVersionId> {
        self.topic_versions
            .values()
            .find(|v| v.previous_topic_version_id == Some(topic_version_id))
            .and_then(|v| v.topic_version_id)
    }

    fn all_topic_versions(&self, topic_id: TopicId, descending: bool) -> Vec<TopicVersion> {
        let mut versions: Vec<TopicVersion> = self
            .topic_versions
            .values()
            .filter(|v| v.topic_id == Some(topic_id))
            .cloned()
            .collect();
        // BTreeMap iteration is id-ordered, which is chronological here.
        if descending {
            versions.reverse();
        }
        versions
    }

    /// Referential constraint from topic.current_version_id to an existing
    /// version row. The write path relies on this being enforced.
    fn check_topic_version_fk(&self, topic: &Topic) -> FolioResult<()> {
        if let Some(version_id) = topic.current_version_id {
            let belongs = self
                .topic_versions
                .get(&version_id)
                .map_or(false, |v| v.topic_id == topic.topic_id);
            if !belongs {
                return Err(StorageError::IntegrityViolation {
                    reason: format!(
                        "topic {:?} references current_version_id {} which does not exist for it",
                        topic.topic_id, version_id
                    ),
                }
                .into());
            }
        }
        Ok(())
    }
}

/// Reference backing store: all tables in process memory.
#[derive(Debug, Default)]
pub struct MemoryBackingStore {
    tables: RwLock<Tables>,
    sequences: Mutex<HashMap<Sequence, i32>>,
}

impl MemoryBackingStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop all rows and reset sequences. Test support.
    pub fn clear(&self) -> FolioResult<()> {
        *self.tables.write().map_err(|_| poisoned())? = Tables::default();
        self.sequences.lock().map_err(|_| poisoned())?.clear();
        Ok(())
    }

    fn read_tables(&self) -> FolioResult<std::sync::RwLockReadGuard<'_, Tables>> {
        self.tables.read().map_err(|_| poisoned())
    }

    fn allocate_id(&self, sequence: Sequence) -> FolioResult<i32> {
        let mut sequences = self.sequences.lock().map_err(|_| poisoned())?;
        let next = sequences
            .entry(sequence)
            .or_insert_with(|| sequence.initial_value());
        let value = *next;
        *next += 1;
        Ok(value)
    }
}

/// Open transaction over a working copy of the tables.
pub struct MemoryTransaction<'a> {
    store: &'a MemoryBackingStore,
    guard: RwLockWriteGuard<'a, Tables>,
    working: Tables,
}

impl BackingStore for MemoryBackingStore {
    fn transaction(&self) -> FolioResult<Box<dyn StoreTransaction + '_>> {
        let guard = self.tables.write().map_err(|_| poisoned())?;
        let working = guard.clone();
        Ok(Box::new(MemoryTransaction {
            store: self,
            guard,
            working,
        }))
    }

    fn schema_initialized(&self) -> FolioResult<bool> {
        // The in-memory schema exists from construction.
        Ok(true)
    }
}

impl StoreReader for MemoryBackingStore {
    fn lookup_virtual_wiki(&self, name: &str) -> FolioResult<Option<VirtualWiki>> {
        Ok(self.read_tables()?.lookup_virtual_wiki(name))
    }

    fn virtual_wikis(&self) -> FolioResult<Vec<VirtualWiki>> {
        Ok(self.read_tables()?.virtual_wikis.values().cloned().collect())
    }

    fn namespaces(&self) -> FolioResult<Vec<Namespace>> {
        Ok(self.read_tables()?.namespaces.values().cloned().collect())
    }

    fn lookup_topic(
        &self,
        virtual_wiki_id: VirtualWikiId,
        namespace_id: NamespaceId,
        page_name: &str,
    ) -> FolioResult<Option<Topic>> {
        Ok(self
            .read_tables()?
            .lookup_topic(virtual_wiki_id, namespace_id, page_name))
    }

    fn lookup_topic_by_id(&self, topic_id: TopicId) -> FolioResult<Option<Topic>> {
        Ok(self.read_tables()?.topics.get(&topic_id).cloned())
    }

    fn topic_count(
        &self,
        virtual_wiki_id: VirtualWikiId,
        namespace_id: Option<NamespaceId>,
    ) -> FolioResult<i64> {
        Ok(self.read_tables()?.topic_count(virtual_wiki_id, namespace_id))
    }

    fn topic_names(
        &self,
        virtual_wiki_id: VirtualWikiId,
        include_deleted: bool,
    ) -> FolioResult<Vec<(TopicId, NamespaceId, String)>> {
        Ok(self.read_tables()?.topic_names(virtual_wiki_id, include_deleted))
    }

    fn lookup_topic_version(
        &self,
        topic_version_id: TopicVersionId,
    ) -> FolioResult<Option<TopicVersion>> {
        Ok(self.read_tables()?.topic_versions.get(&topic_version_id).cloned())
    }

    fn next_topic_version_id(
        &self,
        topic_version_id: TopicVersionId,
    ) -> FolioResult<Option<TopicVersionId>> {
        Ok(self.read_tables()?.next_topic_version_id(topic_version_id))
    }

    fn all_topic_versions(
        &self,
        topic_id: TopicId,
        descending: bool,
    ) -> FolioResult<Vec<TopicVersion>> {
        Ok(self.read_tables()?.all_topic_versions(topic_id, descending))
    }

    fn categories(&self, virtual_wiki_id: VirtualWikiId) -> FolioResult<Vec<Category>> {
        Ok(self
            .read_tables()?
            .categories
            .iter()
            .filter(|c| c.virtual_wiki_id == virtual_wiki_id)
            .cloned()
            .collect())
    }

    fn topic_categories(&self, topic_id: TopicId) -> FolioResult<Vec<Category>> {
        Ok(self
            .read_tables()?
            .categories
            .iter()
            .filter(|c| c.child_topic_id == topic_id)
            .cloned()
            .collect())
    }

    fn topic_links(&self, topic_id: TopicId) -> FolioResult<Vec<TopicLink>> {
        Ok(self
            .read_tables()?
            .topic_links
            .iter()
            .filter(|l| l.topic_id == topic_id)
            .cloned()
            .collect())
    }

    fn recent_changes(
        &self,
        virtual_wiki_id: VirtualWikiId,
        limit: usize,
    ) -> FolioResult<Vec<RecentChange>> {
        Ok(self
            .read_tables()?
            .recent_changes
            .iter()
            .rev()
            .filter(|c| c.virtual_wiki_id == virtual_wiki_id)
            .take(limit)
            .cloned()
            .collect())
    }

    fn log_items(
        &self,
        virtual_wiki_id: VirtualWikiId,
        log_type: Option<LogType>,
        limit: usize,
    ) -> FolioResult<Vec<LogItem>> {
        Ok(self
            .read_tables()?
            .log_items
            .iter()
            .rev()
            .filter(|l| {
                l.virtual_wiki_id == virtual_wiki_id
                    && log_type.map_or(true, |lt| l.log_type == lt)
            })
            .take(limit)
            .cloned()
            .collect())
    }
}

impl StoreReader for MemoryTransaction<'_> {
    fn lookup_virtual_wiki(&self, name: &str) -> FolioResult<Option<VirtualWiki>> {
        Ok(self.working.lookup_virtual_wiki(name))
    }

    fn virtual_wikis(&self) -> FolioResult<Vec<VirtualWiki>> {
        Ok(self.working.virtual_wikis.values().cloned().collect())
    }

    fn namespaces(&self) -> FolioResult<Vec<Namespace>> {
        Ok(self.working.namespaces.values().cloned().collect())
    }

    fn lookup_topic(
        &self,
        virtual_wiki_id: VirtualWikiId,
        namespace_id: NamespaceId,
        page_name: &str,
    ) -> FolioResult<Option<Topic>> {
        Ok(self.working.lookup_topic(virtual_wiki_id, namespace_id, page_name))
    }

    fn lookup_topic_by_id(&self, topic_id: TopicId) -> FolioResult<Option<Topic>> {
        Ok(self.working.topics.get(&topic_id).cloned())
    }

    fn topic_count(
        &self,
        virtual_wiki_id: VirtualWikiId,
        namespace_id: Option<NamespaceId>,
    ) -> FolioResult<i64> {
        Ok(self.working.topic_count(virtual_wiki_id, namespace_id))
    }

    fn topic_names(
        &self,
        virtual_wiki_id: VirtualWikiId,
        include_deleted: bool,
    ) -> FolioResult<Vec<(TopicId, NamespaceId, String)>> {
        Ok(self.working.topic_names(virtual_wiki_id, include_deleted))
    }

    fn lookup_topic_version(
        &self,
        topic_version_id: TopicVersionId,
    ) -> FolioResult<Option<TopicVersion>> {
        Ok(self.working.topic_versions.get(&topic_version_id).cloned())
    }

    fn next_topic_version_id(
        &self,
        topic_version_id: TopicVersionId,
    ) -> FolioResult<Option<TopicVersionId>> {
        Ok(self.working.next_topic_version_id(topic_version_id))
    }

    fn all_topic_versions(
        &self,
        topic_id: TopicId,
        descending: bool,
    ) -> FolioResult<Vec<TopicVersion>> {
        Ok(self.working.all_topic_versions(topic_id, descending))
    }

    fn categories(&self, virtual_wiki_id: VirtualWikiId) -> FolioResult<Vec<Category>> {
        Ok(self
            .working
            .categories
            .iter()
            .filter(|c| c.virtual_wiki_id == virtual_wiki_id)
            .cloned()
            .collect())
    }

    fn topic_categories(&self, topic_id: TopicId) -> FolioResult<Vec<Category>> {
        Ok(self
            .working
            .categories
            .iter()
            .filter(|c| c.child_topic_id == topic_id)
            .cloned()
            .collect())
    }

    fn topic_links(&self, topic_id: TopicId) -> FolioResult<Vec<TopicLink>> {
        Ok(self
            .working
            .topic_links
            .iter()
            .filter(|l| l.topic_id == topic_id)
            .cloned()
            .collect())
    }

    fn recent_changes(
        &self,
        virtual_wiki_id: VirtualWikiId,
        limit: usize,
    ) -> FolioResult<Vec<RecentChange>> {
        Ok(self
            .working
            .recent_changes
            .iter()
            .rev()
            .filter(|c| c.virtual_wiki_id == virtual_wiki_id)
            .take(limit)
            .cloned()
            .collect())
    }

    fn log_items(
        &self,
        virtual_wiki_id: VirtualWikiId,
        log_type: Option<LogType>,
        limit: usize,
    ) -> FolioResult<Vec<LogItem>> {
        Ok(self
            .working
            .log_items
            .iter()
            .rev()
            .filter(|l| {
                l.virtual_wiki_id == virtual_wiki_id
                    && log_type.map_or(true, |lt| l.log_type == lt)
            })
            .take(limit)
            .cloned()
            .collect())
    }
}

impl StoreTransaction for MemoryTransaction<'_> {
    fn next_id(&mut self, sequence: Sequence) -> FolioResult<i32> {
        self.store.allocate_id(sequence)
    }

    fn insert_virtual_wiki(&mut self, virtual_wiki: &VirtualWiki) -> FolioResult<()> {
        let id = virtual_wiki.virtual_wiki_id.ok_or_else(|| {
            FolioError::from(StorageError::InsertFailed {
                entity: "virtual_wiki",
                reason: "id not set".to_string(),
            })
        })?;
        if self.working.virtual_wikis.contains_key(&id)
            || self.working.lookup_virtual_wiki(&virtual_wiki.name).is_some()
        {
            return Err(StorageError::InsertFailed {
                entity: "virtual_wiki",
                reason: format!("duplicate id or name: {}", virtual_wiki.name),
            }
            .into());
        }
        self.working.virtual_wikis.insert(id, virtual_wiki.clone());
        Ok(())
    }

    fn update_virtual_wiki(&mut self, virtual_wiki: &VirtualWiki) -> FolioResult<()> {
        let id = virtual_wiki.virtual_wiki_id.ok_or_else(|| {
            FolioError::from(StorageError::UpdateFailed {
                entity: "virtual_wiki",
                id: -1,
                reason: "id not set".to_string(),
            })
        })?;
        if !self.working.virtual_wikis.contains_key(&id) {
            return Err(StorageError::UpdateFailed {
                entity: "virtual_wiki",
                id,
                reason: "no such row".to_string(),
            }
            .into());
        }
        self.working.virtual_wikis.insert(id, virtual_wiki.clone());
        Ok(())
    }

    fn save_namespace(&mut self, namespace: &Namespace) -> FolioResult<()> {
        self.working.namespaces.insert(namespace.id, namespace.clone());
        Ok(())
    }

    fn insert_topic(&mut self, topic: &Topic) -> FolioResult<()> {
        let id = topic.topic_id.ok_or_else(|| {
            FolioError::from(StorageError::InsertFailed {
                entity: "topic",
                reason: "id not set".to_string(),
            })
        })?;
        if self.working.topics.contains_key(&id) {
            return Err(StorageError::InsertFailed {
                entity: "topic",
                reason: format!("duplicate id {}", id),
            }
            .into());
        }
        self.working.check_topic_version_fk(topic)?;
        self.working.topics.insert(id, topic.clone());
        Ok(())
    }

    fn update_topic(&mut self, topic: &Topic) -> FolioResult<()> {
        let id = topic.topic_id.ok_or_else(|| {
            FolioError::from(StorageError::UpdateFailed {
                entity: "topic",
                id: -1,
                reason: "id not set".to_string(),
            })
        })?;
        if !self.working.topics.contains_key(&id) {
            return Err(StorageError::UpdateFailed {
                entity: "topic",
                id,
                reason: "no such row".to_string(),
            }
            .into());
        }
        self.working.check_topic_version_fk(topic)?;
        self.working.topics.insert(id, topic.clone());
        Ok(())
    }

    fn insert_topic_version(&mut self, version: &TopicVersion) -> FolioResult<()> {
        let id = version.topic_version_id.ok_or_else(|| {
            FolioError::from(StorageError::InsertFailed {
                entity: "topic_version",
                reason: "id not set".to_string(),
            })
        })?;
        let topic_id = version.topic_id.ok_or_else(|| {
            FolioError::from(StorageError::InsertFailed {
                entity: "topic_version",
                reason: "topic_id not set".to_string(),
            })
        })?;
        if self.working.topic_versions.contains_key(&id) {
            return Err(StorageError::InsertFailed {
                entity: "topic_version",
                reason: format!("duplicate id {}", id),
            }
            .into());
        }
        if !self.working.topics.contains_key(&topic_id) {
            return Err(StorageError::IntegrityViolation {
                reason: format!("topic_version {} references missing topic {}", id, topic_id),
            }
            .into());
        }
        self.working.topic_versions.insert(id, version.clone());
        Ok(())
    }

    fn update_topic_version(&mut self, version: &TopicVersion) -> FolioResult<()> {
        let id = version.topic_version_id.ok_or_else(|| {
            FolioError::from(StorageError::UpdateFailed {
                entity: "topic_version",
                id: -1,
                reason: "id not set".to_string(),
            })
        })?;
        if !self.working.topic_versions.contains_key(&id) {
            return Err(StorageError::UpdateFailed {
                entity: "topic_version",
                id,
                reason: "no such row".to_string(),
            }
            .into());
        }
        self.working.topic_versions.insert(id, version.clone());
        Ok(())
    }

    fn delete_topic_version(&mut self, topic_version_id: TopicVersionId) -> FolioResult<()> {
        self.working.topic_versions.remove(&topic_version_id);
        Ok(())
    }

    fn delete_topic_categories(&mut self, topic_id: TopicId) -> FolioResult<()> {
        self.working.categories.retain(|c| c.child_topic_id != topic_id);
        Ok(())
    }

    fn insert_categories(&mut self, categories: &[Category]) -> FolioResult<()> {
        self.working.categories.extend_from_slice(categories);
        Ok(())
    }

    fn delete_topic_links(&mut self, topic_id: TopicId) -> FolioResult<()> {
        self.working.topic_links.retain(|l| l.topic_id != topic_id);
        Ok(())
    }

    fn insert_topic_links(&mut self, links: &[TopicLink]) -> FolioResult<()> {
        self.working.topic_links.extend_from_slice(links);
        Ok(())
    }

    fn insert_log_item(&mut self, log_item: &LogItem) -> FolioResult<()> {
        self.working.log_items.push(log_item.clone());
        Ok(())
    }

    fn insert_recent_change(&mut self, change: &RecentChange) -> FolioResult<()> {
        self.working.recent_changes.push(change.clone());
        Ok(())
    }

    fn delete_recent_changes(&mut self, topic_id: TopicId) -> FolioResult<()> {
        self.working
            .recent_changes
            .retain(|c| c.topic_id != Some(topic_id));
        Ok(())
    }

    fn delete_log_items_by_version(
        &mut self,
        topic_version_id: TopicVersionId,
    ) -> FolioResult<()> {
        self.working
            .log_items
            .retain(|l| l.topic_version_id != Some(topic_version_id));
        Ok(())
    }

    fn delete_recent_changes_by_version(
        &mut self,
        topic_version_id: TopicVersionId,
    ) -> FolioResult<()> {
        self.working
            .recent_changes
            .retain(|c| c.topic_version_id != Some(topic_version_id));
        Ok(())
    }

    fn update_recent_changes_previous(
        &mut self,
        from: TopicVersionId,
        to: Option<TopicVersionId>,
    ) -> FolioResult<()> {
        for change in &mut self.working.recent_changes {
            if change.previous_topic_version_id == Some(from) {
                change.previous_topic_version_id = to;
            }
        }
        Ok(())
    }

    fn reader(&self) -> &dyn StoreReader {
        self
    }

    fn commit(mut self: Box<Self>) -> FolioResult<()> {
        *self.guard = std::mem::take(&mut self.working);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use folio_core::namespace_id;

    fn seeded_store() -> MemoryBackingStore {
        let store = MemoryBackingStore::new();
        let mut txn = store.transaction().unwrap();
        let vw_id = txn.next_id(Sequence::VirtualWiki).unwrap();
        let mut vw = VirtualWiki::new("en", "Main Page");
        vw.virtual_wiki_id = Some(vw_id);
        txn.insert_virtual_wiki(&vw).unwrap();
        txn.commit().unwrap();
        store
    }

    #[test]
    fn test_rollback_discards_writes() {
        let store = seeded_store();
        {
            let mut txn = store.transaction().unwrap();
            let id = txn.next_id(Sequence::Topic).unwrap();
            let mut topic = Topic::new(1, "en", namespace_id::MAIN, "Dropped");
            topic.topic_id = Some(id);
            txn.insert_topic(&topic).unwrap();
            assert!(txn.lookup_topic(1, namespace_id::MAIN, "Dropped").unwrap().is_some());
            // dropped without commit
        }
        assert!(store.lookup_topic(1, namespace_id::MAIN, "Dropped").unwrap().is_none());
    }

    #[test]
    fn test_sequence_values_survive_rollback() {
        let store = seeded_store();
        let first = {
            let mut txn = store.transaction().unwrap();
            txn.next_id(Sequence::Topic).unwrap()
            // rollback
        };
        let mut txn = store.transaction().unwrap();
        let second = txn.next_id(Sequence::Topic).unwrap();
        assert!(second > first, "rolled-back ids must not be reused");
    }

    #[test]
    fn test_topic_current_version_fk_enforced() {
        let store = seeded_store();
        let mut txn = store.transaction().unwrap();
        let id = txn.next_id(Sequence::Topic).unwrap();
        let mut topic = Topic::new(1, "en", namespace_id::MAIN, "Test");
        topic.topic_id = Some(id);
        topic.current_version_id = Some(999);
        let err = txn.insert_topic(&topic).unwrap_err();
        assert!(matches!(
            err,
            FolioError::Storage(StorageError::IntegrityViolation { .. })
        ));
    }

    #[test]
    fn test_version_requires_existing_topic() {
        let store = seeded_store();
        let mut txn = store.transaction().unwrap();
        let id = txn.next_id(Sequence::TopicVersion).unwrap();
        let mut version = TopicVersion::new(None, "127.0.0.1", None, "content", 7);
        version.topic_version_id = Some(id);
        version.topic_id = Some(424242);
        assert!(txn.insert_topic_version(&version).is_err());
    }

    #[test]
    fn test_next_topic_version_id_is_derived() {
        let store = seeded_store();
        let mut txn = store.transaction().unwrap();
        let topic_id = txn.next_id(Sequence::Topic).unwrap();
        let mut topic = Topic::new(1, "en", namespace_id::MAIN, "Chain");
        topic.topic_id = Some(topic_id);
        txn.insert_topic(&topic).unwrap();

        let v1_id = txn.next_id(Sequence::TopicVersion).unwrap();
        let mut v1 = TopicVersion::new(None, "127.0.0.1", None, "one", 3);
        v1.topic_version_id = Some(v1_id);
        v1.topic_id = Some(topic_id);
        txn.insert_topic_version(&v1).unwrap();

        let v2_id = txn.next_id(Sequence::TopicVersion).unwrap();
        let mut v2 = TopicVersion::new(None, "127.0.0.1", None, "two", 3);
        v2.topic_version_id = Some(v2_id);
        v2.topic_id = Some(topic_id);
        v2.previous_topic_version_id = Some(v1_id);
        txn.insert_topic_version(&v2).unwrap();
        txn.commit().unwrap();

        assert_eq!(store.next_topic_version_id(v1_id).unwrap(), Some(v2_id));
        assert_eq!(store.next_topic_version_id(v2_id).unwrap(), None);
    }
}

//! Folio Storage - Backing Store Adapter and Cache Coordinator
//!
//! Defines the storage abstraction the content store runs against: the
//! [`BackingStore`] / [`StoreTransaction`] capability traits, an in-memory
//! reference implementation with real commit/rollback semantics, a SQL
//! adapter shape with per-dialect strategy structs, and the process-wide
//! lookup caches.

pub mod cache;
pub mod memory;
pub mod sql;

pub use cache::{CacheManager, CacheResult, CacheStats, LookupCache, NAMESPACE_LIST_KEY};
pub use memory::MemoryBackingStore;
pub use sql::{Dialect, QueryCatalog, SqlBackingStore, SqlExecutor, SqlRow, SqlValue};

use folio_core::{
    Category, FolioResult, LogItem, LogType, Namespace, NamespaceId, RecentChange, Sequence,
    Topic, TopicId, TopicLink, TopicVersion, TopicVersionId, VirtualWiki, VirtualWikiId,
};

// ============================================================================
// CAPABILITY TRAITS
// ============================================================================

/// Read operations shared by the backing store (autocommit reads) and open
/// transactions (reads that must observe the transaction's own writes).
///
/// Not-found is `Ok(None)`, never an error. Implementations perform no
/// caching; the cache coordinator sits above this layer.
pub trait StoreReader {
    // === Tenants and namespaces ===

    /// Look up a virtual wiki by its unique name.
    fn lookup_virtual_wiki(&self, name: &str) -> FolioResult<Option<VirtualWiki>>;

    /// List all virtual wikis.
    fn virtual_wikis(&self) -> FolioResult<Vec<VirtualWiki>>;

    /// List all namespaces, ordered by id.
    fn namespaces(&self) -> FolioResult<Vec<Namespace>>;

    // === Topics ===

    /// Look up a topic by exact (tenant, namespace, page name). Deleted
    /// topics are returned; filtering is the caller's concern.
    fn lookup_topic(
        &self,
        virtual_wiki_id: VirtualWikiId,
        namespace_id: NamespaceId,
        page_name: &str,
    ) -> FolioResult<Option<Topic>>;

    /// Look up a topic by primary key.
    fn lookup_topic_by_id(&self, topic_id: TopicId) -> FolioResult<Option<Topic>>;

    /// Count non-deleted topics for a tenant, optionally restricted to one
    /// namespace. Redirects are included.
    fn topic_count(
        &self,
        virtual_wiki_id: VirtualWikiId,
        namespace_id: Option<NamespaceId>,
    ) -> FolioResult<i64>;

    /// All (topic id, namespace id, page name) triples for a tenant.
    fn topic_names(
        &self,
        virtual_wiki_id: VirtualWikiId,
        include_deleted: bool,
    ) -> FolioResult<Vec<(TopicId, NamespaceId, String)>>;

    // === Topic versions ===

    /// Look up a version by primary key.
    fn lookup_topic_version(
        &self,
        topic_version_id: TopicVersionId,
    ) -> FolioResult<Option<TopicVersion>>;

    /// Derive the id of the version that follows the given one in its
    /// topic's chain, i.e. the version whose `previous_topic_version_id`
    /// equals the given id. There is no stored next pointer.
    fn next_topic_version_id(
        &self,
        topic_version_id: TopicVersionId,
    ) -> FolioResult<Option<TopicVersionId>>;

    /// All versions of a topic in chronological (id) order, optionally
    /// reversed.
    fn all_topic_versions(
        &self,
        topic_id: TopicId,
        descending: bool,
    ) -> FolioResult<Vec<TopicVersion>>;

    // === Associations ===

    /// All category associations for a tenant.
    fn categories(&self, virtual_wiki_id: VirtualWikiId) -> FolioResult<Vec<Category>>;

    /// Category associations of one topic.
    fn topic_categories(&self, topic_id: TopicId) -> FolioResult<Vec<Category>>;

    /// Outbound link associations of one topic.
    fn topic_links(&self, topic_id: TopicId) -> FolioResult<Vec<TopicLink>>;

    // === Change and audit projections ===

    /// Most recent changes for a tenant, newest first.
    fn recent_changes(
        &self,
        virtual_wiki_id: VirtualWikiId,
        limit: usize,
    ) -> FolioResult<Vec<RecentChange>>;

    /// Log items for a tenant, newest first, optionally filtered by type.
    fn log_items(
        &self,
        virtual_wiki_id: VirtualWikiId,
        log_type: Option<LogType>,
        limit: usize,
    ) -> FolioResult<Vec<LogItem>>;
}

/// One atomic unit of work against the backing store.
///
/// All mutations happen through a transaction. Dropping a transaction
/// without calling [`StoreTransaction::commit`] rolls back every mutation,
/// including id-consuming inserts (allocated sequence values are not
/// returned).
///
/// Reads performed through the transaction observe its uncommitted writes.
pub trait StoreTransaction: StoreReader {
    /// Allocate the next value of a named id sequence. Values survive
    /// rollback - a rolled-back transaction leaves a gap, never a reuse.
    fn next_id(&mut self, sequence: Sequence) -> FolioResult<i32>;

    // === Tenants and namespaces ===

    /// Insert a virtual wiki. The id must already be set.
    fn insert_virtual_wiki(&mut self, virtual_wiki: &VirtualWiki) -> FolioResult<()>;

    /// Update a virtual wiki's display metadata.
    fn update_virtual_wiki(&mut self, virtual_wiki: &VirtualWiki) -> FolioResult<()>;

    /// Insert or update a namespace row (upsert keyed by namespace id).
    fn save_namespace(&mut self, namespace: &Namespace) -> FolioResult<()>;

    // === Topics ===

    /// Insert a topic. The id must already be set. Enforces the referential
    /// constraint from `current_version_id` to an existing version.
    fn insert_topic(&mut self, topic: &Topic) -> FolioResult<()>;

    /// Update a topic row. Enforces the same referential constraint as
    /// [`StoreTransaction::insert_topic`]; the topic must never point at a
    /// version id before that version exists.
    fn update_topic(&mut self, topic: &Topic) -> FolioResult<()>;

    // === Topic versions ===

    /// Insert a version. The id and owning topic id must already be set,
    /// and the owning topic row must exist.
    fn insert_topic_version(&mut self, version: &TopicVersion) -> FolioResult<()>;

    /// Update a version row (administrative back-link maintenance only).
    fn update_topic_version(&mut self, version: &TopicVersion) -> FolioResult<()>;

    /// Permanently delete a version row.
    fn delete_topic_version(&mut self, topic_version_id: TopicVersionId) -> FolioResult<()>;

    // === Associations ===

    /// Delete all category associations of a topic.
    fn delete_topic_categories(&mut self, topic_id: TopicId) -> FolioResult<()>;

    /// Insert category associations.
    fn insert_categories(&mut self, categories: &[Category]) -> FolioResult<()>;

    /// Delete all outbound link associations of a topic.
    fn delete_topic_links(&mut self, topic_id: TopicId) -> FolioResult<()>;

    /// Insert link associations.
    fn insert_topic_links(&mut self, links: &[TopicLink]) -> FolioResult<()>;

    // === Change and audit log ===

    /// Append a log item.
    fn insert_log_item(&mut self, log_item: &LogItem) -> FolioResult<()>;

    /// Append a recent-change row.
    fn insert_recent_change(&mut self, change: &RecentChange) -> FolioResult<()>;

    /// Delete the recent-change projection rows of one topic. History
    /// (versions, log items) is unaffected.
    fn delete_recent_changes(&mut self, topic_id: TopicId) -> FolioResult<()>;

    /// Delete log items referencing a version (purge cleanup).
    fn delete_log_items_by_version(
        &mut self,
        topic_version_id: TopicVersionId,
    ) -> FolioResult<()>;

    /// Delete recent-change rows referencing a version (purge cleanup).
    fn delete_recent_changes_by_version(
        &mut self,
        topic_version_id: TopicVersionId,
    ) -> FolioResult<()>;

    /// Repoint recent-change rows whose previous-version pointer references
    /// a purged version (purge chain splicing).
    fn update_recent_changes_previous(
        &mut self,
        from: TopicVersionId,
        to: Option<TopicVersionId>,
    ) -> FolioResult<()>;

    // === Lifecycle ===

    /// View this transaction as a plain reader.
    fn reader(&self) -> &dyn StoreReader;

    /// Atomically apply every mutation performed through this transaction.
    fn commit(self: Box<Self>) -> FolioResult<()>;
}

/// The backing store adapter: executes reads directly and hands out
/// transactions for writes. Implementations delegate all locking and
/// isolation to the underlying engine; this layer adds no locks of its own
/// above the adapter.
pub trait BackingStore: StoreReader + Send + Sync {
    /// Begin a transaction.
    fn transaction(&self) -> FolioResult<Box<dyn StoreTransaction + '_>>;

    /// Existence probe: whether the schema has been initialized.
    fn schema_initialized(&self) -> FolioResult<bool>;
}

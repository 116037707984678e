//! The versioned content store.
//!
//! Coordinates the topic and revision lifecycle against an injected backing
//! store: every write is one atomic transaction, revision rows are inserted
//! before the topic row points at them, and the lookup caches are refreshed
//! only after a transaction commits. Reads go cache-first except inside an
//! open transaction, where the transaction's own uncommitted writes must be
//! visible and nothing may be cached.

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use tracing::{debug, warn};

use folio_core::validation::{
    validate_category, validate_log_item, validate_namespace, validate_recent_change,
    validate_topic, validate_topic_name, validate_topic_version, validate_virtual_wiki,
};
use folio_core::{
    namespace_id, Category, EditType, FolioConfig, FolioResult, LogItem, LogType, Namespace,
    NamespaceId, RecentChange, Sequence, StorageError, Topic, TopicId, TopicLink, TopicType,
    TopicVersion, TopicVersionId, UserId, ValidationError, VirtualWiki, VirtualWikiId,
};
use folio_storage::{
    BackingStore, CacheManager, CacheResult, CacheStats, StoreReader, StoreTransaction,
    NAMESPACE_LIST_KEY,
};

use crate::changelog;
use crate::name::{NameResolver, ParsedName};
use crate::search::{NullSearchIndexer, SearchIndexer};

/// The canonical content of a redirect topic.
pub fn redirect_marker(destination: &str) -> String {
    format!("#REDIRECT [[{}]]", destination)
}

/// Multi-tenant, version-controlled topic store.
///
/// Owns the cache manager for its lifetime; independent instances have
/// independent caches. The store adds no locks of its own: concurrency
/// control is delegated entirely to the backing store's transactions.
pub struct VersionedContentStore {
    backing: Arc<dyn BackingStore>,
    caches: Arc<CacheManager>,
    indexer: Arc<dyn SearchIndexer>,
    config: FolioConfig,
}

impl VersionedContentStore {
    pub fn new(backing: Arc<dyn BackingStore>, config: FolioConfig) -> FolioResult<Self> {
        config.validate()?;
        let caches = Arc::new(CacheManager::new(&config));
        Ok(VersionedContentStore {
            backing,
            caches,
            indexer: Arc::new(NullSearchIndexer),
            config,
        })
    }

    /// Attach a search indexer to be notified after committed writes.
    pub fn with_indexer(mut self, indexer: Arc<dyn SearchIndexer>) -> Self {
        self.indexer = indexer;
        self
    }

    pub fn config(&self) -> &FolioConfig {
        &self.config
    }

    /// Whether the backing schema has been initialized.
    pub fn is_initialized(&self) -> FolioResult<bool> {
        self.backing.schema_initialized()
    }

    /// Drop all cached state. Called on shutdown or after the backing data
    /// changed out from under the store (bulk imports).
    pub fn shutdown(&self) {
        self.caches.clear_all();
    }

    /// Usage statistics of every lookup cache.
    pub fn cache_stats(&self) -> Vec<(&'static str, CacheStats)> {
        self.caches.stats()
    }

    fn resolver_on<'a>(&'a self, namespaces: &'a [Namespace]) -> NameResolver<'a> {
        NameResolver::new(namespaces, &self.config)
    }

    // ========================================================================
    // TENANT AND NAMESPACE READS
    // ========================================================================

    pub fn lookup_virtual_wiki(&self, name: &str) -> FolioResult<Option<VirtualWiki>> {
        match self.caches.virtual_wikis.get(&name.to_string()) {
            CacheResult::Hit(cached) => Ok(cached),
            CacheResult::Miss => {
                let found = self.backing.lookup_virtual_wiki(name)?;
                self.caches.virtual_wikis.put(name.to_string(), found.clone());
                Ok(found)
            }
        }
    }

    pub fn virtual_wikis(&self) -> FolioResult<Vec<VirtualWiki>> {
        self.backing.virtual_wikis()
    }

    /// The namespace list, cached as one unit.
    pub fn namespaces(&self) -> FolioResult<Vec<Namespace>> {
        if let CacheResult::Hit(Some(list)) =
            self.caches.namespace_list.get(&NAMESPACE_LIST_KEY.to_string())
        {
            return Ok(list);
        }
        let list = self.backing.namespaces()?;
        self.caches
            .namespace_list
            .put(NAMESPACE_LIST_KEY.to_string(), Some(list.clone()));
        Ok(list)
    }

    fn require_virtual_wiki(&self, name: &str) -> FolioResult<VirtualWiki> {
        self.lookup_virtual_wiki(name)?.ok_or_else(|| {
            ValidationError::UnknownVirtualWiki {
                name: name.to_string(),
            }
            .into()
        })
    }

    fn wiki_id(virtual_wiki: &VirtualWiki) -> FolioResult<VirtualWikiId> {
        virtual_wiki.virtual_wiki_id.ok_or_else(|| {
            StorageError::IntegrityViolation {
                reason: format!("virtual wiki '{}' has no id", virtual_wiki.name),
            }
            .into()
        })
    }

    // ========================================================================
    // TOPIC READS
    // ========================================================================

    /// Look up a topic by tenant and raw name.
    ///
    /// Deleted topics are always fetched and cached; the `include_deleted`
    /// filter is applied as the very last step.
    pub fn lookup_topic(
        &self,
        virtual_wiki: &str,
        raw_name: &str,
        include_deleted: bool,
    ) -> FolioResult<Option<Topic>> {
        let started = Instant::now();
        let namespaces = self.namespaces()?;
        let resolver = self.resolver_on(&namespaces);
        let parsed = resolver.parse(virtual_wiki, raw_name);
        let result = self.lookup_parsed(
            &*self.backing,
            true,
            &resolver,
            virtual_wiki,
            &parsed,
            include_deleted,
            true,
        );
        let elapsed_ms = started.elapsed().as_millis() as u64;
        if elapsed_ms > self.config.slow_lookup_threshold_ms {
            debug!(
                key = %resolver.cache_key(virtual_wiki, parsed.namespace_id, &parsed.page_name),
                elapsed_ms,
                "slow topic lookup"
            );
        }
        result
    }

    pub fn lookup_topic_by_id(&self, topic_id: TopicId) -> FolioResult<Option<Topic>> {
        self.topic_by_id(&*self.backing, true, topic_id)
    }

    pub fn lookup_topic_version(
        &self,
        topic_version_id: TopicVersionId,
    ) -> FolioResult<Option<TopicVersion>> {
        if let CacheResult::Hit(cached) = self.caches.topic_versions.get(&topic_version_id) {
            return Ok(cached);
        }
        let found = self.backing.lookup_topic_version(topic_version_id)?;
        self.caches.topic_versions.put(topic_version_id, found.clone());
        Ok(found)
    }

    pub fn next_topic_version_id(
        &self,
        topic_version_id: TopicVersionId,
    ) -> FolioResult<Option<TopicVersionId>> {
        self.backing.next_topic_version_id(topic_version_id)
    }

    pub fn all_topic_versions(
        &self,
        topic_id: TopicId,
        descending: bool,
    ) -> FolioResult<Vec<TopicVersion>> {
        self.backing.all_topic_versions(topic_id, descending)
    }

    /// A topic's revision history by name. Deleted topics keep their
    /// history, so the name is resolved with deleted topics included.
    pub fn topic_history(
        &self,
        virtual_wiki: &str,
        raw_name: &str,
        descending: bool,
    ) -> FolioResult<Vec<TopicVersion>> {
        let Some(topic) = self.lookup_topic(virtual_wiki, raw_name, true)? else {
            return Ok(Vec::new());
        };
        match topic.topic_id {
            Some(topic_id) => self.all_topic_versions(topic_id, descending),
            None => Ok(Vec::new()),
        }
    }

    pub fn topic_count(
        &self,
        virtual_wiki: &str,
        namespace_id: Option<NamespaceId>,
    ) -> FolioResult<i64> {
        let vw = self.require_virtual_wiki(virtual_wiki)?;
        self.backing.topic_count(Self::wiki_id(&vw)?, namespace_id)
    }

    pub fn topic_names(
        &self,
        virtual_wiki: &str,
        include_deleted: bool,
    ) -> FolioResult<Vec<(TopicId, NamespaceId, String)>> {
        let vw = self.require_virtual_wiki(virtual_wiki)?;
        self.backing.topic_names(Self::wiki_id(&vw)?, include_deleted)
    }

    pub fn categories(&self, virtual_wiki: &str) -> FolioResult<Vec<Category>> {
        let vw = self.require_virtual_wiki(virtual_wiki)?;
        self.backing.categories(Self::wiki_id(&vw)?)
    }

    pub fn topic_categories(&self, topic_id: TopicId) -> FolioResult<Vec<Category>> {
        self.backing.topic_categories(topic_id)
    }

    pub fn topic_links(&self, topic_id: TopicId) -> FolioResult<Vec<TopicLink>> {
        self.backing.topic_links(topic_id)
    }

    pub fn recent_changes(
        &self,
        virtual_wiki: &str,
        limit: usize,
    ) -> FolioResult<Vec<RecentChange>> {
        let vw = self.require_virtual_wiki(virtual_wiki)?;
        self.backing.recent_changes(Self::wiki_id(&vw)?, limit)
    }

    pub fn log_items(
        &self,
        virtual_wiki: &str,
        log_type: Option<LogType>,
        limit: usize,
    ) -> FolioResult<Vec<LogItem>> {
        let vw = self.require_virtual_wiki(virtual_wiki)?;
        self.backing.log_items(Self::wiki_id(&vw)?, log_type, limit)
    }

    /// The lookup algorithm. `use_cache` is false inside write transactions:
    /// the transaction's own writes must be visible, and uncommitted state
    /// must never be cached. `allow_shared_fallback` is false once resolution
    /// has already crossed into the shared tenant (one level, never more).
    fn lookup_parsed<R: StoreReader + ?Sized>(
        &self,
        reader: &R,
        use_cache: bool,
        resolver: &NameResolver<'_>,
        virtual_wiki: &str,
        parsed: &ParsedName,
        include_deleted: bool,
        allow_shared_fallback: bool,
    ) -> FolioResult<Option<Topic>> {
        // Special pages are never stored
        if parsed.namespace_id == namespace_id::SPECIAL {
            return Ok(None);
        }
        let storage_ns = resolver.storage_namespace(parsed.namespace_id);
        let key = resolver.cache_key(virtual_wiki, storage_ns, &parsed.page_name);
        let shared = resolver.shared_tenant(virtual_wiki, parsed.namespace_id);

        let mut found: Option<Topic> = None;
        let mut answered = false;
        if use_cache {
            match self.caches.topic_ids_by_name.get(&key) {
                CacheResult::Hit(Some(id)) => {
                    found = self.topic_by_id(reader, use_cache, id)?;
                    answered = true;
                }
                CacheResult::Hit(None) => answered = true,
                CacheResult::Miss => {}
            }
        }
        if !answered {
            let vw = if use_cache {
                self.lookup_virtual_wiki(virtual_wiki)?
            } else {
                reader.lookup_virtual_wiki(virtual_wiki)?
            };
            let Some(vw) = vw else {
                return Ok(None);
            };
            let vw_id = Self::wiki_id(&vw)?;
            let mut topic = reader.lookup_topic(vw_id, storage_ns, &parsed.page_name)?;
            if topic.is_none() {
                if let Some(alternate) =
                    resolver.alternate_page_name(storage_ns, &parsed.page_name)
                {
                    topic = reader.lookup_topic(vw_id, storage_ns, &alternate)?;
                }
            }
            if use_cache {
                match &topic {
                    Some(t) => self.cache_found_topic(&key, t, resolver),
                    // A local absent marker would go stale the moment the
                    // shared tenant gains this name, so it is only cached
                    // when no fallback applies to the key.
                    None if shared.is_none() => {
                        self.caches.topic_ids_by_name.put(key.clone(), None)
                    }
                    None => {}
                }
            }
            found = topic;
        }
        if found.is_none() && allow_shared_fallback {
            if let Some(shared) = shared {
                found = self.lookup_parsed(
                    reader, use_cache, resolver, shared, parsed, true, false,
                )?;
            }
        }
        Ok(match found {
            Some(topic) if topic.is_deleted() && !include_deleted => None,
            other => other,
        })
    }

    fn topic_by_id<R: StoreReader + ?Sized>(
        &self,
        reader: &R,
        use_cache: bool,
        topic_id: TopicId,
    ) -> FolioResult<Option<Topic>> {
        if use_cache {
            if let CacheResult::Hit(cached) = self.caches.topics_by_id.get(&topic_id) {
                return Ok(cached);
            }
        }
        let found = reader.lookup_topic_by_id(topic_id)?;
        if use_cache {
            self.caches.topics_by_id.put(topic_id, found.clone());
        }
        Ok(found)
    }

    fn cache_found_topic(&self, key: &str, topic: &Topic, resolver: &NameResolver<'_>) {
        let Some(id) = topic.topic_id else {
            return;
        };
        self.caches.topic_ids_by_name.put(key.to_string(), Some(id));
        self.caches.topics_by_id.put(id, Some(topic.clone()));
        if !topic.is_deleted() {
            let display =
                resolver.build_topic_name(&topic.virtual_wiki, topic.namespace_id, &topic.page_name);
            self.caches
                .topic_names_by_name
                .put(key.to_string(), Some(display));
        }
    }

    // ========================================================================
    // TOPIC WRITES
    // ========================================================================

    /// Create or update a topic.
    ///
    /// With a version: the version row is inserted first, then the topic's
    /// current-version pointer and denormalized content move to it, and one
    /// log item plus (unless suppressed) one recent-change row are emitted.
    /// Without a version: the topic row is updated directly, for
    /// non-content-visible changes only.
    ///
    /// `categories` are (name, sort key) pairs and `links` are
    /// (namespace, page name) targets, both pre-extracted by the caller;
    /// associations are fully replaced on every call and dropped entirely
    /// when the topic is deleted.
    pub fn write_topic(
        &self,
        topic: &mut Topic,
        mut version: Option<&mut TopicVersion>,
        categories: &[(String, Option<String>)],
        links: &[(NamespaceId, String)],
    ) -> FolioResult<()> {
        validate_topic_name(&topic.page_name)?;
        let namespaces = self.namespaces()?;
        let resolver = self.resolver_on(&namespaces);
        let previous = match topic.topic_id {
            Some(id) => self.backing.lookup_topic_by_id(id)?,
            None => None,
        };
        let mut txn = self.backing.transaction()?;
        self.write_topic_tx(
            txn.as_mut(),
            &resolver,
            topic,
            version.as_deref_mut(),
            categories,
            links,
        )?;
        txn.commit()?;
        self.refresh_topic_caches(topic, previous.as_ref())?;
        if let Some(written) = version.as_deref() {
            self.cache_version(written);
            self.notify_indexed(topic);
        }
        Ok(())
    }

    /// Soft-delete a topic: content emptied, associations cleared, the live
    /// recent-changes projection removed. With a version the deletion is
    /// audited; without one it is internal cleanup and leaves no trail.
    pub fn delete_topic(
        &self,
        topic: &mut Topic,
        mut version: Option<&mut TopicVersion>,
    ) -> FolioResult<()> {
        let namespaces = self.namespaces()?;
        let resolver = self.resolver_on(&namespaces);
        let previous = match topic.topic_id {
            Some(id) => self.backing.lookup_topic_by_id(id)?,
            None => None,
        };
        let mut txn = self.backing.transaction()?;
        self.delete_topic_tx(txn.as_mut(), &resolver, topic, version.as_deref_mut())?;
        txn.commit()?;
        self.refresh_topic_caches(topic, previous.as_ref())?;
        if let Some(written) = version.as_deref() {
            self.cache_version(written);
            self.notify_removed(topic);
        }
        Ok(())
    }

    /// Restore a soft-deleted topic with caller-supplied content, recording
    /// an undelete version so the chain shows how content came back.
    pub fn undelete_topic(
        &self,
        topic: &mut Topic,
        version: &mut TopicVersion,
    ) -> FolioResult<()> {
        let namespaces = self.namespaces()?;
        let resolver = self.resolver_on(&namespaces);
        let previous = match topic.topic_id {
            Some(id) => self.backing.lookup_topic_by_id(id)?,
            None => None,
        };
        let mut txn = self.backing.transaction()?;
        self.undelete_topic_tx(txn.as_mut(), &resolver, topic, version)?;
        txn.commit()?;
        self.refresh_topic_caches(topic, previous.as_ref())?;
        self.cache_version(version);
        self.notify_indexed(topic);
        Ok(())
    }

    /// Whether `topic` may be moved to `destination`: the destination must
    /// not exist, or be soft-deleted, or be a redirect pointing back at the
    /// source. A destination resolved on another tenant (shared upload
    /// fallback) always blocks.
    pub fn can_move_topic(&self, topic: &Topic, destination: &str) -> FolioResult<bool> {
        validate_topic_name(destination)?;
        let namespaces = self.namespaces()?;
        let resolver = self.resolver_on(&namespaces);
        let existing = self.lookup_topic(&topic.virtual_wiki, destination, true)?;
        Ok(Self::move_allowed(&resolver, topic, existing.as_ref()))
    }

    fn move_allowed(
        resolver: &NameResolver<'_>,
        topic: &Topic,
        existing: Option<&Topic>,
    ) -> bool {
        match existing {
            None => true,
            // a shared-tenant name is never displaced by a local move, not
            // even a deleted or redirect one
            Some(dest) if dest.virtual_wiki != topic.virtual_wiki => false,
            Some(dest) if dest.is_deleted() => true,
            Some(dest) => {
                let source_name = resolver.build_topic_name(
                    &topic.virtual_wiki,
                    topic.namespace_id,
                    &topic.page_name,
                );
                dest.redirect_to.as_deref() == Some(source_name.as_str())
            }
        }
    }

    /// Rename a topic, leaving a redirect behind at the old name.
    ///
    /// The rename itself is written recent-change-suppressed; the redirect
    /// half carries the user-visible change. Both halves plus any clearing
    /// of a back-redirect destination happen in one transaction.
    pub fn move_topic(
        &self,
        virtual_wiki: &str,
        topic: &mut Topic,
        mut version: TopicVersion,
        destination: &str,
    ) -> FolioResult<()> {
        validate_topic_name(destination)?;
        if topic.virtual_wiki != virtual_wiki {
            return Err(ValidationError::CrossWikiMove {
                from: topic.virtual_wiki.clone(),
                to: virtual_wiki.to_string(),
            }
            .into());
        }
        let topic_id = topic
            .topic_id
            .ok_or(ValidationError::RequiredFieldMissing { field: "topic_id" })?;
        let namespaces = self.namespaces()?;
        let resolver = self.resolver_on(&namespaces);
        let dest_parsed = resolver.parse(virtual_wiki, destination);
        let old_namespace = topic.namespace_id;
        let old_page = topic.page_name.clone();
        let old_display = resolver.build_topic_name(virtual_wiki, old_namespace, &old_page);
        let dest_display =
            resolver.build_topic_name(virtual_wiki, dest_parsed.namespace_id, &dest_parsed.page_name);

        let mut txn = self.backing.transaction()?;
        // the precondition needs a lookup, so it runs inside the
        // transaction; shared fallback stays on so a shared-tenant name
        // blocks the move just as it blocks can_move_topic
        let existing = self.lookup_parsed(
            txn.reader(),
            false,
            &resolver,
            virtual_wiki,
            &dest_parsed,
            true,
            true,
        )?;
        if !Self::move_allowed(&resolver, topic, existing.as_ref()) {
            return Err(ValidationError::MoveDestinationExists {
                destination: dest_display,
            }
            .into());
        }
        // clear an active back-redirect out of the way; no audit version,
        // the move itself is the audited action
        let mut recycled: Option<Topic> = None;
        if let Some(mut dest) = existing {
            if !dest.is_deleted() {
                self.delete_topic_tx(txn.as_mut(), &resolver, &mut dest, None)?;
            }
            recycled = Some(dest);
        }

        // rename the source in place, keeping its associations
        let move_params = changelog::encode_params(&[&old_display, &dest_display])?;
        let kept_categories: Vec<(String, Option<String>)> = txn
            .reader()
            .topic_categories(topic_id)?
            .into_iter()
            .map(|c| (c.name, c.sort_key))
            .collect();
        let kept_links: Vec<(NamespaceId, String)> = txn
            .reader()
            .topic_links(topic_id)?
            .into_iter()
            .map(|l| (l.target_namespace_id, l.target_page_name))
            .collect();
        topic.namespace_id = dest_parsed.namespace_id;
        topic.page_name = dest_parsed.page_name.clone();
        version.edit_type = EditType::Move;
        version.recent_change_allowed = false;
        version.version_params = Some(move_params.clone());
        self.write_topic_tx(
            txn.as_mut(),
            &resolver,
            topic,
            Some(&mut version),
            &kept_categories,
            &kept_links,
        )?;

        // resurrect the displaced destination under the old name, or
        // fabricate a new topic there, and turn it into a redirect
        let mut redirect = match recycled {
            Some(mut recycled) => {
                recycled.namespace_id = old_namespace;
                recycled.page_name = old_page;
                recycled.delete_date = None;
                recycled
            }
            None => Topic::new(topic.virtual_wiki_id, virtual_wiki, old_namespace, old_page),
        };
        redirect.topic_type = TopicType::Redirect;
        redirect.redirect_to = Some(dest_display.clone());
        let marker = redirect_marker(&dest_display);
        let mut redirect_version = TopicVersion::new(
            version.author_id,
            version.author_display.clone(),
            version.edit_comment.clone(),
            marker.clone(),
            marker.chars().count() as i32,
        );
        redirect_version.edit_type = EditType::Move;
        redirect_version.recent_change_allowed = true;
        redirect_version.version_params = Some(move_params);
        self.write_topic_tx(
            txn.as_mut(),
            &resolver,
            &mut redirect,
            Some(&mut redirect_version),
            &[],
            &[],
        )?;
        txn.commit()?;

        let mut old_view = topic.clone();
        old_view.namespace_id = old_namespace;
        old_view.page_name = redirect.page_name.clone();
        self.refresh_topic_caches(topic, Some(&old_view))?;
        self.refresh_topic_caches(&redirect, None)?;
        self.cache_version(&version);
        self.cache_version(&redirect_version);
        self.notify_indexed(topic);
        self.notify_indexed(&redirect);
        Ok(())
    }

    /// Permanently delete one version row, splicing the chain around it.
    /// The sole version of a topic can never be purged.
    pub fn purge_topic_version(
        &self,
        topic_version_id: TopicVersionId,
        author_id: Option<UserId>,
        author_display: &str,
    ) -> FolioResult<()> {
        // preconditions run against committed state, before the transaction
        let version = self
            .backing
            .lookup_topic_version(topic_version_id)?
            .ok_or(ValidationError::PurgeUnknownVersion { topic_version_id })?;
        let next_id = self.backing.next_topic_version_id(topic_version_id)?;
        let topic_id = version.topic_id.ok_or_else(|| StorageError::IntegrityViolation {
            reason: format!("version {} has no owning topic", topic_version_id),
        })?;
        if version.previous_topic_version_id.is_none() && next_id.is_none() {
            return Err(ValidationError::PurgeSoleVersion {
                topic_id,
                topic_version_id,
            }
            .into());
        }
        let replacement = match version.previous_topic_version_id {
            Some(previous) => previous,
            None => next_id.ok_or_else(|| StorageError::IntegrityViolation {
                reason: format!("version {} has no replacement", topic_version_id),
            })?,
        };
        let namespaces = self.namespaces()?;
        let resolver = self.resolver_on(&namespaces);

        let mut txn = self.backing.transaction()?;
        let mut topic = txn
            .reader()
            .lookup_topic_by_id(topic_id)?
            .ok_or_else(|| StorageError::IntegrityViolation {
                reason: format!("version {} references missing topic {}", topic_version_id, topic_id),
            })?;
        if topic.current_version_id == Some(topic_version_id) {
            let replacement_version = txn
                .reader()
                .lookup_topic_version(replacement)?
                .ok_or_else(|| StorageError::IntegrityViolation {
                    reason: format!("replacement version {} missing", replacement),
                })?;
            topic.current_version_id = Some(replacement);
            // a deleted topic keeps empty denormalized content
            topic.topic_content = if topic.is_deleted() {
                String::new()
            } else {
                replacement_version.version_content.clone()
            };
            validate_topic(&topic)?;
            txn.update_topic(&topic)?;
        }
        if let Some(next_version_id) = next_id {
            if let Some(mut next_version) = txn.reader().lookup_topic_version(next_version_id)? {
                next_version.previous_topic_version_id = version.previous_topic_version_id;
                txn.update_topic_version(&next_version)?;
            }
        }
        txn.delete_log_items_by_version(topic_version_id)?;
        txn.delete_recent_changes_by_version(topic_version_id)?;
        txn.update_recent_changes_previous(topic_version_id, version.previous_topic_version_id)?;
        txn.delete_topic_version(topic_version_id)?;
        let log_item = changelog::purge_log_item(&topic, topic_version_id, author_id, author_display)?;
        validate_log_item(&log_item)?;
        txn.insert_log_item(&log_item)?;
        let topic_name =
            resolver.build_topic_name(&topic.virtual_wiki, topic.namespace_id, &topic.page_name);
        let change = changelog::recent_change_from_log_item(&log_item, &topic.virtual_wiki, Some(topic_name));
        validate_recent_change(&change)?;
        txn.insert_recent_change(&change)?;
        txn.commit()?;

        self.caches.topic_versions.remove(&topic_version_id);
        if let Some(next_version_id) = next_id {
            self.caches.topic_versions.remove(&next_version_id);
        }
        self.refresh_topic_caches(&topic, None)?;
        Ok(())
    }

    /// Rewrite a topic's chain to match an explicit chronological ordering
    /// of its version ids, then resynchronize the topic's current-version
    /// pointer and denormalized content with the last id. Import correction
    /// only, never normal editing.
    pub fn order_topic_versions(
        &self,
        topic: &mut Topic,
        version_ids: &[TopicVersionId],
    ) -> FolioResult<()> {
        if version_ids.is_empty() {
            return Err(ValidationError::InvalidValue {
                field: "version_ids",
                reason: "ordering requires at least one version id".to_string(),
            }
            .into());
        }
        let topic_id = topic
            .topic_id
            .ok_or(ValidationError::RequiredFieldMissing { field: "topic_id" })?;
        let mut txn = self.backing.transaction()?;
        let mut previous: Option<TopicVersionId> = None;
        let mut last_content = String::new();
        for &version_id in version_ids {
            let mut version = txn
                .reader()
                .lookup_topic_version(version_id)?
                .ok_or_else(|| ValidationError::InvalidValue {
                    field: "version_ids",
                    reason: format!("version {} does not exist", version_id),
                })?;
            if version.topic_id != Some(topic_id) {
                return Err(ValidationError::InvalidValue {
                    field: "version_ids",
                    reason: format!(
                        "version {} does not belong to topic {}",
                        version_id, topic_id
                    ),
                }
                .into());
            }
            if version.previous_topic_version_id != previous {
                version.previous_topic_version_id = previous;
                txn.update_topic_version(&version)?;
            }
            last_content = version.version_content.clone();
            previous = Some(version_id);
        }
        topic.current_version_id = previous;
        topic.topic_content = if topic.is_deleted() {
            String::new()
        } else {
            last_content
        };
        validate_topic(topic)?;
        txn.update_topic(topic)?;
        txn.commit()?;
        for version_id in version_ids {
            self.caches.topic_versions.remove(version_id);
        }
        self.refresh_topic_caches(topic, None)?;
        Ok(())
    }

    /// Append a batch of versions to an existing topic in one transaction,
    /// chaining them in order and moving the topic's pointer once at the
    /// end. Import path: no log items or recent changes are emitted.
    pub fn write_topic_versions(
        &self,
        topic: &mut Topic,
        versions: &mut [TopicVersion],
    ) -> FolioResult<()> {
        if versions.is_empty() {
            return Ok(());
        }
        let topic_id = topic
            .topic_id
            .ok_or(ValidationError::RequiredFieldMissing { field: "topic_id" })?;
        let mut txn = self.backing.transaction()?;
        let mut previous = topic.current_version_id;
        for version in versions.iter_mut() {
            version.topic_id = Some(topic_id);
            if version.previous_topic_version_id.is_none() {
                version.previous_topic_version_id = previous;
            }
            if version.topic_version_id.is_none() {
                version.topic_version_id = Some(txn.next_id(Sequence::TopicVersion)?);
            }
            validate_topic_version(version)?;
            txn.insert_topic_version(version)?;
            previous = version.topic_version_id;
        }
        topic.current_version_id = previous;
        if let Some(last) = versions.last() {
            topic.topic_content = if topic.is_deleted() {
                String::new()
            } else {
                last.version_content.clone()
            };
        }
        validate_topic(topic)?;
        txn.update_topic(topic)?;
        txn.commit()?;
        for version in versions.iter() {
            self.cache_version(version);
        }
        self.refresh_topic_caches(topic, None)?;
        self.notify_indexed(topic);
        Ok(())
    }

    // ========================================================================
    // TENANT AND NAMESPACE WRITES
    // ========================================================================

    pub fn write_virtual_wiki(&self, virtual_wiki: &mut VirtualWiki) -> FolioResult<()> {
        validate_virtual_wiki(virtual_wiki)?;
        let mut txn = self.backing.transaction()?;
        if virtual_wiki.virtual_wiki_id.is_none() {
            virtual_wiki.virtual_wiki_id = Some(txn.next_id(Sequence::VirtualWiki)?);
            txn.insert_virtual_wiki(virtual_wiki)?;
        } else {
            txn.update_virtual_wiki(virtual_wiki)?;
        }
        txn.commit()?;
        self.caches
            .virtual_wikis
            .put(virtual_wiki.name.clone(), Some(virtual_wiki.clone()));
        Ok(())
    }

    /// Insert or update one namespace (upsert keyed by id).
    pub fn write_namespace(&self, namespace: &Namespace) -> FolioResult<()> {
        validate_namespace(namespace)?;
        let mut txn = self.backing.transaction()?;
        txn.save_namespace(namespace)?;
        txn.commit()?;
        self.caches.namespace_list.clear();
        Ok(())
    }

    /// Create a tenant-defined namespace, allocating its id above the
    /// reserved range.
    pub fn create_custom_namespace(
        &self,
        default_label: &str,
        main_namespace_id: Option<NamespaceId>,
    ) -> FolioResult<Namespace> {
        let mut namespace = Namespace::new(0, default_label);
        namespace.main_namespace_id = main_namespace_id;
        let mut txn = self.backing.transaction()?;
        namespace.id = txn.next_id(Sequence::Namespace)?;
        validate_namespace(&namespace)?;
        txn.save_namespace(&namespace)?;
        txn.commit()?;
        self.caches.namespace_list.clear();
        Ok(namespace)
    }

    // ========================================================================
    // TRANSACTION BODIES
    // ========================================================================

    fn write_topic_tx(
        &self,
        txn: &mut dyn StoreTransaction,
        resolver: &NameResolver<'_>,
        topic: &mut Topic,
        mut version: Option<&mut TopicVersion>,
        categories: &[(String, Option<String>)],
        links: &[(NamespaceId, String)],
    ) -> FolioResult<()> {
        if topic.namespace_id == namespace_id::SPECIAL || topic.namespace_id == namespace_id::MEDIA
        {
            return Err(ValidationError::InvalidValue {
                field: "namespace_id",
                reason: "not a storage namespace".to_string(),
            }
            .into());
        }
        validate_topic(topic)?;
        let is_new = topic.topic_id.is_none();
        if is_new {
            topic.topic_id = Some(txn.next_id(Sequence::Topic)?);
            txn.insert_topic(topic)?;
        }
        let topic_id = topic.topic_id.ok_or_else(|| StorageError::IntegrityViolation {
            reason: "topic id missing after insert".to_string(),
        })?;

        match version.as_deref_mut() {
            None => {
                if !is_new {
                    txn.update_topic(topic)?;
                }
            }
            Some(version) => {
                version.topic_id = Some(topic_id);
                if version.previous_topic_version_id.is_none() {
                    version.previous_topic_version_id = topic.current_version_id;
                }
                if version.topic_version_id.is_none() {
                    version.topic_version_id = Some(txn.next_id(Sequence::TopicVersion)?);
                }
                validate_topic_version(version)?;
                // the version row must exist before the topic points at it
                txn.insert_topic_version(version)?;
                topic.current_version_id = version.topic_version_id;
                topic.topic_content = version.version_content.clone();
                validate_topic(topic)?;
                txn.update_topic(topic)?;
            }
        }

        // associations are fully replaced, and dropped while deleted
        txn.delete_topic_categories(topic_id)?;
        txn.delete_topic_links(topic_id)?;
        if !topic.is_deleted() {
            if !categories.is_empty() {
                let rows: Vec<Category> = categories
                    .iter()
                    .map(|(name, sort_key)| Category {
                        virtual_wiki_id: topic.virtual_wiki_id,
                        child_topic_id: topic_id,
                        name: name.clone(),
                        sort_key: sort_key.clone(),
                    })
                    .collect();
                for row in &rows {
                    validate_category(row)?;
                }
                txn.insert_categories(&rows)?;
            }
            if !links.is_empty() {
                let rows: Vec<TopicLink> = links
                    .iter()
                    .map(|(namespace, page)| TopicLink {
                        topic_id,
                        target_namespace_id: *namespace,
                        target_page_name: page.clone(),
                    })
                    .collect();
                txn.insert_topic_links(&rows)?;
            }
        }

        if let Some(version) = version.as_deref() {
            let log_item = changelog::edit_log_item(topic, version, version.version_params.clone());
            validate_log_item(&log_item)?;
            txn.insert_log_item(&log_item)?;
            if version.recent_change_allowed {
                let topic_name = resolver.build_topic_name(
                    &topic.virtual_wiki,
                    topic.namespace_id,
                    &topic.page_name,
                );
                let change = changelog::edit_recent_change(topic, version, topic_name);
                validate_recent_change(&change)?;
                txn.insert_recent_change(&change)?;
            }
        }
        Ok(())
    }

    fn delete_topic_tx(
        &self,
        txn: &mut dyn StoreTransaction,
        resolver: &NameResolver<'_>,
        topic: &mut Topic,
        mut version: Option<&mut TopicVersion>,
    ) -> FolioResult<()> {
        if let (Some(topic_id), Some(_)) = (topic.topic_id, version.as_deref()) {
            // history stays; only the live projection is removed
            txn.delete_recent_changes(topic_id)?;
        }
        topic.delete_date = Some(Utc::now());
        topic.topic_content = String::new();
        if let Some(version) = version.as_deref_mut() {
            version.edit_type = EditType::Delete;
            version.version_content = String::new();
        }
        self.write_topic_tx(txn, resolver, topic, version, &[], &[])
    }

    fn undelete_topic_tx(
        &self,
        txn: &mut dyn StoreTransaction,
        resolver: &NameResolver<'_>,
        topic: &mut Topic,
        version: &mut TopicVersion,
    ) -> FolioResult<()> {
        topic.delete_date = None;
        version.edit_type = EditType::Undelete;
        self.write_topic_tx(txn, resolver, topic, Some(version), &[], &[])
    }

    // ========================================================================
    // POST-COMMIT EFFECTS
    // ========================================================================

    /// Refresh the name and id caches for one topic after a committed
    /// write. Sweeps every case variant of the topic's key (and its
    /// shared-tenant alternate), plus the old name's keys after a rename,
    /// then repopulates from the written state.
    fn refresh_topic_caches(&self, topic: &Topic, previous: Option<&Topic>) -> FolioResult<()> {
        let namespaces = self.namespaces()?;
        let resolver = self.resolver_on(&namespaces);
        let key = resolver.cache_key(&topic.virtual_wiki, topic.namespace_id, &topic.page_name);
        let alt_key = resolver
            .shared_tenant(&topic.virtual_wiki, topic.namespace_id)
            .map(|shared| resolver.cache_key(shared, topic.namespace_id, &topic.page_name));
        self.caches.invalidate_topic_name(&key, alt_key.as_deref());
        if let Some(previous) = previous {
            if previous.namespace_id != topic.namespace_id
                || previous.page_name != topic.page_name
            {
                let old_key = resolver.cache_key(
                    &previous.virtual_wiki,
                    previous.namespace_id,
                    &previous.page_name,
                );
                let old_alt = resolver
                    .shared_tenant(&previous.virtual_wiki, previous.namespace_id)
                    .map(|shared| {
                        resolver.cache_key(shared, previous.namespace_id, &previous.page_name)
                    });
                self.caches.invalidate_topic_name(&old_key, old_alt.as_deref());
            }
        }
        self.cache_found_topic(&key, topic, &resolver);
        Ok(())
    }

    fn cache_version(&self, version: &TopicVersion) {
        if let Some(id) = version.topic_version_id {
            self.caches.topic_versions.put(id, Some(version.clone()));
        }
    }

    fn notify_indexed(&self, topic: &Topic) {
        if let Err(error) = self.indexer.index_topic(topic) {
            warn!(topic = %topic.page_name, %error, "search index update failed");
        }
    }

    fn notify_removed(&self, topic: &Topic) {
        if let Err(error) = self.indexer.remove_topic(topic) {
            warn!(topic = %topic.page_name, %error, "search index removal failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redirect_marker_format() {
        assert_eq!(redirect_marker("Test2"), "#REDIRECT [[Test2]]");
        assert_eq!(
            redirect_marker("File:Example.png"),
            "#REDIRECT [[File:Example.png]]"
        );
    }

    #[test]
    fn test_move_allowed_rules() {
        let namespaces = vec![Namespace::new(namespace_id::MAIN, "")];
        let config = FolioConfig::default();
        let resolver = NameResolver::new(&namespaces, &config);
        let source = Topic::new(1, "en", namespace_id::MAIN, "Test");

        // no destination
        assert!(VersionedContentStore::move_allowed(&resolver, &source, None));

        // soft-deleted destination
        let mut deleted = Topic::new(1, "en", namespace_id::MAIN, "Test2");
        deleted.delete_date = Some(Utc::now());
        assert!(VersionedContentStore::move_allowed(
            &resolver,
            &source,
            Some(&deleted)
        ));

        // back-redirect destination
        let mut back_redirect = Topic::new(1, "en", namespace_id::MAIN, "Test2");
        back_redirect.redirect_to = Some("Test".to_string());
        assert!(VersionedContentStore::move_allowed(
            &resolver,
            &source,
            Some(&back_redirect)
        ));

        // anything else blocks
        let other = Topic::new(1, "en", namespace_id::MAIN, "Test2");
        assert!(!VersionedContentStore::move_allowed(
            &resolver,
            &source,
            Some(&other)
        ));

        // a destination on another tenant blocks even when deleted
        let mut shared = Topic::new(2, "shared", namespace_id::MAIN, "Test2");
        shared.delete_date = Some(Utc::now());
        assert!(!VersionedContentStore::move_allowed(
            &resolver,
            &source,
            Some(&shared)
        ));
    }
}

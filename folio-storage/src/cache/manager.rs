//! The set of named caches the content store runs against.

use folio_core::{FolioConfig, Namespace, Topic, TopicId, TopicVersion, TopicVersionId, VirtualWiki};

use super::lookup::{CacheStats, LookupCache};

/// Key under which the full namespace list is cached.
pub const NAMESPACE_LIST_KEY: &str = "all";

/// Owns every lookup cache in one store instance.
///
/// Constructed once and injected into the store; there are no static
/// singletons, so independent store instances (and tests) get independent
/// caches. `clear_all` is the lifecycle reset used on shutdown or when the
/// backing data changes out from under the store (bulk imports).
#[derive(Debug)]
pub struct CacheManager {
    /// (tenant, namespace, page name) key -> topic id, or cached-absent.
    pub topic_ids_by_name: LookupCache<String, TopicId>,
    /// Same key -> display name. Excludes deleted topics.
    pub topic_names_by_name: LookupCache<String, String>,
    /// Topic id -> full topic record (deleted topics included).
    pub topics_by_id: LookupCache<TopicId, Topic>,
    /// Version id -> version record.
    pub topic_versions: LookupCache<TopicVersionId, TopicVersion>,
    /// Tenant name -> virtual wiki record, or cached-absent.
    pub virtual_wikis: LookupCache<String, VirtualWiki>,
    /// The full namespace list, cached under [`NAMESPACE_LIST_KEY`].
    pub namespace_list: LookupCache<String, Vec<Namespace>>,
}

impl CacheManager {
    pub fn new(config: &FolioConfig) -> Self {
        let capacity = config.cache_max_entries;
        CacheManager {
            topic_ids_by_name: LookupCache::new("topic-ids-by-name", capacity),
            topic_names_by_name: LookupCache::new("topic-names-by-name", capacity),
            topics_by_id: LookupCache::new("topics-by-id", capacity),
            topic_versions: LookupCache::new("topic-versions", capacity),
            virtual_wikis: LookupCache::new("virtual-wikis", capacity),
            namespace_list: LookupCache::new("namespace-list", 2),
        }
    }

    /// Drop every cached entry in every cache.
    pub fn clear_all(&self) {
        self.topic_ids_by_name.clear();
        self.topic_names_by_name.clear();
        self.topics_by_id.clear();
        self.topic_versions.clear();
        self.virtual_wikis.clear();
        self.namespace_list.clear();
    }

    /// Invalidate every case-insensitive variant of a topic name key, and
    /// of its alternate (shared-tenant) key when that differs by more than
    /// case. When the two keys differ only by case the first sweep already
    /// covered the second - skipping the redundant pass is a performance
    /// matter only, invalidation is idempotent.
    pub fn invalidate_topic_name(&self, key: &str, alt_key: Option<&str>) {
        self.topic_ids_by_name.remove_case_insensitive(key);
        self.topic_names_by_name.remove_case_insensitive(key);
        if let Some(alt) = alt_key {
            if !alt.eq_ignore_ascii_case(key) {
                self.topic_ids_by_name.remove_case_insensitive(alt);
                self.topic_names_by_name.remove_case_insensitive(alt);
            }
        }
    }

    /// Usage statistics for every cache, for observability surfaces.
    pub fn stats(&self) -> Vec<(&'static str, CacheStats)> {
        vec![
            (self.topic_ids_by_name.name(), self.topic_ids_by_name.stats()),
            (self.topic_names_by_name.name(), self.topic_names_by_name.stats()),
            (self.topics_by_id.name(), self.topics_by_id.stats()),
            (self.topic_versions.name(), self.topic_versions.stats()),
            (self.virtual_wikis.name(), self.virtual_wikis.stats()),
            (self.namespace_list.name(), self.namespace_list.stats()),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CacheResult;

    #[test]
    fn test_invalidate_sweeps_primary_and_alternate() {
        let manager = CacheManager::new(&FolioConfig::default());
        manager.topic_ids_by_name.put("en/File:X.png".to_string(), Some(4));
        manager.topic_ids_by_name.put("shared/File:X.png".to_string(), Some(4));
        manager.invalidate_topic_name("en/File:X.png", Some("shared/File:X.png"));
        assert_eq!(
            manager.topic_ids_by_name.get(&"en/File:X.png".to_string()),
            CacheResult::Miss
        );
        assert_eq!(
            manager.topic_ids_by_name.get(&"shared/File:X.png".to_string()),
            CacheResult::Miss
        );
    }

    #[test]
    fn test_invalidate_skips_case_only_alternate() {
        let manager = CacheManager::new(&FolioConfig::default());
        manager.topic_ids_by_name.put("en/test".to_string(), Some(9));
        // alternate differs only by case: one sweep must cover both
        manager.invalidate_topic_name("en/Test", Some("en/test"));
        assert_eq!(
            manager.topic_ids_by_name.get(&"en/test".to_string()),
            CacheResult::Miss
        );
    }

    #[test]
    fn test_clear_all_resets_every_cache() {
        let manager = CacheManager::new(&FolioConfig::default());
        manager.topic_ids_by_name.put("k".to_string(), Some(1));
        manager.topics_by_id.put(1, None);
        manager.clear_all();
        assert_eq!(manager.topic_ids_by_name.get(&"k".to_string()), CacheResult::Miss);
        assert_eq!(manager.topics_by_id.get(&1), CacheResult::Miss);
    }
}

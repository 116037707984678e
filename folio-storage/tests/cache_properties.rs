//! Property tests for the bounded lookup cache.

use proptest::prelude::*;

use folio_storage::{CacheResult, LookupCache};

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn last_put_wins(
        writes in prop::collection::vec(("[a-c]", prop::option::of(0i32..100)), 1..40),
    ) {
        let cache: LookupCache<String, i32> = LookupCache::new("props", 16);
        for (key, value) in &writes {
            cache.put(key.clone(), *value);
        }
        // for each key, the cache answer is the most recent write
        for key in ["a", "b", "c"] {
            let expected = writes.iter().rev().find(|(k, _)| k == key).map(|(_, v)| *v);
            match expected {
                Some(value) => prop_assert_eq!(cache.get(&key.to_string()), CacheResult::Hit(value)),
                None => prop_assert_eq!(cache.get(&key.to_string()), CacheResult::Miss),
            }
        }
    }

    #[test]
    fn capacity_is_never_exceeded(
        capacity in 1usize..16,
        keys in prop::collection::vec("[a-z]{1,4}", 1..100),
    ) {
        let cache: LookupCache<String, i32> = LookupCache::new("props", capacity);
        for (i, key) in keys.iter().enumerate() {
            cache.put(key.clone(), Some(i as i32));
        }
        prop_assert!(cache.stats().entries <= capacity);
    }

    #[test]
    fn case_insensitive_removal_leaves_no_variant(
        variants in prop::collection::vec(prop::bool::ANY, 1..8),
        other in "[0-9]{1,4}",
    ) {
        let cache: LookupCache<String, i32> = LookupCache::new("props", 64);
        // cache the same logical key under several case variants
        for (i, upper) in variants.iter().enumerate() {
            let key = if *upper { format!("en/TEST{}", i % 2) } else { format!("en/test{}", i % 2) };
            cache.put(key, Some(i as i32));
        }
        cache.put(format!("en/{}", other), Some(-1));
        cache.remove_case_insensitive("en/Test0");
        cache.remove_case_insensitive("en/Test1");
        prop_assert_eq!(cache.get(&"en/TEST0".to_string()), CacheResult::Miss);
        prop_assert_eq!(cache.get(&"en/test0".to_string()), CacheResult::Miss);
        prop_assert_eq!(cache.get(&"en/TEST1".to_string()), CacheResult::Miss);
        prop_assert_eq!(cache.get(&"en/test1".to_string()), CacheResult::Miss);
        // unrelated keys survive the sweep
        prop_assert_eq!(cache.get(&format!("en/{}", other)), CacheResult::Hit(Some(-1)));
    }
}

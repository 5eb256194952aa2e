//! Property-Based Tests for Cache Module
//!
//! Uses proptest to check the LRU and TTL cache invariants over arbitrary
//! operation sequences.

use proptest::prelude::*;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::cache::{
    AdvancedCache, Backend, CacheOptions, Clock, LruCache, ManualClock, SessionStorage, StorageArea,
};

// == Test Configuration ==
const TEST_MAX_SIZE: usize = 8;
const TEST_TTL_MS: u64 = 1000;

// == Strategies ==
/// Small key space so operations collide often
fn key_strategy() -> impl Strategy<Value = String> {
    "[a-j]{1,2}".prop_map(|s| s)
}

#[derive(Debug, Clone)]
enum CacheOp {
    Set { key: String, value: u32 },
    Get { key: String },
    Has { key: String },
    Delete { key: String },
    Advance { ms: u64 },
}

fn cache_op_strategy() -> impl Strategy<Value = CacheOp> {
    prop_oneof![
        (key_strategy(), any::<u32>()).prop_map(|(key, value)| CacheOp::Set { key, value }),
        key_strategy().prop_map(|key| CacheOp::Get { key }),
        key_strategy().prop_map(|key| CacheOp::Has { key }),
        key_strategy().prop_map(|key| CacheOp::Delete { key }),
        (0u64..600).prop_map(|ms| CacheOp::Advance { ms }),
    ]
}

#[derive(Debug)]
struct ModelEntry {
    value: u32,
    stored_at: u64,
    last_accessed: u64,
    seq: u64,
}

/// Applies a read to the model: expired entries drop out, hits refresh
/// `last_accessed`.
fn model_read(model: &mut HashMap<String, ModelEntry>, key: &str, now: u64) -> Option<u32> {
    if matches!(model.get(key), Some(e) if now - e.stored_at > TEST_TTL_MS) {
        model.remove(key);
    }
    let entry = model.get_mut(key)?;
    entry.last_accessed = now;
    Some(entry.value)
}

fn memory_cache(clock: &ManualClock) -> AdvancedCache<u32> {
    AdvancedCache::new(
        CacheOptions::new()
            .ttl(Duration::from_millis(TEST_TTL_MS))
            .max_size(TEST_MAX_SIZE)
            .clock(Arc::new(clock.clone())),
    )
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    // Capacity: size never exceeds max_size, and N+1 distinct inserts
    // without reads drop exactly the first key.
    #[test]
    fn prop_lru_capacity(keys in prop::collection::hash_set(key_strategy(), 2..40)) {
        let keys: Vec<String> = keys.into_iter().collect();
        let max_size = keys.len() - 1;
        let mut lru = LruCache::new(max_size);

        for (i, key) in keys.iter().enumerate() {
            lru.set(key.clone(), i);
            prop_assert!(lru.len() <= max_size);
        }

        prop_assert_eq!(lru.len(), max_size);
        prop_assert!(!lru.has(&keys[0]));
        prop_assert!(keys[1..].iter().all(|k| lru.has(k)));
    }

    // LruCache matches a reference model that tracks recency as a list.
    #[test]
    fn prop_lru_matches_model(
        ops in prop::collection::vec((key_strategy(), any::<bool>()), 1..100)
    ) {
        let mut lru = LruCache::new(4);
        let mut model: Vec<String> = Vec::new();

        for (key, is_set) in ops {
            if is_set {
                model.retain(|k| k != &key);
                if model.len() >= 4 {
                    model.remove(0);
                }
                model.push(key.clone());
                lru.set(key, ());
            } else if lru.get(&key).is_some() {
                model.retain(|k| k != &key);
                model.push(key);
            } else {
                prop_assert!(!model.contains(&key));
            }
        }

        let present: HashSet<&String> = model.iter().collect();
        prop_assert_eq!(lru.len(), present.len());
        prop_assert_eq!(lru.peek_lru(), model.first());
    }

    // The memory backend agrees with a model that applies TTL expiry and
    // evicts the minimum (last_accessed, first insertion) entry, and never
    // holds more than max_size entries.
    #[test]
    fn prop_advanced_cache_matches_model(
        ops in prop::collection::vec(cache_op_strategy(), 1..80)
    ) {
        let clock = ManualClock::new(0);
        let mut cache = memory_cache(&clock);
        let mut model: HashMap<String, ModelEntry> = HashMap::new();
        let mut next_seq = 0u64;

        for op in ops {
            let now = clock.now_ms();
            match op {
                CacheOp::Set { key, value } => {
                    if let Some(entry) = model.get_mut(&key) {
                        entry.value = value;
                        entry.stored_at = now;
                        entry.last_accessed = now;
                        cache.set(&key, value);
                    } else {
                        let victim = if model.len() >= TEST_MAX_SIZE {
                            model
                                .iter()
                                .min_by_key(|(_, e)| (e.last_accessed, e.seq))
                                .map(|(k, _)| k.clone())
                        } else {
                            None
                        };
                        if let Some(victim) = &victim {
                            model.remove(victim);
                        }
                        let entry = ModelEntry {
                            value,
                            stored_at: now,
                            last_accessed: now,
                            seq: next_seq,
                        };
                        model.insert(key.clone(), entry);
                        next_seq += 1;

                        cache.set(&key, value);
                        if let Some(victim) = victim {
                            prop_assert!(!cache.keys().contains(&victim));
                        }
                    }
                }
                CacheOp::Get { key } => {
                    let expected = model_read(&mut model, &key, now);
                    prop_assert_eq!(cache.get(&key), expected);
                }
                CacheOp::Has { key } => {
                    let expected = model_read(&mut model, &key, now);
                    prop_assert_eq!(cache.has(&key), expected.is_some());
                }
                CacheOp::Delete { key } => {
                    prop_assert_eq!(cache.delete(&key), model.remove(&key).is_some());
                }
                CacheOp::Advance { ms } => clock.advance(Duration::from_millis(ms)),
            }
            prop_assert!(cache.len() <= TEST_MAX_SIZE);
            let mut keys = cache.keys();
            keys.sort();
            let mut expected_keys: Vec<String> = model.keys().cloned().collect();
            expected_keys.sort();
            prop_assert_eq!(keys, expected_keys);
        }
    }

    // TTL: a value is readable at t0 + d iff d <= ttl, and on_expire fires
    // exactly once when it is not.
    #[test]
    fn prop_ttl_boundary(elapsed in 0u64..2000, value in any::<u32>()) {
        let clock = ManualClock::new(1_000_000);
        let fired = Arc::new(AtomicU32::new(0));
        let counter = fired.clone();
        let mut cache = AdvancedCache::new(
            CacheOptions::new()
                .ttl(Duration::from_millis(TEST_TTL_MS))
                .clock(Arc::new(clock.clone()))
                .on_expire(move |_: &str, _: &u32| {
                    counter.fetch_add(1, Ordering::SeqCst);
                }),
        );

        cache.set("k", value);
        clock.advance(Duration::from_millis(elapsed));
        let first = cache.get("k");
        let second = cache.get("k");

        if elapsed <= TEST_TTL_MS {
            prop_assert_eq!(first, Some(value));
            prop_assert_eq!(second, Some(value));
            prop_assert_eq!(fired.load(Ordering::SeqCst), 0);
        } else {
            prop_assert_eq!(first, None);
            prop_assert_eq!(second, None);
            prop_assert_eq!(fired.load(Ordering::SeqCst), 1);
        }
    }

    // Two prefixes in one storage area never see or clear each other.
    #[test]
    fn prop_storage_isolation(
        entries in prop::collection::vec((key_strategy(), any::<u32>(), any::<bool>()), 1..30)
    ) {
        let clock = ManualClock::new(0);
        let area = SessionStorage::new();
        let build = |prefix: &str| {
            AdvancedCache::new(
                CacheOptions::<u32>::new()
                    .backend(Backend::Local(Arc::new(area.clone())))
                    .key_prefix(prefix)
                    .clock(Arc::new(clock.clone())),
            )
        };
        let mut left = build("left_");
        let mut right = build("right_");
        let mut right_model = HashMap::new();

        for (key, value, to_left) in entries {
            if to_left {
                left.set(&key, value);
            } else {
                right.set(&key, value);
                right_model.insert(key, value);
            }
        }
        left.clear();

        prop_assert!(left.is_empty());
        prop_assert_eq!(right.len(), right_model.len());
        for (key, value) in &right_model {
            prop_assert_eq!(right.get(key), Some(*value));
        }
        prop_assert!(area.keys().unwrap().iter().all(|k| k.starts_with("right_")));
    }
}

//! Property tests for the TTL+LRU cache: the size bound and the recency
//! order are checked against a reference model over arbitrary operation
//! sequences.

use std::sync::Arc;
use std::time::Duration;

use proptest::prelude::*;

use hn_aggregator::cache::{CacheValue, TtlLruCache};
use hn_aggregator::models::Item;

const CAPACITY: usize = 8;
const KEY_SPACE: u8 = 16;

#[derive(Debug, Clone)]
enum Op {
    Set { key: u8, zero_ttl: bool },
    Get { key: u8 },
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0..KEY_SPACE, any::<bool>()).prop_map(|(key, zero_ttl)| Op::Set { key, zero_ttl }),
        (0..KEY_SPACE).prop_map(|key| Op::Get { key }),
    ]
}

fn value(key: u8) -> CacheValue {
    CacheValue::Item(Arc::new(Item {
        id: u64::from(key),
        kind: "story".to_string(),
        ..Item::default()
    }))
}

/// Reference model: a recency list, most-recent first, truncated to
/// capacity. Entries never expire inside a test run (the TTL is minutes),
/// so membership is purely a recency question.
fn touch(model: &mut Vec<u8>, key: u8) {
    model.retain(|k| *k != key);
    model.insert(0, key);
    model.truncate(CAPACITY);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn size_stays_bounded_and_lru_matches_the_model(
        ops in proptest::collection::vec(op_strategy(), 1..200)
    ) {
        let cache = TtlLruCache::new(CAPACITY);
        let mut model: Vec<u8> = Vec::new();

        for op in ops {
            match op {
                Op::Set { key, zero_ttl } => {
                    let ttl = if zero_ttl {
                        Duration::ZERO
                    } else {
                        Duration::from_secs(300)
                    };
                    cache.set(format!("k:{key}"), value(key), ttl);
                    if !zero_ttl {
                        touch(&mut model, key);
                    }
                    prop_assert!(cache.len() <= CAPACITY);
                }
                Op::Get { key } => {
                    let hit = cache.get(&format!("k:{key}"));
                    let expected = model.contains(&key);
                    prop_assert_eq!(
                        hit.is_some(),
                        expected,
                        "key {} presence diverged from the model",
                        key
                    );
                    if expected {
                        touch(&mut model, key);
                    }
                }
            }
        }

        // Every key the model believes live must be retrievable.
        for key in model.clone() {
            let cache_key = format!("k:{}", key);
            prop_assert!(cache.get(&cache_key).is_some());
        }
    }

    #[test]
    fn zero_ttl_writes_are_never_observable(keys in proptest::collection::vec(0..KEY_SPACE, 1..50)) {
        let cache = TtlLruCache::new(CAPACITY);
        for key in &keys {
            cache.set(format!("k:{key}"), value(*key), Duration::ZERO);
        }
        prop_assert!(cache.is_empty());
        for key in keys {
            let cache_key = format!("k:{}", key);
            prop_assert!(cache.get(&cache_key).is_none());
        }
    }
}

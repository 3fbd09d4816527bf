//! Property-Based Tests for Cache Module
//!
//! Uses proptest to check the store-level guarantees across arbitrary inputs.

use proptest::prelude::*;
use std::collections::{BTreeMap, HashSet};

use axum::http::StatusCode;
use axum::response::IntoResponse;
use tempfile::TempDir;

use crate::cache::{
    CacheBackend, Compression, DiskCache, Expiration, MemoryCache, Node, Value, MAX_KEY_LENGTH,
};
use crate::error::CacheError;

// == Strategies ==
/// Generates valid cache keys (non-empty, within length limit)
fn valid_key_strategy() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9_:./-]{1,64}".prop_map(|s| s)
}

fn value_strategy() -> impl Strategy<Value = Value> {
    prop_oneof![
        any::<i64>().prop_map(Value::Int),
        ".{0,128}".prop_map(Value::Text),
        prop::collection::vec(any::<u8>(), 0..256).prop_map(Value::Bytes),
    ]
}

fn compression_strategy() -> impl Strategy<Value = Compression> {
    prop_oneof![Just(Compression::None), Just(Compression::Zlib)]
}

/// Generates a sequence of cache operations for testing
#[derive(Debug, Clone)]
enum CacheOp {
    Set { key: String, value: Value },
    Get { key: String },
    Delete { key: String },
}

fn cache_op_strategy() -> impl Strategy<Value = CacheOp> {
    let key = "[a-e]{1,2}";
    prop_oneof![
        (key, value_strategy()).prop_map(|(key, value)| CacheOp::Set { key, value }),
        key.prop_map(|key| CacheOp::Get { key }),
        key.prop_map(|key| CacheOp::Delete { key }),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    // A value written to disk reads back unchanged under the same compression.
    #[test]
    fn prop_disk_round_trip(
        key in valid_key_strategy(),
        value in value_strategy(),
        compression in compression_strategy(),
    ) {
        let dir = TempDir::new().unwrap();
        let mut cache = DiskCache::new(dir.path()).unwrap();

        prop_assert_eq!(
            cache.set(&key, value.clone(), &Expiration::Never, compression),
            Some(value.clone())
        );
        prop_assert_eq!(cache.get(&key, compression), Some(value));
    }

    // `set` never overwrites a live key; `replace` always does.
    #[test]
    fn prop_set_does_not_overwrite(
        key in valid_key_strategy(),
        first in value_strategy(),
        second in value_strategy(),
    ) {
        let dir = TempDir::new().unwrap();
        let mut cache = DiskCache::new(dir.path()).unwrap();

        cache.set(&key, first.clone(), &Expiration::Never, Compression::None);
        prop_assert!(cache.set(&key, second.clone(), &Expiration::Never, Compression::None).is_none());
        prop_assert_eq!(cache.get(&key, Compression::None), Some(first));

        prop_assert!(cache.replace(&key, second.clone(), &Expiration::Never, Compression::None).is_some());
        prop_assert_eq!(cache.get(&key, Compression::None), Some(second));
    }

    // Batch results are keyed exactly like the input.
    #[test]
    fn prop_batch_results_match_input_keys(
        entries in prop::collection::btree_map(valid_key_strategy(), value_strategy(), 1..8),
        missing in prop::collection::hash_set("[A-Z]{65,70}", 0..4),
    ) {
        let mut cache = MemoryCache::new();
        let stored = cache.set_many(entries.clone(), &Expiration::Never, Compression::None);
        prop_assert_eq!(
            stored.keys().collect::<Vec<_>>(),
            entries.keys().collect::<Vec<_>>()
        );

        let mut keys: Vec<&str> = entries.keys().map(String::as_str).collect();
        keys.extend(missing.iter().map(String::as_str));
        let fetched = cache.get_many(&keys, Compression::None);

        let expected: HashSet<&str> = keys.iter().copied().collect();
        let actual: HashSet<&str> = fetched.keys().map(String::as_str).collect();
        prop_assert_eq!(actual, expected);
        for (key, value) in &entries {
            prop_assert_eq!(fetched.get(key), Some(&Some(value.clone())));
        }
        for key in &missing {
            prop_assert_eq!(fetched.get(key), Some(&None));
        }
    }

    // Hits, writes and failures reflect exactly the operations performed
    // and never decrease.
    #[test]
    fn prop_statistics_accuracy(ops in prop::collection::vec(cache_op_strategy(), 1..50)) {
        let mut cache = MemoryCache::new();
        let mut live: BTreeMap<String, Value> = BTreeMap::new();
        let (mut hits, mut failures, mut sets) = (0u64, 0u64, 0u64);
        let mut previous = cache.stats();

        for op in ops {
            match op {
                CacheOp::Set { key, value } => {
                    if !live.contains_key(&key) {
                        sets += 1;
                        live.insert(key.clone(), value.clone());
                    }
                    cache.set(&key, value, &Expiration::Never, Compression::None);
                }
                CacheOp::Get { key } => {
                    let got = cache.get(&key, Compression::None);
                    prop_assert_eq!(got.as_ref(), live.get(&key));
                    if got.is_some() { hits += 1 } else { failures += 1 }
                }
                CacheOp::Delete { key } => {
                    prop_assert_eq!(cache.delete(&key, 0), live.remove(&key).is_some());
                }
            }

            let current = cache.stats();
            prop_assert!(current.hits >= previous.hits);
            prop_assert!(current.sets >= previous.sets);
            prop_assert!(current.failures >= previous.failures);
            previous = current;
        }

        let stats = cache.stats();
        prop_assert_eq!(stats.hits, hits);
        prop_assert_eq!(stats.failures, failures);
        prop_assert_eq!(stats.sets, sets);
        prop_assert_eq!(stats.connections, 1);
    }

    // Increments accumulate from an absent key.
    #[test]
    fn prop_increment_accumulates(amounts in prop::collection::vec(-1000i64..1000, 1..20)) {
        let mut cache = MemoryCache::new();
        let mut total = 0i64;
        for amount in amounts {
            total += amount;
            prop_assert_eq!(cache.increment("counter", amount, Compression::None), Some(total));
        }
        prop_assert_eq!(cache.get("counter", Compression::None), Some(Value::Int(total)));
    }

    // The node codec preserves label, timestamps and content.
    #[test]
    fn prop_node_codec_preserves_fields(
        label in ".{0,64}",
        value in value_strategy(),
        ttl in prop::option::of(1u64..1_000_000),
    ) {
        let expiration = ttl.map(Expiration::Seconds).unwrap_or(Expiration::Never);
        let node = Node::new(label.clone(), value.clone(), &expiration).unwrap();
        let decoded = Node::from_bytes(&node.to_bytes().unwrap()).unwrap();

        prop_assert_eq!(decoded.label(), label.as_str());
        prop_assert_eq!(decoded.created(), node.created());
        prop_assert_eq!(decoded.expires(), node.expires());
        prop_assert_eq!(decoded.content(), &value);
    }

    // Truncated encodings are rejected rather than misread.
    #[test]
    fn prop_truncated_node_is_corrupt(value in value_strategy(), cut in 1usize..16) {
        let bytes = Node::new("k", value, &Expiration::Never).unwrap().to_bytes().unwrap();
        let end = bytes.len().saturating_sub(cut);
        prop_assert!(matches!(Node::from_bytes(&bytes[..end]), Err(CacheError::Corrupt(_))));
    }

    // Keys beyond the length limit are rejected by request validation.
    #[test]
    fn prop_oversized_keys_rejected(extra in 1usize..64) {
        let key = "k".repeat(MAX_KEY_LENGTH + extra);
        prop_assert!(crate::models::requests::validate_key(&key).is_some());
    }
}

// == Error Mapping ==
#[test]
fn test_error_status_codes() {
    let cases = [
        (CacheError::NotFound("k".into()), StatusCode::NOT_FOUND),
        (CacheError::NotStored("k".into()), StatusCode::CONFLICT),
        (CacheError::InvalidRequest("bad".into()), StatusCode::BAD_REQUEST),
        (CacheError::InvalidExpiration("soon".into()), StatusCode::BAD_REQUEST),
        (CacheError::Corrupt("bits".into()), StatusCode::INTERNAL_SERVER_ERROR),
        (CacheError::Config("dir".into()), StatusCode::INTERNAL_SERVER_ERROR),
        (CacheError::Task("cancelled".into()), StatusCode::INTERNAL_SERVER_ERROR),
    ];

    for (error, status) in cases {
        assert_eq!(error.into_response().status(), status);
    }
}

//! Tests for hash operations
//!
//! These tests verify:
//! - Field set/get/delete and the field count
//! - Multi-field reads and writes
//! - Integer fields
//! - Clearing hashes and cross-type protection

use shardkv::{Config, Engine, ShardError};
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn setup() -> (TempDir, Engine) {
    let temp = TempDir::new().unwrap();
    let engine = Engine::open(Config::builder().data_dir(temp.path()).build()).unwrap();
    (temp, engine)
}

fn strings(items: Vec<Vec<u8>>) -> Vec<String> {
    items.into_iter().map(|i| String::from_utf8(i).unwrap()).collect()
}

// =============================================================================
// Field Tests
// =============================================================================

#[test]
fn test_hset_hget() {
    let (_temp, engine) = setup();

    assert_eq!(engine.hset(b"t:h", b"name", b"alice").unwrap(), 1);
    assert_eq!(engine.hset(b"t:h", b"name", b"bob").unwrap(), 0);
    assert_eq!(engine.hget(b"t:h", b"name").unwrap(), Some(b"bob".to_vec()));
    assert_eq!(engine.hget(b"t:h", b"missing").unwrap(), None);
    assert_eq!(engine.hget(b"t:none", b"name").unwrap(), None);
    assert!(engine.hexists(b"t:h", b"name").unwrap());
    assert_eq!(engine.hlen(b"t:h").unwrap(), 1);
}

#[test]
fn test_hmset_hmget() {
    let (_temp, engine) = setup();

    engine.hmset(b"t:h", &[("a", "1"), ("b", "2"), ("a", "3")]).unwrap();
    assert_eq!(engine.hlen(b"t:h").unwrap(), 2);

    let values = engine.hmget(b"t:h", &["b", "zz", "a"]).unwrap();
    assert_eq!(values, vec![Some(b"2".to_vec()), None, Some(b"3".to_vec())]);
}

#[test]
fn test_hgetall_hkeys_hvals_in_field_order() {
    let (_temp, engine) = setup();
    engine.hmset(b"t:h", &[("c", "3"), ("a", "1"), ("b", "2")]).unwrap();

    let all = engine.hgetall(b"t:h").unwrap();
    assert_eq!(
        all,
        vec![
            (b"a".to_vec(), b"1".to_vec()),
            (b"b".to_vec(), b"2".to_vec()),
            (b"c".to_vec(), b"3".to_vec()),
        ]
    );
    assert_eq!(strings(engine.hkeys(b"t:h").unwrap()), vec!["a", "b", "c"]);
    assert_eq!(strings(engine.hvals(b"t:h").unwrap()), vec!["1", "2", "3"]);
    assert!(engine.hgetall(b"t:none").unwrap().is_empty());
}

#[test]
fn test_fields_of_similar_keys_do_not_mix() {
    let (_temp, engine) = setup();
    engine.hset(b"t:a", b"f", b"1").unwrap();
    engine.hset(b"t:ab", b"f", b"2").unwrap();

    assert_eq!(engine.hgetall(b"t:a").unwrap().len(), 1);
    assert_eq!(engine.hget(b"t:a", b"f").unwrap(), Some(b"1".to_vec()));
}

#[test]
fn test_hdel_removes_hash_when_empty() {
    let (_temp, engine) = setup();
    engine.hmset(b"t:h", &[("a", "1"), ("b", "2")]).unwrap();

    assert_eq!(engine.hdel(b"t:h", &["a", "missing"]).unwrap(), 1);
    assert_eq!(engine.hlen(b"t:h").unwrap(), 1);

    assert_eq!(engine.hdel(b"t:h", &["b"]).unwrap(), 1);
    assert_eq!(engine.hlen(b"t:h").unwrap(), 0);
    assert_eq!(engine.key_type(b"t:h").unwrap(), None);

    // Another type may now use the key
    engine.set(b"t:h", b"v").unwrap();
}

#[test]
fn test_hincr_by() {
    let (_temp, engine) = setup();

    assert_eq!(engine.hincr_by(b"t:h", b"n", 5).unwrap(), 5);
    assert_eq!(engine.hincr_by(b"t:h", b"n", -7).unwrap(), -2);
    assert_eq!(engine.hget(b"t:h", b"n").unwrap(), Some(b"-2".to_vec()));
    assert_eq!(engine.hlen(b"t:h").unwrap(), 1);

    engine.hset(b"t:h", b"s", b"text").unwrap();
    assert!(matches!(engine.hincr_by(b"t:h", b"s", 1), Err(ShardError::InvalidArgument(_))));
}

#[test]
fn test_hclear_and_hmclear() {
    let (_temp, engine) = setup();
    engine.hmset(b"t:a", &[("x", "1"), ("y", "2")]).unwrap();
    engine.hmset(b"t:b", &[("x", "1")]).unwrap();
    engine.hmset(b"t:c", &[("x", "1")]).unwrap();

    assert_eq!(engine.hclear(b"t:a").unwrap(), 2);
    assert_eq!(engine.hclear(b"t:a").unwrap(), 0);
    assert_eq!(engine.hmclear(&["t:b", "t:c", "t:missing"]).unwrap(), 2);
    assert_eq!(engine.get_table_key_count(b"t").unwrap(), 0);
}

#[test]
fn test_hash_rejects_other_types_and_empty_input() {
    let (_temp, engine) = setup();
    engine.set(b"t:s", b"v").unwrap();

    assert!(matches!(engine.hset(b"t:s", b"f", b"v"), Err(ShardError::TypeMismatch)));
    assert!(matches!(engine.hget(b"t:s", b"f"), Err(ShardError::TypeMismatch)));

    let no_fields: [&str; 0] = [];
    assert!(matches!(engine.hdel(b"t:h", &no_fields), Err(ShardError::InvalidArgument(_))));
}

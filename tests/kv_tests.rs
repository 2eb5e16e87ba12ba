//! Tests for string and bit operations, table counters and engine lifecycle
//!
//! These tests verify:
//! - Basic get/set/delete and conditional writes
//! - Byte-range reads and writes (GetRange/SetRange)
//! - Integer and bit operations
//! - Cross-type protection
//! - Table key counters
//! - State surviving reopen and checkpoint

use shardkv::{Config, DataType, Engine, ShardError};
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn setup() -> (TempDir, Engine) {
    let temp = TempDir::new().unwrap();
    let engine = Engine::open(config_for(&temp)).unwrap();
    (temp, engine)
}

fn config_for(temp: &TempDir) -> Config {
    Config::builder().data_dir(temp.path()).build()
}

// =============================================================================
// Basic Operations
// =============================================================================

#[test]
fn test_set_get_delete() {
    let (_temp, engine) = setup();

    assert_eq!(engine.get(b"t:k").unwrap(), None);
    engine.set(b"t:k", b"v1").unwrap();
    assert_eq!(engine.get(b"t:k").unwrap(), Some(b"v1".to_vec()));
    assert!(engine.exists(b"t:k").unwrap());

    engine.set(b"t:k", b"v2").unwrap();
    assert_eq!(engine.get(b"t:k").unwrap(), Some(b"v2".to_vec()));

    assert!(engine.delete(b"t:k").unwrap());
    assert!(!engine.delete(b"t:k").unwrap());
    assert!(!engine.exists(b"t:k").unwrap());
}

#[test]
fn test_empty_value_is_a_value() {
    let (_temp, engine) = setup();

    engine.set(b"t:empty", b"").unwrap();
    assert_eq!(engine.get(b"t:empty").unwrap(), Some(Vec::new()));
    assert_eq!(engine.strlen(b"t:empty").unwrap(), 0);
    assert!(engine.exists(b"t:empty").unwrap());
}

#[test]
fn test_key_without_table_rejected() {
    let (_temp, engine) = setup();

    assert!(matches!(engine.set(b"notable", b"v"), Err(ShardError::InvalidArgument(_))));
    assert!(matches!(engine.get(b"notable"), Err(ShardError::InvalidArgument(_))));
}

#[test]
fn test_set_nx_and_get_set() {
    let (_temp, engine) = setup();

    assert_eq!(engine.set_nx(b"t:k", b"first").unwrap(), 1);
    assert_eq!(engine.set_nx(b"t:k", b"second").unwrap(), 0);
    assert_eq!(engine.get(b"t:k").unwrap(), Some(b"first".to_vec()));

    assert_eq!(engine.get_set(b"t:k", b"third").unwrap(), Some(b"first".to_vec()));
    assert_eq!(engine.get_set(b"t:new", b"x").unwrap(), None);
    assert_eq!(engine.get(b"t:k").unwrap(), Some(b"third".to_vec()));
}

#[test]
fn test_append_and_strlen() {
    let (_temp, engine) = setup();

    assert_eq!(engine.append(b"t:s", b"Hello").unwrap(), 5);
    assert_eq!(engine.append(b"t:s", b" World").unwrap(), 11);
    assert_eq!(engine.strlen(b"t:s").unwrap(), 11);
    assert_eq!(engine.strlen(b"t:missing").unwrap(), 0);
}

#[test]
fn test_mget_and_mset() {
    let (_temp, engine) = setup();

    let statuses = engine
        .mset(&[("t:a", "1"), ("bad", "2"), ("t:c", "3")])
        .unwrap();
    assert!(statuses[0].is_ok());
    assert!(matches!(statuses[1], Err(ShardError::InvalidArgument(_))));
    assert!(statuses[2].is_ok());

    let values = engine.mget(&["t:a", "t:b", "t:c", "bad"]).unwrap();
    assert_eq!(values[0].as_ref().unwrap(), &Some(b"1".to_vec()));
    assert_eq!(values[1].as_ref().unwrap(), &None);
    assert_eq!(values[2].as_ref().unwrap(), &Some(b"3".to_vec()));
    assert!(values[3].is_err());

    let empty: [&[u8]; 0] = [];
    assert!(matches!(engine.mget(&empty), Err(ShardError::InvalidArgument(_))));
}

#[test]
fn test_del_counts_existing_and_skips_bad_keys() {
    let (_temp, engine) = setup();
    engine.set(b"t:a", b"1").unwrap();
    engine.set(b"t:b", b"2").unwrap();
    engine.sadd(b"t:set", &[b"m"]).unwrap();

    let removed = engine.del(&["t:a", "t:missing", "t:set", "bad", "t:b"]).unwrap();

    assert_eq!(removed, 2);
    assert_eq!(engine.scard(b"t:set").unwrap(), 1);
}

// =============================================================================
// Byte Range Tests
// =============================================================================

#[test]
fn test_get_range() {
    let (_temp, engine) = setup();
    engine.set(b"t:s", b"Hello Redis").unwrap();

    assert_eq!(engine.get_range(b"t:s", 0, 4).unwrap(), b"Hello");
    assert_eq!(engine.get_range(b"t:s", -5, -1).unwrap(), b"Redis");
    assert_eq!(engine.get_range(b"t:s", 0, -1).unwrap(), b"Hello Redis");
    assert_eq!(engine.get_range(b"t:s", 6, 100).unwrap(), b"Redis");
    assert_eq!(engine.get_range(b"t:s", 5, 3).unwrap(), b"");
    assert_eq!(engine.get_range(b"t:s", 50, 60).unwrap(), b"");
    assert_eq!(engine.get_range(b"t:missing", 0, -1).unwrap(), b"");
}

#[test]
fn test_set_range_overwrites_and_pads() {
    let (_temp, engine) = setup();
    engine.set(b"t:s", b"Hello World").unwrap();

    assert_eq!(engine.set_range(b"t:s", 6, b"Redis").unwrap(), 11);
    assert_eq!(engine.get(b"t:s").unwrap(), Some(b"Hello Redis".to_vec()));

    assert_eq!(engine.set_range(b"t:pad", 3, b"ab").unwrap(), 5);
    assert_eq!(engine.get(b"t:pad").unwrap(), Some(vec![0, 0, 0, b'a', b'b']));
}

#[test]
fn test_set_range_edge_cases() {
    let (_temp, engine) = setup();
    engine.set(b"t:s", b"abc").unwrap();

    assert_eq!(engine.set_range(b"t:s", 10, b"").unwrap(), 3);
    assert_eq!(engine.get(b"t:s").unwrap(), Some(b"abc".to_vec()));
    assert!(matches!(engine.set_range(b"t:s", -1, b"x"), Err(ShardError::InvalidArgument(_))));

    assert_eq!(engine.set_range(b"t:absent", 0, b"").unwrap(), 0);
    assert_eq!(engine.get(b"t:absent").unwrap(), None);
}

// =============================================================================
// Integer Tests
// =============================================================================

#[test]
fn test_incr_decr() {
    let (_temp, engine) = setup();

    assert_eq!(engine.incr(b"t:n").unwrap(), 1);
    assert_eq!(engine.incr_by(b"t:n", 10).unwrap(), 11);
    assert_eq!(engine.decr(b"t:n").unwrap(), 10);
    assert_eq!(engine.get(b"t:n").unwrap(), Some(b"10".to_vec()));
}

#[test]
fn test_incr_rejects_non_integer_and_overflow() {
    let (_temp, engine) = setup();
    engine.set(b"t:text", b"abc").unwrap();
    engine.set(b"t:max", i64::MAX.to_string().as_bytes()).unwrap();

    assert!(matches!(engine.incr(b"t:text"), Err(ShardError::InvalidArgument(_))));
    assert!(matches!(engine.incr(b"t:max"), Err(ShardError::InvalidArgument(_))));
    assert_eq!(engine.get(b"t:max").unwrap(), Some(i64::MAX.to_string().into_bytes()));
}

// =============================================================================
// Bit Tests
// =============================================================================

#[test]
fn test_set_bit_get_bit() {
    let (_temp, engine) = setup();

    assert_eq!(engine.set_bit(b"t:bits", 7, true).unwrap(), 0);
    assert_eq!(engine.get(b"t:bits").unwrap(), Some(vec![0x01]));
    assert_eq!(engine.get_bit(b"t:bits", 7).unwrap(), 1);
    assert_eq!(engine.get_bit(b"t:bits", 6).unwrap(), 0);
    assert_eq!(engine.get_bit(b"t:bits", 1000).unwrap(), 0);

    assert_eq!(engine.set_bit(b"t:bits", 7, false).unwrap(), 1);
    assert_eq!(engine.set_bit(b"t:bits", 17, true).unwrap(), 0);
    assert_eq!(engine.strlen(b"t:bits").unwrap(), 3);
}

#[test]
fn test_bit_count() {
    let (_temp, engine) = setup();
    engine.set(b"t:s", b"foobar").unwrap();

    assert_eq!(engine.bit_count(b"t:s", 0, -1).unwrap(), 26);
    assert_eq!(engine.bit_count(b"t:s", 0, 0).unwrap(), 4);
    assert_eq!(engine.bit_count(b"t:s", 1, 1).unwrap(), 6);
    assert_eq!(engine.bit_count(b"t:missing", 0, -1).unwrap(), 0);
}

// =============================================================================
// Type Tests
// =============================================================================

#[test]
fn test_wrong_type_is_rejected() {
    let (_temp, engine) = setup();
    engine.hset(b"t:h", b"f", b"v").unwrap();

    assert!(matches!(engine.get(b"t:h"), Err(ShardError::TypeMismatch)));
    assert!(matches!(engine.set(b"t:h", b"v"), Err(ShardError::TypeMismatch)));
    assert!(matches!(engine.append(b"t:h", b"v"), Err(ShardError::TypeMismatch)));
    assert!(matches!(engine.exists(b"t:h"), Err(ShardError::TypeMismatch)));
}

#[test]
fn test_key_type() {
    let (_temp, engine) = setup();
    engine.set(b"t:s", b"v").unwrap();
    engine.hset(b"t:h", b"f", b"v").unwrap();
    engine.rpush(b"t:l", &[b"a"]).unwrap();
    engine.sadd(b"t:st", &[b"a"]).unwrap();
    engine.zadd(b"t:z", &[(1, b"a")]).unwrap();

    assert_eq!(engine.key_type(b"t:s").unwrap(), Some(DataType::String));
    assert_eq!(engine.key_type(b"t:h").unwrap(), Some(DataType::Hash));
    assert_eq!(engine.key_type(b"t:l").unwrap(), Some(DataType::List));
    assert_eq!(engine.key_type(b"t:st").unwrap(), Some(DataType::Set));
    assert_eq!(engine.key_type(b"t:z").unwrap(), Some(DataType::ZSet));
    assert_eq!(engine.key_type(b"t:none").unwrap(), None);
}

// =============================================================================
// Table Counter Tests
// =============================================================================

#[test]
fn test_table_counter_tracks_creates_and_deletes() {
    let (_temp, engine) = setup();
    let n = 10;
    let m = 4;

    for i in 0..n {
        engine.set(format!("users:{}", i).as_bytes(), b"v").unwrap();
    }
    // Overwrites do not count twice
    engine.set(b"users:0", b"again").unwrap();
    for i in 0..m {
        engine.delete(format!("users:{}", i).as_bytes()).unwrap();
    }

    assert_eq!(engine.get_table_key_count(b"users").unwrap(), n - m);
    assert_eq!(engine.get_table_key_count(b"other").unwrap(), 0);
}

#[test]
fn test_table_counter_counts_keys_of_every_type() {
    let (_temp, engine) = setup();

    engine.set(b"t:s", b"v").unwrap();
    engine.hmset(b"t:h", &[(b"a", b"1"), (b"b", b"2")]).unwrap();
    engine.rpush(b"t:l", &[b"x", b"y", b"z"]).unwrap();
    engine.sadd(b"t:st", &[b"m1", b"m2"]).unwrap();
    engine.zadd(b"t:z", &[(1, b"a"), (2, b"b")]).unwrap();
    assert_eq!(engine.get_table_key_count(b"t").unwrap(), 5);

    // Removing the last element of a container removes the key
    engine.hdel(b"t:h", &[b"a", b"b"]).unwrap();
    engine.lclear(b"t:l").unwrap();
    assert_eq!(engine.get_table_key_count(b"t").unwrap(), 3);
}

#[test]
fn test_table_counter_with_interleaved_strings_and_lists() {
    let temp = TempDir::new().unwrap();
    let n: i64 = 12;
    let m: i64 = 7;
    let key = |i: i64| format!("mix:{}", i).into_bytes();
    {
        let engine = Engine::open(config_for(&temp)).unwrap();

        for i in 0..n {
            if i % 2 == 0 {
                engine.set(&key(i), b"v").unwrap();
            } else {
                engine.rpush(&key(i), &["only"]).unwrap();
            }
        }
        assert_eq!(engine.get_table_key_count(b"mix").unwrap(), n);

        for i in 0..m {
            if i % 2 == 0 {
                assert!(engine.delete(&key(i)).unwrap());
            } else if i % 4 == 1 {
                assert_eq!(engine.lpop(&key(i)).unwrap(), Some(b"only".to_vec()));
            } else {
                assert_eq!(engine.lclear(&key(i)).unwrap(), 1);
            }
        }
        assert_eq!(engine.get_table_key_count(b"mix").unwrap(), n - m);

        // Removing what is already gone changes nothing
        assert!(!engine.delete(&key(0)).unwrap());
        assert_eq!(engine.lpop(&key(1)).unwrap(), None);
        assert_eq!(engine.get_table_key_count(b"mix").unwrap(), n - m);
        engine.close().unwrap();
    }

    let engine = Engine::open(config_for(&temp)).unwrap();
    assert_eq!(engine.get_table_key_count(b"mix").unwrap(), n - m);
}

#[test]
fn test_table_counter_disabled() {
    let temp = TempDir::new().unwrap();
    let config = Config::builder().data_dir(temp.path()).table_counter(false).build();
    let engine = Engine::open(config).unwrap();

    engine.set(b"plain", b"v").unwrap();
    assert_eq!(engine.get(b"plain").unwrap(), Some(b"v".to_vec()));
    assert_eq!(engine.get_table_key_count(b"plain").unwrap(), 0);
}

// =============================================================================
// Lifecycle Tests
// =============================================================================

#[test]
fn test_state_survives_reopen() {
    let temp = TempDir::new().unwrap();
    {
        let engine = Engine::open(config_for(&temp)).unwrap();
        engine.set(b"t:a", b"1").unwrap();
        engine.hset(b"t:h", b"f", b"v").unwrap();
        engine.close().unwrap();
    }

    let engine = Engine::open(config_for(&temp)).unwrap();
    assert_eq!(engine.get(b"t:a").unwrap(), Some(b"1".to_vec()));
    assert_eq!(engine.hget(b"t:h", b"f").unwrap(), Some(b"v".to_vec()));
    assert_eq!(engine.get_table_key_count(b"t").unwrap(), 2);
}

#[test]
fn test_state_survives_checkpoint_and_reopen() {
    let temp = TempDir::new().unwrap();
    {
        let engine = Engine::open(config_for(&temp)).unwrap();
        engine.set(b"t:before", b"1").unwrap();
        let info = engine.checkpoint().unwrap();
        assert!(info.entry_count > 0);
        engine.set(b"t:after", b"2").unwrap();
    }

    let engine = Engine::open(config_for(&temp)).unwrap();
    assert_eq!(engine.get(b"t:before").unwrap(), Some(b"1".to_vec()));
    assert_eq!(engine.get(b"t:after").unwrap(), Some(b"2".to_vec()));
    assert_eq!(engine.get_table_key_count(b"t").unwrap(), 2);
}

#[test]
fn test_write_succeeds_when_automatic_checkpoint_fails() {
    let temp = TempDir::new().unwrap();
    let config = Config::builder()
        .data_dir(temp.path())
        .checkpoint_wal_bytes(1)
        .build();
    let engine = Engine::open(config).unwrap();

    let blocker = temp.path().join("checkpoint.tmp");
    std::fs::create_dir(&blocker).unwrap();

    // Committed once, reported once
    assert_eq!(engine.incr_by(b"t:n", 5).unwrap(), 5);
    assert_eq!(engine.get(b"t:n").unwrap(), Some(b"5".to_vec()));
    assert_eq!(engine.incr_by(b"t:n", 5).unwrap(), 10);

    std::fs::remove_dir(&blocker).unwrap();
    assert_eq!(engine.incr(b"t:n").unwrap(), 11);
    assert!(temp.path().join("checkpoint.sst").exists());
}

#[test]
fn test_closed_engine_rejects_calls() {
    let (_temp, engine) = setup();
    engine.set(b"t:a", b"1").unwrap();

    engine.close().unwrap();
    engine.close().unwrap();

    assert!(engine.is_closed());
    assert!(matches!(engine.get(b"t:a"), Err(ShardError::Closed)));
    assert!(matches!(engine.set(b"t:a", b"2"), Err(ShardError::Closed)));
}

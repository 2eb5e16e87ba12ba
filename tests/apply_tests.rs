//! Tests for committed log apply
//!
//! These tests verify:
//! - Each entry takes effect once and records its index
//! - Redelivered entries are skipped with no effect
//! - Failing entries still advance the applied index
//! - Replay after restart converges to the same state

use shardkv::codec::ScoreBound;
use shardkv::{Command, Config, Engine, LogEntry, Reply, ShardError};
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn config_for(temp: &TempDir) -> Config {
    Config::builder().data_dir(temp.path()).build()
}

fn setup() -> (TempDir, Engine) {
    let temp = TempDir::new().unwrap();
    let engine = Engine::open(config_for(&temp)).unwrap();
    (temp, engine)
}

fn b(s: &str) -> Vec<u8> {
    s.as_bytes().to_vec()
}

/// A log touching every data type, including non-idempotent commands
fn workload() -> Vec<LogEntry> {
    let commands = vec![
        Command::Set { key: b("t:s"), value: b("hello") },
        Command::Append { key: b("t:s"), value: b(" world") },
        Command::IncrBy { key: b("t:n"), delta: 5 },
        Command::IncrBy { key: b("t:n"), delta: 5 },
        Command::HSet { key: b("t:h"), field: b("f"), value: b("v") },
        Command::HIncrBy { key: b("t:h"), field: b("count"), delta: 3 },
        Command::RPush { key: b("t:l"), values: vec![b("a"), b("b"), b("c")] },
        Command::LPop { key: b("t:l") },
        Command::SAdd { key: b("t:set"), members: vec![b("x"), b("y")] },
        Command::ZAdd { key: b("t:z"), members: vec![(1, b("a")), (2, b("b")), (3, b("c"))] },
        Command::ZIncrBy { key: b("t:z"), delta: 10, member: b("a") },
        Command::ZRemRangeByScore { key: b("t:z"), min: ScoreBound::NegInf, max: ScoreBound::Inclusive(2) },
    ];
    commands
        .into_iter()
        .enumerate()
        .map(|(i, command)| LogEntry::new(i as u64 + 1, command))
        .collect()
}

fn apply_all(engine: &Engine, entries: &[LogEntry]) {
    for entry in entries {
        engine.apply(entry).unwrap();
    }
}

fn assert_workload_state(engine: &Engine) {
    assert_eq!(engine.get(b"t:s").unwrap(), Some(b("hello world")));
    assert_eq!(engine.get(b"t:n").unwrap(), Some(b("10")));
    assert_eq!(engine.hget(b"t:h", b"count").unwrap(), Some(b("3")));
    assert_eq!(engine.lrange(b"t:l", 0, -1).unwrap(), vec![b("b"), b("c")]);
    assert_eq!(engine.scard(b"t:set").unwrap(), 2);
    assert_eq!(engine.zscore(b"t:z", b"a").unwrap(), Some(11));
    assert_eq!(engine.zcard(b"t:z").unwrap(), 2);
    assert_eq!(engine.get_table_key_count(b"t").unwrap(), 6);
}

// =============================================================================
// Apply Tests
// =============================================================================

#[test]
fn test_apply_records_index_and_replies() {
    let (_temp, engine) = setup();
    assert_eq!(engine.applied_index().unwrap(), 0);

    let reply = engine
        .apply(&LogEntry::new(1, Command::RPush { key: b("t:l"), values: vec![b("a"), b("b")] }))
        .unwrap();
    assert_eq!(reply.as_int(), Some(2));

    let reply = engine.apply(&LogEntry::new(2, Command::RPop { key: b("t:l") })).unwrap();
    assert!(matches!(reply, Reply::Value(Some(ref v)) if v == b"b"));

    let reply = engine
        .apply(&LogEntry::new(3, Command::Set { key: b("t:k"), value: b("v") }))
        .unwrap();
    assert!(matches!(reply, Reply::Ok));
    assert_eq!(engine.applied_index().unwrap(), 3);
}

#[test]
fn test_redelivered_entry_is_skipped() {
    let (_temp, engine) = setup();
    let entry = LogEntry::new(1, Command::IncrBy { key: b("t:n"), delta: 1 });

    assert_eq!(engine.apply(&entry).unwrap().as_int(), Some(1));
    assert!(engine.apply(&entry).unwrap().is_duplicate());
    assert_eq!(engine.get(b"t:n").unwrap(), Some(b("1")));

    // Anything at or below the applied index is a duplicate
    let older = LogEntry::new(0, Command::IncrBy { key: b("t:n"), delta: 100 });
    assert!(engine.apply(&older).unwrap().is_duplicate());
    assert_eq!(engine.get(b"t:n").unwrap(), Some(b("1")));
}

#[test]
fn test_double_apply_gives_identical_state() {
    let (_temp, engine) = setup();
    let entries = workload();

    apply_all(&engine, &entries);
    assert_workload_state(&engine);

    for entry in &entries {
        assert!(engine.apply(entry).unwrap().is_duplicate());
    }
    assert_workload_state(&engine);
    assert_eq!(engine.applied_index().unwrap(), entries.len() as u64);
}

#[test]
fn test_failed_entry_advances_index_without_effects() {
    let (_temp, engine) = setup();
    engine
        .apply(&LogEntry::new(1, Command::HSet { key: b("t:h"), field: b("f"), value: b("v") }))
        .unwrap();

    // Wrong type
    let failing = LogEntry::new(2, Command::Append { key: b("t:h"), value: b("x") });
    assert!(matches!(engine.apply(&failing), Err(ShardError::TypeMismatch)));
    assert_eq!(engine.applied_index().unwrap(), 2);

    // Redelivery of the failed entry is a no-op, not a second failure
    assert!(engine.apply(&failing).unwrap().is_duplicate());
    assert_eq!(engine.hget(b"t:h", b"f").unwrap(), Some(b("v")));
}

#[test]
fn test_failed_entry_discards_partial_writes() {
    let (_temp, engine) = setup();
    engine.hset(b"t:h", b"f", b"v").unwrap();
    engine.set(b"t:s", b"string").unwrap();

    // The first hash is cleared before the second key fails
    let failing = LogEntry::new(1, Command::HMClear { keys: vec![b("t:h"), b("t:s")] });
    assert!(matches!(engine.apply(&failing), Err(ShardError::TypeMismatch)));
    assert_eq!(engine.hget(b"t:h", b"f").unwrap(), Some(b("v")));
    assert_eq!(engine.get_table_key_count(b"t").unwrap(), 2);
    assert_eq!(engine.applied_index().unwrap(), 1);
}

#[test]
fn test_mset_reports_per_key_status() {
    let (_temp, engine) = setup();
    engine.sadd(b"t:set", &["m"]).unwrap();

    let reply = engine
        .apply(&LogEntry::new(
            1,
            Command::MSet { pairs: vec![(b("t:a"), b("1")), (b("t:set"), b("2"))] },
        ))
        .unwrap();

    match reply {
        Reply::Statuses(statuses) => {
            assert!(statuses[0].is_ok());
            assert!(matches!(statuses[1], Err(ShardError::TypeMismatch)));
        }
        other => panic!("unexpected reply: {:?}", other),
    }
    assert_eq!(engine.get(b"t:a").unwrap(), Some(b("1")));
}

// =============================================================================
// Restart Tests
// =============================================================================

#[test]
fn test_replay_after_restart_converges() {
    let temp = TempDir::new().unwrap();
    let entries = workload();
    let (first, rest) = entries.split_at(7);

    {
        let engine = Engine::open(config_for(&temp)).unwrap();
        apply_all(&engine, first);
    }

    // The log is redelivered from the start after a restart
    let engine = Engine::open(config_for(&temp)).unwrap();
    assert_eq!(engine.applied_index().unwrap(), first.len() as u64);
    for entry in first {
        assert!(engine.apply(entry).unwrap().is_duplicate());
    }
    apply_all(&engine, rest);

    assert_workload_state(&engine);
}

#[test]
fn test_applied_index_survives_checkpoint() {
    let temp = TempDir::new().unwrap();
    let entries = workload();
    {
        let engine = Engine::open(config_for(&temp)).unwrap();
        apply_all(&engine, &entries);
        engine.checkpoint().unwrap();
    }

    let engine = Engine::open(config_for(&temp)).unwrap();
    assert_eq!(engine.applied_index().unwrap(), entries.len() as u64);
    assert_workload_state(&engine);
    apply_all(&engine, &entries);
    assert_workload_state(&engine);
}

#[test]
fn test_applied_index_beyond_signed_range() {
    let temp = TempDir::new().unwrap();
    let high = i64::MAX as u64 + 10;
    {
        let engine = Engine::open(config_for(&temp)).unwrap();
        engine
            .apply(&LogEntry::new(high, Command::Set { key: b("t:k"), value: b("v") }))
            .unwrap();
        assert_eq!(engine.applied_index().unwrap(), high);

        // Positions below it, including those that fit in an i64, are stale
        let stale = LogEntry::new(i64::MAX as u64, Command::Set { key: b("t:k"), value: b("old") });
        assert!(engine.apply(&stale).unwrap().is_duplicate());

        let next = LogEntry::new(high + 1, Command::Set { key: b("t:k"), value: b("new") });
        assert!(!engine.apply(&next).unwrap().is_duplicate());
        engine.close().unwrap();
    }

    let engine = Engine::open(config_for(&temp)).unwrap();
    assert_eq!(engine.applied_index().unwrap(), high + 1);
    assert_eq!(engine.get(b"t:k").unwrap(), Some(b("new")));
}

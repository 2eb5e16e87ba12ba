//! Tests for sorted set operations
//!
//! These tests verify:
//! - Adding, re-scoring and removing members
//! - Rank lookups in both directions
//! - Rank, score and lexicographic ranges with offset/limit
//! - Range removals and clearing

use shardkv::codec::{LexBound, ScoreBound};
use shardkv::engine::flatten_scored;
use shardkv::{Config, Engine, ScorePair, ShardError};
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn setup() -> (TempDir, Engine) {
    let temp = TempDir::new().unwrap();
    let engine = Engine::open(Config::builder().data_dir(temp.path()).build()).unwrap();
    (temp, engine)
}

/// Board with a=1, b=2, c=3, d=4, e=5
fn setup_board() -> (TempDir, Engine) {
    let (temp, engine) = setup();
    engine
        .zadd(b"t:z", &[(3, "c"), (1, "a"), (5, "e"), (2, "b"), (4, "d")])
        .unwrap();
    (temp, engine)
}

fn members(pairs: &[ScorePair]) -> Vec<String> {
    pairs
        .iter()
        .map(|p| String::from_utf8(p.member.clone()).unwrap())
        .collect()
}

fn lex_members(items: Vec<Vec<u8>>) -> Vec<String> {
    items.into_iter().map(|m| String::from_utf8(m).unwrap()).collect()
}

fn incl(score: i64) -> ScoreBound {
    ScoreBound::Inclusive(score)
}

fn excl(score: i64) -> ScoreBound {
    ScoreBound::Exclusive(score)
}

fn lex(raw: &str) -> LexBound {
    LexBound::parse(raw.as_bytes()).unwrap()
}

// =============================================================================
// Membership Tests
// =============================================================================

#[test]
fn test_zadd_counts_new_members_and_updates_scores() {
    let (_temp, engine) = setup();

    assert_eq!(engine.zadd(b"t:z", &[(10, "a"), (20, "b")]).unwrap(), 2);
    assert_eq!(engine.zadd(b"t:z", &[(5, "a"), (30, "c")]).unwrap(), 1);

    assert_eq!(engine.zcard(b"t:z").unwrap(), 3);
    assert_eq!(engine.zscore(b"t:z", b"a").unwrap(), Some(5));
    assert_eq!(members(&engine.zrange(b"t:z", 0, -1).unwrap()), vec!["a", "b", "c"]);
}

#[test]
fn test_equal_scores_order_by_member() {
    let (_temp, engine) = setup();
    engine.zadd(b"t:z", &[(1, "b"), (1, "a"), (0, "z")]).unwrap();

    assert_eq!(members(&engine.zrange(b"t:z", 0, -1).unwrap()), vec!["z", "a", "b"]);
}

#[test]
fn test_negative_scores_sort_first() {
    let (_temp, engine) = setup();
    engine.zadd(b"t:z", &[(0, "zero"), (-10, "neg"), (i64::MAX, "max"), (i64::MIN, "min")]).unwrap();

    assert_eq!(
        members(&engine.zrange(b"t:z", 0, -1).unwrap()),
        vec!["min", "neg", "zero", "max"]
    );
}

#[test]
fn test_zincr_by() {
    let (_temp, engine) = setup_board();

    assert_eq!(engine.zincr_by(b"t:z", 10, b"a").unwrap(), 11);
    assert_eq!(engine.zincr_by(b"t:z", 7, b"new").unwrap(), 7);
    assert_eq!(members(&engine.zrange(b"t:z", -2, -1).unwrap()), vec!["new", "a"]);
    assert_eq!(engine.zcard(b"t:z").unwrap(), 6);
}

#[test]
fn test_zrem_removes_zset_when_empty() {
    let (_temp, engine) = setup();
    engine.zadd(b"t:z", &[(1, "a"), (2, "b")]).unwrap();

    assert_eq!(engine.zrem(b"t:z", &["a", "missing"]).unwrap(), 1);
    assert_eq!(engine.zscore(b"t:z", b"a").unwrap(), None);
    assert_eq!(engine.zrem(b"t:z", &["b"]).unwrap(), 1);
    assert_eq!(engine.key_type(b"t:z").unwrap(), None);
    assert_eq!(engine.get_table_key_count(b"t").unwrap(), 0);
}

// =============================================================================
// Rank Tests
// =============================================================================

#[test]
fn test_zrank_zrevrank() {
    let (_temp, engine) = setup_board();

    assert_eq!(engine.zrank(b"t:z", b"a").unwrap(), Some(0));
    assert_eq!(engine.zrank(b"t:z", b"d").unwrap(), Some(3));
    assert_eq!(engine.zrevrank(b"t:z", b"a").unwrap(), Some(4));
    assert_eq!(engine.zrevrank(b"t:z", b"e").unwrap(), Some(0));
    assert_eq!(engine.zrank(b"t:z", b"missing").unwrap(), None);
}

#[test]
fn test_zrange_zrevrange() {
    let (_temp, engine) = setup_board();

    assert_eq!(members(&engine.zrange(b"t:z", 1, 2).unwrap()), vec!["b", "c"]);
    assert_eq!(members(&engine.zrange(b"t:z", -2, 100).unwrap()), vec!["d", "e"]);
    assert_eq!(members(&engine.zrevrange(b"t:z", 0, 1).unwrap()), vec!["e", "d"]);
    assert!(engine.zrange(b"t:z", 3, 1).unwrap().is_empty());
    assert!(engine.zrange(b"t:none", 0, -1).unwrap().is_empty());
}

// =============================================================================
// Score Range Tests
// =============================================================================

#[test]
fn test_zrange_by_score_bounds() {
    let (_temp, engine) = setup_board();

    let found = engine.zrange_by_score(b"t:z", incl(2), incl(4), 0, None).unwrap();
    assert_eq!(members(&found), vec!["b", "c", "d"]);

    let found = engine.zrange_by_score(b"t:z", excl(2), excl(4), 0, None).unwrap();
    assert_eq!(members(&found), vec!["c"]);

    let found = engine
        .zrange_by_score(b"t:z", ScoreBound::NegInf, ScoreBound::PosInf, 0, None)
        .unwrap();
    assert_eq!(found.len(), 5);

    assert!(engine.zrange_by_score(b"t:z", incl(4), incl(2), 0, None).unwrap().is_empty());
}

#[test]
fn test_zrange_by_score_offset_limit() {
    let (_temp, engine) = setup_board();

    let found = engine
        .zrange_by_score(b"t:z", ScoreBound::NegInf, ScoreBound::PosInf, 1, Some(2))
        .unwrap();
    assert_eq!(members(&found), vec!["b", "c"]);

    let found = engine
        .zrange_by_score(b"t:z", ScoreBound::NegInf, ScoreBound::PosInf, 10, None)
        .unwrap();
    assert!(found.is_empty());
}

#[test]
fn test_zrevrange_by_score() {
    let (_temp, engine) = setup_board();

    let found = engine.zrevrange_by_score(b"t:z", incl(4), incl(2), 0, None).unwrap();
    assert_eq!(members(&found), vec!["d", "c", "b"]);

    let found = engine
        .zrevrange_by_score(b"t:z", ScoreBound::PosInf, ScoreBound::NegInf, 1, Some(1))
        .unwrap();
    assert_eq!(members(&found), vec!["d"]);
}

#[test]
fn test_zcount() {
    let (_temp, engine) = setup_board();

    assert_eq!(engine.zcount(b"t:z", incl(2), incl(4)).unwrap(), 3);
    assert_eq!(engine.zcount(b"t:z", excl(1), ScoreBound::PosInf).unwrap(), 4);
    assert_eq!(engine.zcount(b"t:z", incl(100), ScoreBound::PosInf).unwrap(), 0);
}

#[test]
fn test_score_ranges_at_extreme_scores() {
    let (_temp, engine) = setup();
    engine
        .zadd(b"t:z", &[(i64::MIN, "lo"), (0, "mid"), (i64::MAX, "hi")])
        .unwrap();

    let found = engine
        .zrange_by_score(b"t:z", excl(i64::MIN), ScoreBound::PosInf, 0, None)
        .unwrap();
    assert_eq!(members(&found), vec!["mid", "hi"]);

    let found = engine
        .zrange_by_score(b"t:z", ScoreBound::NegInf, excl(i64::MAX), 0, None)
        .unwrap();
    assert_eq!(members(&found), vec!["lo", "mid"]);

    let found = engine
        .zrevrange_by_score(b"t:z", ScoreBound::PosInf, excl(i64::MIN), 0, None)
        .unwrap();
    assert_eq!(members(&found), vec!["hi", "mid"]);

    assert_eq!(engine.zcount(b"t:z", incl(i64::MIN), incl(i64::MAX)).unwrap(), 3);
    assert_eq!(engine.zcount(b"t:z", excl(i64::MAX), ScoreBound::PosInf).unwrap(), 0);
}

#[test]
fn test_score_ranges_ignore_neighbouring_keys() {
    let (_temp, engine) = setup_board();
    engine.zadd(b"t:y", &[(3, "other")]).unwrap();
    engine.zadd(b"t:zz", &[(3, "other")]).unwrap();

    let found = engine.zrange_by_score(b"t:z", incl(3), incl(3), 0, None).unwrap();
    assert_eq!(members(&found), vec!["c"]);

    let found = engine
        .zrevrange_by_score(b"t:z", incl(5), ScoreBound::NegInf, 2, Some(2))
        .unwrap();
    assert_eq!(members(&found), vec!["c", "b"]);
    assert_eq!(members(&engine.zrevrange(b"t:z", 0, 1).unwrap()), vec!["e", "d"]);
}

#[test]
fn test_flatten_scored() {
    let (_temp, engine) = setup_board();
    let found = engine.zrange(b"t:z", 0, 1).unwrap();

    assert_eq!(flatten_scored(&found, false), vec![b"a".to_vec(), b"b".to_vec()]);
    assert_eq!(
        flatten_scored(&found, true),
        vec![b"a".to_vec(), b"1".to_vec(), b"b".to_vec(), b"2".to_vec()]
    );
}

// =============================================================================
// Lex Range Tests
// =============================================================================

#[test]
fn test_zrange_by_lex() {
    let (_temp, engine) = setup();
    engine
        .zadd(b"t:z", &[(0, "a"), (0, "b"), (0, "c"), (0, "d"), (0, "e")])
        .unwrap();

    let found = engine.zrange_by_lex(b"t:z", lex("-"), lex("[c"), 0, None).unwrap();
    assert_eq!(lex_members(found), vec!["a", "b", "c"]);

    let found = engine.zrange_by_lex(b"t:z", lex("(b"), lex("(e"), 0, None).unwrap();
    assert_eq!(lex_members(found), vec!["c", "d"]);

    let found = engine.zrange_by_lex(b"t:z", lex("-"), lex("+"), 1, Some(2)).unwrap();
    assert_eq!(lex_members(found), vec!["b", "c"]);

    assert_eq!(engine.zlexcount(b"t:z", lex("[b"), lex("[d")).unwrap(), 3);
}

#[test]
fn test_lex_range_requires_single_score() {
    let (_temp, engine) = setup_board();

    assert!(matches!(
        engine.zrange_by_lex(b"t:z", lex("-"), lex("+"), 0, None),
        Err(ShardError::InvalidArgument(_))
    ));
}

// =============================================================================
// Removal Tests
// =============================================================================

#[test]
fn test_zrem_range_by_score() {
    let (_temp, engine) = setup_board();

    assert_eq!(engine.zrem_range_by_score(b"t:z", incl(2), excl(4)).unwrap(), 2);
    assert_eq!(members(&engine.zrange(b"t:z", 0, -1).unwrap()), vec!["a", "d", "e"]);
    assert_eq!(engine.zcard(b"t:z").unwrap(), 3);
}

#[test]
fn test_zrem_range_by_rank() {
    let (_temp, engine) = setup_board();

    assert_eq!(engine.zrem_range_by_rank(b"t:z", 0, 1).unwrap(), 2);
    assert_eq!(engine.zrem_range_by_rank(b"t:z", -1, -1).unwrap(), 1);
    assert_eq!(members(&engine.zrange(b"t:z", 0, -1).unwrap()), vec!["c", "d"]);
}

#[test]
fn test_zrem_range_by_lex() {
    let (_temp, engine) = setup();
    engine.zadd(b"t:z", &[(0, "a"), (0, "b"), (0, "c")]).unwrap();

    assert_eq!(engine.zrem_range_by_lex(b"t:z", lex("[b"), lex("+")).unwrap(), 2);
    assert_eq!(members(&engine.zrange(b"t:z", 0, -1).unwrap()), vec!["a"]);
}

#[test]
fn test_lex_removal_on_mixed_scores_keeps_members() {
    let (_temp, engine) = setup_board();

    assert!(matches!(
        engine.zrem_range_by_lex(b"t:z", lex("-"), lex("+")),
        Err(ShardError::InvalidArgument(_))
    ));
    assert_eq!(engine.zcard(b"t:z").unwrap(), 5);

    // Once the remaining members share a score, lex ranges apply again
    assert_eq!(engine.zrem_range_by_score(b"t:z", incl(2), ScoreBound::PosInf).unwrap(), 4);
    engine.zadd(b"t:z", &[(1, "b"), (1, "c")]).unwrap();
    let found = engine.zrange_by_lex(b"t:z", lex("(a"), lex("+"), 0, None).unwrap();
    assert_eq!(lex_members(found), vec!["b", "c"]);
    assert_eq!(engine.zrem_range_by_lex(b"t:z", lex("-"), lex("[b")).unwrap(), 2);
    assert_eq!(members(&engine.zrange(b"t:z", 0, -1).unwrap()), vec!["c"]);
}

#[test]
fn test_zclear_and_zmclear() {
    let (_temp, engine) = setup_board();
    engine.zadd(b"t:other", &[(1, "x")]).unwrap();

    assert_eq!(engine.zclear(b"t:z").unwrap(), 5);
    assert_eq!(engine.zcard(b"t:z").unwrap(), 0);
    assert_eq!(engine.zmclear(&["t:z", "t:other"]).unwrap(), 1);
    assert_eq!(engine.get_table_key_count(b"t").unwrap(), 0);
}

#[test]
fn test_zset_rejects_other_types() {
    let (_temp, engine) = setup();
    engine.set(b"t:s", b"v").unwrap();

    assert!(matches!(engine.zadd(b"t:s", &[(1, "a")]), Err(ShardError::TypeMismatch)));
    assert!(matches!(engine.zrank(b"t:s", b"a"), Err(ShardError::TypeMismatch)));
}

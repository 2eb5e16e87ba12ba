//! Tests for the key codec
//!
//! These tests verify:
//! - Table parsing of user keys
//! - Encoded keys decode back to their parts
//! - Sub-record prefixes never overlap between distinct user keys
//! - Sortable integer encodings order like the integers
//! - Range bound parsing

use shardkv::codec::{
    decode_hash_field, decode_key, decode_list_seq, decode_sortable_i64, decode_zscore_key,
    encode_hash_field, encode_list_item, encode_root, encode_sortable_i64, encode_zscore_key,
    hash_field_prefix, table_count_key, tag, DataType, LexBound, ListMeta, ScoreBound, TableKey,
};
use shardkv::ShardError;

// =============================================================================
// Helper Functions
// =============================================================================

fn tk(key: &[u8]) -> TableKey<'_> {
    TableKey::parse(key, b':', true).unwrap()
}

// =============================================================================
// Table Key Tests
// =============================================================================

#[test]
fn test_parse_splits_at_first_delimiter() {
    let key = tk(b"users:42:name");
    assert_eq!(key.table, b"users");
    assert_eq!(key.rest, b"42:name");
}

#[test]
fn test_parse_rejects_missing_or_empty_table() {
    assert!(matches!(
        TableKey::parse(b"no-table", b':', true),
        Err(ShardError::InvalidArgument(_))
    ));
    assert!(matches!(
        TableKey::parse(b":rest", b':', true),
        Err(ShardError::InvalidArgument(_))
    ));
}

#[test]
fn test_parse_without_table_accounting() {
    let key = TableKey::parse(b"plain", b':', false).unwrap();
    assert!(key.table.is_empty());
    assert_eq!(key.rest, b"plain");
}

// =============================================================================
// Encoding Tests
// =============================================================================

#[test]
fn test_decode_key_parts() {
    let encoded = encode_hash_field(&tk(b"t:h"), b"field");
    let decoded = decode_key(&encoded).unwrap();

    assert_eq!(decoded.tag, tag::HASH);
    assert_eq!(decoded.table, b"t");
    assert_eq!(decoded.rest, b"h");
    assert_eq!(decoded.suffix, b"field");
    assert_eq!(decode_hash_field(&encoded).unwrap(), b"field");
}

#[test]
fn test_decode_key_rejects_short_input() {
    let encoded = encode_root(tag::KV, &tk(b"t:key"));
    assert!(decode_key(&encoded[..encoded.len() - 1]).is_err());
    assert!(decode_key(&[tag::KV]).is_err());
}

#[test]
fn test_sub_prefixes_do_not_overlap() {
    let prefix_a = hash_field_prefix(&tk(b"t:a"));
    let field_of_ab = encode_hash_field(&tk(b"t:ab"), b"x");
    assert!(!field_of_ab.starts_with(&prefix_a));

    let field_of_a = encode_hash_field(&tk(b"t:a"), b"bx");
    assert!(field_of_a.starts_with(&prefix_a));
}

#[test]
fn test_root_tags_are_distinct() {
    let key = tk(b"t:k");
    let mut roots: Vec<Vec<u8>> = DataType::ALL
        .iter()
        .map(|t| encode_root(t.root_tag(), &key))
        .collect();
    roots.sort();
    roots.dedup();
    assert_eq!(roots.len(), DataType::ALL.len());
}

#[test]
fn test_table_count_keys_differ_per_table() {
    assert_ne!(table_count_key(b"a"), table_count_key(b"b"));
    assert_eq!(table_count_key(b"a")[0], tag::TABLE_COUNT);
}

// =============================================================================
// Ordering Tests
// =============================================================================

#[test]
fn test_sortable_i64_preserves_order() {
    let values = [i64::MIN, -1000, -1, 0, 1, 42, i64::MAX];
    for pair in values.windows(2) {
        assert!(encode_sortable_i64(pair[0]) < encode_sortable_i64(pair[1]));
    }
    for v in values {
        assert_eq!(decode_sortable_i64(&encode_sortable_i64(v)).unwrap(), v);
    }
}

#[test]
fn test_list_items_sort_by_sequence() {
    let key = tk(b"t:list");
    let left = encode_list_item(&key, -3);
    let mid = encode_list_item(&key, 0);
    let right = encode_list_item(&key, 7);

    assert!(left < mid && mid < right);
    assert_eq!(decode_list_seq(&left).unwrap(), -3);
}

#[test]
fn test_zscore_keys_sort_by_score_then_member() {
    let key = tk(b"t:z");
    let a = encode_zscore_key(&key, -5, b"zzz");
    let b = encode_zscore_key(&key, 1, b"aaa");
    let c = encode_zscore_key(&key, 1, b"bbb");

    assert!(a < b && b < c);
    assert_eq!(decode_zscore_key(&c).unwrap(), (1, b"bbb".as_slice()));
}

#[test]
fn test_list_meta_length() {
    let meta = ListMeta { head: -2, tail: 3 };
    assert_eq!(meta.len(), 5);
    assert_eq!(ListMeta::decode(&meta.encode()).unwrap(), meta);
    assert!(ListMeta::empty().is_empty());
    assert!(ListMeta::decode(&[0u8; 3]).is_err());
}

// =============================================================================
// Bound Parsing Tests
// =============================================================================

#[test]
fn test_parse_score_bounds() {
    assert_eq!(ScoreBound::parse(b"-inf").unwrap(), ScoreBound::NegInf);
    assert_eq!(ScoreBound::parse(b"+inf").unwrap(), ScoreBound::PosInf);
    assert_eq!(ScoreBound::parse(b"10").unwrap(), ScoreBound::Inclusive(10));
    assert_eq!(ScoreBound::parse(b"(-3").unwrap(), ScoreBound::Exclusive(-3));
    assert!(ScoreBound::parse(b"ten").is_err());
}

#[test]
fn test_parse_lex_bounds() {
    assert_eq!(LexBound::parse(b"-").unwrap(), LexBound::Min);
    assert_eq!(LexBound::parse(b"+").unwrap(), LexBound::Max);
    assert_eq!(LexBound::parse(b"[abc").unwrap(), LexBound::Inclusive(b"abc".to_vec()));
    assert_eq!(LexBound::parse(b"(abc").unwrap(), LexBound::Exclusive(b"abc".to_vec()));
    assert!(LexBound::parse(b"abc").is_err());
}

//! Sorted set operations
//!
//! Every member has a `ZSET` record (member → score) and a `ZSCORE` index
//! record ordered by (score, member). Score ranges seek straight to the first
//! candidate index key and stop past the last; rank ranges walk the index
//! from whichever end is nearer in the requested order.
//!
//! Lexicographic ranges ignore scores, which is only meaningful when every
//! member shares one score; anything else is rejected with `InvalidArgument`.

use crate::codec::{
    decode_i64, decode_zscore_key, encode_i64, encode_zscore_key, encode_zset_member,
    zscore_prefix, zsize_key, DataType, LexBound, ScoreBound, TableKey,
};
use crate::error::{Result, ShardError};
use crate::substrate::prefix_end;

use super::txn::{KeyLookup, WriteTxn};
use super::{check_type, ensure_not_empty, resolve_rank_range, Engine};

/// A member together with its score
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScorePair {
    pub member: Vec<u8>,
    pub score: i64,
}

/// Flatten range results into the reply shape adapters return:
/// members only, or `[member, score, member, score, ...]`
pub fn flatten_scored(pairs: &[ScorePair], with_scores: bool) -> Vec<Vec<u8>> {
    let mut out = Vec::with_capacity(if with_scores { pairs.len() * 2 } else { pairs.len() });
    for pair in pairs {
        out.push(pair.member.clone());
        if with_scores {
            out.push(pair.score.to_string().into_bytes());
        }
    }
    out
}

// =============================================================================
// Index helpers
// =============================================================================

fn decode_pair(key: &[u8]) -> Result<ScorePair> {
    let (score, member) = decode_zscore_key(key)?;
    Ok(ScorePair {
        member: member.to_vec(),
        score,
    })
}

/// Decode score index entries in iteration order
fn collect_pairs<'b>(entries: impl Iterator<Item = (&'b [u8], &'b [u8])>) -> Result<Vec<ScorePair>> {
    entries.map(|(k, _)| decode_pair(k)).collect()
}

/// End of the score index of one sorted set
fn index_end(tk: &TableKey<'_>) -> Option<Vec<u8>> {
    prefix_end(&zscore_prefix(tk))
}

/// Index keys `[start, end)` that can hold scores admitted by `min`/`max`
fn score_keys(tk: &TableKey<'_>, min: &ScoreBound, max: &ScoreBound) -> (Vec<u8>, Option<Vec<u8>>) {
    let start = encode_zscore_key(tk, min.floor(), b"");
    let end = match max.ceiling().checked_add(1) {
        Some(next) => Some(encode_zscore_key(tk, next, b"")),
        None => index_end(tk),
    };
    (start, end)
}

/// Keep entries inside the score bounds, then apply `offset`/`limit`
fn select_by_score<'b>(
    entries: impl Iterator<Item = (&'b [u8], &'b [u8])>,
    min: &ScoreBound,
    max: &ScoreBound,
    offset: usize,
    limit: Option<usize>,
) -> Result<Vec<ScorePair>> {
    let limit = limit.unwrap_or(usize::MAX);
    let mut skipped = 0;
    let mut out = Vec::new();
    for (key, _) in entries {
        if out.len() >= limit {
            break;
        }
        let (score, member) = decode_zscore_key(key)?;
        if !min.admits_from_below(score) || !max.admits_from_above(score) {
            continue;
        }
        if skipped < offset {
            skipped += 1;
            continue;
        }
        out.push(ScorePair {
            member: member.to_vec(),
            score,
        });
    }
    Ok(out)
}

/// The score every member shares, from the first and last index keys
///
/// `None` for an empty set; `InvalidArgument` when the scores differ.
fn shared_score(first: Option<&[u8]>, last: Option<&[u8]>) -> Result<Option<i64>> {
    let Some(first) = first else {
        return Ok(None);
    };
    let (score, _) = decode_zscore_key(first)?;
    if let Some(last) = last {
        if decode_zscore_key(last)?.0 != score {
            return Err(ShardError::invalid(
                "lex range requires all members to share one score",
            ));
        }
    }
    Ok(Some(score))
}

/// Index keys from the lex minimum to the end of the shared score
fn lex_keys(tk: &TableKey<'_>, score: i64, min: &LexBound) -> (Vec<u8>, Option<Vec<u8>>) {
    let end = match score.checked_add(1) {
        Some(next) => Some(encode_zscore_key(tk, next, b"")),
        None => index_end(tk),
    };
    let start = match min {
        LexBound::Inclusive(m) | LexBound::Exclusive(m) => encode_zscore_key(tk, score, m),
        LexBound::Min | LexBound::Max => encode_zscore_key(tk, score, b""),
    };
    (start, end)
}

/// Keep members inside the lex bounds, then apply `offset`/`limit`
fn select_by_lex<'b>(
    entries: impl Iterator<Item = (&'b [u8], &'b [u8])>,
    min: &LexBound,
    max: &LexBound,
    offset: usize,
    limit: Option<usize>,
) -> Result<Vec<ScorePair>> {
    let limit = limit.unwrap_or(usize::MAX);
    let mut skipped = 0;
    let mut out = Vec::new();
    for (key, _) in entries {
        if out.len() >= limit {
            break;
        }
        let (score, member) = decode_zscore_key(key)?;
        if !min.admits_from_below(member) {
            continue;
        }
        if !max.admits_from_above(member) {
            break;
        }
        if skipped < offset {
            skipped += 1;
            continue;
        }
        out.push(ScorePair {
            member: member.to_vec(),
            score,
        });
    }
    Ok(out)
}

fn read_card<L: KeyLookup>(src: &L, tk: &TableKey<'_>) -> Result<i64> {
    match src.lookup(&zsize_key(tk)) {
        Some(raw) => decode_i64(&raw),
        None => Ok(0),
    }
}

fn write_card(txn: &mut WriteTxn<'_>, tk: &TableKey<'_>, card: i64) {
    if card > 0 {
        txn.put_root(tk.table, zsize_key(tk), encode_i64(card).to_vec());
    } else {
        txn.delete_root(tk.table, zsize_key(tk));
    }
}

fn read_score<L: KeyLookup>(src: &L, tk: &TableKey<'_>, member: &[u8]) -> Result<Option<i64>> {
    src.lookup(&encode_zset_member(tk, member))
        .map(|raw| decode_i64(&raw))
        .transpose()
}

fn put_member(txn: &mut WriteTxn<'_>, tk: &TableKey<'_>, member: &[u8], score: i64) {
    txn.put(encode_zset_member(tk, member), encode_i64(score).to_vec());
    txn.put(encode_zscore_key(tk, score, member), Vec::new());
}

fn remove_member(txn: &mut WriteTxn<'_>, tk: &TableKey<'_>, member: &[u8], score: i64) {
    txn.delete(encode_zset_member(tk, member));
    txn.delete(encode_zscore_key(tk, score, member));
}

impl Engine {
    // =========================================================================
    // Reads
    // =========================================================================

    pub fn zscore(&self, key: &[u8], member: &[u8]) -> Result<Option<i64>> {
        let tk = self.table_key(key)?;
        let view = self.view()?;
        check_type(&view, &tk, DataType::ZSet)?;
        read_score(&view, &tk, member)
    }

    /// Number of members
    pub fn zcard(&self, key: &[u8]) -> Result<i64> {
        let tk = self.table_key(key)?;
        let view = self.view()?;
        check_type(&view, &tk, DataType::ZSet)?;
        read_card(&view, &tk)
    }

    /// Position in ascending (score, member) order; `None` when absent
    pub fn zrank(&self, key: &[u8], member: &[u8]) -> Result<Option<i64>> {
        self.rank(key, member, false)
    }

    /// Position in descending order; `None` when absent
    pub fn zrevrank(&self, key: &[u8], member: &[u8]) -> Result<Option<i64>> {
        self.rank(key, member, true)
    }

    fn rank(&self, key: &[u8], member: &[u8], reverse: bool) -> Result<Option<i64>> {
        let tk = self.table_key(key)?;
        let view = self.view()?;
        check_type(&view, &tk, DataType::ZSet)?;

        let Some(score) = read_score(&view, &tk, member)? else {
            return Ok(None);
        };
        let prefix = zscore_prefix(&tk);
        let target = encode_zscore_key(&tk, score, member);
        let below = view.range(&prefix, Some(target.as_slice())).count() as i64;
        if reverse {
            Ok(Some(read_card(&view, &tk)? - 1 - below))
        } else {
            Ok(Some(below))
        }
    }

    /// Members between two inclusive ranks, ascending
    pub fn zrange(&self, key: &[u8], start: i64, stop: i64) -> Result<Vec<ScorePair>> {
        self.range_by_rank(key, start, stop, false)
    }

    /// Members between two inclusive ranks of the descending order
    pub fn zrevrange(&self, key: &[u8], start: i64, stop: i64) -> Result<Vec<ScorePair>> {
        self.range_by_rank(key, start, stop, true)
    }

    fn range_by_rank(&self, key: &[u8], start: i64, stop: i64, reverse: bool) -> Result<Vec<ScorePair>> {
        let tk = self.table_key(key)?;
        let view = self.view()?;
        check_type(&view, &tk, DataType::ZSet)?;

        let Some((first, last)) = resolve_rank_range(start, stop, read_card(&view, &tk)?) else {
            return Ok(Vec::new());
        };
        let (skip, take) = (first as usize, (last - first + 1) as usize);
        let prefix = zscore_prefix(&tk);
        let pairs = if reverse {
            collect_pairs(view.prefix(&prefix).rev().skip(skip).take(take))
        } else {
            collect_pairs(view.prefix(&prefix).skip(skip).take(take))
        };
        pairs
    }

    /// Members with `min <= score <= max` (bounds may be exclusive or
    /// infinite), ascending, then `offset`/`limit` applied
    pub fn zrange_by_score(
        &self,
        key: &[u8],
        min: ScoreBound,
        max: ScoreBound,
        offset: usize,
        limit: Option<usize>,
    ) -> Result<Vec<ScorePair>> {
        let tk = self.table_key(key)?;
        let view = self.view()?;
        check_type(&view, &tk, DataType::ZSet)?;

        let (start, end) = score_keys(&tk, &min, &max);
        let pairs = select_by_score(view.range(&start, end.as_deref()), &min, &max, offset, limit);
        pairs
    }

    /// Like [`Engine::zrange_by_score`] but descending; bounds are given
    /// high first
    pub fn zrevrange_by_score(
        &self,
        key: &[u8],
        max: ScoreBound,
        min: ScoreBound,
        offset: usize,
        limit: Option<usize>,
    ) -> Result<Vec<ScorePair>> {
        let tk = self.table_key(key)?;
        let view = self.view()?;
        check_type(&view, &tk, DataType::ZSet)?;

        let (start, end) = score_keys(&tk, &min, &max);
        let pairs = select_by_score(view.range_rev(&start, end.as_deref()), &min, &max, offset, limit);
        pairs
    }

    /// Number of members within a score range
    pub fn zcount(&self, key: &[u8], min: ScoreBound, max: ScoreBound) -> Result<i64> {
        let tk = self.table_key(key)?;
        let view = self.view()?;
        check_type(&view, &tk, DataType::ZSet)?;

        let (start, end) = score_keys(&tk, &min, &max);
        let mut count = 0;
        for (index_key, _) in view.range(&start, end.as_deref()) {
            let (score, _) = decode_zscore_key(index_key)?;
            if min.admits_from_below(score) && max.admits_from_above(score) {
                count += 1;
            }
        }
        Ok(count)
    }

    /// Members within a lexicographic range, then `offset`/`limit` applied
    pub fn zrange_by_lex(
        &self,
        key: &[u8],
        min: LexBound,
        max: LexBound,
        offset: usize,
        limit: Option<usize>,
    ) -> Result<Vec<Vec<u8>>> {
        let pairs = self.lex_pairs(key, &min, &max, offset, limit)?;
        Ok(pairs.into_iter().map(|p| p.member).collect())
    }

    /// Number of members within a lexicographic range
    pub fn zlexcount(&self, key: &[u8], min: LexBound, max: LexBound) -> Result<i64> {
        Ok(self.lex_pairs(key, &min, &max, 0, None)?.len() as i64)
    }

    fn lex_pairs(
        &self,
        key: &[u8],
        min: &LexBound,
        max: &LexBound,
        offset: usize,
        limit: Option<usize>,
    ) -> Result<Vec<ScorePair>> {
        let tk = self.table_key(key)?;
        let view = self.view()?;
        check_type(&view, &tk, DataType::ZSet)?;

        let prefix = zscore_prefix(&tk);
        let score = {
            let mut index = view.prefix(&prefix);
            let first = index.next().map(|(k, _)| k);
            let last = index.next_back().map(|(k, _)| k);
            shared_score(first, last)?
        };
        let Some(score) = score else {
            return Ok(Vec::new());
        };

        let (start, end) = lex_keys(&tk, score, min);
        let pairs = select_by_lex(view.range(&start, end.as_deref()), min, max, offset, limit);
        pairs
    }

    // =========================================================================
    // Writes
    // =========================================================================

    /// Add or update members; returns how many members are new
    pub fn zadd<M: AsRef<[u8]>>(&self, key: &[u8], members: &[(i64, M)]) -> Result<i64> {
        self.write(|txn| self.zadd_in(txn, key, members))
    }

    /// Add `delta` to a member's score (absent = 0); returns the new score
    pub fn zincr_by(&self, key: &[u8], delta: i64, member: &[u8]) -> Result<i64> {
        self.write(|txn| self.zincr_by_in(txn, key, delta, member))
    }

    /// Remove members; returns how many were present
    pub fn zrem<M: AsRef<[u8]>>(&self, key: &[u8], members: &[M]) -> Result<i64> {
        self.write(|txn| self.zrem_in(txn, key, members))
    }

    pub fn zrem_range_by_score(&self, key: &[u8], min: ScoreBound, max: ScoreBound) -> Result<i64> {
        self.write(|txn| self.zrem_range_by_score_in(txn, key, min, max))
    }

    pub fn zrem_range_by_rank(&self, key: &[u8], start: i64, stop: i64) -> Result<i64> {
        self.write(|txn| self.zrem_range_by_rank_in(txn, key, start, stop))
    }

    pub fn zrem_range_by_lex(&self, key: &[u8], min: LexBound, max: LexBound) -> Result<i64> {
        self.write(|txn| self.zrem_range_by_lex_in(txn, key, min, max))
    }

    /// Remove the whole sorted set; returns the number of members removed
    pub fn zclear(&self, key: &[u8]) -> Result<i64> {
        self.write(|txn| self.zclear_in(txn, key))
    }

    /// Remove several sorted sets; returns how many existed
    pub fn zmclear<K: AsRef<[u8]>>(&self, keys: &[K]) -> Result<i64> {
        self.write(|txn| self.zmclear_in(txn, keys))
    }

    // =========================================================================
    // Staged implementations
    // =========================================================================

    fn staged_pairs(&self, txn: &WriteTxn<'_>, tk: &TableKey<'_>) -> Result<Vec<ScorePair>> {
        let entries = txn.scan_prefix(&zscore_prefix(tk));
        collect_pairs(entries.iter().map(|(k, v)| (k.as_slice(), v.as_slice())))
    }

    /// Remove a run of index entries and shrink the cardinality
    fn remove_pairs(&self, txn: &mut WriteTxn<'_>, tk: &TableKey<'_>, doomed: &[ScorePair]) -> Result<i64> {
        if doomed.is_empty() {
            return Ok(0);
        }
        for pair in doomed {
            remove_member(txn, tk, &pair.member, pair.score);
        }
        let card = read_card(txn, tk)?;
        write_card(txn, tk, card - doomed.len() as i64);
        Ok(doomed.len() as i64)
    }

    pub(super) fn zadd_in<M: AsRef<[u8]>>(
        &self,
        txn: &mut WriteTxn<'_>,
        key: &[u8],
        members: &[(i64, M)],
    ) -> Result<i64> {
        ensure_not_empty(members, "score-member pairs")?;
        let tk = self.table_key(key)?;
        check_type(txn, &tk, DataType::ZSet)?;

        let mut added = 0;
        for (score, member) in members {
            let member = member.as_ref();
            match read_score(txn, &tk, member)? {
                Some(old) if old == *score => continue,
                Some(old) => remove_member(txn, &tk, member, old),
                None => added += 1,
            }
            put_member(txn, &tk, member, *score);
        }
        if added > 0 {
            let card = read_card(txn, &tk)?;
            write_card(txn, &tk, card + added);
        }
        Ok(added)
    }

    pub(super) fn zincr_by_in(
        &self,
        txn: &mut WriteTxn<'_>,
        key: &[u8],
        delta: i64,
        member: &[u8],
    ) -> Result<i64> {
        let tk = self.table_key(key)?;
        check_type(txn, &tk, DataType::ZSet)?;

        let old = read_score(txn, &tk, member)?;
        let next = old
            .unwrap_or(0)
            .checked_add(delta)
            .ok_or_else(|| ShardError::invalid("increment or decrement would overflow"))?;

        match old {
            Some(old) => remove_member(txn, &tk, member, old),
            None => {
                let card = read_card(txn, &tk)?;
                write_card(txn, &tk, card + 1);
            }
        }
        put_member(txn, &tk, member, next);
        Ok(next)
    }

    pub(super) fn zrem_in<M: AsRef<[u8]>>(&self, txn: &mut WriteTxn<'_>, key: &[u8], members: &[M]) -> Result<i64> {
        ensure_not_empty(members, "members")?;
        let tk = self.table_key(key)?;
        check_type(txn, &tk, DataType::ZSet)?;

        let mut doomed = Vec::new();
        for member in members {
            let member = member.as_ref();
            if doomed.iter().any(|p: &ScorePair| p.member == member) {
                continue;
            }
            if let Some(score) = read_score(txn, &tk, member)? {
                doomed.push(ScorePair {
                    member: member.to_vec(),
                    score,
                });
            }
        }
        self.remove_pairs(txn, &tk, &doomed)
    }

    pub(super) fn zrem_range_by_score_in(
        &self,
        txn: &mut WriteTxn<'_>,
        key: &[u8],
        min: ScoreBound,
        max: ScoreBound,
    ) -> Result<i64> {
        let tk = self.table_key(key)?;
        check_type(txn, &tk, DataType::ZSet)?;

        let (start, end) = score_keys(&tk, &min, &max);
        let entries = txn.scan_range(&start, end.as_deref());
        let doomed = select_by_score(
            entries.iter().map(|(k, v)| (k.as_slice(), v.as_slice())),
            &min,
            &max,
            0,
            None,
        )?;
        self.remove_pairs(txn, &tk, &doomed)
    }

    pub(super) fn zrem_range_by_rank_in(
        &self,
        txn: &mut WriteTxn<'_>,
        key: &[u8],
        start: i64,
        stop: i64,
    ) -> Result<i64> {
        let tk = self.table_key(key)?;
        check_type(txn, &tk, DataType::ZSet)?;

        let Some((first, last)) = resolve_rank_range(start, stop, read_card(txn, &tk)?) else {
            return Ok(0);
        };
        let pairs = self.staged_pairs(txn, &tk)?;
        let doomed: Vec<ScorePair> = pairs
            .into_iter()
            .skip(first as usize)
            .take((last - first + 1) as usize)
            .collect();
        self.remove_pairs(txn, &tk, &doomed)
    }

    pub(super) fn zrem_range_by_lex_in(
        &self,
        txn: &mut WriteTxn<'_>,
        key: &[u8],
        min: LexBound,
        max: LexBound,
    ) -> Result<i64> {
        let tk = self.table_key(key)?;
        check_type(txn, &tk, DataType::ZSet)?;

        let prefix = zscore_prefix(&tk);
        let first = txn.edge_key(&prefix, false);
        let last = txn.edge_key(&prefix, true);
        let Some(score) = shared_score(first.as_deref(), last.as_deref())? else {
            return Ok(0);
        };

        let (start, end) = lex_keys(&tk, score, &min);
        let entries = txn.scan_range(&start, end.as_deref());
        let doomed = select_by_lex(
            entries.iter().map(|(k, v)| (k.as_slice(), v.as_slice())),
            &min,
            &max,
            0,
            None,
        )?;
        self.remove_pairs(txn, &tk, &doomed)
    }

    pub(super) fn zclear_in(&self, txn: &mut WriteTxn<'_>, key: &[u8]) -> Result<i64> {
        let tk = self.table_key(key)?;
        check_type(txn, &tk, DataType::ZSet)?;
        let pairs = self.staged_pairs(txn, &tk)?;
        self.remove_pairs(txn, &tk, &pairs)
    }

    pub(super) fn zmclear_in<K: AsRef<[u8]>>(&self, txn: &mut WriteTxn<'_>, keys: &[K]) -> Result<i64> {
        ensure_not_empty(keys, "keys")?;
        let mut cleared = 0;
        for key in keys {
            if self.zclear_in(txn, key.as_ref())? > 0 {
                cleared += 1;
            }
        }
        Ok(cleared)
    }
}

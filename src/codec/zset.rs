//! Sorted set encodings and range bounds
//!
//! - `ZSIZE  [table][rest]` → cardinality
//! - `ZSET   [table][rest][member]` → score
//! - `ZSCORE [table][rest][score][member]` → empty
//!
//! The score index orders members by (score, member bytes), which is the order
//! rank and score-range operations walk.

use serde::{Deserialize, Serialize};

use crate::error::{Result, ShardError};

use super::key::{decode_key, encode_root, encode_sub, sub_prefix, TableKey};
use super::{decode_sortable_i64, encode_sortable_i64, tag};

/// Root record holding the cardinality
pub fn zsize_key(key: &TableKey<'_>) -> Vec<u8> {
    encode_root(tag::ZSIZE, key)
}

/// Member record (value = score)
pub fn encode_zset_member(key: &TableKey<'_>, member: &[u8]) -> Vec<u8> {
    encode_sub(tag::ZSET, key, member)
}

/// Score index record
pub fn encode_zscore_key(key: &TableKey<'_>, score: i64, member: &[u8]) -> Vec<u8> {
    let mut suffix = Vec::with_capacity(8 + member.len());
    suffix.extend_from_slice(&encode_sortable_i64(score));
    suffix.extend_from_slice(member);
    encode_sub(tag::ZSCORE, key, &suffix)
}

/// Prefix of the whole score index of one sorted set
pub fn zscore_prefix(key: &TableKey<'_>) -> Vec<u8> {
    sub_prefix(tag::ZSCORE, key)
}

/// Split a score index key into (score, member)
pub fn decode_zscore_key(encoded: &[u8]) -> Result<(i64, &[u8])> {
    let decoded = decode_key(encoded)?;
    if decoded.tag != tag::ZSCORE || decoded.suffix.len() < 8 {
        return Err(ShardError::Storage(format!(
            "expected zset score key, found tag {:#04x}",
            decoded.tag
        )));
    }
    let score = decode_sortable_i64(&decoded.suffix[..8])?;
    Ok((score, &decoded.suffix[8..]))
}

// =============================================================================
// Score bounds
// =============================================================================

/// One end of a score range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScoreBound {
    /// `-inf`
    NegInf,
    /// `+inf`
    PosInf,
    /// `n`
    Inclusive(i64),
    /// `(n`
    Exclusive(i64),
}

impl ScoreBound {
    /// Parse `-inf`, `+inf`, `n` or `(n`
    pub fn parse(raw: &[u8]) -> Result<Self> {
        let text = std::str::from_utf8(raw)
            .map_err(|_| ShardError::invalid("score bound is not utf-8"))?;
        match text.to_ascii_lowercase().as_str() {
            "-inf" => return Ok(ScoreBound::NegInf),
            "+inf" | "inf" => return Ok(ScoreBound::PosInf),
            _ => {}
        }
        let (exclusive, digits) = match text.strip_prefix('(') {
            Some(rest) => (true, rest),
            None => (false, text),
        };
        let score: i64 = digits
            .parse()
            .map_err(|_| ShardError::invalid(format!("invalid score bound: {}", text)))?;
        Ok(if exclusive {
            ScoreBound::Exclusive(score)
        } else {
            ScoreBound::Inclusive(score)
        })
    }

    /// Whether `score` is on the admitted side of this bound used as a minimum
    pub fn admits_from_below(&self, score: i64) -> bool {
        match *self {
            ScoreBound::NegInf => true,
            ScoreBound::PosInf => false,
            ScoreBound::Inclusive(min) => score >= min,
            ScoreBound::Exclusive(min) => score > min,
        }
    }

    /// Whether `score` is on the admitted side of this bound used as a maximum
    pub fn admits_from_above(&self, score: i64) -> bool {
        match *self {
            ScoreBound::NegInf => false,
            ScoreBound::PosInf => true,
            ScoreBound::Inclusive(max) => score <= max,
            ScoreBound::Exclusive(max) => score < max,
        }
    }

    /// Smallest score this bound admits as a minimum (scan start)
    pub fn floor(&self) -> i64 {
        match *self {
            ScoreBound::NegInf => i64::MIN,
            ScoreBound::PosInf => i64::MAX,
            ScoreBound::Inclusive(s) => s,
            ScoreBound::Exclusive(s) => s.saturating_add(1),
        }
    }

    /// Largest score this bound admits as a maximum (scan end)
    pub fn ceiling(&self) -> i64 {
        match *self {
            ScoreBound::NegInf => i64::MIN,
            ScoreBound::PosInf => i64::MAX,
            ScoreBound::Inclusive(s) => s,
            ScoreBound::Exclusive(s) => s.saturating_sub(1),
        }
    }
}

impl From<i64> for ScoreBound {
    fn from(score: i64) -> Self {
        ScoreBound::Inclusive(score)
    }
}

// =============================================================================
// Lex bounds
// =============================================================================

/// One end of a lexicographic member range
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LexBound {
    /// `-`: below every member
    Min,
    /// `+`: above every member
    Max,
    /// `[member`
    Inclusive(Vec<u8>),
    /// `(member`
    Exclusive(Vec<u8>),
}

impl LexBound {
    /// Parse `-`, `+`, `[member` or `(member`
    pub fn parse(raw: &[u8]) -> Result<Self> {
        match raw {
            b"-" => Ok(LexBound::Min),
            b"+" => Ok(LexBound::Max),
            [b'[', member @ ..] => Ok(LexBound::Inclusive(member.to_vec())),
            [b'(', member @ ..] => Ok(LexBound::Exclusive(member.to_vec())),
            _ => Err(ShardError::invalid(
                "lex bound must start with '[' or '(' or be '-' or '+'",
            )),
        }
    }

    /// Whether `member` is admitted by this bound used as a minimum
    pub fn admits_from_below(&self, member: &[u8]) -> bool {
        match self {
            LexBound::Min => true,
            LexBound::Max => false,
            LexBound::Inclusive(min) => member >= min.as_slice(),
            LexBound::Exclusive(min) => member > min.as_slice(),
        }
    }

    /// Whether `member` is admitted by this bound used as a maximum
    pub fn admits_from_above(&self, member: &[u8]) -> bool {
        match self {
            LexBound::Min => false,
            LexBound::Max => true,
            LexBound::Inclusive(max) => member <= max.as_slice(),
            LexBound::Exclusive(max) => member < max.as_slice(),
        }
    }
}

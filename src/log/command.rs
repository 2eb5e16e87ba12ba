//! Command definitions
//!
//! One variant per mutation the storage engine supports. Reads never go
//! through the log, so they have no variant here.

use serde::{Deserialize, Serialize};

use crate::codec::{LexBound, ScoreBound};

/// A mutation proposed to the consensus log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Command {
    // -------------------------------------------------------------------------
    // Strings and bits
    // -------------------------------------------------------------------------
    Set { key: Vec<u8>, value: Vec<u8> },
    SetNx { key: Vec<u8>, value: Vec<u8> },
    GetSet { key: Vec<u8>, value: Vec<u8> },
    Append { key: Vec<u8>, value: Vec<u8> },
    SetRange { key: Vec<u8>, offset: i64, value: Vec<u8> },
    Del { keys: Vec<Vec<u8>> },
    MSet { pairs: Vec<(Vec<u8>, Vec<u8>)> },
    IncrBy { key: Vec<u8>, delta: i64 },
    SetBit { key: Vec<u8>, offset: u64, on: bool },

    // -------------------------------------------------------------------------
    // Hashes
    // -------------------------------------------------------------------------
    HSet { key: Vec<u8>, field: Vec<u8>, value: Vec<u8> },
    HMSet { key: Vec<u8>, pairs: Vec<(Vec<u8>, Vec<u8>)> },
    HDel { key: Vec<u8>, fields: Vec<Vec<u8>> },
    HIncrBy { key: Vec<u8>, field: Vec<u8>, delta: i64 },
    HClear { key: Vec<u8> },
    HMClear { keys: Vec<Vec<u8>> },

    // -------------------------------------------------------------------------
    // Lists
    // -------------------------------------------------------------------------
    LPush { key: Vec<u8>, values: Vec<Vec<u8>> },
    RPush { key: Vec<u8>, values: Vec<Vec<u8>> },
    LPop { key: Vec<u8> },
    RPop { key: Vec<u8> },
    LSet { key: Vec<u8>, index: i64, value: Vec<u8> },
    LTrimFront { key: Vec<u8>, count: i64 },
    LTrimBack { key: Vec<u8>, count: i64 },
    LClear { key: Vec<u8> },
    LMClear { keys: Vec<Vec<u8>> },

    // -------------------------------------------------------------------------
    // Sets
    // -------------------------------------------------------------------------
    SAdd { key: Vec<u8>, members: Vec<Vec<u8>> },
    SRem { key: Vec<u8>, members: Vec<Vec<u8>> },
    SClear { key: Vec<u8> },
    SMClear { keys: Vec<Vec<u8>> },

    // -------------------------------------------------------------------------
    // Sorted sets
    // -------------------------------------------------------------------------
    ZAdd { key: Vec<u8>, members: Vec<(i64, Vec<u8>)> },
    ZIncrBy { key: Vec<u8>, delta: i64, member: Vec<u8> },
    ZRem { key: Vec<u8>, members: Vec<Vec<u8>> },
    ZRemRangeByScore { key: Vec<u8>, min: ScoreBound, max: ScoreBound },
    ZRemRangeByRank { key: Vec<u8>, start: i64, stop: i64 },
    ZRemRangeByLex { key: Vec<u8>, min: LexBound, max: LexBound },
    ZClear { key: Vec<u8> },
    ZMClear { keys: Vec<Vec<u8>> },
}

impl Command {
    /// Short upper-case name, used in logs
    pub fn name(&self) -> &'static str {
        match self {
            Command::Set { .. } => "SET",
            Command::SetNx { .. } => "SETNX",
            Command::GetSet { .. } => "GETSET",
            Command::Append { .. } => "APPEND",
            Command::SetRange { .. } => "SETRANGE",
            Command::Del { .. } => "DEL",
            Command::MSet { .. } => "MSET",
            Command::IncrBy { .. } => "INCRBY",
            Command::SetBit { .. } => "SETBIT",
            Command::HSet { .. } => "HSET",
            Command::HMSet { .. } => "HMSET",
            Command::HDel { .. } => "HDEL",
            Command::HIncrBy { .. } => "HINCRBY",
            Command::HClear { .. } => "HCLEAR",
            Command::HMClear { .. } => "HMCLEAR",
            Command::LPush { .. } => "LPUSH",
            Command::RPush { .. } => "RPUSH",
            Command::LPop { .. } => "LPOP",
            Command::RPop { .. } => "RPOP",
            Command::LSet { .. } => "LSET",
            Command::LTrimFront { .. } => "LTRIM_FRONT",
            Command::LTrimBack { .. } => "LTRIM_BACK",
            Command::LClear { .. } => "LCLEAR",
            Command::LMClear { .. } => "LMCLEAR",
            Command::SAdd { .. } => "SADD",
            Command::SRem { .. } => "SREM",
            Command::SClear { .. } => "SCLEAR",
            Command::SMClear { .. } => "SMCLEAR",
            Command::ZAdd { .. } => "ZADD",
            Command::ZIncrBy { .. } => "ZINCRBY",
            Command::ZRem { .. } => "ZREM",
            Command::ZRemRangeByScore { .. } => "ZREMRANGEBYSCORE",
            Command::ZRemRangeByRank { .. } => "ZREMRANGEBYRANK",
            Command::ZRemRangeByLex { .. } => "ZREMRANGEBYLEX",
            Command::ZClear { .. } => "ZCLEAR",
            Command::ZMClear { .. } => "ZMCLEAR",
        }
    }
}

/// A committed command and its position in the partition's log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    /// Log position; strictly increasing, starting at 1
    pub index: u64,
    pub command: Command,
}

impl LogEntry {
    pub fn new(index: u64, command: Command) -> Self {
        Self { index, command }
    }
}

//! Committed log apply
//!
//! Entries arrive in log order, possibly more than once after a crash
//! restart. The applied index is written in the same batch as the command's
//! effects, so an entry is either fully applied with its position recorded,
//! or not applied at all.

use crate::error::Result;
use crate::log::{Command, LogEntry, Reply};

use super::txn::WriteTxn;
use super::Engine;

impl Engine {
    /// Apply one committed entry exactly once
    ///
    /// - `index <= applied_index`: nothing is written, returns [`Reply::Duplicate`]
    /// - otherwise the command runs and the index is recorded in the same batch
    /// - a failing command records the index with no other effect, so replay
    ///   stays deterministic, and the error is returned
    pub fn apply(&self, entry: &LogEntry) -> Result<Reply> {
        let outcome = self.write_at(entry.index, |txn| self.execute(txn, &entry.command));
        match outcome {
            Ok(Some(reply)) => Ok(reply),
            Ok(None) => {
                tracing::debug!(index = entry.index, command = entry.command.name(), "skipping redelivered entry");
                Ok(Reply::Duplicate)
            }
            Err(e) => {
                tracing::debug!(index = entry.index, command = entry.command.name(), error = %e, "committed entry failed");
                Err(e)
            }
        }
    }

    fn execute(&self, txn: &mut WriteTxn<'_>, command: &Command) -> Result<Reply> {
        let reply = match command {
            // Strings and bits
            Command::Set { key, value } => {
                self.set_in(txn, key, value)?;
                Reply::Ok
            }
            Command::SetNx { key, value } => Reply::Int(self.set_nx_in(txn, key, value)?),
            Command::GetSet { key, value } => Reply::Value(self.get_set_in(txn, key, value)?),
            Command::Append { key, value } => Reply::Int(self.append_in(txn, key, value)?),
            Command::SetRange { key, offset, value } => {
                Reply::Int(self.set_range_in(txn, key, *offset, value)?)
            }
            Command::Del { keys } => Reply::Int(self.del_in(txn, keys.as_slice())?),
            Command::MSet { pairs } => Reply::Statuses(self.mset_in(txn, pairs.as_slice())?),
            Command::IncrBy { key, delta } => Reply::Int(self.incr_by_in(txn, key, *delta)?),
            Command::SetBit { key, offset, on } => {
                Reply::Int(self.set_bit_in(txn, key, *offset, *on)? as i64)
            }

            // Hashes
            Command::HSet { key, field, value } => Reply::Int(self.hset_in(txn, key, field, value)?),
            Command::HMSet { key, pairs } => {
                self.hmset_in(txn, key, pairs.as_slice())?;
                Reply::Ok
            }
            Command::HDel { key, fields } => Reply::Int(self.hdel_in(txn, key, fields.as_slice())?),
            Command::HIncrBy { key, field, delta } => {
                Reply::Int(self.hincr_by_in(txn, key, field, *delta)?)
            }
            Command::HClear { key } => Reply::Int(self.hclear_in(txn, key)?),
            Command::HMClear { keys } => Reply::Int(self.hmclear_in(txn, keys.as_slice())?),

            // Lists
            Command::LPush { key, values } => Reply::Int(self.lpush_in(txn, key, values.as_slice())?),
            Command::RPush { key, values } => Reply::Int(self.rpush_in(txn, key, values.as_slice())?),
            Command::LPop { key } => Reply::Value(self.lpop_in(txn, key)?),
            Command::RPop { key } => Reply::Value(self.rpop_in(txn, key)?),
            Command::LSet { key, index, value } => {
                self.lset_in(txn, key, *index, value)?;
                Reply::Ok
            }
            Command::LTrimFront { key, count } => Reply::Int(self.ltrim_front_in(txn, key, *count)?),
            Command::LTrimBack { key, count } => Reply::Int(self.ltrim_back_in(txn, key, *count)?),
            Command::LClear { key } => Reply::Int(self.lclear_in(txn, key)?),
            Command::LMClear { keys } => Reply::Int(self.lmclear_in(txn, keys.as_slice())?),

            // Sets
            Command::SAdd { key, members } => Reply::Int(self.sadd_in(txn, key, members.as_slice())?),
            Command::SRem { key, members } => Reply::Int(self.srem_in(txn, key, members.as_slice())?),
            Command::SClear { key } => Reply::Int(self.sclear_in(txn, key)?),
            Command::SMClear { keys } => Reply::Int(self.smclear_in(txn, keys.as_slice())?),

            // Sorted sets
            Command::ZAdd { key, members } => Reply::Int(self.zadd_in(txn, key, members.as_slice())?),
            Command::ZIncrBy { key, delta, member } => {
                Reply::Int(self.zincr_by_in(txn, key, *delta, member)?)
            }
            Command::ZRem { key, members } => Reply::Int(self.zrem_in(txn, key, members.as_slice())?),
            Command::ZRemRangeByScore { key, min, max } => {
                Reply::Int(self.zrem_range_by_score_in(txn, key, *min, *max)?)
            }
            Command::ZRemRangeByRank { key, start, stop } => {
                Reply::Int(self.zrem_range_by_rank_in(txn, key, *start, *stop)?)
            }
            Command::ZRemRangeByLex { key, min, max } => {
                Reply::Int(self.zrem_range_by_lex_in(txn, key, min.clone(), max.clone())?)
            }
            Command::ZClear { key } => Reply::Int(self.zclear_in(txn, key)?),
            Command::ZMClear { keys } => Reply::Int(self.zmclear_in(txn, keys.as_slice())?),
        };
        Ok(reply)
    }
}

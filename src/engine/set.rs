//! Set operations

use crate::codec::{
    decode_i64, decode_set_member, encode_i64, encode_set_member, set_member_prefix, ssize_key,
    DataType, TableKey,
};
use crate::error::Result;

use super::txn::{KeyLookup, WriteTxn};
use super::{check_type, ensure_not_empty, Engine};

fn read_card<L: KeyLookup>(src: &L, tk: &TableKey<'_>) -> Result<i64> {
    match src.lookup(&ssize_key(tk)) {
        Some(raw) => decode_i64(&raw),
        None => Ok(0),
    }
}

fn write_card(txn: &mut WriteTxn<'_>, tk: &TableKey<'_>, card: i64) {
    if card > 0 {
        txn.put_root(tk.table, ssize_key(tk), encode_i64(card).to_vec());
    } else {
        txn.delete_root(tk.table, ssize_key(tk));
    }
}

impl Engine {
    // =========================================================================
    // Reads
    // =========================================================================

    pub fn sismember(&self, key: &[u8], member: &[u8]) -> Result<bool> {
        let tk = self.table_key(key)?;
        let view = self.view()?;
        check_type(&view, &tk, DataType::Set)?;
        Ok(view.contains(&encode_set_member(&tk, member)))
    }

    /// All members (in byte order, though callers should not rely on it)
    pub fn smembers(&self, key: &[u8]) -> Result<Vec<Vec<u8>>> {
        let tk = self.table_key(key)?;
        let view = self.view()?;
        check_type(&view, &tk, DataType::Set)?;

        let prefix = set_member_prefix(&tk);
        let members = view
            .prefix(&prefix)
            .map(|(k, _)| Ok(decode_set_member(k)?.to_vec()))
            .collect::<Result<Vec<_>>>();
        members
    }

    /// Number of members
    pub fn scard(&self, key: &[u8]) -> Result<i64> {
        let tk = self.table_key(key)?;
        let view = self.view()?;
        check_type(&view, &tk, DataType::Set)?;
        read_card(&view, &tk)
    }

    // =========================================================================
    // Writes
    // =========================================================================

    /// Add members; returns how many were not already present
    pub fn sadd<M: AsRef<[u8]>>(&self, key: &[u8], members: &[M]) -> Result<i64> {
        self.write(|txn| self.sadd_in(txn, key, members))
    }

    /// Remove members; returns how many were present
    pub fn srem<M: AsRef<[u8]>>(&self, key: &[u8], members: &[M]) -> Result<i64> {
        self.write(|txn| self.srem_in(txn, key, members))
    }

    /// Remove the whole set; returns the number of members removed
    pub fn sclear(&self, key: &[u8]) -> Result<i64> {
        self.write(|txn| self.sclear_in(txn, key))
    }

    /// Remove several sets; returns how many existed
    pub fn smclear<K: AsRef<[u8]>>(&self, keys: &[K]) -> Result<i64> {
        self.write(|txn| self.smclear_in(txn, keys))
    }

    // =========================================================================
    // Staged implementations
    // =========================================================================

    pub(super) fn sadd_in<M: AsRef<[u8]>>(&self, txn: &mut WriteTxn<'_>, key: &[u8], members: &[M]) -> Result<i64> {
        ensure_not_empty(members, "members")?;
        let tk = self.table_key(key)?;
        check_type(txn, &tk, DataType::Set)?;

        let mut added = 0;
        for member in members {
            let member_key = encode_set_member(&tk, member.as_ref());
            if !txn.contains(&member_key) {
                txn.put(member_key, Vec::new());
                added += 1;
            }
        }
        if added > 0 {
            let card = read_card(txn, &tk)?;
            write_card(txn, &tk, card + added);
        }
        Ok(added)
    }

    pub(super) fn srem_in<M: AsRef<[u8]>>(&self, txn: &mut WriteTxn<'_>, key: &[u8], members: &[M]) -> Result<i64> {
        ensure_not_empty(members, "members")?;
        let tk = self.table_key(key)?;
        check_type(txn, &tk, DataType::Set)?;

        let mut removed = 0;
        for member in members {
            let member_key = encode_set_member(&tk, member.as_ref());
            if txn.contains(&member_key) {
                txn.delete(member_key);
                removed += 1;
            }
        }
        if removed > 0 {
            let card = read_card(txn, &tk)?;
            write_card(txn, &tk, card - removed);
        }
        Ok(removed)
    }

    pub(super) fn sclear_in(&self, txn: &mut WriteTxn<'_>, key: &[u8]) -> Result<i64> {
        let tk = self.table_key(key)?;
        check_type(txn, &tk, DataType::Set)?;

        let members = txn.scan_prefix(&set_member_prefix(&tk));
        let removed = members.len() as i64;
        for (member_key, _) in members {
            txn.delete(member_key);
        }
        txn.delete_root(tk.table, ssize_key(&tk));
        Ok(removed)
    }

    pub(super) fn smclear_in<K: AsRef<[u8]>>(&self, txn: &mut WriteTxn<'_>, keys: &[K]) -> Result<i64> {
        ensure_not_empty(keys, "keys")?;
        let mut cleared = 0;
        for key in keys {
            if self.sclear_in(txn, key.as_ref())? > 0 {
                cleared += 1;
            }
        }
        Ok(cleared)
    }
}

//! Table-scoped key iteration
//!
//! Keys of one type under one table are walked in encoded order: shorter
//! keys first, then bytewise. A cursor is the last user key a caller saw;
//! the next page starts strictly after it (or strictly before it, in
//! reverse). An empty cursor starts at the table's first (or last) key.

use crate::codec::{decode_key, encode_root, table_prefix, DataType};
use crate::error::{Result, ShardError};
use crate::substrate::prefix_end;

use super::Engine;

impl Engine {
    /// Up to `count` keys of `data_type` in `table`, after `cursor`
    pub fn scan(
        &self,
        data_type: DataType,
        table: &[u8],
        cursor: &[u8],
        count: usize,
    ) -> Result<Vec<Vec<u8>>> {
        let tag = data_type.root_tag();
        let prefix = self.scan_prefix(tag, table)?;
        let after = self.scan_cursor(tag, table, cursor)?;
        let end = prefix_end(&prefix);
        let view = self.view()?;

        let start = after.as_deref().unwrap_or(&prefix[..]);
        let keys = view
            .range(start, end.as_deref())
            .filter(|(k, _)| Some(*k) != after.as_deref())
            .take(count)
            .map(|(k, _)| self.user_key(k))
            .collect::<Result<Vec<_>>>();
        keys
    }

    /// Up to `count` keys of `data_type` in `table`, before `cursor`, last first
    pub fn rev_scan(
        &self,
        data_type: DataType,
        table: &[u8],
        cursor: &[u8],
        count: usize,
    ) -> Result<Vec<Vec<u8>>> {
        let tag = data_type.root_tag();
        let prefix = self.scan_prefix(tag, table)?;
        let before = match self.scan_cursor(tag, table, cursor)? {
            Some(encoded) => Some(encoded),
            None => prefix_end(&prefix),
        };
        let view = self.view()?;

        let keys = view
            .range_rev(&prefix, before.as_deref())
            .take(count)
            .map(|(k, _)| self.user_key(k))
            .collect::<Result<Vec<_>>>();
        keys
    }

    // =========================================================================
    // Internal helpers
    // =========================================================================

    fn scan_prefix(&self, tag: u8, table: &[u8]) -> Result<Vec<u8>> {
        if self.config.table_counter {
            if table.is_empty() {
                return Err(ShardError::invalid("scan needs a table"));
            }
            if table.len() > u16::MAX as usize {
                return Err(ShardError::invalid("table name too long"));
            }
        } else if !table.is_empty() {
            return Err(ShardError::invalid("tables are disabled"));
        }
        Ok(table_prefix(tag, table))
    }

    /// Encoded root key of a non-empty cursor, which must lie in `table`
    fn scan_cursor(&self, tag: u8, table: &[u8], cursor: &[u8]) -> Result<Option<Vec<u8>>> {
        if cursor.is_empty() {
            return Ok(None);
        }
        let tk = self.table_key(cursor)?;
        if tk.table != table {
            return Err(ShardError::invalid("cursor belongs to another table"));
        }
        Ok(Some(encode_root(tag, &tk)))
    }

    /// Rebuild the user key a root record was stored under
    fn user_key(&self, encoded: &[u8]) -> Result<Vec<u8>> {
        let parts = decode_key(encoded)?;
        if !self.config.table_counter {
            return Ok(parts.rest.to_vec());
        }
        let mut key = Vec::with_capacity(parts.table.len() + 1 + parts.rest.len());
        key.extend_from_slice(parts.table);
        key.push(self.config.table_delimiter);
        key.extend_from_slice(parts.rest);
        Ok(key)
    }
}

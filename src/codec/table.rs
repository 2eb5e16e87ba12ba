//! Bookkeeping keys

use bytes::{BufMut, BytesMut};

use super::tag;

/// Counter record for one table: `[TABLE_COUNT][len][table]`
pub fn table_count_key(table: &[u8]) -> Vec<u8> {
    let mut buf = BytesMut::with_capacity(3 + table.len());
    buf.put_u8(tag::TABLE_COUNT);
    buf.put_u16(table.len() as u16);
    buf.put_slice(table);
    buf.to_vec()
}

/// Record holding the last applied log position
pub fn applied_index_key() -> Vec<u8> {
    let mut key = vec![tag::META];
    key.extend_from_slice(b"applied_index");
    key
}

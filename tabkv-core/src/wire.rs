/// Object and enumeration page wire format
///
/// Object layout (little-endian):
///
/// ```text
/// +-------------+-----------+-------------+---------------+
/// | key_len u16 | key bytes | value bytes | version u64   |
/// +-------------+-----------+-------------+---------------+
/// ```
///
/// The value length is implied by the enclosing record length. A page is a
/// sequence of `[u32 record_len][record_len bytes]` records with no padding;
/// the records must consume exactly the page's declared total length.

use crate::types::{ContinuationToken, Object, Version, MAX_KEY_LENGTH};
use crate::{Error, Result};
use bytes::{Buf, BufMut, Bytes, BytesMut};

const KEY_LEN_SIZE: usize = 2;
const VERSION_SIZE: usize = 8;
const RECORD_LEN_SIZE: usize = 4;

/// Fixed per-object overhead inside a record
pub const OBJECT_OVERHEAD: usize = KEY_LEN_SIZE + VERSION_SIZE;

/// One undecoded enumeration page as produced by the cluster
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawPage {
    /// Token to pass back to continue the scan
    pub next_token: ContinuationToken,
    /// Declared number of meaningful bytes in `buffer`
    pub total_length: u32,
    pub buffer: Bytes,
}

impl RawPage {
    pub fn empty(next_token: ContinuationToken) -> Self {
        Self {
            next_token,
            total_length: 0,
            buffer: Bytes::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.total_length == 0
    }
}

/// Size of an encoded object.
pub fn encoded_object_len(key: &[u8], value: &[u8]) -> usize {
    OBJECT_OVERHEAD + key.len() + value.len()
}

/// Append one encoded object to `buf`.
///
/// Keys must already have passed `validate_key`; the length prefix is only
/// 16 bits wide.
pub fn encode_object(buf: &mut BytesMut, key: &[u8], value: &[u8], version: Version) {
    debug_assert!(
        key.len() <= MAX_KEY_LENGTH,
        "key of {} bytes does not fit the u16 length prefix",
        key.len()
    );
    buf.reserve(encoded_object_len(key, value));
    buf.put_u16_le(key.len() as u16);
    buf.put_slice(key);
    buf.put_slice(value);
    buf.put_u64_le(version);
}

/// Decode one object. Key and value share storage with `blob`.
pub fn decode_object(blob: Bytes) -> Result<Object> {
    if blob.len() < OBJECT_OVERHEAD {
        return Err(Error::Corruption(format!(
            "object record of {} bytes is shorter than the {} byte header",
            blob.len(),
            OBJECT_OVERHEAD
        )));
    }

    let key_len = (&blob[..KEY_LEN_SIZE]).get_u16_le() as usize;
    if key_len == 0 {
        return Err(Error::Corruption("object record has an empty key".to_string()));
    }
    let value_end = blob.len() - VERSION_SIZE;
    let key_end = KEY_LEN_SIZE + key_len;
    if key_end > value_end {
        return Err(Error::Corruption(format!(
            "key length {} overruns object record of {} bytes",
            key_len,
            blob.len()
        )));
    }

    let version = (&blob[value_end..]).get_u64_le();
    Ok(Object {
        key: blob.slice(KEY_LEN_SIZE..key_end),
        value: blob.slice(key_end..value_end),
        version,
    })
}

/// Decode every record in a page.
///
/// The running offset must land exactly on `total_length`; anything else is
/// corruption rather than a short read.
pub fn decode_page(page: &RawPage) -> Result<Vec<Object>> {
    let total = page.total_length as usize;
    if page.buffer.len() < total {
        return Err(Error::Corruption(format!(
            "page declares {} bytes but buffer holds {}",
            total,
            page.buffer.len()
        )));
    }

    let mut objects = Vec::new();
    let mut offset = 0usize;
    while offset < total {
        if offset + RECORD_LEN_SIZE > total {
            return Err(Error::Corruption(format!(
                "record length prefix at offset {} overshoots page length {}",
                offset, total
            )));
        }
        let record_len = (&page.buffer[offset..offset + RECORD_LEN_SIZE]).get_u32_le() as usize;
        offset += RECORD_LEN_SIZE;

        let end = offset
            .checked_add(record_len)
            .filter(|end| *end <= total)
            .ok_or_else(|| {
                Error::Corruption(format!(
                    "record of {} bytes at offset {} overshoots page length {}",
                    record_len, offset, total
                ))
            })?;

        objects.push(decode_object(page.buffer.slice(offset..end))?);
        offset = end;
    }

    Ok(objects)
}

/// Incrementally builds an enumeration page.
#[derive(Debug, Default)]
pub struct PageBuilder {
    buf: BytesMut,
    records: usize,
}

impl PageBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bytes a record for this object would add to the page.
    pub fn record_len(key: &[u8], value: &[u8]) -> usize {
        RECORD_LEN_SIZE + encoded_object_len(key, value)
    }

    pub fn push(&mut self, key: &[u8], value: &[u8], version: Version) {
        let object_len = encoded_object_len(key, value);
        debug_assert!(
            object_len <= u32::MAX as usize,
            "object of {} bytes does not fit the u32 record prefix",
            object_len
        );
        self.buf.put_u32_le(object_len as u32);
        encode_object(&mut self.buf, key, value, version);
        self.records += 1;
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records == 0
    }

    pub fn records(&self) -> usize {
        self.records
    }

    pub fn finish(self, next_token: ContinuationToken) -> RawPage {
        let buffer = self.buf.freeze();
        RawPage {
            next_token,
            total_length: buffer.len() as u32,
            buffer,
        }
    }
}

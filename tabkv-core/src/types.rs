use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{Error, Result};

/// Object version. Starts at 1 on the first write of a key and strictly
/// increases on every later write to it.
pub type Version = u64;

/// Version reported for keys that do not exist.
pub const VERSION_NONEXISTENT: Version = 0;

/// Largest key accepted on the wire (key length is a 16-bit field).
pub const MAX_KEY_LENGTH: usize = u16::MAX as usize;

/// Opaque 64-bit table handle, stable until the table is dropped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TableId(pub u64);

impl fmt::Display for TableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A stored object as returned by reads and enumeration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Object {
    pub key: Bytes,
    pub value: Bytes,
    pub version: Version,
}

impl Object {
    pub fn new(key: impl Into<Bytes>, value: impl Into<Bytes>, version: Version) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            version,
        }
    }

    /// Lossy UTF-8 view of the key, for display.
    pub fn key_str(&self) -> String {
        String::from_utf8_lossy(&self.key).into_owned()
    }

    /// Lossy UTF-8 view of the value, for display.
    pub fn value_str(&self) -> String {
        String::from_utf8_lossy(&self.value).into_owned()
    }

    /// Interpret the value as a counter written by [`counter_value`].
    pub fn as_counter(&self) -> Option<i64> {
        decode_counter(&self.value)
    }
}

/// Opaque scan position handed back and forth during table enumeration.
///
/// `START` begins a scan; `END` is returned once no further page exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContinuationToken(pub u64);

impl ContinuationToken {
    pub const START: ContinuationToken = ContinuationToken(0);
    pub const END: ContinuationToken = ContinuationToken(u64::MAX);

    pub fn is_end(&self) -> bool {
        *self == Self::END
    }
}

impl Default for ContinuationToken {
    fn default() -> Self {
        Self::START
    }
}

/// Encode a counter as the 8-byte little-endian value `increment` operates on.
pub fn counter_value(value: i64) -> Bytes {
    Bytes::copy_from_slice(&value.to_le_bytes())
}

/// Decode a counter value; `None` unless the value is exactly 8 bytes.
pub fn decode_counter(value: &[u8]) -> Option<i64> {
    let raw: [u8; 8] = value.try_into().ok()?;
    Some(i64::from_le_bytes(raw))
}

/// Validate a key for transmission.
pub fn validate_key(key: &[u8]) -> Result<()> {
    if key.is_empty() {
        return Err(Error::InvalidArgument("key must not be empty".to_string()));
    }
    if key.len() > MAX_KEY_LENGTH {
        return Err(Error::InvalidArgument(format!(
            "key length {} exceeds maximum {}",
            key.len(),
            MAX_KEY_LENGTH
        )));
    }
    Ok(())
}

/// 32-bit key hash used to place keys on tablets.
pub fn key_hash(key: &[u8]) -> u64 {
    crc32fast::hash(key) as u64
}

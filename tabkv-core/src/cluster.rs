/// The storage collaborator seam
///
/// Everything behind this trait (replication, placement, transport, retry)
/// belongs to the cluster. Every method blocks for one logical round trip.

use crate::rules::RejectRules;
use crate::status::Status;
use crate::types::{ContinuationToken, Object, TableId, Version};
use crate::wire::RawPage;
use crate::Result;
use bytes::Bytes;

/// One member of a batched round trip
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MultiOp {
    Read {
        table: TableId,
        key: Bytes,
        rules: Option<RejectRules>,
    },
    Write {
        table: TableId,
        key: Bytes,
        value: Bytes,
        rules: Option<RejectRules>,
    },
}

impl MultiOp {
    pub fn table(&self) -> TableId {
        match self {
            MultiOp::Read { table, .. } | MultiOp::Write { table, .. } => *table,
        }
    }

    pub fn key(&self) -> &Bytes {
        match self {
            MultiOp::Read { key, .. } | MultiOp::Write { key, .. } => key,
        }
    }

    pub fn rules(&self) -> Option<&RejectRules> {
        match self {
            MultiOp::Read { rules, .. } | MultiOp::Write { rules, .. } => rules.as_ref(),
        }
    }

    pub fn is_read(&self) -> bool {
        matches!(self, MultiOp::Read { .. })
    }

    /// Bytes of key and value carried by this item.
    pub fn payload_len(&self) -> usize {
        match self {
            MultiOp::Read { key, .. } => key.len(),
            MultiOp::Write { key, value, .. } => key.len() + value.len(),
        }
    }
}

/// Outcome of one batch member
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultiOpResult {
    pub status: Status,
    /// New version for writes, observed version for reads and rejections
    pub version: Version,
    /// Value returned by a successful read
    pub value: Option<Bytes>,
}

impl MultiOpResult {
    pub fn ok(version: Version, value: Option<Bytes>) -> Self {
        Self {
            status: Status::Ok,
            version,
            value,
        }
    }

    pub fn failed(status: Status, version: Version) -> Self {
        Self {
            status,
            version,
            value: None,
        }
    }
}

/// A distributed key-value cluster as seen by one client session.
pub trait Cluster: Send + Sync {
    /// Create a table split across `server_span` tablets. Creating an
    /// existing name returns the existing id.
    fn create_table(&self, name: &[u8], server_span: u32) -> Result<TableId>;

    /// Drop a table by name. Dropping a missing table is not an error.
    fn drop_table(&self, name: &[u8]) -> Result<()>;

    fn get_table_id(&self, name: &[u8]) -> Result<TableId>;

    fn read(&self, table: TableId, key: &[u8], rules: Option<&RejectRules>) -> Result<Object>;

    fn write(
        &self,
        table: TableId,
        key: &[u8],
        value: &[u8],
        rules: Option<&RejectRules>,
    ) -> Result<Version>;

    /// Returns the version removed, or `VERSION_NONEXISTENT` if the key was absent.
    fn remove(&self, table: TableId, key: &[u8], rules: Option<&RejectRules>) -> Result<Version>;

    fn increment(&self, table: TableId, key: &[u8], delta: i64) -> Result<i64>;

    /// Evaluate every op independently. On success the result has exactly
    /// one entry per op, in op order.
    fn multi_op(&self, ops: &[MultiOp]) -> Result<Vec<MultiOpResult>>;

    /// Fetch one raw page starting at `token`. The page may be empty with a
    /// non-terminal token when the scanned tablet holds no records.
    fn enumerate_table(&self, table: TableId, token: ContinuationToken) -> Result<RawPage>;
}

/// Batched multi-object operations
use bytes::Bytes;
use tabkv_core::{Cluster, Error, MultiOp, Object, RejectRules, Result, Status, TableId, Version};
use tracing::debug;

/// Ordered list of independent reads and writes sent as one round trip.
///
/// Keys and values are copied into the request when added, so the request
/// owns all per-item scratch and releases it when dropped, whether or not
/// the batch succeeds.
#[derive(Debug, Clone, Default)]
pub struct BatchRequest {
    ops: Vec<MultiOp>,
}

impl BatchRequest {
    /// Create a new batch request
    pub fn new() -> Self {
        Self { ops: Vec::new() }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            ops: Vec::with_capacity(capacity),
        }
    }

    /// Add a read
    pub fn read(self, table: TableId, key: impl AsRef<[u8]>) -> Self {
        self.push(MultiOp::Read {
            table,
            key: Bytes::copy_from_slice(key.as_ref()),
            rules: None,
        })
    }

    /// Add a read gated by `rules`
    pub fn read_with_rules(self, table: TableId, key: impl AsRef<[u8]>, rules: RejectRules) -> Self {
        self.push(MultiOp::Read {
            table,
            key: Bytes::copy_from_slice(key.as_ref()),
            rules: Some(rules),
        })
    }

    /// Add a write
    pub fn write(self, table: TableId, key: impl AsRef<[u8]>, value: impl AsRef<[u8]>) -> Self {
        self.push(MultiOp::Write {
            table,
            key: Bytes::copy_from_slice(key.as_ref()),
            value: Bytes::copy_from_slice(value.as_ref()),
            rules: None,
        })
    }

    /// Add a write gated by `rules`
    pub fn write_with_rules(
        self,
        table: TableId,
        key: impl AsRef<[u8]>,
        value: impl AsRef<[u8]>,
        rules: RejectRules,
    ) -> Self {
        self.push(MultiOp::Write {
            table,
            key: Bytes::copy_from_slice(key.as_ref()),
            value: Bytes::copy_from_slice(value.as_ref()),
            rules: Some(rules),
        })
    }

    pub(crate) fn push_write(self, item: &WriteItem<'_>) -> Self {
        match item.rules {
            Some(rules) => self.write_with_rules(item.table, item.key, item.value, rules),
            None => self.write(item.table, item.key, item.value),
        }
    }

    fn push(mut self, op: MultiOp) -> Self {
        self.ops.push(op);
        self
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Total key and value bytes held by the request
    pub fn payload_len(&self) -> usize {
        self.ops.iter().map(MultiOp::payload_len).sum()
    }

    pub fn ops(&self) -> &[MultiOp] {
        &self.ops
    }
}

/// One write for [`Client::multi_write`](crate::Client::multi_write)
#[derive(Debug, Clone, Copy)]
pub struct WriteItem<'a> {
    pub table: TableId,
    pub key: &'a [u8],
    pub value: &'a [u8],
    pub rules: Option<RejectRules>,
}

impl<'a> WriteItem<'a> {
    pub fn new(table: TableId, key: &'a [u8], value: &'a [u8]) -> Self {
        Self {
            table,
            key,
            value,
            rules: None,
        }
    }

    pub fn with_rules(mut self, rules: RejectRules) -> Self {
        self.rules = Some(rules);
        self
    }
}

/// Outcome of one batch member, at the same index as its request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchResult {
    pub status: Status,
    /// New version for writes; observed version for reads and rejections
    pub version: Version,
    /// Object returned by a successful read
    pub object: Option<Object>,
}

impl BatchResult {
    pub fn is_ok(&self) -> bool {
        self.status.is_ok()
    }

    /// The version on success, or the item's error.
    pub fn into_result(self) -> Result<Version> {
        self.status.into_result().map(|_| self.version)
    }
}

/// Dispatch `request` as a single call and pair every result with its request.
///
/// Fails as a whole only when the cluster does; per-item failures are
/// carried in each result's `status`.
pub(crate) fn execute(cluster: &dyn Cluster, request: BatchRequest) -> Result<Vec<BatchResult>> {
    if request.is_empty() {
        return Ok(Vec::new());
    }

    debug!(
        "Executing batch of {} items ({} payload bytes)",
        request.len(),
        request.payload_len()
    );
    let results = cluster.multi_op(&request.ops)?;
    if results.len() != request.ops.len() {
        return Err(Error::SystemicFailure(format!(
            "cluster answered {} of {} batch items",
            results.len(),
            request.ops.len()
        )));
    }

    Ok(request
        .ops
        .into_iter()
        .zip(results)
        .map(|(op, result)| {
            let object = match (op, result.value) {
                (MultiOp::Read { key, .. }, Some(value)) if result.status.is_ok() => Some(Object {
                    key,
                    value,
                    version: result.version,
                }),
                _ => None,
            };
            BatchResult {
                status: result.status,
                version: result.version,
                object,
            }
        })
        .collect())
}

/// TabKV client library
///
/// A blocking session API over any [`Cluster`](tabkv_core::Cluster):
/// single-object reads and writes with conditional rules, batched
/// multi-object operations and resumable table enumeration.

pub mod client;
pub mod batch;
pub mod enumerator;

// Re-export key types
pub use client::Client;
pub use batch::{BatchRequest, BatchResult, WriteItem};
pub use enumerator::{EnumeratorState, TableEnumerator, TablePage};
pub use tabkv_core::{
    ClientConfig, ContinuationToken, Error, Object, RejectRules, Result, Status, TableId, Version,
};

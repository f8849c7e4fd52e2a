/// Test utilities and helpers for TabKV testing
///
/// This module provides common test utilities to simplify writing tests.

use std::collections::BTreeMap;
use std::sync::Arc;
use tabkv_client::{Client, Object, TableId, WriteItem};
use tabkv_core::{ClientConfig, ClusterConfig, MemoryCluster};

/// Isolated in-memory cluster that hands out client sessions
pub struct TestCluster {
    pub cluster: Arc<MemoryCluster>,
}

impl TestCluster {
    /// Create a new, empty cluster with default limits
    pub fn new() -> Self {
        Self::with_config(ClusterConfig::default())
    }

    pub fn with_config(config: ClusterConfig) -> Self {
        Self {
            cluster: Arc::new(MemoryCluster::with_config(config)),
        }
    }

    /// Cluster whose pages hold at most `bytes` of records, to force many pages
    pub fn with_page_bytes(bytes: usize) -> Self {
        Self::with_config(ClusterConfig::new().with_max_page_bytes(bytes))
    }

    /// Open a new client session on this cluster
    pub fn client(&self) -> Client {
        Client::with_cluster(self.cluster.clone())
    }

    pub fn client_with_config(&self, config: ClientConfig) -> Client {
        Client::with_cluster_and_config(self.cluster.clone(), config)
    }

    /// Create a table split across `span` tablets
    pub fn table(&self, name: &str, span: u32) -> TableId {
        self.client()
            .create_table_with_span(name, span)
            .expect("Failed to create table")
    }

    /// Number of live objects in `table`
    pub fn object_count(&self, table: TableId) -> usize {
        self.cluster.object_count(table).expect("Failed to count objects")
    }
}

impl Default for TestCluster {
    fn default() -> Self {
        Self::new()
    }
}

/// Mock data generator for testing
pub struct MockDataGenerator {
    counter: u64,
}

impl MockDataGenerator {
    pub fn new() -> Self {
        Self { counter: 0 }
    }

    /// Generate a simple key
    pub fn simple_key(&mut self) -> String {
        let idx = self.counter;
        self.counter += 1;
        format!("key{:08}", idx)
    }

    /// Value derived from a key, so reads can be checked without bookkeeping
    pub fn value_for(key: &str) -> String {
        format!("value-of-{}", key)
    }

    /// Generate a value of exactly `bytes` bytes
    pub fn sized_value(bytes: usize) -> Vec<u8> {
        vec![b'x'; bytes]
    }
}

impl Default for MockDataGenerator {
    fn default() -> Self {
        Self::new()
    }
}

/// Write `count` objects with generated keys through one batch, returning
/// the expected contents as key -> value.
pub fn populate(client: &mut Client, table: TableId, count: usize) -> BTreeMap<String, String> {
    let mut gen = MockDataGenerator::new();
    let expected: BTreeMap<String, String> = (0..count)
        .map(|_| {
            let key = gen.simple_key();
            let value = MockDataGenerator::value_for(&key);
            (key, value)
        })
        .collect();

    let items: Vec<WriteItem<'_>> = expected
        .iter()
        .map(|(k, v)| WriteItem::new(table, k.as_bytes(), v.as_bytes()))
        .collect();
    for result in client.multi_write(&items).expect("Failed to populate") {
        assert!(result.is_ok(), "populate write failed: {:?}", result.status);
    }
    expected
}

/// Drain a table scan into key -> value, failing on duplicates.
pub fn scan_all(client: &Client, table: TableId) -> BTreeMap<String, String> {
    let mut seen = BTreeMap::new();
    for object in client.enumerate(table) {
        let object = object.expect("Scan failed");
        let previous = seen.insert(object.key_str(), object.value_str());
        assert!(previous.is_none(), "key {} enumerated twice", object.key_str());
    }
    seen
}

/// Assert that an object holds the expected value and version
pub fn assert_object(object: &Object, value: &str, version: u64) {
    assert_eq!(object.value_str(), value, "value of {}", object.key_str());
    assert_eq!(object.version, version, "version of {}", object.key_str());
}

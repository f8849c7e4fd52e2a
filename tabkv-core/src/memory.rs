/// In-process cluster for testing and single-node use
///
/// Implements the full `Cluster` contract in memory. Each table's 32-bit
/// key-hash space is split evenly across `server_span` tablets. Tablets are
/// locked independently, so batch members living on different tablets are
/// applied in parallel. All data is lost when the last handle is dropped.

use crate::cluster::{Cluster, MultiOp, MultiOpResult};
use crate::config::ClusterConfig;
use crate::rules::{check_rules, RejectRules};
use crate::status::Status;
use crate::types::{
    counter_value, decode_counter, key_hash, validate_key, ContinuationToken, Object, TableId,
    Version, VERSION_NONEXISTENT,
};
use crate::wire::{PageBuilder, RawPage};
use crate::{Error, Result};
use bytes::Bytes;
use lazy_static::lazy_static;
use parking_lot::{Mutex, RwLock};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::{debug, info};

/// Size of the key-hash space partitioned into tablets
const HASH_SPACE: u64 = 1 << 32;

/// Largest accepted server span
pub const MAX_SERVER_SPAN: u32 = 1024;

/// Batches smaller than this are applied on the calling thread.
const PARALLEL_BATCH_THRESHOLD: usize = 32;

lazy_static! {
    static ref NAMED_CLUSTERS: Mutex<HashMap<String, MemoryCluster>> = Mutex::new(HashMap::new());
}

/// Stored state of one live key
#[derive(Debug, Clone)]
struct Entry {
    value: Bytes,
    version: Version,
}

/// Entries ordered by (key hash, key) so a hash works as a scan position.
///
/// Removed keys leave the map. `max_removed_version` is the highest version
/// ever removed from this tablet; a re-created key starts above it so the
/// version of a key never goes backwards.
#[derive(Debug, Default)]
struct Tablet {
    entries: BTreeMap<(u64, Bytes), Entry>,
    max_removed_version: Version,
}

impl Tablet {
    fn entry_key(key: &[u8]) -> (u64, Bytes) {
        (key_hash(key), Bytes::copy_from_slice(key))
    }

    fn current_version(&self, key: &[u8]) -> Option<Version> {
        self.entries.get(&Self::entry_key(key)).map(|e| e.version)
    }

    fn read(&self, key: &[u8], rules: Option<&RejectRules>) -> Result<Object> {
        let entry_key = Self::entry_key(key);
        let entry = self.entries.get(&entry_key);
        check_rules(rules, entry.map(|e| e.version)).into_result()?;

        match entry {
            Some(entry) => Ok(Object {
                key: entry_key.1,
                value: entry.value.clone(),
                version: entry.version,
            }),
            None => Err(Error::ObjectDoesntExist),
        }
    }

    fn write(&mut self, key: &[u8], value: Bytes, rules: Option<&RejectRules>) -> Result<Version> {
        let entry_key = Self::entry_key(key);
        let previous = self.entries.get(&entry_key).map(|e| e.version);
        check_rules(rules, previous).into_result()?;

        let version = previous.unwrap_or(self.max_removed_version) + 1;
        self.entries.insert(entry_key, Entry { value, version });
        Ok(version)
    }

    fn remove(&mut self, key: &[u8], rules: Option<&RejectRules>) -> Result<Version> {
        let entry_key = Self::entry_key(key);
        check_rules(rules, self.entries.get(&entry_key).map(|e| e.version)).into_result()?;

        match self.entries.remove(&entry_key) {
            Some(entry) => {
                self.max_removed_version = self.max_removed_version.max(entry.version);
                Ok(entry.version)
            }
            None => Ok(VERSION_NONEXISTENT),
        }
    }

    fn increment(&mut self, key: &[u8], delta: i64) -> Result<i64> {
        let entry = self
            .entries
            .get_mut(&Self::entry_key(key))
            .ok_or(Error::ObjectDoesntExist)?;

        let current = decode_counter(&entry.value)
            .ok_or_else(|| Error::InvalidArgument("value is not an 8-byte counter".to_string()))?;

        // Counters wrap on overflow.
        let updated = current.wrapping_add(delta);
        entry.value = counter_value(updated);
        entry.version += 1;
        Ok(updated)
    }

    fn apply(&mut self, op: &MultiOp) -> MultiOpResult {
        let outcome = match op {
            MultiOp::Read { key, rules, .. } => self
                .read(key, rules.as_ref())
                .map(|obj| MultiOpResult::ok(obj.version, Some(obj.value))),
            MultiOp::Write {
                key, value, rules, ..
            } => self
                .write(key, value.clone(), rules.as_ref())
                .map(|version| MultiOpResult::ok(version, None)),
        };

        outcome.unwrap_or_else(|err| {
            let observed = self.current_version(op.key()).unwrap_or(VERSION_NONEXISTENT);
            MultiOpResult::failed(err.status(), observed)
        })
    }
}

#[derive(Debug)]
struct Table {
    id: TableId,
    /// Hashes owned by each tablet; the last tablet also takes the remainder
    tablet_width: u64,
    tablets: Vec<Mutex<Tablet>>,
}

impl Table {
    fn new(id: TableId, server_span: u32) -> Self {
        let tablets = (0..server_span).map(|_| Mutex::new(Tablet::default())).collect();
        Self {
            id,
            tablet_width: HASH_SPACE / server_span as u64,
            tablets,
        }
    }

    fn tablet_index(&self, hash: u64) -> usize {
        ((hash / self.tablet_width) as usize).min(self.tablets.len() - 1)
    }

    /// First hash owned by the tablet after `index`, if any.
    fn next_tablet_start(&self, index: usize) -> Option<u64> {
        (index + 1 < self.tablets.len()).then(|| (index as u64 + 1) * self.tablet_width)
    }

    fn tablet_for(&self, key: &[u8]) -> &Mutex<Tablet> {
        &self.tablets[self.tablet_index(key_hash(key))]
    }
}

#[derive(Debug, Default)]
struct ClusterState {
    tables: HashMap<TableId, Table>,
    names: HashMap<Bytes, TableId>,
    next_table_id: u64,
}

impl ClusterState {
    fn table(&self, id: TableId) -> Result<&Table> {
        self.tables
            .get(&id)
            .ok_or_else(|| Error::TableDoesntExist(format!("table id {}", id)))
    }
}

/// In-memory cluster
#[derive(Clone, Debug)]
pub struct MemoryCluster {
    inner: Arc<RwLock<ClusterState>>,
    config: ClusterConfig,
}

impl MemoryCluster {
    /// Create a new, empty cluster
    pub fn new() -> Self {
        Self::with_config(ClusterConfig::default())
    }

    pub fn with_config(config: ClusterConfig) -> Self {
        Self {
            inner: Arc::new(RwLock::new(ClusterState {
                next_table_id: 1,
                ..Default::default()
            })),
            config,
        }
    }

    /// Process-wide cluster registered under `name`, created on first use.
    pub fn named(name: &str) -> Self {
        let mut registry = NAMED_CLUSTERS.lock();
        registry
            .entry(name.to_string())
            .or_insert_with(|| {
                info!("Registering in-memory cluster '{}'", name);
                MemoryCluster::new()
            })
            .clone()
    }

    /// Forget a named cluster. Existing handles keep working.
    pub fn unregister(name: &str) -> bool {
        NAMED_CLUSTERS.lock().remove(name).is_some()
    }

    pub fn config(&self) -> &ClusterConfig {
        &self.config
    }

    /// Number of live objects in a table
    pub fn object_count(&self, table: TableId) -> Result<usize> {
        let state = self.inner.read();
        let table = state.table(table)?;
        Ok(table
            .tablets
            .iter()
            .map(|t| t.lock().entries.len())
            .sum())
    }

    fn validate_value(&self, value: &[u8]) -> Result<()> {
        if value.len() > self.config.max_object_bytes {
            return Err(Error::InvalidArgument(format!(
                "value of {} bytes exceeds maximum {}",
                value.len(),
                self.config.max_object_bytes
            )));
        }
        Ok(())
    }

    fn validate_op(&self, op: &MultiOp) -> Result<()> {
        validate_key(op.key())?;
        if let MultiOp::Write { value, .. } = op {
            self.validate_value(value)?;
        }
        Ok(())
    }

    fn apply_group(tablet: &Mutex<Tablet>, indices: &[usize], ops: &[MultiOp]) -> Vec<(usize, MultiOpResult)> {
        let mut tablet = tablet.lock();
        indices.iter().map(|&i| (i, tablet.apply(&ops[i]))).collect()
    }
}

impl Default for MemoryCluster {
    fn default() -> Self {
        Self::new()
    }
}

impl Cluster for MemoryCluster {
    fn create_table(&self, name: &[u8], server_span: u32) -> Result<TableId> {
        if name.is_empty() {
            return Err(Error::InvalidArgument("table name must not be empty".to_string()));
        }
        if server_span == 0 || server_span > MAX_SERVER_SPAN {
            return Err(Error::InvalidArgument(format!(
                "server span {} outside 1..={}",
                server_span, MAX_SERVER_SPAN
            )));
        }

        let mut state = self.inner.write();
        if let Some(id) = state.names.get(name) {
            return Ok(*id);
        }

        let id = TableId(state.next_table_id);
        state.next_table_id += 1;
        state.tables.insert(id, Table::new(id, server_span));
        state.names.insert(Bytes::copy_from_slice(name), id);
        info!(
            "Created table '{}' (id {}, span {})",
            String::from_utf8_lossy(name),
            id,
            server_span
        );
        Ok(id)
    }

    fn drop_table(&self, name: &[u8]) -> Result<()> {
        let mut state = self.inner.write();
        match state.names.remove(name) {
            Some(id) => {
                state.tables.remove(&id);
                info!("Dropped table '{}' (id {})", String::from_utf8_lossy(name), id);
            }
            None => debug!("Drop of unknown table '{}' ignored", String::from_utf8_lossy(name)),
        }
        Ok(())
    }

    fn get_table_id(&self, name: &[u8]) -> Result<TableId> {
        self.inner
            .read()
            .names
            .get(name)
            .copied()
            .ok_or_else(|| Error::TableDoesntExist(String::from_utf8_lossy(name).into_owned()))
    }

    fn read(&self, table: TableId, key: &[u8], rules: Option<&RejectRules>) -> Result<Object> {
        validate_key(key)?;
        let state = self.inner.read();
        let tablet = state.table(table)?.tablet_for(key).lock();
        tablet.read(key, rules)
    }

    fn write(
        &self,
        table: TableId,
        key: &[u8],
        value: &[u8],
        rules: Option<&RejectRules>,
    ) -> Result<Version> {
        validate_key(key)?;
        self.validate_value(value)?;
        let state = self.inner.read();
        let mut tablet = state.table(table)?.tablet_for(key).lock();
        tablet.write(key, Bytes::copy_from_slice(value), rules)
    }

    fn remove(&self, table: TableId, key: &[u8], rules: Option<&RejectRules>) -> Result<Version> {
        validate_key(key)?;
        let state = self.inner.read();
        let mut tablet = state.table(table)?.tablet_for(key).lock();
        tablet.remove(key, rules)
    }

    fn increment(&self, table: TableId, key: &[u8], delta: i64) -> Result<i64> {
        validate_key(key)?;
        let state = self.inner.read();
        let mut tablet = state.table(table)?.tablet_for(key).lock();
        tablet.increment(key, delta)
    }

    fn multi_op(&self, ops: &[MultiOp]) -> Result<Vec<MultiOpResult>> {
        if ops.is_empty() {
            return Ok(Vec::new());
        }
        let mut results: Vec<Option<MultiOpResult>> = vec![None; ops.len()];

        let state = self.inner.read();
        let mut groups: BTreeMap<(TableId, usize), Vec<usize>> = BTreeMap::new();
        let mut unresolved = 0;
        for (i, op) in ops.iter().enumerate() {
            let table = match state.tables.get(&op.table()) {
                Some(table) => table,
                None => {
                    unresolved += 1;
                    results[i] = Some(MultiOpResult::failed(
                        Status::TableDoesntExist,
                        VERSION_NONEXISTENT,
                    ));
                    continue;
                }
            };
            if let Err(err) = self.validate_op(op) {
                results[i] = Some(MultiOpResult::failed(err.status(), VERSION_NONEXISTENT));
                continue;
            }
            groups
                .entry((table.id, table.tablet_index(key_hash(op.key()))))
                .or_default()
                .push(i);
        }

        if unresolved == ops.len() {
            return Err(Error::TableDoesntExist(
                "no batch item names an existing table".to_string(),
            ));
        }

        debug!(
            "Dispatching batch of {} items across {} tablets",
            ops.len(),
            groups.len()
        );

        let applied: Vec<Vec<(usize, MultiOpResult)>> =
            if groups.len() > 1 && ops.len() >= PARALLEL_BATCH_THRESHOLD {
                crossbeam::thread::scope(|s| {
                    let handles: Vec<_> = groups
                        .iter()
                        .map(|((table, tablet), indices)| {
                            let tablet = &state.tables[table].tablets[*tablet];
                            s.spawn(move |_| Self::apply_group(tablet, indices, ops))
                        })
                        .collect();
                    handles
                        .into_iter()
                        .map(|h| h.join())
                        .collect::<std::thread::Result<Vec<_>>>()
                })
                .and_then(|joined| joined)
                .map_err(|_| Error::SystemicFailure("batch worker panicked".to_string()))?
            } else {
                groups
                    .iter()
                    .map(|((table, tablet), indices)| {
                        Self::apply_group(&state.tables[table].tablets[*tablet], indices, ops)
                    })
                    .collect()
            };

        for (i, result) in applied.into_iter().flatten() {
            results[i] = Some(result);
        }

        results
            .into_iter()
            .map(|r| r.ok_or_else(|| Error::SystemicFailure("batch item left unanswered".to_string())))
            .collect()
    }

    fn enumerate_table(&self, table: TableId, token: ContinuationToken) -> Result<RawPage> {
        let state = self.inner.read();
        let table = state.table(table)?;
        if token.is_end() {
            return Ok(RawPage::empty(ContinuationToken::END));
        }
        if token.0 >= HASH_SPACE {
            return Err(Error::InvalidArgument(format!(
                "continuation token {} is not a scan position",
                token.0
            )));
        }

        let index = table.tablet_index(token.0);
        let tablet = table.tablets[index].lock();
        let mut page = PageBuilder::new();
        let mut last_hash = None;
        let mut resume_at = None;

        for ((hash, key), entry) in tablet.entries.range((token.0, Bytes::new())..) {
            let value = &entry.value;
            // Only break between hash groups so a resumed scan never
            // re-reads or skips keys sharing a hash.
            let record_len = PageBuilder::record_len(key, value);
            if last_hash != Some(*hash)
                && !page.is_empty()
                && page.len() + record_len > self.config.max_page_bytes
            {
                resume_at = Some(*hash);
                break;
            }
            page.push(key, value, entry.version);
            last_hash = Some(*hash);
        }

        let next_token = match resume_at {
            Some(hash) => ContinuationToken(hash),
            None => table
                .next_tablet_start(index)
                .map(ContinuationToken)
                .unwrap_or(ContinuationToken::END),
        };

        debug!(
            "Enumerated {} objects from table {} tablet {} (next token {:?})",
            page.records(),
            table.id,
            index,
            next_token
        );
        Ok(page.finish(next_token))
    }
}

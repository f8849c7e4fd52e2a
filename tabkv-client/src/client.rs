/// TabKV client session
use crate::batch::{self, BatchRequest, BatchResult, WriteItem};
use crate::enumerator::{self, TableEnumerator, TablePage};
use std::sync::Arc;
use tabkv_core::config::MEMORY_LOCATOR_PREFIX;
use tabkv_core::{
    ClientConfig, Cluster, ContinuationToken, Error, MemoryCluster, Object, RejectRules, Result,
    TableId, Version,
};
use tracing::info;

/// A session with one cluster.
///
/// Every call blocks for one round trip. Methods take `&mut self` because a
/// session carries at most one in-flight operation; use one `Client` per
/// thread (or serialize access) for concurrent work.
pub struct Client {
    cluster: Arc<dyn Cluster>,
    config: ClientConfig,
}

impl Client {
    /// Connect to the cluster described by `config`
    ///
    /// Only in-process clusters (`memory:` locators) can be reached
    /// directly; other transports attach through [`Client::with_cluster`].
    ///
    /// # Example
    /// ```
    /// # use tabkv_client::Client;
    /// # use tabkv_core::ClientConfig;
    /// let config = ClientConfig::new().with_cluster_name("doc-connect");
    /// let mut client = Client::connect(config)?;
    /// let table = client.create_table("greetings")?;
    /// client.write(table, "hello", "world")?;
    /// # Ok::<(), tabkv_core::Error>(())
    /// ```
    pub fn connect(config: ClientConfig) -> Result<Self> {
        config.validate().map_err(Error::InvalidArgument)?;

        if !config.coordinator_locator.starts_with(MEMORY_LOCATOR_PREFIX) {
            return Err(Error::SystemicFailure(format!(
                "unsupported transport in locator '{}'",
                config.coordinator_locator
            )));
        }

        info!(
            "Connecting to cluster '{}' at {}",
            config.cluster_name, config.coordinator_locator
        );
        let cluster = MemoryCluster::named(&config.cluster_name);
        Ok(Self {
            cluster: Arc::new(cluster),
            config,
        })
    }

    /// Connect to `locator` using the default cluster name.
    pub fn connect_locator(locator: impl Into<String>) -> Result<Self> {
        Self::connect(ClientConfig::new().with_coordinator_locator(locator))
    }

    /// Attach a session to an existing cluster handle
    pub fn with_cluster(cluster: Arc<dyn Cluster>) -> Self {
        Self::with_cluster_and_config(cluster, ClientConfig::default())
    }

    pub fn with_cluster_and_config(cluster: Arc<dyn Cluster>, config: ClientConfig) -> Self {
        Self { cluster, config }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Create a table spread over the configured default number of tablets.
    /// Returns the existing id if the name is taken.
    pub fn create_table(&mut self, name: impl AsRef<[u8]>) -> Result<TableId> {
        let span = self.config.default_server_span;
        self.create_table_with_span(name, span)
    }

    pub fn create_table_with_span(&mut self, name: impl AsRef<[u8]>, server_span: u32) -> Result<TableId> {
        self.cluster.create_table(name.as_ref(), server_span)
    }

    /// Drop a table. Dropping a missing table succeeds.
    pub fn drop_table(&mut self, name: impl AsRef<[u8]>) -> Result<()> {
        self.cluster.drop_table(name.as_ref())
    }

    pub fn get_table_id(&mut self, name: impl AsRef<[u8]>) -> Result<TableId> {
        self.cluster.get_table_id(name.as_ref())
    }

    /// Read an object. Fails with `ObjectDoesntExist` if the key is absent.
    pub fn read(&mut self, table: TableId, key: impl AsRef<[u8]>) -> Result<Object> {
        self.cluster.read(table, key.as_ref(), None)
    }

    /// Read an object after checking `rules` against it. A rejected read
    /// returns the rule's error and no data.
    pub fn read_with_rules(
        &mut self,
        table: TableId,
        key: impl AsRef<[u8]>,
        rules: &RejectRules,
    ) -> Result<Object> {
        self.cluster.read(table, key.as_ref(), Some(rules))
    }

    /// Create or overwrite an object, returning its new version.
    pub fn write(
        &mut self,
        table: TableId,
        key: impl AsRef<[u8]>,
        value: impl AsRef<[u8]>,
    ) -> Result<Version> {
        self.cluster.write(table, key.as_ref(), value.as_ref(), None)
    }

    /// Conditional write. On rejection the stored object is untouched.
    ///
    /// # Example
    /// ```
    /// # use tabkv_client::Client;
    /// # use tabkv_core::{ClientConfig, Error, RejectRules};
    /// # let mut client = Client::connect(ClientConfig::new().with_cluster_name("doc-cas"))?;
    /// # let table = client.create_table("accounts")?;
    /// let version = client.write(table, "balance", "100")?;
    ///
    /// // Only one writer that observed `version` gets through.
    /// let rules = RejectRules::new().reject_if_version_greater(version);
    /// client.write_with_rules(table, "balance", "90", &rules)?;
    /// let stale = client.write_with_rules(table, "balance", "80", &rules);
    /// assert_eq!(stale, Err(Error::WrongVersion));
    /// # Ok::<(), tabkv_core::Error>(())
    /// ```
    pub fn write_with_rules(
        &mut self,
        table: TableId,
        key: impl AsRef<[u8]>,
        value: impl AsRef<[u8]>,
        rules: &RejectRules,
    ) -> Result<Version> {
        self.cluster.write(table, key.as_ref(), value.as_ref(), Some(rules))
    }

    /// Remove an object. Returns the version removed, or
    /// `VERSION_NONEXISTENT` if the key was already absent.
    pub fn remove(&mut self, table: TableId, key: impl AsRef<[u8]>) -> Result<Version> {
        self.cluster.remove(table, key.as_ref(), None)
    }

    pub fn remove_with_rules(
        &mut self,
        table: TableId,
        key: impl AsRef<[u8]>,
        rules: &RejectRules,
    ) -> Result<Version> {
        self.cluster.remove(table, key.as_ref(), Some(rules))
    }

    /// Atomically add `delta` to a counter object and return the new value.
    pub fn increment(&mut self, table: TableId, key: impl AsRef<[u8]>, delta: i64) -> Result<i64> {
        self.cluster.increment(table, key.as_ref(), delta)
    }

    /// Execute a batch in one round trip
    ///
    /// # Example
    /// ```
    /// # use tabkv_client::{BatchRequest, Client};
    /// # use tabkv_core::{ClientConfig, Status};
    /// # let mut client = Client::connect(ClientConfig::new().with_cluster_name("doc-batch"))?;
    /// # let table = client.create_table("users")?;
    /// let batch = BatchRequest::new()
    ///     .write(table, b"user#1", b"alice")
    ///     .read(table, b"user#2");
    ///
    /// let results = client.batch(batch)?;
    /// assert_eq!(results[0].status, Status::Ok);
    /// assert_eq!(results[1].status, Status::ObjectDoesntExist);
    /// # Ok::<(), tabkv_core::Error>(())
    /// ```
    pub fn batch(&mut self, request: BatchRequest) -> Result<Vec<BatchResult>> {
        batch::execute(self.cluster.as_ref(), request)
    }

    /// Read many objects at once; absent or rejected entries are `None`.
    pub fn multi_read(&mut self, keys: &[(TableId, &[u8])]) -> Result<Vec<Option<Object>>> {
        let request = keys
            .iter()
            .fold(BatchRequest::with_capacity(keys.len()), |req, (table, key)| req.read(*table, key));

        Ok(self
            .batch(request)?
            .into_iter()
            .map(|result| result.object)
            .collect())
    }

    /// Write many objects at once, each with its own optional rules.
    pub fn multi_write(&mut self, items: &[WriteItem<'_>]) -> Result<Vec<BatchResult>> {
        let request = items
            .iter()
            .fold(BatchRequest::with_capacity(items.len()), |req, item| req.push_write(item));
        self.batch(request)
    }

    /// Fetch the next non-empty page of a table scan, or an empty page
    /// carrying `ContinuationToken::END` once the scan is complete.
    pub fn get_table_objects(&mut self, table: TableId, token: ContinuationToken) -> Result<TablePage> {
        enumerator::fetch_page(self.cluster.as_ref(), table, token)
    }

    /// Start a scan over every object in `table`.
    ///
    /// # Example
    /// ```
    /// # use tabkv_client::Client;
    /// # use tabkv_core::ClientConfig;
    /// # let mut client = Client::connect(ClientConfig::new().with_cluster_name("doc-enum"))?;
    /// # let table = client.create_table("events")?;
    /// # client.write(table, "a", "1")?;
    /// # client.write(table, "b", "2")?;
    /// let mut count = 0;
    /// for object in client.enumerate(table) {
    ///     let object = object?;
    ///     println!("{} = {}", object.key_str(), object.value_str());
    ///     count += 1;
    /// }
    /// assert_eq!(count, 2);
    /// # Ok::<(), tabkv_core::Error>(())
    /// ```
    pub fn enumerate(&self, table: TableId) -> TableEnumerator {
        TableEnumerator::new(Arc::clone(&self.cluster), table)
    }

    /// Resume a scan from a token returned by an earlier page.
    pub fn enumerate_from(&self, table: TableId, token: ContinuationToken) -> TableEnumerator {
        TableEnumerator::resume(Arc::clone(&self.cluster), table, token)
    }
}

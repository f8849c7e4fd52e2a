use serde::{Deserialize, Serialize};

/// Prefix of coordinator locators served by the in-process cluster.
pub const MEMORY_LOCATOR_PREFIX: &str = "memory:";

/// Client session configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Service locator of the cluster coordinator (e.g. "memory:")
    pub coordinator_locator: String,

    /// Name of the cluster behind the coordinator
    pub cluster_name: String,

    /// Number of tablets a table created without an explicit span is split into
    pub default_server_span: u32,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            coordinator_locator: MEMORY_LOCATOR_PREFIX.to_string(),
            cluster_name: "main".to_string(),
            default_server_span: 1,
        }
    }
}

impl ClientConfig {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_coordinator_locator(mut self, locator: impl Into<String>) -> Self {
        self.coordinator_locator = locator.into();
        self
    }

    pub fn with_cluster_name(mut self, name: impl Into<String>) -> Self {
        self.cluster_name = name.into();
        self
    }

    pub fn with_default_server_span(mut self, span: u32) -> Self {
        self.default_server_span = span;
        self
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), String> {
        if self.coordinator_locator.is_empty() {
            return Err("coordinator_locator must not be empty".to_string());
        }

        if self.cluster_name.is_empty() {
            return Err("cluster_name must not be empty".to_string());
        }

        if self.default_server_span == 0 {
            return Err("default_server_span must be greater than 0".to_string());
        }

        Ok(())
    }
}

/// Limits applied by the in-process cluster
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusterConfig {
    /// Soft upper bound on the encoded size of one enumeration page.
    /// A page always holds at least one record.
    pub max_page_bytes: usize,

    /// Maximum value size accepted by writes
    pub max_object_bytes: usize,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            max_page_bytes: 8 * 1024,
            max_object_bytes: 1024 * 1024,
        }
    }
}

impl ClusterConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_page_bytes(mut self, bytes: usize) -> Self {
        self.max_page_bytes = bytes;
        self
    }

    pub fn with_max_object_bytes(mut self, bytes: usize) -> Self {
        self.max_object_bytes = bytes;
        self
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.max_page_bytes == 0 {
            return Err("max_page_bytes must be greater than 0".to_string());
        }

        if self.max_object_bytes == 0 {
            return Err("max_object_bytes must be greater than 0".to_string());
        }

        Ok(())
    }
}

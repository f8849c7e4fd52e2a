/// TabKV core: data model, conditional rules, wire codec and the cluster seam
///
/// The client crate builds its session API on the types defined here. The
/// `memory` module provides a complete in-process cluster for tests, tools
/// and single-node use.

pub mod error;
pub mod status;
pub mod types;
pub mod rules;
pub mod wire;
pub mod config;
pub mod cluster;
pub mod memory;

pub use error::{Error, Result};
pub use status::Status;
pub use types::*;
pub use rules::RejectRules;
pub use wire::RawPage;
pub use config::{ClientConfig, ClusterConfig};
pub use cluster::{Cluster, MultiOp, MultiOpResult};
pub use memory::MemoryCluster;

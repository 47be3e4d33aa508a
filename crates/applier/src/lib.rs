//! # Arbor Cluster Applier
//!
//! Reads the artifact tree written by the generator, groups the per-chain
//! JSON files into typed ConfigMaps, upserts them into a Kubernetes
//! namespace, and creates one LoadBalancer service per discovered chain.
//!
//! The per-pod init container (external to this tool) consumes the
//! ConfigMaps and labels each pod with the chain-id label the services
//! select on.

pub mod cluster;
pub mod error;
pub mod files;

pub use cluster::{apply_all, ApplySummary};
pub use error::{ClusterError, Result};

/// Pod label carrying the chain id; set by the init container at startup.
pub const CHAIN_ID_LABEL: &str = "arbor/chain-id";
/// Name of the exposed service port.
pub const PORT_NAME: &str = "rpc";
/// RPC target port every node serves on.
pub const RPC_PORT: i32 = 50002;
/// Extension of all artifact files.
pub const FILE_EXT: &str = ".json";
/// Per-chain file kinds grouped into ConfigMaps of the same name.
pub const CHAIN_FILE_KINDS: [&str; 3] = ["genesis", "keystore", "config"];
/// The global identity index, stored in its own ConfigMap.
pub const IDS_FILE: &str = "ids";

//! # Arbor Artifact Emitters
//!
//! Writes the planner's frozen identity graph to disk as the per-chain
//! artifact tree the cluster applier projects into Kubernetes:
//!
//! ```text
//! <output>/<profile>/
//!   ids.json
//!   chain_<N>/
//!     genesis.json
//!     config.json
//!     keystore.json
//! ```

pub mod emitter;
pub mod genesis;
pub mod node_config;

pub use emitter::emit;

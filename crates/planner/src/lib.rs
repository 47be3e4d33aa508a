//! # Arbor Identity Planner
//!
//! Turns a validated test profile into the full identity graph the
//! artifact emitter writes out: globally unique node IDs, BLS key
//! material, committee assignments, cross-chain expansions, and
//! load-balanced `rootChainNode`/`peerNode` pointers.
//!
//! The planner runs in three passes:
//!
//! 1. **Synthesis** ([`synthesis`]) — per chain, in lexicographic name
//!    order: allocate ID blocks, generate keys concurrently, collect
//!    implicit and filler accounts.
//! 2. **Expansion** ([`expand`]) — multiply multi-committee identities
//!    into per-chain entries with fresh IDs.
//! 3. **Pointer assignment** ([`pointers`]) — wire every physical node to
//!    a root-chain anchor and an in-chain peer, balancing load.
//!
//! [`plan::build_plan`] orchestrates all three and produces a [`plan::Plan`].

pub mod expand;
pub mod identity;
pub mod plan;
pub mod pointers;
pub mod progress;
pub mod synthesis;

pub use expand::ExpandedEntry;
pub use identity::{net_address, NodeIdentity, NodeType};
pub use plan::{build_plan, IdsFile, Plan};
pub use synthesis::GenesisAccount;

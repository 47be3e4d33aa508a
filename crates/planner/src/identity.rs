//! The central planner entity: one synthesized node identity.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

/// Role of an identity inside its chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum NodeType {
    #[default]
    Validator,
    Delegator,
    Fullnode,
}

/// A node identity as planned for one chain.
///
/// Serialization covers exactly the `ids.json` surface; everything the
/// emitter needs beyond that (committees, amounts, key bytes, genesis
/// placement) stays internal.
///
/// `id` is signed: validators and full nodes occupy the dense positive
/// range that drives pod ordinal naming, delegators count down from -1 so
/// they never punch holes into that range. `root_chain_node` and
/// `peer_node` are lookup relations by ID, resolved through the ids map by
/// consumers, never owned references.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeIdentity {
    pub id: i64,
    /// Chain the identity belongs to: drives `ids.json` grouping, account
    /// placement, and keystore placement.
    pub chain_id: u64,
    pub root_chain_id: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub root_chain_node: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub peer_node: Option<i64>,
    pub address: String,
    pub public_key: String,
    pub private_key: String,
    pub node_type: NodeType,

    /// Ordered committee list; the first entry is the native chain for
    /// non-committee-only identities.
    #[serde(skip)]
    pub committees: Vec<u64>,
    /// Committees that materialize an additional entry in the target
    /// chain. `None` for full nodes and committee-only identities.
    #[serde(skip)]
    pub expanding_committees: Option<HashSet<u64>>,
    #[serde(skip)]
    pub private_key_bytes: Vec<u8>,
    #[serde(skip)]
    pub staked_amount: u64,
    #[serde(skip)]
    pub amount: u64,
    #[serde(skip)]
    pub is_delegate: bool,
    #[serde(skip)]
    pub net_address: String,
    /// Chain whose `genesis.validators` carries this entry; differs from
    /// `chain_id` for committee-only and expanded identities.
    #[serde(skip)]
    pub genesis_chain_id: u64,
}

impl NodeIdentity {
    /// Committee-only identities are staked for a foreign committee while
    /// keeping genesis placement with their originating chain.
    pub fn is_committee_only(&self) -> bool {
        self.genesis_chain_id != self.chain_id && self.expanding_committees.is_none()
    }
}

/// Derived dial address for a node ID, e.g. `tcp://node-7.p2p`.
pub fn net_address(id: i64, suffix: &str) -> String {
    format!("tcp://node-{id}{suffix}")
}

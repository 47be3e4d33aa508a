//! Pass 2: cross-chain expansion.
//!
//! Multi-committee identities materialize one additional entry per
//! expanding committee. Expansion is a value copy with selective
//! overrides: fresh ID, retargeted chain and genesis placement, and a
//! recomputed net address. The base record is never mutated.
//!
//! New validator IDs continue above the dense base range so pod ordinals
//! stay gapless; new delegator IDs continue below the lowest existing
//! negative ID.

use std::collections::HashMap;

use crate::identity::{net_address, NodeIdentity, NodeType};

/// One post-expansion record plus the bookkeeping pointer assignment needs.
#[derive(Debug, Clone)]
pub struct ExpandedEntry {
    pub identity: NodeIdentity,
    /// ID of the base identity this entry was copied from.
    pub original_id: i64,
    /// Address of the base identity; shared by all of its entries.
    pub original_address: String,
    /// Whether the entry's chain is a root chain.
    pub is_root_chain: bool,
}

/// Allocates expansion IDs: validators climb from one past the base node
/// count, delegators descend from one below the lowest existing ID.
struct ExpansionCursors {
    next_id: i64,
    next_delegator_id: i64,
}

impl ExpansionCursors {
    fn from_base(identities: &[NodeIdentity]) -> Self {
        let base_node_count = identities.iter().filter(|i| !i.is_delegate).count() as i64;
        let lowest_delegator = identities
            .iter()
            .filter(|i| i.is_delegate)
            .map(|i| i.id)
            .min()
            .unwrap_or(0);
        ExpansionCursors {
            next_id: base_node_count + 1,
            next_delegator_id: lowest_delegator - 1,
        }
    }

    fn take(&mut self, is_delegate: bool) -> i64 {
        if is_delegate {
            let id = self.next_delegator_id;
            self.next_delegator_id -= 1;
            id
        } else {
            let id = self.next_id;
            self.next_id += 1;
            id
        }
    }
}

fn root_of(chain_roots: &HashMap<u64, u64>, chain_id: u64) -> u64 {
    chain_roots.get(&chain_id).copied().unwrap_or(chain_id)
}

/// Expand one base identity into its post-expansion entries.
///
/// Full nodes and single-committee identities yield exactly the base
/// record. Multi-committee identities yield the base record plus one copy
/// per expanding committee; non-expanding committees stay staked in the
/// native genesis without producing a record.
fn expand_one(
    identity: &NodeIdentity,
    chain_roots: &HashMap<u64, u64>,
    suffix: &str,
    cursors: &mut ExpansionCursors,
) -> Vec<ExpandedEntry> {
    let is_root_chain = root_of(chain_roots, identity.chain_id) == identity.chain_id;
    let base = ExpandedEntry {
        identity: identity.clone(),
        original_id: identity.id,
        original_address: identity.address.clone(),
        is_root_chain,
    };

    if identity.node_type == NodeType::Fullnode || identity.committees.len() <= 1 {
        return vec![base];
    }

    let mut entries = vec![base];
    for &committee in identity.committees.iter().skip(1) {
        let expanding = identity
            .expanding_committees
            .as_ref()
            .map_or(false, |set| set.contains(&committee));
        if !expanding {
            continue;
        }

        let mut copy = identity.clone();
        copy.id = cursors.take(identity.is_delegate);
        copy.chain_id = committee;
        copy.genesis_chain_id = committee;
        copy.net_address = net_address(copy.id, suffix);

        entries.push(ExpandedEntry {
            identity: copy,
            original_id: identity.id,
            original_address: identity.address.clone(),
            is_root_chain: root_of(chain_roots, committee) == committee,
        });
    }
    entries
}

/// Expand all identities, iterated in ID order. Single-threaded, so the
/// allocated IDs are deterministic for a given base set.
pub fn expand_identities(
    identities: &[NodeIdentity],
    chain_roots: &HashMap<u64, u64>,
    suffix: &str,
) -> Vec<ExpandedEntry> {
    let mut cursors = ExpansionCursors::from_base(identities);
    let mut entries = Vec::with_capacity(identities.len());
    for identity in identities {
        entries.extend(expand_one(identity, chain_roots, suffix, &mut cursors));
    }
    entries
}

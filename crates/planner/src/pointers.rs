//! Pass 3: `rootChainNode` / `peerNode` assignment.
//!
//! Strictly sequential over the expanded entries in their deterministic
//! order; the assignment counters are the only mutable state. Counters are
//! pre-seeded with the load implied by self-references and
//! repeated-identity references so the load-balanced picks start from the
//! real distribution. Ties break to the first-seen candidate.

use std::collections::{BTreeMap, HashMap};

use crate::expand::ExpandedEntry;
use crate::identity::{NodeIdentity, NodeType};

/// Index structures shared by both pointer kinds.
struct PointerIndex {
    /// Validators on root chains, in entry order.
    root_chain_node_ids: Vec<i64>,
    /// Address of any root-chain entry to that entry's ID.
    address_to_root: HashMap<String, i64>,
    /// Per nested chain: validators carrying a root-chain identity.
    nested_peer_nodes: HashMap<u64, Vec<i64>>,
    /// Per chain: committee-only validators placed there.
    committee_only_peer_nodes: HashMap<u64, Vec<i64>>,
}

impl PointerIndex {
    fn build(entries: &[ExpandedEntry]) -> Self {
        let mut root_chain_node_ids = Vec::new();
        let mut address_to_root = HashMap::new();
        for entry in entries {
            if entry.is_root_chain {
                if entry.identity.node_type == NodeType::Validator && !entry.identity.is_delegate
                {
                    root_chain_node_ids.push(entry.identity.id);
                }
                address_to_root.insert(entry.identity.address.clone(), entry.identity.id);
            }
        }

        let mut nested_peer_nodes: HashMap<u64, Vec<i64>> = HashMap::new();
        let mut committee_only_peer_nodes: HashMap<u64, Vec<i64>> = HashMap::new();
        for entry in entries {
            let identity = &entry.identity;
            if identity.node_type != NodeType::Validator || identity.is_delegate {
                continue;
            }
            if !entry.is_root_chain && address_to_root.contains_key(&entry.original_address) {
                nested_peer_nodes
                    .entry(identity.chain_id)
                    .or_default()
                    .push(identity.id);
            }
            if identity.is_committee_only() {
                committee_only_peer_nodes
                    .entry(identity.chain_id)
                    .or_default()
                    .push(identity.id);
            }
        }

        PointerIndex {
            root_chain_node_ids,
            address_to_root,
            nested_peer_nodes,
            committee_only_peer_nodes,
        }
    }

    /// Candidate peers for a chain: repeated-identity validators first,
    /// then committee-only validators, then root-chain validators.
    fn peer_candidates(&self, chain_id: u64) -> &[i64] {
        if let Some(peers) = self.nested_peer_nodes.get(&chain_id) {
            if !peers.is_empty() {
                return peers;
            }
        }
        if let Some(peers) = self.committee_only_peer_nodes.get(&chain_id) {
            if !peers.is_empty() {
                return peers;
            }
        }
        &self.root_chain_node_ids
    }
}

/// First candidate with the minimum assignment count.
fn least_assigned(candidates: &[i64], counts: &HashMap<i64, usize>) -> Option<i64> {
    let mut selected: Option<(i64, usize)> = None;
    for &id in candidates {
        let count = counts.get(&id).copied().unwrap_or(0);
        match selected {
            Some((_, best)) if count >= best => {}
            _ => selected = Some((id, count)),
        }
    }
    selected.map(|(id, _)| id)
}

/// Assign both pointers over all entries and produce the `ids.json` keys
/// map (`node-<id>` to identity). Delegators hold no pointers and are
/// excluded from the map.
pub fn assign_pointers(entries: &[ExpandedEntry]) -> BTreeMap<String, NodeIdentity> {
    let index = PointerIndex::build(entries);

    let mut root_assignments: HashMap<i64, usize> =
        index.root_chain_node_ids.iter().map(|&id| (id, 0)).collect();
    let mut peer_assignments: HashMap<i64, usize> = HashMap::new();
    for ids in index
        .nested_peer_nodes
        .values()
        .chain(index.committee_only_peer_nodes.values())
    {
        for &id in ids {
            peer_assignments.insert(id, 0);
        }
    }
    for &id in &index.root_chain_node_ids {
        peer_assignments.insert(id, 0);
    }

    // Seed rootChainNode load: root validators point at themselves,
    // repeated-identity nested validators point at their root entry.
    for entry in entries {
        let identity = &entry.identity;
        if identity.is_delegate {
            continue;
        }
        if entry.is_root_chain && identity.node_type == NodeType::Validator {
            *root_assignments.entry(identity.id).or_insert(0) += 1;
        } else if let Some(&root_id) = index.address_to_root.get(&entry.original_address) {
            if identity.node_type == NodeType::Validator {
                *root_assignments.entry(root_id).or_insert(0) += 1;
            }
        }
    }

    // Seed peerNode load from every self-referencing validator.
    for entry in entries {
        let identity = &entry.identity;
        if identity.is_delegate || identity.node_type != NodeType::Validator {
            continue;
        }
        let self_referencing = entry.is_root_chain
            || index.address_to_root.contains_key(&entry.original_address)
            || identity.is_committee_only();
        if self_referencing {
            *peer_assignments.entry(identity.id).or_insert(0) += 1;
        }
    }

    let mut keys = BTreeMap::new();
    for entry in entries {
        let mut identity = entry.identity.clone();
        if identity.is_delegate {
            continue;
        }

        identity.root_chain_node = if entry.is_root_chain {
            Some(identity.id)
        } else if let Some(&root_id) = index.address_to_root.get(&entry.original_address) {
            Some(root_id)
        } else {
            let picked = least_assigned(&index.root_chain_node_ids, &root_assignments);
            if let Some(id) = picked {
                *root_assignments.entry(id).or_insert(0) += 1;
            }
            picked
        };

        identity.peer_node = match identity.node_type {
            NodeType::Validator => {
                if entry.is_root_chain
                    || index.address_to_root.contains_key(&entry.original_address)
                    || identity.is_committee_only()
                {
                    Some(identity.id)
                } else {
                    let picked = least_assigned(
                        index.peer_candidates(identity.chain_id),
                        &peer_assignments,
                    );
                    if let Some(id) = picked {
                        *peer_assignments.entry(id).or_insert(0) += 1;
                    }
                    picked
                }
            }
            NodeType::Fullnode => {
                let candidates = if entry.is_root_chain {
                    &index.root_chain_node_ids[..]
                } else {
                    index.peer_candidates(identity.chain_id)
                };
                let picked = least_assigned(candidates, &peer_assignments);
                if let Some(id) = picked {
                    *peer_assignments.entry(id).or_insert(0) += 1;
                }
                picked
            }
            NodeType::Delegator => None,
        };

        keys.insert(format!("node-{}", identity.id), identity);
    }
    keys
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::net_address;
    use std::collections::HashSet;

    fn entry(
        id: i64,
        chain_id: u64,
        genesis_chain_id: u64,
        node_type: NodeType,
        original_address: &str,
        is_root_chain: bool,
    ) -> ExpandedEntry {
        ExpandedEntry {
            identity: NodeIdentity {
                id,
                chain_id,
                root_chain_id: 1,
                root_chain_node: None,
                peer_node: None,
                address: original_address.to_string(),
                public_key: format!("pub-{id}"),
                private_key: format!("priv-{id}"),
                node_type,
                committees: vec![chain_id],
                expanding_committees: None,
                private_key_bytes: vec![],
                staked_amount: 1,
                amount: 1,
                is_delegate: node_type == NodeType::Delegator,
                net_address: net_address(id, ".p2p"),
                genesis_chain_id,
            },
            original_id: id,
            original_address: original_address.to_string(),
            is_root_chain,
        }
    }

    #[test]
    fn root_validators_self_reference() {
        let entries = vec![
            entry(1, 1, 1, NodeType::Validator, "a1", true),
            entry(2, 1, 1, NodeType::Validator, "a2", true),
        ];
        let keys = assign_pointers(&entries);
        assert_eq!(keys["node-1"].root_chain_node, Some(1));
        assert_eq!(keys["node-1"].peer_node, Some(1));
        assert_eq!(keys["node-2"].root_chain_node, Some(2));
        assert_eq!(keys["node-2"].peer_node, Some(2));
    }

    #[test]
    fn repeated_identity_points_home() {
        // validator 1 on root, expanded as 3 on chain 2
        let mut expanded = entry(3, 2, 2, NodeType::Validator, "a1", false);
        expanded.identity.expanding_committees = Some(HashSet::from([2]));
        let entries = vec![
            entry(1, 1, 1, NodeType::Validator, "a1", true),
            entry(2, 1, 1, NodeType::Validator, "a2", true),
            expanded,
        ];
        let keys = assign_pointers(&entries);
        assert_eq!(keys["node-3"].root_chain_node, Some(1));
        assert_eq!(keys["node-3"].peer_node, Some(3));
    }

    #[test]
    fn committee_only_self_references_peer() {
        let entries = vec![
            entry(1, 1, 1, NodeType::Validator, "a1", true),
            // committee-only: placed on chain 2, genesis stays on chain 1
            entry(2, 2, 1, NodeType::Validator, "a2", false),
        ];
        let keys = assign_pointers(&entries);
        assert_eq!(keys["node-2"].peer_node, Some(2));
        assert_eq!(keys["node-2"].root_chain_node, Some(1));
    }

    #[test]
    fn full_nodes_balance_over_root_validators() {
        let entries = vec![
            entry(1, 1, 1, NodeType::Validator, "a1", true),
            entry(2, 1, 1, NodeType::Validator, "a2", true),
            entry(3, 1, 1, NodeType::Fullnode, "a3", true),
            entry(4, 1, 1, NodeType::Fullnode, "a4", true),
        ];
        let keys = assign_pointers(&entries);
        let peers = [keys["node-3"].peer_node, keys["node-4"].peer_node];
        // one full node per validator once seeding is accounted for
        assert!(peers.contains(&Some(1)));
        assert!(peers.contains(&Some(2)));
        assert_eq!(keys["node-3"].root_chain_node, Some(3));
    }

    #[test]
    fn delegators_are_excluded() {
        let entries = vec![
            entry(1, 1, 1, NodeType::Validator, "a1", true),
            entry(-1, 1, 1, NodeType::Delegator, "d1", true),
        ];
        let keys = assign_pointers(&entries);
        assert_eq!(keys.len(), 1);
        assert!(keys.contains_key("node-1"));
    }

    #[test]
    fn load_stays_balanced_within_one() {
        // 2 root validators, 5 nested validators with no root identity:
        // peer candidates fall back to committee-only validator on chain 2
        let mut entries = vec![
            entry(1, 1, 1, NodeType::Validator, "a1", true),
            entry(2, 1, 1, NodeType::Validator, "a2", true),
            entry(3, 2, 1, NodeType::Validator, "a3", false), // committee-only
        ];
        for i in 0..5 {
            entries.push(entry(
                4 + i,
                2,
                2,
                NodeType::Validator,
                &format!("n{i}"),
                false,
            ));
        }
        let keys = assign_pointers(&entries);

        // all five nested validators point at the sole committee-only peer
        for i in 0..5 {
            assert_eq!(keys[&format!("node-{}", 4 + i)].peer_node, Some(3));
        }

        // rootChainNode load across the two root validators differs by <= 1
        let mut counts: HashMap<i64, usize> = HashMap::new();
        for i in 0..5 {
            let root = keys[&format!("node-{}", 4 + i)]
                .root_chain_node
                .expect("assigned");
            *counts.entry(root).or_insert(0) += 1;
        }
        let max = counts.values().max().copied().unwrap_or(0);
        let min = counts.values().min().copied().unwrap_or(0);
        assert!(max - min <= 1, "root load spread too wide: {counts:?}");
    }
}

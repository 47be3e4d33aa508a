//! Profile invariants enforced before any key material is generated.
//!
//! All checks are fatal. Messages name the offending chain and counts so a
//! broken profile can be fixed without reading the planner source.

use std::collections::HashMap;

use tracing::info;

use crate::error::{Error, Result};
use crate::profile::AppConfig;

/// Run every invariant over the selected profile.
pub fn validate(cfg: &AppConfig) -> Result<()> {
    validate_node_count(cfg)?;
    validate_committee_assignments(cfg)?;
    Ok(())
}

/// The sum of validators, full nodes, repeated-identity expansions, and
/// committee-only validators must equal `nodes.count`. Delegators are not
/// physical nodes and never count.
pub fn validate_node_count(cfg: &AppConfig) -> Result<()> {
    let mut total = 0usize;
    for (chain_name, chain) in &cfg.chains {
        let base = chain.validators.count + chain.full_nodes.count;
        let repeated = chain.repeated_identity_validators();
        let committee_only = chain.committee_only_validators();
        let chain_nodes = base + repeated + committee_only;
        total += chain_nodes;

        if repeated > 0 || committee_only > 0 {
            info!(
                "chain {chain_name}: {} validators + {} full nodes + {repeated} repeated-identity expansions + {committee_only} committee-only validators = {chain_nodes} entries (+ {} delegators)",
                chain.validators.count, chain.full_nodes.count, chain.delegators.count
            );
        } else {
            info!(
                "chain {chain_name}: {} validators + {} full nodes = {chain_nodes} entries (+ {} delegators)",
                chain.validators.count, chain.full_nodes.count, chain.delegators.count
            );
        }
    }

    if total != cfg.nodes.count {
        return Err(Error::Invariant(format!(
            "node count mismatch: total entries ({total}) does not equal nodes.count ({})",
            cfg.nodes.count
        )));
    }
    info!("total entries: {total} (matches nodes.count)");
    Ok(())
}

/// Committee targets must name known chains, repeated-identity counts must
/// fit inside the existing populations, at least one root chain must carry
/// validators, and every nested chain needs a peer-eligible validator on
/// its root chain.
pub fn validate_committee_assignments(cfg: &AppConfig) -> Result<()> {
    let mut chain_ids: HashMap<u64, &str> = HashMap::new();
    for (name, chain) in &cfg.chains {
        if let Some(previous) = chain_ids.insert(chain.id, name) {
            return Err(Error::Invariant(format!(
                "chain {name}: id {} already used by chain {previous}",
                chain.id
            )));
        }
    }

    let root_chain_validators: usize = cfg
        .chains
        .values()
        .filter(|c| c.is_root())
        .map(|c| c.validators.count)
        .sum();
    if root_chain_validators == 0 {
        return Err(Error::Invariant(
            "no validators found on any root chain; at least one root chain must have validators for rootChainNode assignment".into(),
        ));
    }
    info!("root chain validators: {root_chain_validators}");

    for (chain_name, chain) in &cfg.chains {
        for ca in &chain.committees {
            if !chain_ids.contains_key(&ca.id) {
                return Err(Error::Invariant(format!(
                    "chain {chain_name}: committee ID {} does not match any chain ID (available chain IDs: {:?})",
                    ca.id,
                    cfg.chain_ids()
                )));
            }
            if ca.repeated_identity_validator_count > chain.validators.count {
                return Err(Error::Invariant(format!(
                    "chain {chain_name}: committee {} repeatedIdentityValidatorCount ({}) exceeds total validators ({})",
                    ca.id, ca.repeated_identity_validator_count, chain.validators.count
                )));
            }
            if ca.repeated_identity_delegator_count > chain.delegators.count {
                return Err(Error::Invariant(format!(
                    "chain {chain_name}: committee {} repeatedIdentityDelegatorCount ({}) exceeds total delegators ({})",
                    ca.id, ca.repeated_identity_delegator_count, chain.delegators.count
                )));
            }
            info!(
                "chain {chain_name}: committee {} assignment - {} repeated-identity validators + {} committee-only validators, {} repeated-identity delegators + {} committee-only delegators",
                ca.id,
                ca.repeated_identity_validator_count,
                ca.validator_count,
                ca.repeated_identity_delegator_count,
                ca.delegator_count
            );
        }
    }

    // Nested chains are only reachable when their root chain stakes at
    // least one validator into the nested committee.
    for (chain_name, chain) in &cfg.chains {
        if chain.is_root() {
            continue;
        }
        let root = cfg.chain_by_id(chain.root_chain).ok_or_else(|| {
            Error::Invariant(format!(
                "chain {chain_name}: rootChain {} does not exist",
                chain.root_chain
            ))
        })?;

        let (mut repeated, mut committee_only) = (0usize, 0usize);
        for ca in &root.committees {
            if ca.id == chain.id {
                repeated = ca.repeated_identity_validator_count;
                committee_only = ca.validator_count;
                break;
            }
        }
        if repeated + committee_only == 0 {
            return Err(Error::Invariant(format!(
                "nested chain {chain_name} (ID {id}): root chain must have at least one validator assigned to committee {id} (either via repeatedIdentityValidatorCount or validatorCount) for peerNode assignment",
                id = chain.id
            )));
        }
        info!(
            "nested chain {chain_name}: root chain has {} validators in committee {} ({repeated} repeated-identity + {committee_only} committee-only)",
            repeated + committee_only,
            chain.id
        );
    }

    Ok(())
}

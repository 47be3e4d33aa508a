//! Plan orchestration: synthesis, expansion, projections, pointers.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;
use tracing::info;

use arbor_common::accounts::SharedAccount;
use arbor_common::error::Result;
use arbor_common::profile::AppConfig;

use crate::expand::{expand_identities, ExpandedEntry};
use crate::identity::{NodeIdentity, NodeType};
use crate::pointers::assign_pointers;
use crate::progress::{spawn_reporter, Progress};
use crate::synthesis::{generate_chain_identities, GenesisAccount};

/// The global identity index written as `ids.json`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IdsFile {
    #[serde(rename = "main-accounts", skip_serializing_if = "Option::is_none")]
    pub main_accounts: Option<BTreeMap<String, SharedAccount>>,
    pub keys: BTreeMap<String, NodeIdentity>,
}

/// The frozen output of the planner, consumed by the artifact emitter.
#[derive(Debug, Default)]
pub struct Plan {
    /// Post-expansion entries in deterministic order.
    pub entries: Vec<ExpandedEntry>,
    /// Base identities per chain name (native full nodes feed keystores).
    pub chain_identities: BTreeMap<String, Vec<NodeIdentity>>,
    /// Implicit and filler accounts per chain name.
    pub chain_accounts: BTreeMap<String, Vec<GenesisAccount>>,
    /// Genesis validator sections keyed by `genesis_chain_id`.
    pub genesis_by_chain: HashMap<u64, Vec<NodeIdentity>>,
    /// Accounts/keystore placement keyed by `chain_id`.
    pub keystore_by_chain: HashMap<u64, Vec<NodeIdentity>>,
    /// `publicKey@netAddress` dial entries per chain.
    pub dial_peers: HashMap<u64, Vec<String>>,
    pub ids: IdsFile,
}

/// Per-chain first IDs: a positive cursor walks the chains in name order
/// reserving `validators + committee-only validators + full nodes` slots,
/// a negative cursor reserves `delegators + committee-only delegators`.
fn chain_start_indices(cfg: &AppConfig) -> BTreeMap<String, (i64, i64)> {
    let mut starts = BTreeMap::new();
    let mut cursor: i64 = 1;
    let mut delegator_cursor: i64 = -1;
    for (name, chain) in &cfg.chains {
        starts.insert(name.clone(), (cursor, delegator_cursor));
        cursor += (chain.validators.count
            + chain.committee_only_validators()
            + chain.full_nodes.count) as i64;
        delegator_cursor -=
            (chain.delegators.count + chain.committee_only_delegators()) as i64;
    }
    starts
}

/// Run all planner passes over a validated profile.
pub async fn build_plan(
    cfg: &AppConfig,
    shared_accounts: &BTreeMap<String, SharedAccount>,
) -> Result<Plan> {
    let semaphore = Arc::new(Semaphore::new(cfg.general.concurrency.max(1)));
    let progress = Arc::new(Progress::default());
    let reporter = spawn_reporter(progress.clone());

    let starts = chain_start_indices(cfg);

    let mut plan = Plan::default();
    let mut all_identities: Vec<NodeIdentity> = Vec::new();
    for (name, chain) in &cfg.chains {
        let (start_idx, delegator_start_idx) = starts[name];
        let population = generate_chain_identities(
            name,
            chain,
            start_idx,
            delegator_start_idx,
            &cfg.general,
            semaphore.clone(),
            progress.clone(),
        )
        .await?;
        all_identities.extend(population.identities.iter().cloned());
        plan.chain_identities.insert(name.clone(), population.identities);
        plan.chain_accounts.insert(name.clone(), population.accounts);
    }
    reporter.abort();

    all_identities.sort_by_key(|identity| identity.id);

    let chain_roots: HashMap<u64, u64> = cfg
        .chains
        .values()
        .map(|chain| (chain.id, chain.root_chain))
        .collect();

    plan.entries = expand_identities(
        &all_identities,
        &chain_roots,
        &cfg.general.net_address_suffix,
    );

    for entry in &plan.entries {
        let identity = &entry.identity;
        if identity.node_type != NodeType::Fullnode {
            plan.genesis_by_chain
                .entry(identity.genesis_chain_id)
                .or_default()
                .push(identity.clone());
            plan.keystore_by_chain
                .entry(identity.chain_id)
                .or_default()
                .push(identity.clone());
        }
        if !identity.is_delegate {
            plan.dial_peers
                .entry(identity.chain_id)
                .or_default()
                .push(format!("{}@{}", identity.public_key, identity.net_address));
        }
    }

    plan.ids = IdsFile {
        main_accounts: if shared_accounts.is_empty() {
            None
        } else {
            Some(shared_accounts.clone())
        },
        keys: assign_pointers(&plan.entries),
    };

    info!(
        base_identities = all_identities.len(),
        expanded_entries = plan.entries.len(),
        ids_entries = plan.ids.keys.len(),
        "planning complete"
    );
    Ok(plan)
}

//! Pass 1: per-chain identity synthesis.
//!
//! Key generation is CPU-bound, so workers run concurrently under a shared
//! counting semaphore capped at `general.concurrency`. Implicit accounts
//! stream through a bounded channel to a single collector; identities
//! append under a per-chain mutex. A `JoinSet` is the barrier that closes
//! the channel once every producer finished.
//!
//! Within a chain the resulting insertion order is nondeterministic; the
//! identity slice is sorted by ID before it leaves this module, and
//! accounts are an unordered multiset to every consumer.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::mpsc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::task::JoinSet;
use tracing::info;

use arbor_common::crypto::Keypair;
use arbor_common::error::{Error, Result};
use arbor_common::profile::{ChainConfig, GeneralConfig};

use crate::identity::{net_address, NodeIdentity, NodeType};
use crate::progress::Progress;

/// A genesis ledger account: address hex and balance.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct GenesisAccount {
    pub address: String,
    pub amount: u64,
}

/// Everything synthesized for one chain.
#[derive(Debug, Default)]
pub struct ChainPopulation {
    /// Identities sorted by ID.
    pub identities: Vec<NodeIdentity>,
    /// Implicit role accounts plus filler accounts, in arrival order.
    pub accounts: Vec<GenesisAccount>,
}

/// Shared handles cloned into every worker task.
#[derive(Clone)]
struct WorkerShared {
    semaphore: Arc<Semaphore>,
    identities: Arc<Mutex<Vec<NodeIdentity>>>,
    tx: mpsc::Sender<GenesisAccount>,
    progress: Arc<Progress>,
    suffix: Arc<String>,
}

async fn acquire(semaphore: &Arc<Semaphore>) -> Result<OwnedSemaphorePermit> {
    semaphore
        .clone()
        .acquire_owned()
        .await
        .map_err(|e| Error::Planner(format!("concurrency limiter closed: {e}")))
}

async fn send_account(
    tx: &mpsc::Sender<GenesisAccount>,
    address: String,
    amount: u64,
) -> Result<()> {
    tx.send(GenesisAccount { address, amount })
        .await
        .map_err(|_| Error::Planner("account collector closed".into()))
}

/// Per-index committee assignments for the repeated-identity counts of a
/// chain: the first `n` members of the population gain the target
/// committee, and the same committee is marked expanding.
fn committee_maps(
    assignments: &[(u64, usize)],
    population: usize,
) -> (HashMap<usize, Vec<u64>>, HashMap<usize, HashSet<u64>>) {
    let mut committees: HashMap<usize, Vec<u64>> = HashMap::new();
    let mut expanding: HashMap<usize, HashSet<u64>> = HashMap::new();
    for &(target, count) in assignments {
        for i in 0..count.min(population) {
            committees.entry(i).or_default().push(target);
            expanding.entry(i).or_default().insert(target);
        }
    }
    (committees, expanding)
}

#[allow(clippy::too_many_arguments)]
fn spawn_validators(
    workers: &mut JoinSet<Result<()>>,
    shared: &WorkerShared,
    chain: &ChainConfig,
    is_delegate: bool,
    count: usize,
    start_idx: i64,
    committee_assignments: &HashMap<usize, Vec<u64>>,
    expanding_committees: &HashMap<usize, HashSet<u64>>,
) {
    let (staked_amount, amount) = if is_delegate {
        (chain.delegators.staked_amount, chain.delegators.amount)
    } else {
        (chain.validators.staked_amount, chain.validators.amount)
    };

    for i in 0..count {
        let shared = shared.clone();
        let chain_id = chain.id;
        let root_chain_id = chain.root_chain;
        let extra = committee_assignments.get(&i).cloned().unwrap_or_default();
        let expanding = expanding_committees.get(&i).cloned();
        // Delegators count down, validators count up.
        let node_id = if is_delegate {
            start_idx - i as i64
        } else {
            start_idx + i as i64
        };

        workers.spawn(async move {
            let _permit = acquire(&shared.semaphore).await?;
            let keypair = Keypair::generate()?;

            let mut committees = vec![chain_id];
            committees.extend(extra);

            send_account(&shared.tx, keypair.address_hex(), amount).await?;

            let identity = NodeIdentity {
                id: node_id,
                chain_id,
                root_chain_id,
                root_chain_node: None,
                peer_node: None,
                address: keypair.address_hex(),
                public_key: keypair.public_hex(),
                private_key: keypair.secret_hex(),
                node_type: if is_delegate {
                    NodeType::Delegator
                } else {
                    NodeType::Validator
                },
                committees,
                expanding_committees: expanding,
                private_key_bytes: keypair.secret_bytes().to_vec(),
                staked_amount,
                amount,
                is_delegate,
                net_address: net_address(node_id, &shared.suffix),
                genesis_chain_id: chain_id,
            };

            shared.identities.lock().push(identity);
            if is_delegate {
                shared.progress.add_delegator();
            } else {
                shared.progress.add_validator();
            }
            Ok(())
        });
    }
}

/// A committee-only identity is staked exclusively for the target
/// committee: accounts and keystore land in the target chain while
/// genesis placement stays with the originating chain.
fn spawn_committee_only(
    workers: &mut JoinSet<Result<()>>,
    shared: &WorkerShared,
    chain: &ChainConfig,
    is_delegate: bool,
    node_id: i64,
    target_committee: u64,
) {
    let shared = shared.clone();
    let originating_chain = chain.id;
    let root_chain_id = chain.root_chain;
    let (staked_amount, amount) = if is_delegate {
        (chain.delegators.staked_amount, chain.delegators.amount)
    } else {
        (chain.validators.staked_amount, chain.validators.amount)
    };

    workers.spawn(async move {
        let _permit = acquire(&shared.semaphore).await?;
        let keypair = Keypair::generate()?;

        send_account(&shared.tx, keypair.address_hex(), amount).await?;

        let identity = NodeIdentity {
            id: node_id,
            chain_id: target_committee,
            root_chain_id,
            root_chain_node: None,
            peer_node: None,
            address: keypair.address_hex(),
            public_key: keypair.public_hex(),
            private_key: keypair.secret_hex(),
            node_type: if is_delegate {
                NodeType::Delegator
            } else {
                NodeType::Validator
            },
            committees: vec![target_committee],
            expanding_committees: None,
            private_key_bytes: keypair.secret_bytes().to_vec(),
            staked_amount,
            amount,
            is_delegate,
            net_address: net_address(node_id, &shared.suffix),
            genesis_chain_id: originating_chain,
        };

        shared.identities.lock().push(identity);
        if is_delegate {
            shared.progress.add_delegator();
        } else {
            shared.progress.add_validator();
        }
        Ok(())
    });
}

fn spawn_full_nodes(
    workers: &mut JoinSet<Result<()>>,
    shared: &WorkerShared,
    chain: &ChainConfig,
    start_idx: i64,
) {
    for i in 0..chain.full_nodes.count {
        let shared = shared.clone();
        let chain_id = chain.id;
        let root_chain_id = chain.root_chain;
        let amount = chain.full_nodes.amount;
        let node_id = start_idx + i as i64;

        workers.spawn(async move {
            let _permit = acquire(&shared.semaphore).await?;
            let keypair = Keypair::generate()?;

            send_account(&shared.tx, keypair.address_hex(), amount).await?;

            let identity = NodeIdentity {
                id: node_id,
                chain_id,
                root_chain_id,
                root_chain_node: None,
                peer_node: None,
                address: keypair.address_hex(),
                public_key: keypair.public_hex(),
                private_key: keypair.secret_hex(),
                node_type: NodeType::Fullnode,
                committees: Vec::new(),
                expanding_committees: None,
                private_key_bytes: keypair.secret_bytes().to_vec(),
                staked_amount: 0,
                amount,
                is_delegate: false,
                net_address: net_address(node_id, &shared.suffix),
                genesis_chain_id: chain_id,
            };

            shared.identities.lock().push(identity);
            shared.progress.add_full_node();
            Ok(())
        });
    }
}

/// Filler accounts carry no keys: the address is the 20-character
/// zero-padded hex rendering of the index, taken as raw address bytes.
fn spawn_filler_accounts(
    workers: &mut JoinSet<Result<()>>,
    shared: &WorkerShared,
    chain: &ChainConfig,
) {
    for i in 0..chain.accounts.count {
        let shared = shared.clone();
        let amount = chain.accounts.amount;
        workers.spawn(async move {
            let _permit = acquire(&shared.semaphore).await?;
            let address = hex::encode(format!("{i:020x}"));
            send_account(&shared.tx, address, amount).await?;
            shared.progress.add_account();
            Ok(())
        });
    }
}

/// Synthesize all identities and accounts for one chain.
///
/// `start_idx` is the first positive ID of the chain's block,
/// `delegator_start_idx` the first (negative) delegator ID.
pub async fn generate_chain_identities(
    chain_name: &str,
    chain: &ChainConfig,
    start_idx: i64,
    delegator_start_idx: i64,
    general: &GeneralConfig,
    semaphore: Arc<Semaphore>,
    progress: Arc<Progress>,
) -> Result<ChainPopulation> {
    info!(
        chain = chain_name,
        id = chain.id,
        root_chain = chain.root_chain,
        "generating identities"
    );

    let (tx, mut rx) = mpsc::channel::<GenesisAccount>(general.buffer.max(1));
    let collector = tokio::spawn(async move {
        let mut accounts = Vec::new();
        while let Some(account) = rx.recv().await {
            accounts.push(account);
        }
        accounts
    });

    let identities = Arc::new(Mutex::new(Vec::with_capacity(
        chain.validators.count + chain.delegators.count + chain.full_nodes.count,
    )));
    let shared = WorkerShared {
        semaphore,
        identities: identities.clone(),
        tx,
        progress,
        suffix: Arc::new(general.net_address_suffix.clone()),
    };

    let validator_assignments: Vec<(u64, usize)> = chain
        .committees
        .iter()
        .map(|ca| (ca.id, ca.repeated_identity_validator_count))
        .collect();
    let delegator_assignments: Vec<(u64, usize)> = chain
        .committees
        .iter()
        .map(|ca| (ca.id, ca.repeated_identity_delegator_count))
        .collect();

    let (validator_committees, validator_expanding) =
        committee_maps(&validator_assignments, chain.validators.count);
    let (delegator_committees, delegator_expanding) =
        committee_maps(&delegator_assignments, chain.delegators.count);

    // Positive block layout: regulars, then committee-only validators,
    // then full nodes. Delegators count down from their own block.
    let committee_only_validator_start = start_idx + chain.validators.count as i64;
    let full_node_start =
        committee_only_validator_start + chain.committee_only_validators() as i64;

    let mut workers: JoinSet<Result<()>> = JoinSet::new();

    spawn_validators(
        &mut workers,
        &shared,
        chain,
        false,
        chain.validators.count,
        start_idx,
        &validator_committees,
        &validator_expanding,
    );

    let mut committee_only_idx = committee_only_validator_start;
    for ca in &chain.committees {
        for i in 0..ca.validator_count {
            spawn_committee_only(
                &mut workers,
                &shared,
                chain,
                false,
                committee_only_idx + i as i64,
                ca.id,
            );
        }
        committee_only_idx += ca.validator_count as i64;
    }

    spawn_validators(
        &mut workers,
        &shared,
        chain,
        true,
        chain.delegators.count,
        delegator_start_idx,
        &delegator_committees,
        &delegator_expanding,
    );

    let mut committee_only_delegator_idx =
        delegator_start_idx - chain.delegators.count as i64;
    for ca in &chain.committees {
        for i in 0..ca.delegator_count {
            spawn_committee_only(
                &mut workers,
                &shared,
                chain,
                true,
                committee_only_delegator_idx - i as i64,
                ca.id,
            );
        }
        committee_only_delegator_idx -= ca.delegator_count as i64;
    }

    spawn_full_nodes(&mut workers, &shared, chain, full_node_start);
    spawn_filler_accounts(&mut workers, &shared, chain);

    // Barrier: every producer must land before the channel may close.
    while let Some(joined) = workers.join_next().await {
        joined.map_err(|e| Error::Planner(format!("identity worker panicked: {e}")))??;
    }
    drop(shared);

    let accounts = collector
        .await
        .map_err(|e| Error::Planner(format!("account collector failed: {e}")))?;

    let mut identities = Arc::try_unwrap(identities)
        .map_err(|_| Error::Planner("identity slice still shared after barrier".into()))?
        .into_inner();
    identities.sort_by_key(|identity| identity.id);

    info!(
        chain = chain_name,
        validators = chain.validators.count,
        delegators = chain.delegators.count,
        full_nodes = chain.full_nodes.count,
        accounts = chain.accounts.count,
        "chain synthesis complete"
    );

    Ok(ChainPopulation { identities, accounts })
}

#[cfg(test)]
mod tests {
    use super::*;
    use arbor_common::profile::{
        AccountsConfig, CommitteeAssignment, DelegatorsConfig, FullNodesConfig,
        ValidatorsConfig,
    };

    fn general() -> GeneralConfig {
        GeneralConfig {
            concurrency: 4,
            password: "pw".into(),
            buffer: 8,
            net_address_suffix: ".p2p".into(),
            json_beautify: false,
        }
    }

    fn chain() -> ChainConfig {
        ChainConfig {
            id: 1,
            root_chain: 1,
            validators: ValidatorsConfig { count: 3, staked_amount: 100, amount: 50 },
            delegators: DelegatorsConfig { count: 2, staked_amount: 10, amount: 5 },
            full_nodes: FullNodesConfig { count: 1, amount: 7 },
            accounts: AccountsConfig { count: 2, amount: 3 },
            committees: vec![CommitteeAssignment {
                id: 2,
                repeated_identity_validator_count: 2,
                repeated_identity_delegator_count: 1,
                validator_count: 1,
                delegator_count: 0,
            }],
            ..ChainConfig::default()
        }
    }

    async fn generate() -> ChainPopulation {
        generate_chain_identities(
            "chain_1",
            &chain(),
            1,
            -1,
            &general(),
            Arc::new(Semaphore::new(4)),
            Arc::new(Progress::default()),
        )
        .await
        .expect("synthesis")
    }

    #[tokio::test]
    async fn id_blocks_are_contiguous() {
        let population = generate().await;
        let ids: Vec<i64> = population.identities.iter().map(|i| i.id).collect();
        // sorted: delegators -2..-1, then validators 1..3, committee-only 4,
        // full node 5
        assert_eq!(ids, vec![-2, -1, 1, 2, 3, 4, 5]);
    }

    #[tokio::test]
    async fn repeated_identity_assignment_hits_first_indices() {
        let population = generate().await;
        let by_id: HashMap<i64, &NodeIdentity> =
            population.identities.iter().map(|i| (i.id, i)).collect();

        assert_eq!(by_id[&1].committees, vec![1, 2]);
        assert_eq!(by_id[&2].committees, vec![1, 2]);
        assert_eq!(by_id[&3].committees, vec![1]);
        assert!(by_id[&1].expanding_committees.as_ref().unwrap().contains(&2));
        assert!(by_id[&3].expanding_committees.is_none());

        // first delegator repeats, second does not
        assert_eq!(by_id[&-1].committees, vec![1, 2]);
        assert_eq!(by_id[&-2].committees, vec![1]);
    }

    #[tokio::test]
    async fn committee_only_targets_the_committee() {
        let population = generate().await;
        let co = population
            .identities
            .iter()
            .find(|i| i.id == 4)
            .expect("committee-only validator");
        assert_eq!(co.chain_id, 2);
        assert_eq!(co.genesis_chain_id, 1);
        assert_eq!(co.committees, vec![2]);
        assert!(co.expanding_committees.is_none());
        assert!(co.is_committee_only());
    }

    #[tokio::test]
    async fn accounts_cover_roles_and_filler() {
        let population = generate().await;
        // 3 validators + 2 delegators + 1 committee-only + 1 full node + 2 filler
        assert_eq!(population.accounts.len(), 9);
        let filler = hex::encode(format!("{:020x}", 0));
        assert!(population.accounts.iter().any(|a| a.address == filler && a.amount == 3));
        assert!(population.accounts.iter().any(|a| a.amount == 7));
    }

    #[tokio::test]
    async fn identities_carry_net_addresses() {
        let population = generate().await;
        let v1 = population.identities.iter().find(|i| i.id == 1).unwrap();
        assert_eq!(v1.net_address, "tcp://node-1.p2p");
        assert_eq!(v1.address.len(), 40);
        assert_eq!(v1.public_key.len(), 96);
    }
}

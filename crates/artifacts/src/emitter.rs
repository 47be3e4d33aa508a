//! Walks the plan and writes the artifact tree.
//!
//! The output directory is recreated empty on every run so a previous
//! run's files never leak into the next. Chains are written in name
//! order; the global `ids.json` goes last.

use std::collections::{BTreeMap, HashSet};
use std::fs::{self, File};
use std::io::Write;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::Serialize;
use tracing::info;

use arbor_common::accounts::SharedAccount;
use arbor_common::error::Result;
use arbor_common::keystore::Keystore;
use arbor_common::profile::{AppConfig, ChainConfig};
use arbor_planner::identity::{NodeIdentity, NodeType};
use arbor_planner::synthesis::GenesisAccount;
use arbor_planner::Plan;

use crate::genesis::write_genesis;
use crate::node_config;

/// Create the output directory if needed and delete everything inside it.
pub fn reset_output_dir(dir: &Path) -> Result<()> {
    fs::create_dir_all(dir)?;
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            fs::remove_dir_all(&path)?;
        } else {
            fs::remove_file(&path)?;
        }
    }
    Ok(())
}

fn save_json_pretty<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let file = File::create(path)?;
    let mut writer = std::io::BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, value)?;
    writer.flush()?;
    Ok(())
}

/// Re-read a streamed file and rewrite it with two-space indentation.
fn beautify(path: &Path) -> Result<()> {
    let raw = fs::read(path)?;
    let parsed: serde_json::Value = serde_json::from_slice(&raw)?;
    let pretty = serde_json::to_vec_pretty(&parsed)?;
    fs::write(path, pretty)?;
    Ok(())
}

/// The chain's full accounts array: native accounts first, then entries
/// placed here from other chains (deduplicated by address), then every
/// shared account at the chain's configured account amount.
fn compose_accounts(
    chain: &ChainConfig,
    native: &[GenesisAccount],
    placed: &[NodeIdentity],
    shared: &BTreeMap<String, SharedAccount>,
) -> Vec<GenesisAccount> {
    let mut seen: HashSet<&str> = native.iter().map(|a| a.address.as_str()).collect();
    let mut accounts: Vec<GenesisAccount> = native.to_vec();

    for identity in placed {
        if seen.insert(&identity.address) {
            accounts.push(GenesisAccount {
                address: identity.address.clone(),
                amount: identity.amount,
            });
        }
    }
    for account in shared.values() {
        accounts.push(GenesisAccount {
            address: account.address.clone(),
            amount: chain.accounts.amount,
        });
    }
    accounts
}

/// Build the chain's keystore: all identities placed here, the chain's
/// native full nodes, and the shared accounts.
fn build_keystore(
    placed: &[NodeIdentity],
    native: &[NodeIdentity],
    shared: &BTreeMap<String, SharedAccount>,
    password: &str,
) -> Result<Keystore> {
    let mut keystore = Keystore::new();
    let full_nodes = native
        .iter()
        .filter(|identity| identity.node_type == NodeType::Fullnode);

    for identity in placed.iter().chain(full_nodes) {
        let nickname = if identity.is_delegate {
            format!("delegator-{}", -identity.id)
        } else {
            format!("node-{}", identity.id)
        };
        keystore.import_raw(&identity.private_key_bytes, password, &nickname)?;
    }
    for (name, account) in shared {
        keystore.import_raw(&account.private_key_bytes, password, name)?;
    }
    Ok(keystore)
}

#[allow(clippy::too_many_arguments)]
fn write_chain_files(
    chain_dir: &Path,
    chain: &ChainConfig,
    native_identities: &[NodeIdentity],
    native_accounts: &[GenesisAccount],
    genesis_validators: &[NodeIdentity],
    placed: &[NodeIdentity],
    dial_peers: &[String],
    shared: &BTreeMap<String, SharedAccount>,
    password: &str,
    beautify_json: bool,
    now_epoch: u64,
) -> Result<()> {
    fs::create_dir_all(chain_dir)?;

    let accounts = compose_accounts(chain, native_accounts, placed, shared);
    let accounts_json = serde_json::to_vec(&accounts)?;

    let genesis_path = chain_dir.join("genesis.json");
    let max_committee_size = if chain.max_committee_size == 0 {
        100
    } else {
        chain.max_committee_size
    };
    write_genesis(
        &genesis_path,
        chain.id,
        chain.root_chain,
        genesis_validators,
        &accounts_json,
        max_committee_size,
    )?;
    if beautify_json {
        beautify(&genesis_path)?;
    }

    let config = node_config::template(chain, dial_peers.to_vec(), now_epoch);
    save_json_pretty(&chain_dir.join("config.json"), &config)?;

    let keystore = build_keystore(placed, native_identities, shared, password)?;
    save_json_pretty(&chain_dir.join("keystore.json"), &keystore)?;

    Ok(())
}

/// Write the full artifact tree for a planned profile.
pub fn emit(
    cfg: &AppConfig,
    shared: &BTreeMap<String, SharedAccount>,
    plan: &Plan,
    out_base: &Path,
) -> Result<()> {
    reset_output_dir(out_base)?;

    let now_epoch = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);

    let empty_identities: Vec<NodeIdentity> = Vec::new();
    let empty_accounts: Vec<GenesisAccount> = Vec::new();
    let empty_peers: Vec<String> = Vec::new();

    for (name, chain) in &cfg.chains {
        let chain_dir = out_base.join(name);
        write_chain_files(
            &chain_dir,
            chain,
            plan.chain_identities.get(name).unwrap_or(&empty_identities),
            plan.chain_accounts.get(name).unwrap_or(&empty_accounts),
            plan.genesis_by_chain.get(&chain.id).unwrap_or(&empty_identities),
            plan.keystore_by_chain.get(&chain.id).unwrap_or(&empty_identities),
            plan.dial_peers.get(&chain.id).unwrap_or(&empty_peers),
            shared,
            &cfg.general.password,
            cfg.general.json_beautify,
            now_epoch,
        )?;
        info!(chain = name.as_str(), "written chain files");
    }

    save_json_pretty(&out_base.join("ids.json"), &plan.ids)?;
    info!(entries = plan.ids.keys.len(), "written ids.json");
    Ok(())
}

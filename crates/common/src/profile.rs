//! Test-profile catalog: YAML model and loader.
//!
//! A catalog file (`configs.yml`) maps profile names to an [`AppConfig`].
//! Selection is case-insensitive on the requested name; an unknown name
//! fails with the list of available profiles so operators can self-serve.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::error::{Error, Result};

/// File name of the profile catalog inside the catalog directory.
pub const CATALOG_FILE: &str = "configs.yml";

/// General knobs shared by every chain in a profile.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GeneralConfig {
    /// Maximum number of key generations in flight.
    pub concurrency: usize,
    /// Keystore passphrase shared by all encrypted keys.
    pub password: String,
    /// Account channel capacity hint (0 is treated as 1).
    pub buffer: usize,
    /// Suffix appended to derived net addresses, e.g. `.p2p`.
    pub net_address_suffix: String,
    /// Re-indent genesis files with two-space indentation after streaming.
    pub json_beautify: bool,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        GeneralConfig {
            concurrency: 8,
            password: String::new(),
            buffer: 64,
            net_address_suffix: String::new(),
            json_beautify: false,
        }
    }
}

/// Declared total of physical nodes; cross-checked against the planner tally.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NodesConfig {
    pub count: usize,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ValidatorsConfig {
    pub count: usize,
    pub staked_amount: u64,
    pub amount: u64,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FullNodesConfig {
    pub count: usize,
    pub amount: u64,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AccountsConfig {
    pub count: usize,
    pub amount: u64,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DelegatorsConfig {
    pub count: usize,
    pub staked_amount: u64,
    pub amount: u64,
}

/// Cross-chain committee participation for one target chain.
///
/// Two semantically distinct kinds live here:
/// - repeated-identity counts reuse existing validators/delegators of this
///   chain; the same identity appears in both chains' genesis via an
///   expanded entry.
/// - `validator_count`/`delegator_count` create new entities staked only
///   for the target committee; genesis placement stays with the
///   originating chain while accounts and keystore move to the target.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CommitteeAssignment {
    pub id: u64,
    pub repeated_identity_validator_count: usize,
    pub repeated_identity_delegator_count: usize,
    pub validator_count: usize,
    pub delegator_count: usize,
}

/// Per-chain populations, committee assignments, and runtime tuning.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ChainConfig {
    pub id: u64,
    pub root_chain: u64,
    pub validators: ValidatorsConfig,
    pub full_nodes: FullNodesConfig,
    pub accounts: AccountsConfig,
    pub delegators: DelegatorsConfig,
    pub committees: Vec<CommitteeAssignment>,
    pub gossip_threshold: u64,
    /// Offset in seconds added to the current epoch at emit time; 0 disables.
    pub sleep_until: u64,
    pub max_committee_size: u64,
    pub minimum_peers_to_start: u32,
    pub max_inbound: u32,
    pub max_outbound: u32,
    pub in_memory: bool,
    pub lazy_mempool_check_frequency_s: u32,
    pub drop_percentage: u32,
    pub max_transaction_count: u32,
}

impl ChainConfig {
    /// True when the chain anchors the identity graph (its own root).
    pub fn is_root(&self) -> bool {
        self.id == self.root_chain
    }

    /// Committee-only validators this chain contributes across all targets.
    pub fn committee_only_validators(&self) -> usize {
        self.committees.iter().map(|ca| ca.validator_count).sum()
    }

    /// Committee-only delegators this chain contributes across all targets.
    pub fn committee_only_delegators(&self) -> usize {
        self.committees.iter().map(|ca| ca.delegator_count).sum()
    }

    /// Repeated-identity validator expansions declared by this chain.
    pub fn repeated_identity_validators(&self) -> usize {
        self.committees
            .iter()
            .map(|ca| ca.repeated_identity_validator_count)
            .sum()
    }
}

/// One named profile: general knobs, the expected node tally, and chains.
///
/// Chain names key the map; a `BTreeMap` keeps them in the lexicographic
/// order the ID allocator depends on.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub general: GeneralConfig,
    pub nodes: NodesConfig,
    pub chains: BTreeMap<String, ChainConfig>,
}

impl AppConfig {
    /// Chain ids sorted ascending, for diagnostics.
    pub fn chain_ids(&self) -> Vec<u64> {
        let mut ids: Vec<u64> = self.chains.values().map(|c| c.id).collect();
        ids.sort_unstable();
        ids
    }

    /// Look up a chain config by id.
    pub fn chain_by_id(&self, id: u64) -> Option<&ChainConfig> {
        self.chains.values().find(|c| c.id == id)
    }
}

/// Parse the full catalog from `<dir>/configs.yml`.
pub fn load_catalog(dir: impl AsRef<Path>) -> Result<BTreeMap<String, AppConfig>> {
    let path = dir.as_ref().join(CATALOG_FILE);
    let raw = fs::read_to_string(&path).map_err(|e| {
        Error::Profile(format!("failed to read config file '{}': {e}", path.display()))
    })?;
    let catalog: BTreeMap<String, AppConfig> = serde_yaml::from_str(&raw)
        .map_err(|e| Error::Profile(format!("failed to parse config file: {e}")))?;
    Ok(catalog)
}

/// Select one profile by name (case-insensitive).
pub fn select_profile(
    catalog: &BTreeMap<String, AppConfig>,
    name: &str,
) -> Result<AppConfig> {
    match catalog.get(&name.to_lowercase()) {
        Some(cfg) => Ok(cfg.clone()),
        None => {
            let available: Vec<&str> = catalog.keys().map(String::as_str).collect();
            Err(Error::Profile(format!(
                "unknown config '{name}'. Available configs: {}",
                available.join(", ")
            )))
        }
    }
}

/// Profile names present in the catalog directory, best effort (used for
/// CLI help output; load failures surface as an empty list).
pub fn list_profiles(dir: impl AsRef<Path>) -> Vec<String> {
    load_catalog(dir)
        .map(|catalog| catalog.keys().cloned().collect())
        .unwrap_or_default()
}

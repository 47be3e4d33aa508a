//! Node runtime config template (`config.json`).
//!
//! The template carries two placeholder sentinels, `NODE_ID` and
//! `ROOT_NODE_ID`, substituted per pod by the external init container at
//! launch. Everything else is concrete and derived from the chain config.

use serde::Serialize;

use arbor_common::profile::ChainConfig;

/// External-address placeholder substituted per pod.
pub const NODE_ID_SENTINEL: &str = "NODE_ID";
/// Root-chain URL placeholder substituted per pod.
pub const ROOT_NODE_ID_SENTINEL: &str = "ROOT_NODE_ID";

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RootChainEntry {
    pub chain_id: u64,
    pub url: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MainConfig {
    pub log_level: String,
    pub chain_id: u64,
    pub root_chain: Vec<RootChainEntry>,
    pub run_vdf: bool,
    pub sleep_until: u64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RpcConfig {
    pub wallet_port: String,
    pub explorer_port: String,
    pub rpc_port: String,
    pub admin_port: String,
    pub rpc_url: String,
    pub admin_rpc_url: String,
    pub timeout_s: u64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreConfig {
    pub data_dir_path: String,
    pub db_name: String,
    pub in_memory: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct P2pConfig {
    pub network_id: u64,
    pub listen_address: String,
    pub external_address: String,
    pub max_inbound: u32,
    pub max_outbound: u32,
    pub trusted_peer_ids: Option<Vec<String>>,
    pub dial_peers: Vec<String>,
    pub banned_peer_ids: Option<Vec<String>>,
    pub banned_ips: Option<Vec<String>>,
    pub minimum_peers_to_start: u32,
    pub gossip_threshold: u64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsensusConfig {
    pub new_height_timeout_ms: u64,
    pub election_timeout_ms: u64,
    pub election_vote_timeout_ms: u64,
    pub propose_timeout_ms: u64,
    pub propose_vote_timeout_ms: u64,
    pub precommit_timeout_ms: u64,
    pub precommit_vote_timeout_ms: u64,
    pub commit_timeout_ms: u64,
    pub round_interrupt_timeout_ms: u64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MempoolConfig {
    pub max_total_bytes: u64,
    pub max_transaction_count: u32,
    pub individual_max_tx_size: u32,
    pub drop_percentage: u32,
    pub lazy_mempool_check_frequency_s: u32,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsConfig {
    pub metrics_enabled: bool,
    pub prometheus_address: String,
}

/// The full node template; sections flatten into one object on disk.
#[derive(Debug, Clone, Serialize)]
pub struct NodeConfig {
    #[serde(flatten)]
    pub main: MainConfig,
    #[serde(flatten)]
    pub rpc: RpcConfig,
    #[serde(flatten)]
    pub store: StoreConfig,
    #[serde(flatten)]
    pub p2p: P2pConfig,
    #[serde(flatten)]
    pub consensus: ConsensusConfig,
    #[serde(flatten)]
    pub mempool: MempoolConfig,
    #[serde(flatten)]
    pub metrics: MetricsConfig,
}

fn defaulted<T: PartialEq + Default>(value: T, fallback: T) -> T {
    if value == T::default() {
        fallback
    } else {
        value
    }
}

/// Build the per-chain template.
///
/// `now_epoch` is the emit-time Unix epoch; a configured `sleepUntil`
/// offset is added to it, otherwise the field stays 0.
pub fn template(chain: &ChainConfig, dial_peers: Vec<String>, now_epoch: u64) -> NodeConfig {
    let is_root = chain.is_root();
    let root_chain = vec![RootChainEntry {
        chain_id: if is_root { chain.id } else { chain.root_chain },
        url: ROOT_NODE_ID_SENTINEL.into(),
    }];

    let sleep_until = if chain.sleep_until > 0 {
        now_epoch + chain.sleep_until
    } else {
        0
    };

    NodeConfig {
        main: MainConfig {
            log_level: "debug".into(),
            chain_id: chain.id,
            root_chain,
            run_vdf: false,
            sleep_until,
        },
        rpc: RpcConfig {
            wallet_port: "50000".into(),
            explorer_port: "50001".into(),
            rpc_port: "50002".into(),
            admin_port: "50003".into(),
            rpc_url: "http://0.0.0.0:50002".into(),
            admin_rpc_url: "http://0.0.0.0:50003".into(),
            timeout_s: 3,
        },
        store: StoreConfig {
            data_dir_path: "/root/.arbor".into(),
            db_name: "arbor".into(),
            in_memory: chain.in_memory,
        },
        p2p: P2pConfig {
            network_id: 1,
            listen_address: format!("0.0.0.0:{}", 9000 + chain.id),
            external_address: NODE_ID_SENTINEL.into(),
            max_inbound: defaulted(chain.max_inbound, 21),
            max_outbound: defaulted(chain.max_outbound, 7),
            trusted_peer_ids: None,
            dial_peers,
            banned_peer_ids: None,
            banned_ips: None,
            minimum_peers_to_start: chain.minimum_peers_to_start,
            gossip_threshold: chain.gossip_threshold,
        },
        consensus: ConsensusConfig {
            new_height_timeout_ms: 4500,
            election_timeout_ms: 1500,
            election_vote_timeout_ms: 1500,
            propose_timeout_ms: 2500,
            // nested chains vote faster than the root
            propose_vote_timeout_ms: if is_root { 4000 } else { 3000 },
            precommit_timeout_ms: 2000,
            precommit_vote_timeout_ms: 2000,
            commit_timeout_ms: 2000,
            round_interrupt_timeout_ms: 2000,
        },
        mempool: MempoolConfig {
            max_total_bytes: 1_000_000,
            max_transaction_count: defaulted(chain.max_transaction_count, 5000),
            individual_max_tx_size: 4000,
            drop_percentage: defaulted(chain.drop_percentage, 35),
            lazy_mempool_check_frequency_s: defaulted(chain.lazy_mempool_check_frequency_s, 1),
        },
        metrics: MetricsConfig {
            metrics_enabled: true,
            prometheus_address: "0.0.0.0:9090".into(),
        },
    }
}

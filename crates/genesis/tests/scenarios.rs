//! End-to-end generator scenarios: plan a profile, emit the artifact
//! tree, and check the emitted JSON against the expected identity
//! topology.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fs;
use std::path::Path;

use serde_json::Value;

use arbor_common::profile::{
    AppConfig, ChainConfig, CommitteeAssignment, DelegatorsConfig, ValidatorsConfig,
};
use arbor_common::validate;
use arbor_planner::{build_plan, Plan};

fn chain(id: u64, root: u64, validators: usize) -> ChainConfig {
    ChainConfig {
        id,
        root_chain: root,
        validators: ValidatorsConfig {
            count: validators,
            staked_amount: 1_000_000,
            amount: 500_000,
        },
        ..ChainConfig::default()
    }
}

fn profile(nodes: usize, chains: Vec<(&str, ChainConfig)>) -> AppConfig {
    let mut cfg = AppConfig::default();
    cfg.general.concurrency = 4;
    cfg.general.password = "test-password".into();
    cfg.general.net_address_suffix = ".p2p".into();
    cfg.nodes.count = nodes;
    for (name, chain) in chains {
        cfg.chains.insert(name.to_string(), chain);
    }
    cfg
}

async fn plan_and_emit(cfg: &AppConfig, out: &Path) -> Plan {
    validate::validate(cfg).expect("valid profile");
    let plan = build_plan(cfg, &BTreeMap::new()).await.expect("plan");
    arbor_artifacts::emit(cfg, &BTreeMap::new(), &plan, out).expect("emit");
    plan
}

fn read_json(path: &Path) -> Value {
    serde_json::from_slice(&fs::read(path).expect("read file")).expect("parse json")
}

/// Structural invariants every valid profile must satisfy after planning.
fn check_invariants(cfg: &AppConfig, plan: &Plan, out: &Path) {
    let keys = &plan.ids.keys;

    // unique ids and unique (chainId, address) pairs among physical nodes
    let mut ids = HashSet::new();
    let mut placements = HashSet::new();
    for identity in keys.values() {
        assert!(ids.insert(identity.id), "duplicate id {}", identity.id);
        assert!(
            placements.insert((identity.chain_id, identity.address.clone())),
            "duplicate placement for {}",
            identity.id
        );
    }

    let chain_roots: HashMap<u64, u64> =
        cfg.chains.values().map(|c| (c.id, c.root_chain)).collect();

    for (name, identity) in keys {
        assert_eq!(name, &format!("node-{}", identity.id));

        // every physical node points at a validator on its root chain
        let root_id = identity.root_chain_node.expect("rootChainNode present");
        let root = keys
            .get(&format!("node-{root_id}"))
            .expect("rootChainNode resolves");
        assert_eq!(root.chain_id, chain_roots[&identity.chain_id]);

        // and at a peer on its own chain (root full nodes peer with the root)
        let peer_id = identity.peer_node.expect("peerNode present");
        let peer = keys.get(&format!("node-{peer_id}")).expect("peerNode resolves");
        assert!(
            peer.chain_id == identity.chain_id
                || peer.chain_id == chain_roots[&identity.chain_id]
        );
    }

    // declared tally matches the emitted physical node set
    let expected: usize = cfg
        .chains
        .values()
        .map(|c| {
            c.validators.count
                + c.full_nodes.count
                + c.repeated_identity_validators()
                + c.committee_only_validators()
        })
        .sum();
    assert_eq!(cfg.nodes.count, expected);
    assert_eq!(keys.len(), expected);

    // per-chain genesis validators carry no duplicate addresses and match
    // the planned placement exactly
    for chain in cfg.chains.values() {
        let planned: Vec<&str> = plan
            .genesis_by_chain
            .get(&chain.id)
            .map(|v| v.iter().map(|i| i.address.as_str()).collect())
            .unwrap_or_default();

        let genesis = read_json(&out.join(chain_dir_name(cfg, chain.id)).join("genesis.json"));
        let emitted: Vec<&str> = genesis["validators"]
            .as_array()
            .expect("validators array")
            .iter()
            .map(|v| v["address"].as_str().expect("address"))
            .collect();
        assert_eq!(planned, emitted, "genesis validators for chain {}", chain.id);

        let mut dedup = HashSet::new();
        for (address, entry) in emitted.iter().zip(genesis["validators"].as_array().unwrap()) {
            assert!(
                dedup.insert((*address, entry["committees"].to_string())),
                "duplicate genesis entry on chain {}",
                chain.id
            );
        }
    }
}

fn chain_dir_name(cfg: &AppConfig, chain_id: u64) -> String {
    cfg.chains
        .iter()
        .find(|(_, c)| c.id == chain_id)
        .map(|(name, _)| name.clone())
        .expect("chain name")
}

// S1: single root chain, two validators, no committees: everything
// self-references.
#[tokio::test]
async fn single_root_chain_self_references() {
    let cfg = profile(2, vec![("chain_1", chain(1, 1, 2))]);
    let tmp = tempfile::TempDir::new().expect("tmpdir");
    let plan = plan_and_emit(&cfg, tmp.path()).await;

    let keys = &plan.ids.keys;
    assert_eq!(keys.len(), 2);
    for id in [1i64, 2] {
        let identity = &keys[&format!("node-{id}")];
        assert_eq!(identity.root_chain_node, Some(id));
        assert_eq!(identity.peer_node, Some(id));
    }

    let genesis = read_json(&tmp.path().join("chain_1/genesis.json"));
    let validators = genesis["validators"].as_array().expect("validators");
    assert_eq!(validators.len(), 2);
    for v in validators {
        assert_eq!(v["committees"], serde_json::json!([1]));
    }

    check_invariants(&cfg, &plan, tmp.path());
}

// S2: root + nested with one repeated-identity validator.
#[tokio::test]
async fn repeated_identity_expands_into_nested_chain() {
    let mut root = chain(1, 1, 3);
    root.committees.push(CommitteeAssignment {
        id: 2,
        repeated_identity_validator_count: 1,
        ..CommitteeAssignment::default()
    });
    let cfg = profile(4, vec![("chain_1", root), ("chain_2", chain(2, 1, 0))]);
    let tmp = tempfile::TempDir::new().expect("tmpdir");
    let plan = plan_and_emit(&cfg, tmp.path()).await;

    let keys = &plan.ids.keys;
    assert_eq!(keys.len(), 4);
    for id in [1i64, 2, 3] {
        assert_eq!(keys[&format!("node-{id}")].chain_id, 1);
    }
    let node_4 = &keys["node-4"];
    assert_eq!(node_4.chain_id, 2);
    assert_eq!(node_4.address, keys["node-1"].address);
    assert_eq!(node_4.public_key, keys["node-1"].public_key);
    assert_eq!(node_4.root_chain_node, Some(1));
    assert_eq!(node_4.peer_node, Some(4));

    let genesis_1 = read_json(&tmp.path().join("chain_1/genesis.json"));
    let v1 = genesis_1["validators"]
        .as_array()
        .expect("validators")
        .iter()
        .find(|v| v["address"] == Value::from(keys["node-1"].address.clone()))
        .expect("node-1 entry");
    assert_eq!(v1["committees"], serde_json::json!([1, 2]));

    let genesis_2 = read_json(&tmp.path().join("chain_2/genesis.json"));
    let validators_2 = genesis_2["validators"].as_array().expect("validators");
    assert_eq!(validators_2.len(), 1);
    assert_eq!(validators_2[0]["committees"], serde_json::json!([2]));
    assert_eq!(validators_2[0]["netAddress"], "tcp://node-4.p2p");

    check_invariants(&cfg, &plan, tmp.path());
}

// S3: committee-only validator: genesis stays with the originating chain,
// accounts and keystore move to the target.
#[tokio::test]
async fn committee_only_validator_splits_placement() {
    let mut root = chain(1, 1, 3);
    root.committees.push(CommitteeAssignment {
        id: 2,
        validator_count: 1,
        ..CommitteeAssignment::default()
    });
    let cfg = profile(4, vec![("chain_1", root), ("chain_2", chain(2, 1, 0))]);
    let tmp = tempfile::TempDir::new().expect("tmpdir");
    let plan = plan_and_emit(&cfg, tmp.path()).await;

    let node_4 = &plan.ids.keys["node-4"];
    assert_eq!(node_4.chain_id, 2);
    assert_eq!(node_4.peer_node, Some(4));

    // appears in chain_1 genesis with the target committee only
    let genesis_1 = read_json(&tmp.path().join("chain_1/genesis.json"));
    let entry = genesis_1["validators"]
        .as_array()
        .expect("validators")
        .iter()
        .find(|v| v["address"] == Value::from(node_4.address.clone()))
        .expect("committee-only entry")
        .clone();
    assert_eq!(entry["committees"], serde_json::json!([2]));

    // absent from chain_2 genesis validators
    let genesis_2 = read_json(&tmp.path().join("chain_2/genesis.json"));
    assert_eq!(genesis_2["validators"].as_array().expect("validators").len(), 0);

    // present in chain_2 keystore and accounts
    let keystore_2 = read_json(&tmp.path().join("chain_2/keystore.json"));
    assert!(keystore_2["nicknameMap"].get("node-4").is_some());
    assert_eq!(keystore_2["nicknameMap"]["node-4"], Value::from(node_4.address.clone()));
    let accounts_2 = genesis_2["accounts"].as_array().expect("accounts");
    assert!(accounts_2
        .iter()
        .any(|a| a["address"] == Value::from(node_4.address.clone())));

    check_invariants(&cfg, &plan, tmp.path());
}

// S4: delegators appear in genesis and keystore but never in ids.json,
// and omit netAddress.
#[tokio::test]
async fn delegators_are_ledger_only() {
    let mut c1 = chain(1, 1, 1);
    c1.delegators = DelegatorsConfig { count: 2, staked_amount: 100, amount: 50 };
    let cfg = profile(1, vec![("chain_1", c1)]);
    let tmp = tempfile::TempDir::new().expect("tmpdir");
    let plan = plan_and_emit(&cfg, tmp.path()).await;

    let ids = read_json(&tmp.path().join("ids.json"));
    let keys = ids["keys"].as_object().expect("keys");
    assert_eq!(keys.len(), 1);
    assert!(keys.contains_key("node-1"));

    let keystore = read_json(&tmp.path().join("chain_1/keystore.json"));
    let nicknames = keystore["nicknameMap"].as_object().expect("nicknames");
    let mut names: Vec<&String> = nicknames.keys().collect();
    names.sort();
    assert_eq!(names, ["delegator-1", "delegator-2", "node-1"]);

    let genesis = read_json(&tmp.path().join("chain_1/genesis.json"));
    let validators = genesis["validators"].as_array().expect("validators");
    assert_eq!(validators.len(), 3);
    for v in validators {
        if v["delegate"] == Value::from(true) {
            assert!(v.get("netAddress").is_none());
        } else {
            assert!(v.get("netAddress").is_some());
        }
    }

    check_invariants(&cfg, &plan, tmp.path());
}

// S6: tally mismatch fails validation naming the counts.
#[test]
fn tally_mismatch_is_rejected() {
    let mut c1 = chain(1, 1, 1);
    c1.committees.push(CommitteeAssignment {
        id: 2,
        validator_count: 1,
        ..CommitteeAssignment::default()
    });
    let mut c2 = chain(2, 2, 1);
    c2.committees.push(CommitteeAssignment {
        id: 1,
        validator_count: 1,
        ..CommitteeAssignment::default()
    });
    let cfg = profile(2, vec![("chain_1", c1), ("chain_2", c2)]);

    let err = validate::validate(&cfg).unwrap_err();
    assert!(err
        .to_string()
        .contains("total entries (4) does not equal nodes.count (2)"));
}

// Running the generator twice produces the same structure (counts, names,
// pointer topology) even though key material differs.
#[tokio::test]
async fn regeneration_is_structurally_stable() {
    let mut root = chain(1, 1, 3);
    root.committees.push(CommitteeAssignment {
        id: 2,
        repeated_identity_validator_count: 2,
        validator_count: 1,
        ..CommitteeAssignment::default()
    });
    let cfg = profile(6, vec![("chain_1", root), ("chain_2", chain(2, 1, 0))]);

    let tmp_a = tempfile::TempDir::new().expect("tmpdir");
    let tmp_b = tempfile::TempDir::new().expect("tmpdir");
    let plan_a = plan_and_emit(&cfg, tmp_a.path()).await;
    let plan_b = plan_and_emit(&cfg, tmp_b.path()).await;

    let shape = |plan: &Plan| -> Vec<(String, u64, Option<i64>, Option<i64>)> {
        plan.ids
            .keys
            .iter()
            .map(|(name, identity)| {
                (
                    name.clone(),
                    identity.chain_id,
                    identity.root_chain_node,
                    identity.peer_node,
                )
            })
            .collect()
    };
    assert_eq!(shape(&plan_a), shape(&plan_b));

    for dir in ["chain_1", "chain_2"] {
        for file in ["genesis.json", "config.json", "keystore.json"] {
            assert!(tmp_a.path().join(dir).join(file).exists());
            assert!(tmp_b.path().join(dir).join(file).exists());
        }
    }

    check_invariants(&cfg, &plan_a, tmp_a.path());
    check_invariants(&cfg, &plan_b, tmp_b.path());
}

// A fresh output tree replaces whatever the previous run left behind.
#[tokio::test]
async fn output_tree_is_recreated_each_run() {
    let cfg = profile(2, vec![("chain_1", chain(1, 1, 2))]);
    let tmp = tempfile::TempDir::new().expect("tmpdir");
    fs::create_dir_all(tmp.path().join("chain_9")).expect("mkdir");
    fs::write(tmp.path().join("chain_9/genesis.json"), b"{}").expect("write");

    plan_and_emit(&cfg, tmp.path()).await;
    assert!(!tmp.path().join("chain_9").exists());
    assert!(tmp.path().join("chain_1/genesis.json").exists());
    assert!(tmp.path().join("ids.json").exists());
}

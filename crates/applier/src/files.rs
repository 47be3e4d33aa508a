//! Artifact tree reading: chain folder discovery and ConfigMap data maps.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::error::{ClusterError, Result};
use crate::{CHAIN_FILE_KINDS, FILE_EXT, IDS_FILE};

/// Per-kind ConfigMap payloads: `data[kind][entry key] = file contents`.
pub type DataByKind = BTreeMap<String, BTreeMap<String, String>>;

/// Parse a chain folder name of the form `chain_<digits>`.
pub fn chain_id_from_folder(name: &str) -> Option<u64> {
    let digits = name.strip_prefix("chain_")?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

/// Subdirectories matching `chain_<digits>`, sorted for deterministic
/// application order.
pub fn chain_folders(config_path: &Path) -> Result<Vec<String>> {
    let mut folders = Vec::new();
    for entry in fs::read_dir(config_path)? {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if entry.file_type()?.is_dir() && chain_id_from_folder(&name).is_some() {
            folders.push(name);
        }
    }
    folders.sort();
    Ok(folders)
}

/// Read a JSON file and return it re-indented with two spaces; parsing
/// doubles as a well-formedness check before anything reaches the cluster.
pub fn read_json_pretty(path: &Path) -> Result<String> {
    let raw = fs::read(path)?;
    let value: serde_json::Value =
        serde_json::from_slice(&raw).map_err(|source| ClusterError::Json {
            path: path.display().to_string(),
            source,
        })?;
    serde_json::to_string_pretty(&value).map_err(|source| ClusterError::Json {
        path: path.display().to_string(),
        source,
    })
}

/// ConfigMap entry key for a chain file, e.g. `genesis_1.json`.
pub fn entry_key(kind: &str, chain_id: u64) -> String {
    format!("{kind}_{chain_id}{FILE_EXT}")
}

/// Aggregate every chain file into its kind's data map and `ids.json`
/// into its own single-entry map.
pub fn build_data_maps(base: &Path, folders: &[String]) -> Result<DataByKind> {
    let mut data: DataByKind = BTreeMap::new();
    for kind in CHAIN_FILE_KINDS {
        let mut files = BTreeMap::new();
        for folder in folders {
            let chain_id = chain_id_from_folder(folder)
                .ok_or_else(|| ClusterError::InvalidChainFolder(folder.clone()))?;
            let path = base.join(folder).join(format!("{kind}{FILE_EXT}"));
            files.insert(entry_key(kind, chain_id), read_json_pretty(&path)?);
        }
        data.insert(kind.to_string(), files);
    }

    let ids_path = base.join(format!("{IDS_FILE}{FILE_EXT}"));
    let mut ids = BTreeMap::new();
    ids.insert(format!("{IDS_FILE}{FILE_EXT}"), read_json_pretty(&ids_path)?);
    data.insert(IDS_FILE.to_string(), ids);
    Ok(data)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NodeKey {
    #[allow(dead_code)]
    id: i64,
    chain_id: u64,
}

#[derive(Debug, Deserialize)]
struct IdsIndex {
    keys: BTreeMap<String, NodeKey>,
}

/// Distinct chain ids referenced by `ids.json`, sorted ascending so the
/// per-chain services are created in a reproducible order.
pub fn chain_ids_from_ids_json(raw: &str) -> Result<Vec<u64>> {
    let index: IdsIndex = serde_json::from_str(raw).map_err(|source| ClusterError::Json {
        path: format!("{IDS_FILE}{FILE_EXT}"),
        source,
    })?;
    let ids: BTreeSet<u64> = index.keys.values().map(|key| key.chain_id).collect();
    Ok(ids.into_iter().collect())
}

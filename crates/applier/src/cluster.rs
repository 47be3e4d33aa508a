//! Kubernetes projection: ConfigMap upserts and per-chain services.

use std::collections::BTreeMap;
use std::path::Path;

use k8s_openapi::api::core::v1::{ConfigMap, Service, ServicePort, ServiceSpec};
use k8s_openapi::apimachinery::pkg::util::intstr::IntOrString;
use kube::api::{Api, ObjectMeta, PostParams};
use kube::Client;
use tracing::info;

use crate::error::{ClusterError, Result};
use crate::files::{build_data_maps, chain_ids_from_ids_json, DataByKind};
use crate::{CHAIN_ID_LABEL, FILE_EXT, IDS_FILE, PORT_NAME, RPC_PORT};

/// What one applier run created or updated.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct ApplySummary {
    pub config_maps: usize,
    pub services: usize,
    pub chains: Vec<u64>,
}

fn config_map(name: &str, namespace: &str, data: BTreeMap<String, String>) -> ConfigMap {
    ConfigMap {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some(namespace.to_string()),
            ..ObjectMeta::default()
        },
        data: Some(data),
        ..ConfigMap::default()
    }
}

/// One ConfigMap per non-empty kind, in deterministic kind order.
pub fn build_config_maps(namespace: &str, data_by_kind: &DataByKind) -> Vec<ConfigMap> {
    data_by_kind
        .iter()
        .filter(|(_, data)| !data.is_empty())
        .map(|(kind, data)| config_map(kind, namespace, data.clone()))
        .collect()
}

fn is_already_exists(err: &kube::Error) -> bool {
    matches!(err, kube::Error::Api(response) if response.code == 409)
}

/// Create the ConfigMap; when it already exists, fetch it, overwrite
/// `.data` entirely, and update.
pub async fn apply_config_map(api: &Api<ConfigMap>, cm: &ConfigMap) -> Result<()> {
    let name = cm.metadata.name.clone().unwrap_or_default();
    let pp = PostParams::default();
    match api.create(&pp, cm).await {
        Ok(_) => Ok(()),
        Err(err) if is_already_exists(&err) => {
            let mut existing = api.get(&name).await?;
            existing.data = cm.data.clone();
            existing.metadata.managed_fields = None;
            api.replace(&name, &pp, &existing).await?;
            Ok(())
        }
        Err(err) => Err(ClusterError::Api(err)),
    }
}

/// LoadBalancer service exposing `start_port + chain_id` on the chain's
/// RPC target port. Pods join the selector once the init container labels
/// them with the chain-id label.
pub fn service_for_chain(namespace: &str, start_port: i32, chain_id: u64) -> Service {
    Service {
        metadata: ObjectMeta {
            name: Some(format!("rpc-lb-chain-{chain_id}")),
            namespace: Some(namespace.to_string()),
            labels: Some(BTreeMap::from([("type".to_string(), "chain".to_string())])),
            ..ObjectMeta::default()
        },
        spec: Some(ServiceSpec {
            type_: Some("LoadBalancer".to_string()),
            selector: Some(BTreeMap::from([
                ("app".to_string(), "node".to_string()),
                (CHAIN_ID_LABEL.to_string(), chain_id.to_string()),
            ])),
            ports: Some(vec![ServicePort {
                name: Some(PORT_NAME.to_string()),
                port: start_port + chain_id as i32,
                target_port: Some(IntOrString::Int(RPC_PORT)),
                ..ServicePort::default()
            }]),
            ..ServiceSpec::default()
        }),
        ..Service::default()
    }
}

/// Create one service per chain. Services are not reconciled: an existing
/// service from a previous run surfaces as an API error.
pub async fn create_services(
    api: &Api<Service>,
    namespace: &str,
    start_port: i32,
    chains: &[u64],
) -> Result<()> {
    let pp = PostParams::default();
    for &chain_id in chains {
        let service = service_for_chain(namespace, start_port, chain_id);
        let name = service.metadata.name.clone().unwrap_or_default();
        api.create(&pp, &service).await?;
        info!(service = name.as_str(), chain = chain_id, "created service");
    }
    Ok(())
}

/// Apply the full artifact tree: upsert the four ConfigMaps, then create
/// the per-chain services discovered from `ids.json`.
pub async fn apply_all(
    client: Client,
    config_path: &Path,
    namespace: &str,
    start_port: i32,
    folders: &[String],
) -> Result<ApplySummary> {
    let data_by_kind = build_data_maps(config_path, folders)?;
    let config_maps = build_config_maps(namespace, &data_by_kind);

    let cm_api: Api<ConfigMap> = Api::namespaced(client.clone(), namespace);
    for cm in &config_maps {
        apply_config_map(&cm_api, cm).await?;
        info!(
            name = cm.metadata.name.as_deref().unwrap_or_default(),
            keys = cm.data.as_ref().map(BTreeMap::len).unwrap_or_default(),
            "applied configmap"
        );
    }

    let ids_raw = &data_by_kind[IDS_FILE][&format!("{IDS_FILE}{FILE_EXT}")];
    let chains = chain_ids_from_ids_json(ids_raw)?;

    let svc_api: Api<Service> = Api::namespaced(client, namespace);
    create_services(&svc_api, namespace, start_port, &chains).await?;

    Ok(ApplySummary {
        config_maps: config_maps.len(),
        services: chains.len(),
        chains,
    })
}

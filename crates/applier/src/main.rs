//! `arbor-applier` — projects an artifact tree into Kubernetes.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tracing::{error, info, warn};

use arbor_applier::files::chain_folders;
use arbor_applier::{apply_all, ApplySummary};

/// Apply generated chain configs as ConfigMaps and create per-chain RPC
/// load-balancer services.
#[derive(Parser)]
#[command(
    name = "arbor-applier",
    version,
    about = "Apply generated chain artifacts to a Kubernetes namespace"
)]
struct Cli {
    /// Path to the folders containing the generated config files
    #[arg(long, default_value = "./artifacts")]
    path: PathBuf,

    /// Folder name of the specific profile
    #[arg(long, default_value = "default")]
    config: String,

    /// Namespace to create ConfigMaps and services in
    #[arg(long, default_value = "arbor")]
    namespace: String,

    /// Path to the kubeconfig file
    #[arg(long, default_value = "~/.kube/config")]
    kubeconfig: String,

    /// Timeout for the whole session, e.g. `30s` or `2m`
    #[arg(long, default_value = "30s", value_parser = parse_duration)]
    timeout: Duration,

    /// Start of the service port range; chain N listens on start+N
    #[arg(long = "startPort", default_value_t = 1000)]
    start_port: i32,
}

/// Accepts plain seconds or an `s`/`m` suffix.
fn parse_duration(raw: &str) -> Result<Duration, String> {
    let raw = raw.trim();
    let (number, unit) = match raw.find(|c: char| !c.is_ascii_digit()) {
        Some(pos) => raw.split_at(pos),
        None => (raw, "s"),
    };
    let value: u64 = number
        .parse()
        .map_err(|_| format!("invalid duration '{raw}'"))?;
    match unit {
        "s" => Ok(Duration::from_secs(value)),
        "m" => Ok(Duration::from_secs(value * 60)),
        other => Err(format!("unsupported duration unit '{other}'")),
    }
}

fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = std::env::var_os("HOME") {
            return PathBuf::from(home).join(rest);
        }
    }
    PathBuf::from(path)
}

async fn build_client(kubeconfig: &str) -> anyhow::Result<kube::Client> {
    let path = expand_home(kubeconfig);
    let kc = kube::config::Kubeconfig::read_from(&path)
        .with_context(|| format!("read kubeconfig {}", path.display()))?;
    let config = kube::Config::from_custom_kubeconfig(
        kc,
        &kube::config::KubeConfigOptions::default(),
    )
    .await
    .context("build client config")?;
    kube::Client::try_from(config).context("create client")
}

async fn run(cli: Cli) -> anyhow::Result<Option<ApplySummary>> {
    let config_path = cli.path.join(&cli.config);
    let stat = std::fs::metadata(&config_path)
        .with_context(|| format!("failed to find config at {}", config_path.display()))?;
    anyhow::ensure!(stat.is_dir(), "config is not a directory: {}", config_path.display());

    let folders = chain_folders(&config_path)?;
    if folders.is_empty() {
        warn!(path = %config_path.display(), "no chain folders found");
        return Ok(None);
    }

    let client = build_client(&cli.kubeconfig).await?;

    let summary = tokio::time::timeout(
        cli.timeout,
        apply_all(
            client,
            &config_path,
            &cli.namespace,
            cli.start_port,
            &folders,
        ),
    )
    .await
    .context("session timed out")??;

    Ok(Some(summary))
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    info!("building configs for chains");
    let cli = Cli::parse();
    match run(cli).await {
        Ok(Some(summary)) => {
            info!(
                config_maps = summary.config_maps,
                services = summary.services,
                "configs applied"
            );
        }
        Ok(None) => {}
        Err(e) => {
            error!("{e:#}");
            std::process::exit(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn durations_parse_with_and_without_suffix() {
        assert_eq!(parse_duration("30s").unwrap(), Duration::from_secs(30));
        assert_eq!(parse_duration("45").unwrap(), Duration::from_secs(45));
        assert_eq!(parse_duration("2m").unwrap(), Duration::from_secs(120));
        assert!(parse_duration("5h").is_err());
        assert!(parse_duration("abc").is_err());
    }

    #[test]
    fn home_expansion_only_touches_tilde_paths() {
        assert_eq!(expand_home("/etc/kube"), PathBuf::from("/etc/kube"));
        if let Some(home) = std::env::var_os("HOME") {
            assert_eq!(
                expand_home("~/.kube/config"),
                PathBuf::from(home).join(".kube/config")
            );
        }
    }
}

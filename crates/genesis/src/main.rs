//! `arbor-genesis` — genesis artifact generator.
//!
//! Selects a test profile from a YAML catalog, validates it, plans the
//! identity graph, and writes the per-chain artifact tree plus the global
//! `ids.json` under `<output>/<profile>/`.

use std::path::PathBuf;

use clap::Parser;
use tracing::{error, info};

use arbor_common::accounts::load_shared_accounts;
use arbor_common::profile::{list_profiles, load_catalog, select_profile};
use arbor_common::validate;
use arbor_planner::build_plan;

/// Generate per-chain genesis, config, and keystore artifacts for a named
/// test profile.
#[derive(Parser)]
#[command(
    name = "arbor-genesis",
    version,
    about = "Generate per-chain genesis, config, and keystore artifacts for a test profile",
    after_help = "The catalog directory must contain configs.yml and may contain accounts.yml."
)]
struct Cli {
    /// Name of the profile to use
    #[arg(long, default_value = "default")]
    config: String,

    /// Directory containing configs.yml and the optional accounts.yml
    #[arg(long, default_value = ".")]
    path: PathBuf,

    /// Directory the artifact tree is written under
    #[arg(long, default_value = "./artifacts")]
    output: PathBuf,
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let catalog = load_catalog(&cli.path)?;
    let cfg = select_profile(&catalog, &cli.config)?;
    info!(profile = cli.config.as_str(), "using config");

    info!("validating configuration");
    validate::validate(&cfg)?;

    let mut shared_accounts = load_shared_accounts(&cli.path)?;
    if !shared_accounts.is_empty() {
        info!(count = shared_accounts.len(), "loaded shared accounts");
        for account in shared_accounts.values_mut() {
            account.password = cfg.general.password.clone();
        }
    }

    let plan = build_plan(&cfg, &shared_accounts).await?;

    let out_dir = cli.output.join(cli.config.to_lowercase());
    info!(output = %out_dir.display(), "writing artifact tree");
    arbor_artifacts::emit(&cfg, &shared_accounts, &plan, &out_dir)?;

    info!("done");
    Ok(())
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse();
    let catalog_dir = cli.path.clone();
    if let Err(e) = run(cli).await {
        error!("{e}");
        let available = list_profiles(&catalog_dir);
        if !available.is_empty() {
            error!("available configs: {}", available.join(", "));
        }
        std::process::exit(1);
    }
}

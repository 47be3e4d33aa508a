//! Periodic progress reporting for long key-generation runs.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::info;

/// Shared per-kind counters, incremented as entities land.
#[derive(Debug, Default)]
pub struct Progress {
    accounts: AtomicU64,
    validators: AtomicU64,
    delegators: AtomicU64,
    full_nodes: AtomicU64,
}

impl Progress {
    pub fn add_account(&self) {
        self.accounts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_validator(&self) {
        self.validators.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_delegator(&self) {
        self.delegators.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_full_node(&self) {
        self.full_nodes.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> (u64, u64, u64, u64) {
        (
            self.accounts.load(Ordering::Relaxed),
            self.validators.load(Ordering::Relaxed),
            self.delegators.load(Ordering::Relaxed),
            self.full_nodes.load(Ordering::Relaxed),
        )
    }
}

/// Log a counter snapshot every two seconds until the handle is aborted.
pub fn spawn_reporter(progress: Arc<Progress>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(2));
        ticker.tick().await; // immediate first tick is noise
        loop {
            ticker.tick().await;
            let (accounts, validators, delegators, full_nodes) = progress.snapshot();
            info!(accounts, validators, delegators, full_nodes, "generation progress");
        }
    })
}

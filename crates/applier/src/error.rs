//! Applier error type. Every failure aborts the remaining sequence.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClusterError {
    /// Kubernetes create/get/update failed, including already-exists on
    /// service re-creation.
    #[error("kubernetes api: {0}")]
    Api(#[from] kube::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// A file on the artifact tree is not well-formed JSON.
    #[error("invalid JSON [path: {path}]: {source}")]
    Json {
        path: String,
        source: serde_json::Error,
    },

    #[error("invalid chain folder name: {0}")]
    InvalidChainFolder(String),
}

pub type Result<T> = std::result::Result<T, ClusterError>;

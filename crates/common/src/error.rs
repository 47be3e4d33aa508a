//! Harness-wide error type.
//!
//! Every failure in the generator pipeline is fatal at the component
//! boundary: there are no retries and no partial output. Binaries log the
//! error and exit non-zero.

use thiserror::Error;

/// Errors surfaced by the profile loader, planner, and artifact emitter.
#[derive(Debug, Error)]
pub enum Error {
    /// Profile catalog missing, malformed, or the named profile absent.
    #[error("profile error: {0}")]
    Profile(String),

    /// A counting or committee-reference invariant does not hold.
    #[error("invariant violation: {0}")]
    Invariant(String),

    /// BLS key synthesis failed.
    #[error("key generation failed: {0}")]
    KeyGeneration(String),

    /// Keystore encryption or key import failed.
    #[error("crypto error: {0}")]
    Crypto(String),

    /// A planner worker or its coordination primitives failed.
    #[error("planner error: {0}")]
    Planner(String),

    /// Read/write/remove failure on the artifact tree.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// JSON marshal/unmarshal failure, including the pretty-print re-parse.
    #[error("json encoding: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML parse failure in the catalog or shared-accounts file.
    #[error("yaml encoding: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

//! # Arbor Harness Common Crate
//!
//! Shared building blocks for the cluster-test harness tools.
//!
//! ## Modules
//! - `error`: harness-wide error type
//! - `profile`: test-profile catalog (YAML) model and loader
//! - `validate`: profile counting and committee-reference invariants
//! - `accounts`: shared-account identities replicated across chains
//! - `crypto`: BLS12-381 key material and address derivation
//! - `keystore`: passphrase-encrypted keystore files

pub mod accounts;
pub mod crypto;
pub mod error;
pub mod keystore;
pub mod profile;
pub mod validate;

pub use accounts::SharedAccount;
pub use crypto::Keypair;
pub use error::{Error, Result};
pub use keystore::Keystore;
pub use profile::{AppConfig, ChainConfig, CommitteeAssignment, GeneralConfig};

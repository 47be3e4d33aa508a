//! Shared-account identities replicated across every chain.
//!
//! Loaded from an optional `accounts.yml` next to the profile catalog. A
//! missing file is equivalent to an empty set; a present file with an
//! undecodable private key is an error naming the account.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// File name of the optional shared-accounts file.
pub const ACCOUNTS_FILE: &str = "accounts.yml";

/// A long-lived identity present in every chain's accounts and keystore.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SharedAccount {
    pub address: String,
    pub public_key: String,
    pub private_key: String,
    /// Keystore passphrase, attached from the profile at load time.
    #[serde(default)]
    pub password: String,
    /// Raw key bytes for keystore encryption, never serialized.
    #[serde(skip)]
    pub private_key_bytes: Vec<u8>,
}

#[derive(Debug, Default, Deserialize)]
struct SharedAccountsFile {
    #[serde(default)]
    accounts: BTreeMap<String, SharedAccount>,
}

/// Read `<dir>/accounts.yml`, hex-decoding each private key. Returns an
/// empty map when the file does not exist.
pub fn load_shared_accounts(dir: impl AsRef<Path>) -> Result<BTreeMap<String, SharedAccount>> {
    let path = dir.as_ref().join(ACCOUNTS_FILE);
    let raw = match fs::read_to_string(&path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
        Err(e) => {
            return Err(Error::Profile(format!(
                "failed to read accounts file '{}': {e}",
                path.display()
            )))
        }
    };

    let parsed: SharedAccountsFile = serde_yaml::from_str(&raw)
        .map_err(|e| Error::Profile(format!("failed to parse accounts file: {e}")))?;

    let mut accounts = parsed.accounts;
    for (name, account) in accounts.iter_mut() {
        account.private_key_bytes = hex::decode(&account.private_key).map_err(|e| {
            Error::Profile(format!("failed to decode private key for account '{name}': {e}"))
        })?;
    }
    Ok(accounts)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_is_empty_set() {
        let tmp = tempfile::TempDir::new().expect("tmpdir");
        let accounts = load_shared_accounts(tmp.path()).expect("load");
        assert!(accounts.is_empty());
    }

    #[test]
    fn decodes_private_keys() {
        let tmp = tempfile::TempDir::new().expect("tmpdir");
        fs::write(
            tmp.path().join(ACCOUNTS_FILE),
            r#"
accounts:
  faucet:
    address: "00112233445566778899aabbccddeeff00112233"
    publicKey: "aa"
    privateKey: "0badc0de"
"#,
        )
        .expect("write");
        let accounts = load_shared_accounts(tmp.path()).expect("load");
        assert_eq!(accounts.len(), 1);
        assert_eq!(accounts["faucet"].private_key_bytes, vec![0x0b, 0xad, 0xc0, 0xde]);
    }

    #[test]
    fn invalid_hex_names_the_account() {
        let tmp = tempfile::TempDir::new().expect("tmpdir");
        fs::write(
            tmp.path().join(ACCOUNTS_FILE),
            r#"
accounts:
  broken:
    address: "00"
    publicKey: "aa"
    privateKey: "zz"
"#,
        )
        .expect("write");
        let err = load_shared_accounts(tmp.path()).unwrap_err();
        assert!(err.to_string().contains("broken"));
    }
}

//! Passphrase-encrypted keystore files.
//!
//! One keystore per chain maps addresses to encrypted private keys and
//! nicknames to addresses. Encryption is AES-256-GCM with a per-entry
//! random salt and nonce; the key is SHA3-256(salt || passphrase). The
//! `encrypted` field stores hex(nonce || ciphertext+tag).

use std::collections::BTreeMap;

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha3::{Digest, Sha3_256};

use crate::crypto::Keypair;
use crate::error::{Error, Result};

const SALT_LEN: usize = 16;
const NONCE_LEN: usize = 12;

/// A single encrypted private key entry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct EncryptedPrivateKey {
    pub public_key: String,
    pub salt: String,
    pub encrypted: String,
}

/// Address-keyed keystore with a nickname index.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Keystore {
    pub address_map: BTreeMap<String, EncryptedPrivateKey>,
    pub nickname_map: BTreeMap<String, String>,
}

impl Keystore {
    pub fn new() -> Self {
        Keystore::default()
    }

    /// Encrypt a raw private key under the shared passphrase and register
    /// it under `nickname`. Returns the derived address hex.
    pub fn import_raw(
        &mut self,
        private_key: &[u8],
        password: &str,
        nickname: &str,
    ) -> Result<String> {
        let keypair = Keypair::from_secret_bytes(private_key)?;
        let address = keypair.address_hex();

        let mut salt = [0u8; SALT_LEN];
        OsRng.fill_bytes(&mut salt);
        let mut nonce = [0u8; NONCE_LEN];
        OsRng.fill_bytes(&mut nonce);

        let key = derive_key(&salt, password);
        let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&key));
        let ciphertext = cipher
            .encrypt(Nonce::from_slice(&nonce), private_key)
            .map_err(|_| Error::Crypto("keystore encryption failed".into()))?;

        let mut encrypted = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        encrypted.extend_from_slice(&nonce);
        encrypted.extend_from_slice(&ciphertext);

        self.address_map.insert(
            address.clone(),
            EncryptedPrivateKey {
                public_key: keypair.public_hex(),
                salt: hex::encode(salt),
                encrypted: hex::encode(encrypted),
            },
        );
        self.nickname_map.insert(nickname.to_string(), address.clone());
        Ok(address)
    }

    /// Decrypt the entry stored under `address`.
    pub fn decrypt(&self, address: &str, password: &str) -> Result<Vec<u8>> {
        let entry = self
            .address_map
            .get(address)
            .ok_or_else(|| Error::Crypto(format!("no keystore entry for address {address}")))?;
        let salt = hex::decode(&entry.salt)
            .map_err(|e| Error::Crypto(format!("invalid salt hex: {e}")))?;
        let blob = hex::decode(&entry.encrypted)
            .map_err(|e| Error::Crypto(format!("invalid ciphertext hex: {e}")))?;
        if blob.len() <= NONCE_LEN {
            return Err(Error::Crypto("ciphertext too short".into()));
        }
        let (nonce, ciphertext) = blob.split_at(NONCE_LEN);

        let key = derive_key(&salt, password);
        let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&key));
        cipher
            .decrypt(Nonce::from_slice(nonce), ciphertext)
            .map_err(|_| Error::Crypto("keystore decryption failed".into()))
    }
}

fn derive_key(salt: &[u8], password: &str) -> [u8; 32] {
    let mut hasher = Sha3_256::new();
    hasher.update(salt);
    hasher.update(password.as_bytes());
    hasher.finalize().into()
}

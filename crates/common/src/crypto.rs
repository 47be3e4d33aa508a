//! BLS12-381 key material for synthesized node identities.
//!
//! Keys are generated from 32 bytes of OS entropy via `blst` (min-pk
//! variant: 32-byte secrets, 48-byte compressed public keys). The node
//! address is the first 20 bytes of the SHA3-256 digest of the public key.

use blst::min_pk::SecretKey;
use rand::rngs::OsRng;
use rand::RngCore;
use sha3::{Digest, Sha3_256};

use crate::error::{Error, Result};

/// Length of a serialized secret key.
pub const SECRET_KEY_LEN: usize = 32;
/// Length of a compressed public key.
pub const PUBLIC_KEY_LEN: usize = 48;
/// Length of a derived address.
pub const ADDRESS_LEN: usize = 20;

/// A freshly synthesized BLS12-381 keypair with its derived address.
#[derive(Clone)]
pub struct Keypair {
    secret: [u8; SECRET_KEY_LEN],
    public: [u8; PUBLIC_KEY_LEN],
    address: [u8; ADDRESS_LEN],
}

impl Keypair {
    /// Generate a keypair from OS randomness.
    pub fn generate() -> Result<Self> {
        let mut ikm = [0u8; SECRET_KEY_LEN];
        OsRng.fill_bytes(&mut ikm);
        let sk = SecretKey::key_gen(&ikm, &[])
            .map_err(|e| Error::KeyGeneration(format!("{e:?}")))?;
        Ok(Self::from_secret_key(sk))
    }

    /// Reconstruct a keypair from a serialized 32-byte secret.
    pub fn from_secret_bytes(bytes: &[u8]) -> Result<Self> {
        let sk = SecretKey::from_bytes(bytes)
            .map_err(|e| Error::Crypto(format!("invalid secret key: {e:?}")))?;
        Ok(Self::from_secret_key(sk))
    }

    fn from_secret_key(sk: SecretKey) -> Self {
        let public = sk.sk_to_pk().to_bytes();
        Keypair {
            secret: sk.to_bytes(),
            public,
            address: derive_address(&public),
        }
    }

    pub fn secret_bytes(&self) -> &[u8] {
        &self.secret
    }

    pub fn address_hex(&self) -> String {
        hex::encode(self.address)
    }

    pub fn public_hex(&self) -> String {
        hex::encode(self.public)
    }

    pub fn secret_hex(&self) -> String {
        hex::encode(self.secret)
    }
}

/// First 20 bytes of SHA3-256 over the compressed public key.
pub fn derive_address(public_key: &[u8]) -> [u8; ADDRESS_LEN] {
    let digest = Sha3_256::digest(public_key);
    let mut address = [0u8; ADDRESS_LEN];
    address.copy_from_slice(&digest[..ADDRESS_LEN]);
    address
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generates_distinct_keys() {
        let a = Keypair::generate().expect("keygen");
        let b = Keypair::generate().expect("keygen");
        assert_ne!(a.secret_hex(), b.secret_hex());
        assert_ne!(a.address_hex(), b.address_hex());
    }

    #[test]
    fn lengths_are_fixed() {
        let kp = Keypair::generate().expect("keygen");
        assert_eq!(kp.secret_hex().len(), SECRET_KEY_LEN * 2);
        assert_eq!(kp.public_hex().len(), PUBLIC_KEY_LEN * 2);
        assert_eq!(kp.address_hex().len(), ADDRESS_LEN * 2);
    }

    #[test]
    fn secret_roundtrip_is_deterministic() {
        let kp = Keypair::generate().expect("keygen");
        let restored = Keypair::from_secret_bytes(kp.secret_bytes()).expect("restore");
        assert_eq!(kp.public_hex(), restored.public_hex());
        assert_eq!(kp.address_hex(), restored.address_hex());
    }

    #[test]
    fn invalid_secret_rejected() {
        assert!(Keypair::from_secret_bytes(&[0u8; 5]).is_err());
    }

    #[test]
    fn address_is_prefix_of_pubkey_digest() {
        let kp = Keypair::generate().expect("keygen");
        let public = hex::decode(kp.public_hex()).expect("hex");
        let addr = derive_address(&public);
        assert_eq!(hex::encode(addr), kp.address_hex());
    }
}

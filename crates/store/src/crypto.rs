//! Envelope encryption for data at rest (spec §4.1): AES-256-GCM with a
//! SHA-256 integrity hash over the plaintext, grounded in the encrypted
//! storage backend pattern used for participant state in the pack's
//! node examples (key ring holding one or more versioned keys, newest
//! used for writes, any known version still used for reads).

use aes_gcm::aead::{Aead, KeyInit, OsRng};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as B64;
use rand::RngCore;
use sha2::{Digest, Sha256};

use crate::error::StoreError;

const NONCE_LEN: usize = 12;

/// Holds the active encryption key plus any still-readable prior versions.
/// `key_version` increments only when the operator rotates the configured
/// key; this ring never performs rotation itself.
pub struct KeyRing {
    active_version: u32,
    keys: Vec<(u32, [u8; 32])>,
}

impl KeyRing {
    pub fn from_base64(key_b64: &str) -> Result<Self, StoreError> {
        let raw = B64
            .decode(key_b64)
            .map_err(|e| StoreError::InvalidData(format!("invalid encryption key: {e}")))?;
        if raw.len() != 32 {
            return Err(StoreError::InvalidData(
                "encryption key must decode to 32 bytes".to_string(),
            ));
        }
        let mut key = [0u8; 32];
        key.copy_from_slice(&raw);
        Ok(Self {
            active_version: 1,
            keys: vec![(1, key)],
        })
    }

    fn key_for_version(&self, version: u32) -> Result<&[u8; 32], StoreError> {
        self.keys
            .iter()
            .find(|(v, _)| *v == version)
            .map(|(_, k)| k)
            .ok_or_else(|| StoreError::DecryptionFailure(format!("unknown key version {version}")))
    }

    pub fn active_version(&self) -> u32 {
        self.active_version
    }

    /// Encrypts `plaintext` under the active key, returning the nonce and
    /// ciphertext (which includes the GCM authentication tag).
    pub fn encrypt(&self, plaintext: &[u8]) -> Result<CipherText, StoreError> {
        let key_bytes = self.key_for_version(self.active_version)?;
        let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key_bytes));
        let mut nonce_bytes = [0u8; NONCE_LEN];
        OsRng.fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);
        let ciphertext = cipher
            .encrypt(nonce, plaintext)
            .map_err(|_| StoreError::IntegrityFailure("encryption failure".to_string()))?;
        Ok(CipherText {
            key_version: self.active_version,
            nonce: nonce_bytes.to_vec(),
            ciphertext,
        })
    }

    pub fn decrypt(&self, ct: &CipherText) -> Result<Vec<u8>, StoreError> {
        let key_bytes = self.key_for_version(ct.key_version)?;
        let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key_bytes));
        let nonce = Nonce::from_slice(&ct.nonce);
        cipher
            .decrypt(nonce, ct.ciphertext.as_ref())
            .map_err(|_| StoreError::DecryptionFailure("AEAD tag mismatch".to_string()))
    }
}

pub struct CipherText {
    pub key_version: u32,
    pub nonce: Vec<u8>,
    pub ciphertext: Vec<u8>,
}

/// SHA-256 hash over plaintext bytes, carried alongside the ciphertext so a
/// successful decrypt can still be checked against bit rot or a truncated
/// write independent of the AEAD tag.
pub fn integrity_hash(plaintext: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(plaintext);
    B64.encode(hasher.finalize())
}

pub fn verify_integrity(plaintext: &[u8], expected_hash: &str) -> bool {
    integrity_hash(plaintext) == expected_hash
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_key() -> String {
        B64.encode([7u8; 32])
    }

    #[test]
    fn encrypt_then_decrypt_round_trips() {
        let ring = KeyRing::from_base64(&test_key()).unwrap();
        let ct = ring.encrypt(b"hello world").unwrap();
        let pt = ring.decrypt(&ct).unwrap();
        assert_eq!(pt, b"hello world");
    }

    #[test]
    fn tampered_ciphertext_fails_decrypt() {
        let ring = KeyRing::from_base64(&test_key()).unwrap();
        let mut ct = ring.encrypt(b"hello world").unwrap();
        ct.ciphertext[0] ^= 0xFF;
        assert!(ring.decrypt(&ct).is_err());
    }

    #[test]
    fn integrity_hash_detects_mismatch() {
        let h = integrity_hash(b"payload");
        assert!(verify_integrity(b"payload", &h));
        assert!(!verify_integrity(b"tampered", &h));
    }

    #[test]
    fn rejects_key_of_wrong_length() {
        let bad = B64.encode([1u8; 16]);
        assert!(KeyRing::from_base64(&bad).is_err());
    }
}

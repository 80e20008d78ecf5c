//! On-disk envelope wrapping every entity the store persists: a version
//! number for optimistic concurrency (spec §4.1) plus either a plaintext
//! or an encrypted payload. Plaintext mode is a first-class, valid
//! configuration (SPEC_FULL.md §6 Open Question resolution) used whenever
//! no encryption key is configured — not a degraded fallback.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as B64;
use serde::{Deserialize, Serialize};
use serde::de::DeserializeOwned;

use crate::crypto::{self, CipherText, KeyRing};
use crate::error::StoreError;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "mode")]
enum Payload {
    Plain { body: serde_json::Value },
    Encrypted {
        key_version: u32,
        nonce_b64: String,
        ciphertext_b64: String,
        integrity_hash: String,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredEnvelope {
    pub version: u64,
    payload: Payload,
}

impl StoredEnvelope {
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Serializes `entity` into a new envelope at `version`, encrypting it
    /// when `ring` is present.
    pub fn seal<T: Serialize>(
        entity: &T,
        version: u64,
        ring: Option<&KeyRing>,
    ) -> Result<Self, StoreError> {
        let body = serde_json::to_value(entity)?;
        let plaintext = serde_json::to_vec(&body)?;
        let payload = match ring {
            None => Payload::Plain { body },
            Some(ring) => {
                let hash = crypto::integrity_hash(&plaintext);
                let ct = ring.encrypt(&plaintext)?;
                Payload::Encrypted {
                    key_version: ct.key_version,
                    nonce_b64: B64.encode(&ct.nonce),
                    ciphertext_b64: B64.encode(&ct.ciphertext),
                    integrity_hash: hash,
                }
            }
        };
        Ok(Self { version, payload })
    }

    /// Recovers the wrapped entity, verifying the integrity hash when the
    /// payload was encrypted. `ring` must be supplied to open an
    /// `Encrypted` payload; its absence against a `Plain` payload is fine.
    pub fn open<T: DeserializeOwned>(&self, ring: Option<&KeyRing>) -> Result<T, StoreError> {
        match &self.payload {
            Payload::Plain { body } => Ok(serde_json::from_value(body.clone())?),
            Payload::Encrypted {
                key_version,
                nonce_b64,
                ciphertext_b64,
                integrity_hash,
            } => {
                let ring = ring.ok_or_else(|| {
                    StoreError::DecryptionFailure("no encryption key configured".to_string())
                })?;
                let nonce = B64
                    .decode(nonce_b64)
                    .map_err(|e| StoreError::InvalidData(e.to_string()))?;
                let ciphertext = B64
                    .decode(ciphertext_b64)
                    .map_err(|e| StoreError::InvalidData(e.to_string()))?;
                let ct = CipherText {
                    key_version: *key_version,
                    nonce,
                    ciphertext,
                };
                let plaintext = ring.decrypt(&ct)?;
                if !crypto::verify_integrity(&plaintext, integrity_hash) {
                    return Err(StoreError::IntegrityFailure(
                        "stored hash does not match decrypted payload".to_string(),
                    ));
                }
                let body: serde_json::Value = serde_json::from_slice(&plaintext)?;
                Ok(serde_json::from_value(body)?)
            }
        }
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, StoreError> {
        Ok(serde_json::to_vec(self)?)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, StoreError> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::Engine as _;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Sample {
        n: u32,
        s: String,
    }

    #[test]
    fn plain_mode_round_trips_without_ring() {
        let sample = Sample { n: 1, s: "a".into() };
        let env = StoredEnvelope::seal(&sample, 1, None).unwrap();
        let back: Sample = env.open(None).unwrap();
        assert_eq!(back, sample);
    }

    #[test]
    fn encrypted_mode_round_trips_with_ring() {
        let key_b64 = B64.encode([3u8; 32]);
        let ring = KeyRing::from_base64(&key_b64).unwrap();
        let sample = Sample { n: 2, s: "b".into() };
        let env = StoredEnvelope::seal(&sample, 1, Some(&ring)).unwrap();
        let back: Sample = env.open(Some(&ring)).unwrap();
        assert_eq!(back, sample);
    }

    #[test]
    fn encrypted_payload_without_ring_fails() {
        let key_b64 = B64.encode([3u8; 32]);
        let ring = KeyRing::from_base64(&key_b64).unwrap();
        let sample = Sample { n: 3, s: "c".into() };
        let env = StoredEnvelope::seal(&sample, 1, Some(&ring)).unwrap();
        let res: Result<Sample, _> = env.open(None);
        assert!(res.is_err());
    }
}

//! Generic optimistic-concurrency store over any `KvBackend` (spec §4.1).
//!
//! Every write is a compare-and-set against the previously observed raw
//! bytes: the caller supplies the version it last read, `save` bumps it by
//! one, and a concurrent writer racing against a stale version sees its
//! CAS rejected and surfaces `VersionConflict` rather than silently
//! clobbering the other write. This mirrors the last-writer-wins-by-
//! timestamp guard the pack's sync repository uses at the SQL layer,
//! translated to a KV `cas_set`.

use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::backend::KvBackend;
use crate::crypto::KeyRing;
use crate::envelope::StoredEnvelope;
use crate::error::StoreError;

#[derive(Clone)]
pub struct SecureStore<B: KvBackend> {
    backend: Arc<B>,
    ring: Option<Arc<KeyRing>>,
}

impl<B: KvBackend> SecureStore<B> {
    pub fn new(backend: Arc<B>, ring: Option<Arc<KeyRing>>) -> Self {
        Self { backend, ring }
    }

    pub fn backend(&self) -> &Arc<B> {
        &self.backend
    }

    /// Loads and decrypts the entity at `key`, returning its current
    /// version alongside it so the caller can pass it back to `save`.
    pub async fn load<T: DeserializeOwned>(&self, key: &str) -> Result<Option<(T, u64)>, StoreError> {
        let Some(raw) = self.backend.get(key).await? else {
            return Ok(None);
        };
        let envelope = StoredEnvelope::from_bytes(&raw)?;
        let entity = envelope.open(self.ring.as_deref())?;
        Ok(Some((entity, envelope.version())))
    }

    /// Creates a brand-new entity at `key`. Fails if `key` already exists.
    pub async fn create<T: Serialize>(&self, key: &str, entity: &T) -> Result<u64, StoreError> {
        let envelope = StoredEnvelope::seal(entity, 1, self.ring.as_deref())?;
        let bytes = envelope.to_bytes()?;
        let ok = self.backend.cas_set(key, None, bytes).await?;
        if !ok {
            return Err(StoreError::Backend(format!(
                "key {key} already exists, cannot create"
            )));
        }
        Ok(1)
    }

    /// Overwrites the entity at `key`, provided `expected_version` still
    /// matches what's stored. Returns the new version on success.
    pub async fn save<T: Serialize>(
        &self,
        key: &str,
        entity: &T,
        expected_version: u64,
    ) -> Result<u64, StoreError> {
        let Some(current_raw) = self.backend.get(key).await? else {
            return Err(StoreError::NotFound(key.to_string()));
        };
        let current = StoredEnvelope::from_bytes(&current_raw)?;
        if current.version() != expected_version {
            return Err(StoreError::VersionConflict {
                expected: expected_version,
                found: current.version(),
            });
        }
        let new_version = expected_version + 1;
        let envelope = StoredEnvelope::seal(entity, new_version, self.ring.as_deref())?;
        let new_bytes = envelope.to_bytes()?;
        let ok = self
            .backend
            .cas_set(key, Some(current_raw), new_bytes)
            .await?;
        if !ok {
            return Err(StoreError::VersionConflict {
                expected: expected_version,
                found: expected_version + 1,
            });
        }
        Ok(new_version)
    }

    pub async fn delete(&self, key: &str) -> Result<bool, StoreError> {
        self.backend.delete(key).await
    }

    pub async fn exists(&self, key: &str) -> Result<bool, StoreError> {
        self.backend.exists(key).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory_backend::MemoryBackend;
    use serde::Deserialize;

    #[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
    struct Widget {
        n: u32,
    }

    fn store() -> SecureStore<MemoryBackend> {
        SecureStore::new(Arc::new(MemoryBackend::new()), None)
    }

    #[tokio::test]
    async fn create_then_load_round_trips() {
        let s = store();
        s.create("w:1", &Widget { n: 1 }).await.unwrap();
        let (w, v): (Widget, u64) = s.load("w:1").await.unwrap().unwrap();
        assert_eq!(w, Widget { n: 1 });
        assert_eq!(v, 1);
    }

    #[tokio::test]
    async fn save_with_stale_version_conflicts() {
        let s = store();
        s.create("w:1", &Widget { n: 1 }).await.unwrap();
        s.save("w:1", &Widget { n: 2 }, 1).await.unwrap();
        let err = s.save("w:1", &Widget { n: 3 }, 1).await.unwrap_err();
        assert!(matches!(err, StoreError::VersionConflict { .. }));
    }

    #[tokio::test]
    async fn create_twice_fails() {
        let s = store();
        s.create("w:1", &Widget { n: 1 }).await.unwrap();
        assert!(s.create("w:1", &Widget { n: 2 }).await.is_err());
    }
}

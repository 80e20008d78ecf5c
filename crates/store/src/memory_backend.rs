//! In-memory `KvBackend`: sufficient for tests and for a single-process
//! deployment (spec §6: "an in-memory implementation with the same
//! semantics is sufficient for testing").

use async_trait::async_trait;
use dashmap::DashMap;
use std::collections::BTreeSet;

use crate::backend::{KvBackend, glob_match};
use crate::error::StoreError;

#[derive(Default)]
pub struct MemoryBackend {
    strings: DashMap<String, Vec<u8>>,
    sets: DashMap<String, BTreeSet<String>>,
    zsets: DashMap<String, Vec<(f64, String)>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KvBackend for MemoryBackend {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.strings.get(key).map(|v| v.clone()))
    }

    async fn set(&self, key: &str, value: Vec<u8>) -> Result<(), StoreError> {
        self.strings.insert(key.to_string(), value);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool, StoreError> {
        Ok(self.strings.remove(key).is_some())
    }

    async fn exists(&self, key: &str) -> Result<bool, StoreError> {
        Ok(self.strings.contains_key(key))
    }

    async fn keys_by_pattern(&self, pattern: &str) -> Result<Vec<String>, StoreError> {
        Ok(self
            .strings
            .iter()
            .map(|e| e.key().clone())
            .filter(|k| glob_match(pattern, k))
            .collect())
    }

    async fn set_add(&self, key: &str, member: &str) -> Result<(), StoreError> {
        self.sets
            .entry(key.to_string())
            .or_default()
            .insert(member.to_string());
        Ok(())
    }

    async fn set_remove(&self, key: &str, member: &str) -> Result<(), StoreError> {
        if let Some(mut set) = self.sets.get_mut(key) {
            set.remove(member);
        }
        Ok(())
    }

    async fn set_members(&self, key: &str) -> Result<Vec<String>, StoreError> {
        Ok(self
            .sets
            .get(key)
            .map(|s| s.iter().cloned().collect())
            .unwrap_or_default())
    }

    async fn set_card(&self, key: &str) -> Result<usize, StoreError> {
        Ok(self.sets.get(key).map(|s| s.len()).unwrap_or(0))
    }

    async fn zadd(&self, key: &str, score: f64, member: &str) -> Result<(), StoreError> {
        let mut z = self.zsets.entry(key.to_string()).or_default();
        z.retain(|(_, m)| m != member);
        z.push((score, member.to_string()));
        z.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));
        Ok(())
    }

    async fn zrange_by_score(
        &self,
        key: &str,
        min: f64,
        max: f64,
    ) -> Result<Vec<String>, StoreError> {
        Ok(self
            .zsets
            .get(key)
            .map(|z| {
                z.iter()
                    .filter(|(score, _)| *score >= min && *score <= max)
                    .map(|(_, m)| m.clone())
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn zrem(&self, key: &str, member: &str) -> Result<(), StoreError> {
        if let Some(mut z) = self.zsets.get_mut(key) {
            z.retain(|(_, m)| m != member);
        }
        Ok(())
    }

    async fn cas_set(
        &self,
        key: &str,
        expected: Option<Vec<u8>>,
        new_value: Vec<u8>,
    ) -> Result<bool, StoreError> {
        match self.strings.entry(key.to_string()) {
            dashmap::mapref::entry::Entry::Occupied(mut e) => {
                if Some(e.get().clone()) == expected {
                    e.insert(new_value);
                    Ok(true)
                } else {
                    Ok(false)
                }
            }
            dashmap::mapref::entry::Entry::Vacant(e) => {
                if expected.is_none() {
                    e.insert(new_value);
                    Ok(true)
                } else {
                    Ok(false)
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn cas_set_rejects_on_mismatch() {
        let backend = MemoryBackend::new();
        backend.set("k", b"v1".to_vec()).await.unwrap();
        let ok = backend
            .cas_set("k", Some(b"wrong".to_vec()), b"v2".to_vec())
            .await
            .unwrap();
        assert!(!ok);
        assert_eq!(backend.get("k").await.unwrap(), Some(b"v1".to_vec()));
    }

    #[tokio::test]
    async fn cas_set_on_vacant_requires_none() {
        let backend = MemoryBackend::new();
        assert!(
            backend
                .cas_set("new", None, b"v1".to_vec())
                .await
                .unwrap()
        );
        assert!(
            !backend
                .cas_set("new", None, b"v2".to_vec())
                .await
                .unwrap()
        );
    }

    #[tokio::test]
    async fn zrange_by_score_orders_and_filters() {
        let backend = MemoryBackend::new();
        backend.zadd("z", 30.0, "c").await.unwrap();
        backend.zadd("z", 10.0, "a").await.unwrap();
        backend.zadd("z", 20.0, "b").await.unwrap();
        let got = backend.zrange_by_score("z", 0.0, 25.0).await.unwrap();
        assert_eq!(got, vec!["a".to_string(), "b".to_string()]);
    }
}

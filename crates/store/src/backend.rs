//! Minimal KV backend abstraction (spec §4.1): string get/set/delete/exists,
//! keys-by-pattern, sets, sorted sets, and an atomic compare-and-set
//! primitive. Any backend offering these primitives is acceptable — a
//! Redis-compatible server or an in-memory stand-in both satisfy it (spec §6).

use async_trait::async_trait;

use crate::error::StoreError;

#[async_trait]
pub trait KvBackend: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError>;
    async fn set(&self, key: &str, value: Vec<u8>) -> Result<(), StoreError>;
    async fn delete(&self, key: &str) -> Result<bool, StoreError>;
    async fn exists(&self, key: &str) -> Result<bool, StoreError>;

    /// Glob-style pattern match (`*` wildcard only), akin to Redis `KEYS`.
    async fn keys_by_pattern(&self, pattern: &str) -> Result<Vec<String>, StoreError>;

    async fn set_add(&self, key: &str, member: &str) -> Result<(), StoreError>;
    async fn set_remove(&self, key: &str, member: &str) -> Result<(), StoreError>;
    async fn set_members(&self, key: &str) -> Result<Vec<String>, StoreError>;
    async fn set_card(&self, key: &str) -> Result<usize, StoreError>;

    async fn zadd(&self, key: &str, score: f64, member: &str) -> Result<(), StoreError>;
    async fn zrange_by_score(
        &self,
        key: &str,
        min: f64,
        max: f64,
    ) -> Result<Vec<String>, StoreError>;
    async fn zrem(&self, key: &str, member: &str) -> Result<(), StoreError>;

    /// Atomic compare-and-set on the raw value of `key`. `expected = None`
    /// means "key must not currently exist". Returns `true` on success,
    /// `false` if the current value didn't match `expected` (the caller
    /// should reload and retry or surface `VERSION_CONFLICT`).
    async fn cas_set(
        &self,
        key: &str,
        expected: Option<Vec<u8>>,
        new_value: Vec<u8>,
    ) -> Result<bool, StoreError>;
}

/// Minimal glob matcher supporting only the `*` wildcard, sufficient for the
/// namespaced key patterns this store uses (`goal:*`, `reminder:*`, ...).
pub fn glob_match(pattern: &str, candidate: &str) -> bool {
    fn go(p: &[u8], c: &[u8]) -> bool {
        match p.first() {
            None => c.is_empty(),
            Some(b'*') => go(&p[1..], c) || (!c.is_empty() && go(p, &c[1..])),
            Some(&ch) => c.first() == Some(&ch) && go(&p[1..], &c[1..]),
        }
    }
    go(pattern.as_bytes(), candidate.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn glob_matches_prefix_star() {
        assert!(glob_match("goal:*", "goal:123"));
        assert!(!glob_match("goal:*", "quest:123"));
        assert!(glob_match("*", "anything"));
        assert!(glob_match("drill:*:2025-01-15", "drill:abc:2025-01-15"));
    }
}

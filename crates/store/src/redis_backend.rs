//! Redis-backed `KvBackend` (spec §6: "Redis or a Redis-compatible store
//! is assumed"), built on `redis::aio::ConnectionManager` for automatic
//! reconnection the way the pack's provider cache wraps its redis client.

use async_trait::async_trait;
use redis::AsyncCommands;
use redis::aio::ConnectionManager;

use crate::backend::KvBackend;
use crate::error::StoreError;

#[derive(Clone)]
pub struct RedisBackend {
    conn: ConnectionManager,
}

impl RedisBackend {
    pub async fn connect(redis_url: &str) -> Result<Self, StoreError> {
        let client = redis::Client::open(redis_url)
            .map_err(|e| StoreError::Backend(format!("invalid redis url: {e}")))?;
        let conn = client
            .get_connection_manager()
            .await
            .map_err(|e| StoreError::Backend(format!("redis connect failed: {e}")))?;
        Ok(Self { conn })
    }
}

fn backend_err(e: redis::RedisError) -> StoreError {
    StoreError::Backend(e.to_string())
}

#[async_trait]
impl KvBackend for RedisBackend {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        let mut conn = self.conn.clone();
        conn.get(key).await.map_err(backend_err)
    }

    async fn set(&self, key: &str, value: Vec<u8>) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        conn.set(key, value).await.map_err(backend_err)
    }

    async fn delete(&self, key: &str) -> Result<bool, StoreError> {
        let mut conn = self.conn.clone();
        let removed: u64 = conn.del(key).await.map_err(backend_err)?;
        Ok(removed > 0)
    }

    async fn exists(&self, key: &str) -> Result<bool, StoreError> {
        let mut conn = self.conn.clone();
        conn.exists(key).await.map_err(backend_err)
    }

    async fn keys_by_pattern(&self, pattern: &str) -> Result<Vec<String>, StoreError> {
        let mut conn = self.conn.clone();
        conn.keys(pattern).await.map_err(backend_err)
    }

    async fn set_add(&self, key: &str, member: &str) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        conn.sadd(key, member).await.map_err(backend_err)
    }

    async fn set_remove(&self, key: &str, member: &str) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        conn.srem(key, member).await.map_err(backend_err)
    }

    async fn set_members(&self, key: &str) -> Result<Vec<String>, StoreError> {
        let mut conn = self.conn.clone();
        conn.smembers(key).await.map_err(backend_err)
    }

    async fn set_card(&self, key: &str) -> Result<usize, StoreError> {
        let mut conn = self.conn.clone();
        conn.scard(key).await.map_err(backend_err)
    }

    async fn zadd(&self, key: &str, score: f64, member: &str) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        conn.zadd(key, member, score).await.map_err(backend_err)
    }

    async fn zrange_by_score(
        &self,
        key: &str,
        min: f64,
        max: f64,
    ) -> Result<Vec<String>, StoreError> {
        let mut conn = self.conn.clone();
        conn.zrangebyscore(key, min, max).await.map_err(backend_err)
    }

    async fn zrem(&self, key: &str, member: &str) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        conn.zrem(key, member).await.map_err(backend_err)
    }

    /// Implemented as a Lua script so the compare-and-swap is atomic on the
    /// server: Redis doesn't expose a native "SET if equals" primitive.
    async fn cas_set(
        &self,
        key: &str,
        expected: Option<Vec<u8>>,
        new_value: Vec<u8>,
    ) -> Result<bool, StoreError> {
        const SCRIPT: &str = r#"
            local current = redis.call('GET', KEYS[1])
            if current == false then
                if ARGV[1] == '' then
                    redis.call('SET', KEYS[1], ARGV[2])
                    return 1
                end
                return 0
            end
            if ARGV[1] == current then
                redis.call('SET', KEYS[1], ARGV[2])
                return 1
            end
            return 0
        "#;
        let mut conn = self.conn.clone();
        let has_expected = expected.is_some();
        let expected_bytes = expected.unwrap_or_default();
        let expected_marker: Vec<u8> = if has_expected {
            expected_bytes
        } else {
            Vec::new()
        };
        let result: i32 = redis::Script::new(SCRIPT)
            .key(key)
            .arg(expected_marker)
            .arg(new_value)
            .invoke_async(&mut conn)
            .await
            .map_err(backend_err)?;
        Ok(result == 1)
    }
}

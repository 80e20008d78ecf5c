//! Spark repository: `drillSparks` and `drillPendingSpark` index maintenance
//! (spec §3, §4.1) so the scheduler can find "the drill's pending Spark"
//! and cascade delete can find every Spark a drill ever produced without a
//! full scan.

use practice_domain::{DrillId, Spark, SparkId, SparkStatus};

use crate::backend::KvBackend;
use crate::error::StoreError;
use crate::keys;
use crate::store::SecureStore;

#[derive(Clone)]
pub struct SparkRepository<B: KvBackend> {
    store: SecureStore<B>,
}

impl<B: KvBackend> SparkRepository<B> {
    pub fn new(store: SecureStore<B>) -> Self {
        Self { store }
    }

    pub async fn insert(&self, spark: &Spark) -> Result<(), StoreError> {
        let key = keys::spark(spark.id);
        self.store.create(&key, spark).await?;
        let backend = self.store.backend();
        if let Err(e) = backend
            .set_add(&keys::drill_sparks(spark.drill_id), &spark.id.to_string())
            .await
        {
            self.store.delete(&key).await.ok();
            return Err(e);
        }
        if spark.status == SparkStatus::Pending {
            if let Err(e) = backend
                .set(&keys::drill_pending_spark(spark.drill_id), spark.id.to_string().into_bytes())
                .await
            {
                backend
                    .set_remove(&keys::drill_sparks(spark.drill_id), &spark.id.to_string())
                    .await
                    .ok();
                self.store.delete(&key).await.ok();
                return Err(e);
            }
        }
        Ok(())
    }

    pub async fn get(&self, id: SparkId) -> Result<Option<(Spark, u64)>, StoreError> {
        self.store.load(&keys::spark(id)).await
    }

    pub async fn require(&self, id: SparkId) -> Result<(Spark, u64), StoreError> {
        self.get(id)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("spark {id}")))
    }

    /// The drill's current pending Spark, if any (spec §3 invariant: at
    /// most one at a time).
    pub async fn get_pending_for_drill(&self, drill_id: DrillId) -> Result<Option<(Spark, u64)>, StoreError> {
        let Some(bytes) = self.store.backend().get(&keys::drill_pending_spark(drill_id)).await? else {
            return Ok(None);
        };
        let id: SparkId = String::from_utf8_lossy(&bytes)
            .parse()
            .map_err(|_| StoreError::InvalidData("corrupt drillPendingSpark entry".to_string()))?;
        self.get(id).await
    }

    pub async fn list_for_drill(&self, drill_id: DrillId) -> Result<Vec<Spark>, StoreError> {
        let ids = self.store.backend().set_members(&keys::drill_sparks(drill_id)).await?;
        let mut sparks = Vec::with_capacity(ids.len());
        for id in ids {
            let spark_id: SparkId = id
                .parse()
                .map_err(|_| StoreError::InvalidData(format!("corrupt spark id in index: {id}")))?;
            if let Some((spark, _)) = self.get(spark_id).await? {
                sparks.push(spark);
            }
        }
        Ok(sparks)
    }

    /// Persists `spark`, clearing `drillPendingSpark` once it leaves pending
    /// (a Spark never re-enters pending, so there's nothing to re-add).
    pub async fn update(&self, spark: &Spark, expected_version: u64) -> Result<u64, StoreError> {
        let new_version = self.store.save(&keys::spark(spark.id), spark, expected_version).await?;
        if spark.status != SparkStatus::Pending {
            let backend = self.store.backend();
            if let Some(bytes) = backend.get(&keys::drill_pending_spark(spark.drill_id)).await? {
                if bytes == spark.id.to_string().into_bytes() {
                    backend.delete(&keys::drill_pending_spark(spark.drill_id)).await?;
                }
            }
        }
        Ok(new_version)
    }

    pub async fn delete(&self, spark: &Spark) -> Result<(), StoreError> {
        let backend = self.store.backend();
        backend.set_remove(&keys::drill_sparks(spark.drill_id), &spark.id.to_string()).await?;
        if let Some(bytes) = backend.get(&keys::drill_pending_spark(spark.drill_id)).await? {
            if bytes == spark.id.to_string().into_bytes() {
                backend.delete(&keys::drill_pending_spark(spark.drill_id)).await?;
            }
        }
        self.store.delete(&keys::spark(spark.id)).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory_backend::MemoryBackend;
    use practice_domain::{DrillId, SparkEvent, SparkVariant, UserId};
    use std::sync::Arc;

    fn store() -> SecureStore<MemoryBackend> {
        SecureStore::new(Arc::new(MemoryBackend::new()), None)
    }

    #[tokio::test]
    async fn pending_pointer_set_on_insert_and_cleared_on_completion() {
        let repo = SparkRepository::new(store());
        let drill_id = DrillId::new();
        let spark = Spark::new(drill_id, UserId::new(), SparkVariant::Full, 0, 20).unwrap();
        repo.insert(&spark).await.unwrap();

        let (pending, version) = repo.get_pending_for_drill(drill_id).await.unwrap().unwrap();
        assert_eq!(pending.id, spark.id);

        let mut completed = pending;
        completed.apply(SparkEvent::Complete).unwrap();
        repo.update(&completed, version).await.unwrap();

        assert!(repo.get_pending_for_drill(drill_id).await.unwrap().is_none());
        assert_eq!(repo.list_for_drill(drill_id).await.unwrap().len(), 1);
    }
}

//! Goal repository: validation-before-write plus the `userGoals` /
//! `userActiveGoals` index maintenance described in spec §4.1.

use std::sync::Arc;

use practice_domain::{EngineError, Goal, GoalId, GoalStatus, UserId};

use crate::backend::KvBackend;
use crate::error::StoreError;
use crate::keys;
use crate::store::SecureStore;

#[derive(Clone)]
pub struct GoalRepository<B: KvBackend> {
    store: SecureStore<B>,
}

impl<B: KvBackend> GoalRepository<B> {
    pub fn new(store: SecureStore<B>) -> Self {
        Self { store }
    }

    pub fn backend(&self) -> &Arc<B> {
        self.store.backend()
    }

    pub async fn insert(&self, goal: &Goal) -> Result<(), StoreError> {
        goal.check_invariants()
            .map_err(|e| StoreError::InvalidData(e.to_string()))?;
        let key = keys::goal(goal.id);
        self.store.create(&key, goal).await?;

        let backend = self.store.backend();
        if let Err(e) = backend
            .set_add(&keys::user_goals(goal.owner_user_id), &goal.id.to_string())
            .await
        {
            self.store.delete(&key).await.ok();
            return Err(e);
        }
        if goal.status == GoalStatus::Active {
            if let Err(e) = backend
                .set_add(
                    &keys::user_active_goals(goal.owner_user_id),
                    &goal.id.to_string(),
                )
                .await
            {
                backend
                    .set_remove(&keys::user_goals(goal.owner_user_id), &goal.id.to_string())
                    .await
                    .ok();
                self.store.delete(&key).await.ok();
                return Err(e);
            }
        }
        Ok(())
    }

    pub async fn get(&self, id: GoalId) -> Result<Option<(Goal, u64)>, StoreError> {
        self.store.load(&keys::goal(id)).await
    }

    pub async fn require(&self, id: GoalId) -> Result<(Goal, u64), StoreError> {
        self.get(id)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("goal {id}")))
    }

    /// Persists `goal`, keeping the `userActiveGoals` index synchronized
    /// with whatever status the caller's transition landed on.
    pub async fn update(
        &self,
        goal: &Goal,
        expected_version: u64,
        was_active: bool,
    ) -> Result<u64, StoreError> {
        goal.check_invariants()
            .map_err(|e| StoreError::InvalidData(e.to_string()))?;
        let new_version = self
            .store
            .save(&keys::goal(goal.id), goal, expected_version)
            .await?;

        let now_active = goal.status == GoalStatus::Active;
        if was_active && !now_active {
            self.store
                .backend()
                .set_remove(&keys::user_active_goals(goal.owner_user_id), &goal.id.to_string())
                .await?;
        } else if !was_active && now_active {
            self.store
                .backend()
                .set_add(&keys::user_active_goals(goal.owner_user_id), &goal.id.to_string())
                .await?;
        }
        Ok(new_version)
    }

    pub async fn list_for_user(&self, user_id: UserId) -> Result<Vec<Goal>, StoreError> {
        let ids = self.store.backend().set_members(&keys::user_goals(user_id)).await?;
        let mut goals = Vec::with_capacity(ids.len());
        for id in ids {
            let goal_id: GoalId = id
                .parse()
                .map_err(|_| StoreError::InvalidData(format!("corrupt goal id in index: {id}")))?;
            if let Some((goal, _)) = self.get(goal_id).await? {
                goals.push(goal);
            }
        }
        goals.sort_by_key(|g| g.priority);
        Ok(goals)
    }

    pub async fn list_active_for_user(&self, user_id: UserId) -> Result<Vec<Goal>, StoreError> {
        let ids = self
            .store
            .backend()
            .set_members(&keys::user_active_goals(user_id))
            .await?;
        let mut goals = Vec::with_capacity(ids.len());
        for id in ids {
            let goal_id: GoalId = id
                .parse()
                .map_err(|_| StoreError::InvalidData(format!("corrupt goal id in index: {id}")))?;
            if let Some((goal, _)) = self.get(goal_id).await? {
                goals.push(goal);
            }
        }
        goals.sort_by_key(|g| g.priority);
        Ok(goals)
    }

    pub async fn remove_from_indexes(&self, goal: &Goal) -> Result<(), StoreError> {
        let backend = self.store.backend();
        backend
            .set_remove(&keys::user_goals(goal.owner_user_id), &goal.id.to_string())
            .await?;
        backend
            .set_remove(&keys::user_active_goals(goal.owner_user_id), &goal.id.to_string())
            .await?;
        Ok(())
    }

    pub async fn delete(&self, goal: &Goal) -> Result<(), StoreError> {
        self.remove_from_indexes(goal).await?;
        self.store.delete(&keys::goal(goal.id)).await?;
        Ok(())
    }

    /// Sweeps completed/abandoned Goals older than `ttl` past their
    /// `updated_at` (spec §4.1 retention: terminal Goals expire after 24h).
    pub async fn sweep_terminal_older_than(
        &self,
        ttl: chrono::Duration,
    ) -> Result<usize, StoreError> {
        let keys = self.store.backend().keys_by_pattern("goal:*").await?;
        let mut swept = 0;
        let cutoff = chrono::Utc::now() - ttl;
        for key in keys {
            if let Some((goal, _)) = self.store.load::<Goal>(&key).await? {
                if goal.status.is_terminal() && goal.updated_at < cutoff {
                    self.delete(&goal).await?;
                    swept += 1;
                }
            }
        }
        Ok(swept)
    }
}

impl From<EngineError> for StoreError {
    fn from(err: EngineError) -> Self {
        StoreError::InvalidData(err.to_string())
    }
}

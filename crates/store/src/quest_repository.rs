//! Quest repository: `goalQuests` index maintenance (spec §4.1).

use practice_domain::{Quest, QuestId, GoalId};

use crate::backend::KvBackend;
use crate::error::StoreError;
use crate::keys;
use crate::store::SecureStore;

#[derive(Clone)]
pub struct QuestRepository<B: KvBackend> {
    store: SecureStore<B>,
}

impl<B: KvBackend> QuestRepository<B> {
    pub fn new(store: SecureStore<B>) -> Self {
        Self { store }
    }

    pub async fn insert(&self, quest: &Quest) -> Result<(), StoreError> {
        let key = keys::quest(quest.id);
        self.store.create(&key, quest).await?;
        if let Err(e) = self
            .store
            .backend()
            .set_add(&keys::goal_quests(quest.goal_id), &quest.id.to_string())
            .await
        {
            self.store.delete(&key).await.ok();
            return Err(e);
        }
        Ok(())
    }

    pub async fn get(&self, id: QuestId) -> Result<Option<(Quest, u64)>, StoreError> {
        self.store.load(&keys::quest(id)).await
    }

    pub async fn require(&self, id: QuestId) -> Result<(Quest, u64), StoreError> {
        self.get(id)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("quest {id}")))
    }

    pub async fn update(&self, quest: &Quest, expected_version: u64) -> Result<u64, StoreError> {
        self.store.save(&keys::quest(quest.id), quest, expected_version).await
    }

    pub async fn list_for_goal(&self, goal_id: GoalId) -> Result<Vec<Quest>, StoreError> {
        let ids = self
            .store
            .backend()
            .set_members(&keys::goal_quests(goal_id))
            .await?;
        let mut quests = Vec::with_capacity(ids.len());
        for id in ids {
            let quest_id: QuestId = id
                .parse()
                .map_err(|_| StoreError::InvalidData(format!("corrupt quest id in index: {id}")))?;
            if let Some((quest, _)) = self.get(quest_id).await? {
                quests.push(quest);
            }
        }
        quests.sort_by_key(|q| q.order);
        Ok(quests)
    }

    pub async fn delete(&self, quest: &Quest) -> Result<(), StoreError> {
        self.store
            .backend()
            .set_remove(&keys::goal_quests(quest.goal_id), &quest.id.to_string())
            .await?;
        self.store.delete(&keys::quest(quest.id)).await?;
        Ok(())
    }
}

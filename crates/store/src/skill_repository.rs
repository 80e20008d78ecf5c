//! Skill repository: `questSkills`, `goalSkills`, `userSkills` index
//! maintenance (spec §4.1).

use practice_domain::{GoalId, QuestId, Skill, SkillId, UserId};

use crate::backend::KvBackend;
use crate::error::StoreError;
use crate::keys;
use crate::store::SecureStore;

#[derive(Clone)]
pub struct SkillRepository<B: KvBackend> {
    store: SecureStore<B>,
}

impl<B: KvBackend> SkillRepository<B> {
    pub fn new(store: SecureStore<B>) -> Self {
        Self { store }
    }

    pub async fn insert(&self, skill: &Skill) -> Result<(), StoreError> {
        let key = keys::skill(skill.id);
        self.store.create(&key, skill).await?;

        let backend = self.store.backend();
        let added = [
            backend.set_add(&keys::quest_skills(skill.quest_id), &skill.id.to_string()).await,
            backend.set_add(&keys::goal_skills(skill.goal_id), &skill.id.to_string()).await,
            backend.set_add(&keys::user_skills(skill.user_id), &skill.id.to_string()).await,
        ];
        if let Some(Err(_)) = added.iter().find(|r| r.is_err()) {
            backend.set_remove(&keys::quest_skills(skill.quest_id), &skill.id.to_string()).await.ok();
            backend.set_remove(&keys::goal_skills(skill.goal_id), &skill.id.to_string()).await.ok();
            backend.set_remove(&keys::user_skills(skill.user_id), &skill.id.to_string()).await.ok();
            self.store.delete(&key).await.ok();
            return Err(StoreError::Backend("failed to maintain skill indexes".to_string()));
        }
        Ok(())
    }

    pub async fn get(&self, id: SkillId) -> Result<Option<(Skill, u64)>, StoreError> {
        self.store.load(&keys::skill(id)).await
    }

    pub async fn require(&self, id: SkillId) -> Result<(Skill, u64), StoreError> {
        self.get(id)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("skill {id}")))
    }

    pub async fn update(&self, skill: &Skill, expected_version: u64) -> Result<u64, StoreError> {
        self.store.save(&keys::skill(skill.id), skill, expected_version).await
    }

    pub async fn list_for_quest(&self, quest_id: QuestId) -> Result<Vec<Skill>, StoreError> {
        self.list_by_index(&keys::quest_skills(quest_id)).await
    }

    pub async fn list_for_goal(&self, goal_id: GoalId) -> Result<Vec<Skill>, StoreError> {
        self.list_by_index(&keys::goal_skills(goal_id)).await
    }

    pub async fn list_for_user(&self, user_id: UserId) -> Result<Vec<Skill>, StoreError> {
        self.list_by_index(&keys::user_skills(user_id)).await
    }

    async fn list_by_index(&self, index_key: &str) -> Result<Vec<Skill>, StoreError> {
        let ids = self.store.backend().set_members(index_key).await?;
        let mut skills = Vec::with_capacity(ids.len());
        for id in ids {
            let skill_id: SkillId = id
                .parse()
                .map_err(|_| StoreError::InvalidData(format!("corrupt skill id in index: {id}")))?;
            if let Some((skill, _)) = self.get(skill_id).await? {
                skills.push(skill);
            }
        }
        skills.sort_by_key(|s| s.order);
        Ok(skills)
    }

    pub async fn delete(&self, skill: &Skill) -> Result<(), StoreError> {
        let backend = self.store.backend();
        backend.set_remove(&keys::quest_skills(skill.quest_id), &skill.id.to_string()).await?;
        backend.set_remove(&keys::goal_skills(skill.goal_id), &skill.id.to_string()).await?;
        backend.set_remove(&keys::user_skills(skill.user_id), &skill.id.to_string()).await?;
        self.store.delete(&keys::skill(skill.id)).await?;
        Ok(())
    }
}

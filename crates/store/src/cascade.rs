//! Cascade delete: Goal → Quests → Skills → Drills → Sparks → Reminders
//! (spec §4.1). Idempotent — re-invoking against a Goal that's already
//! gone (or partially cleaned up by a prior failed attempt) just finds
//! nothing left to delete at each level and returns a smaller count.

use practice_domain::Goal;

use crate::backend::KvBackend;
use crate::drill_repository::DrillRepository;
use crate::error::StoreError;
use crate::goal_repository::GoalRepository;
use crate::quest_repository::QuestRepository;
use crate::reminder_repository::ReminderRepository;
use crate::skill_repository::SkillRepository;
use crate::spark_repository::SparkRepository;
use crate::store::SecureStore;

#[derive(Debug, Default, Clone, Copy, serde::Serialize)]
pub struct CascadeCount {
    pub quests: usize,
    pub skills: usize,
    pub drills: usize,
    pub sparks: usize,
    pub reminders: usize,
}

impl CascadeCount {
    pub fn total(&self) -> usize {
        self.quests + self.skills + self.drills + self.sparks + self.reminders
    }
}

pub struct CascadeDeleter<B: KvBackend> {
    goals: GoalRepository<B>,
    quests: QuestRepository<B>,
    skills: SkillRepository<B>,
    drills: DrillRepository<B>,
    sparks: SparkRepository<B>,
    reminders: ReminderRepository<B>,
}

impl<B: KvBackend> CascadeDeleter<B> {
    pub fn new(store: SecureStore<B>) -> Self {
        Self {
            goals: GoalRepository::new(store.clone()),
            quests: QuestRepository::new(store.clone()),
            skills: SkillRepository::new(store.clone()),
            drills: DrillRepository::new(store.clone()),
            sparks: SparkRepository::new(store.clone()),
            reminders: ReminderRepository::new(store),
        }
    }

    /// Tears down a Goal and everything owned beneath it: Quests, Skills,
    /// Drills, Sparks, Reminders. Safe to call twice — the second call walks
    /// the same indices, finds nothing left under them, and returns a
    /// `CascadeCount` of all zeroes (spec §8 "cascadeDelete is idempotent").
    pub async fn delete_goal(&self, goal: &Goal) -> Result<CascadeCount, StoreError> {
        let mut count = CascadeCount::default();

        for quest in self.quests.list_for_goal(goal.id).await? {
            for skill in self.skills.list_for_quest(quest.id).await? {
                let sub = self.delete_skill_subtree(&skill.id).await?;
                count.skills += 1;
                count.drills += sub.drills;
                count.sparks += sub.sparks;
                count.reminders += sub.reminders;
            }
            self.quests.delete(&quest).await?;
            count.quests += 1;
        }

        self.goals.delete(goal).await?;
        Ok(count)
    }

    async fn delete_skill_subtree(
        &self,
        skill_id: &practice_domain::SkillId,
    ) -> Result<CascadeCount, StoreError> {
        let mut count = CascadeCount::default();
        let Some((skill, _)) = self.skills.get(*skill_id).await? else {
            return Ok(count);
        };
        for drill in self.drills.list_for_skill(*skill_id).await? {
            let sub = self.delete_drill_and_descendants(drill.id).await?;
            count.drills += sub.drills;
            count.sparks += sub.sparks;
            count.reminders += sub.reminders;
        }
        self.skills.delete(&skill).await?;
        Ok(count)
    }

    /// Deletes a single Drill plus every Spark it ever produced and every
    /// Reminder scheduled against those Sparks, driven entirely by the
    /// `drillSparks`/`sparkReminders` indices — no caller-supplied id lists.
    pub async fn delete_drill_and_descendants(
        &self,
        drill_id: practice_domain::DrillId,
    ) -> Result<CascadeCount, StoreError> {
        let mut count = CascadeCount::default();
        for spark in self.sparks.list_for_drill(drill_id).await? {
            for (reminder, _) in self.reminders.list_for_spark(spark.id).await? {
                self.reminders.delete(&reminder).await?;
                count.reminders += 1;
            }
            self.sparks.delete(&spark).await?;
            count.sparks += 1;
        }
        if let Some((drill, _)) = self.drills.get(drill_id).await? {
            self.drills.delete(&drill).await?;
            count.drills += 1;
        }
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory_backend::MemoryBackend;
    use practice_domain::{
        DailyDrill, Difficulty, Goal, Quest, QuestEvent, Reminder, Skill, Spark, SparkVariant, Tone, UserId,
    };
    use std::collections::BTreeSet;
    use std::sync::Arc;

    fn store() -> SecureStore<MemoryBackend> {
        SecureStore::new(Arc::new(MemoryBackend::new()), None)
    }

    #[tokio::test]
    async fn cascade_delete_removes_full_subtree_and_is_idempotent() {
        let s = store();
        let deleter = CascadeDeleter::new(s.clone());
        let goals = GoalRepository::new(s.clone());
        let quests = QuestRepository::new(s.clone());
        let skills = SkillRepository::new(s.clone());
        let drills = DrillRepository::new(s.clone());
        let sparks = SparkRepository::new(s.clone());
        let reminders = ReminderRepository::new(s.clone());

        let user = UserId::new();
        let goal = Goal::new(user, "Learn Rust".into(), "".into(), "UTC".into(), Some(1)).unwrap();
        goals.insert(&goal).await.unwrap();

        let mut quest = Quest::new(goal.id, "Basics".into(), "".into(), 1).unwrap();
        quest.apply(QuestEvent::Start).unwrap();
        quests.insert(&quest).await.unwrap();

        let skill = Skill::new(
            quest.id,
            goal.id,
            user,
            "Write a loop".into(),
            "prints items".into(),
            vec!["syntax".into()],
            20,
            Difficulty::Foundation,
            1,
        )
        .unwrap();
        skills.insert(&skill).await.unwrap();

        let drill = DailyDrill::new(
            practice_domain::WeekPlanId::new(),
            skill.id,
            user,
            goal.id,
            chrono::NaiveDate::from_ymd_opt(2025, 1, 15).unwrap(),
            1,
            "action".into(),
            "pass".into(),
            "constraint".into(),
            20,
            false,
            0,
        )
        .unwrap();
        drills.insert(&drill).await.unwrap();

        let spark = Spark::new(drill.id, user, SparkVariant::Full, 0, 20).unwrap();
        sparks.insert(&spark).await.unwrap();

        let reminder = Reminder::new(
            user,
            drill.id,
            spark.id,
            chrono::Utc::now(),
            0,
            SparkVariant::Full,
            Tone::Encouraging,
            BTreeSet::new(),
        );
        reminders.insert(&reminder).await.unwrap();

        let count = deleter.delete_goal(&goal).await.unwrap();
        assert_eq!(count.quests, 1);
        assert_eq!(count.skills, 1);
        assert_eq!(count.drills, 1);
        assert_eq!(count.sparks, 1);
        assert_eq!(count.reminders, 1);

        assert!(goals.get(goal.id).await.unwrap().is_none());
        assert!(drills.get(drill.id).await.unwrap().is_none());
        assert!(sparks.get(spark.id).await.unwrap().is_none());
        assert!(reminders.get(reminder.id).await.unwrap().is_none());

        // Idempotent: re-running against the (now-gone) goal finds nothing.
        let goal_like = goal.clone();
        let second = deleter.delete_goal(&goal_like).await.unwrap();
        assert_eq!(second.total(), 0);
    }
}

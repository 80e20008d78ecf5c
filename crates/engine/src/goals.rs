//! Goal lifecycle operations (spec §4.8): `createGoal`, `onGoalCreated`,
//! `getGoal`, `listGoals`, `deleteGoal`, `setGoalPriority`, `pauseGoal`,
//! `resumeGoal`, `getPathProgress`.

use std::collections::BTreeSet;

use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;

use practice_domain::{
    Channel, DailyDrill, Difficulty, DrillStatus, Goal, GoalEvent, GoalId, GoalStatus,
    Quest, QuestEvent, QuestStatus, Reminder, Skill, SIBLING_DEACTIVATION_TARGET, Spark,
    SparkVariant, Tone, UserId, WeekPlanId,
};
use practice_domain::EngineError;
use practice_scheduler::{ReminderConfig as SchedulerReminderConfig, generate_schedule_for_date};
use practice_store::{CascadeCount, KvBackend};

use crate::engine::Engine;
use crate::params::{CreateGoalParams, GoalProgress, OnGoalCreatedResult, QuestSeed};

pub(crate) fn today_in_timezone(tz_name: &str, now: DateTime<Utc>) -> Result<NaiveDate, EngineError> {
    let tz: Tz = tz_name
        .parse()
        .map_err(|_| EngineError::Validation(format!("unknown timezone {tz_name}")))?;
    Ok(now.with_timezone(&tz).date_naive())
}

impl<B: KvBackend> Engine<B> {
    pub async fn create_goal(
        &self,
        owner_user_id: UserId,
        params: CreateGoalParams,
    ) -> Result<Goal, EngineError> {
        let goal = Goal::new(
            owner_user_id,
            params.title,
            params.description,
            params.timezone,
            params.priority,
        )?;
        self.goals.insert(&goal).await?;
        Ok(goal)
    }

    pub async fn get_goal(&self, requester: UserId, goal_id: GoalId) -> Result<Goal, EngineError> {
        let (goal, _) = self.goals.require(goal_id).await?;
        self.check_goal_ownership(&goal, requester)?;
        Ok(goal)
    }

    pub async fn list_goals(&self, requester: UserId) -> Result<Vec<Goal>, EngineError> {
        Ok(self.goals.list_for_user(requester).await?)
    }

    pub async fn delete_goal(
        &self,
        requester: UserId,
        goal_id: GoalId,
    ) -> Result<CascadeCount, EngineError> {
        let (goal, _) = self.goals.require(goal_id).await?;
        self.check_goal_ownership(&goal, requester)?;
        Ok(self.cascade.delete_goal(&goal).await?)
    }

    pub async fn set_goal_priority(
        &self,
        requester: UserId,
        goal_id: GoalId,
        priority: u32,
    ) -> Result<Goal, EngineError> {
        let (mut goal, version) = self.goals.require(goal_id).await?;
        self.check_goal_ownership(&goal, requester)?;
        let was_active = goal.status == GoalStatus::Active;
        goal.priority = priority.max(1);
        goal.check_invariants()?;
        self.goals.update(&goal, version, was_active).await?;
        Ok(goal)
    }

    pub async fn pause_goal(
        &self,
        requester: UserId,
        goal_id: GoalId,
        until: Option<NaiveDate>,
    ) -> Result<Goal, EngineError> {
        let (mut goal, version) = self.goals.require(goal_id).await?;
        self.check_goal_ownership(&goal, requester)?;
        let was_active = goal.status == GoalStatus::Active;
        goal.apply(GoalEvent::Pause, until)?;
        self.goals.update(&goal, version, was_active).await?;
        Ok(goal)
    }

    pub async fn resume_goal(&self, requester: UserId, goal_id: GoalId) -> Result<Goal, EngineError> {
        let (mut goal, version) = self.goals.require(goal_id).await?;
        self.check_goal_ownership(&goal, requester)?;
        let was_active = goal.status == GoalStatus::Active;
        goal.apply(GoalEvent::Resume, None)?;
        self.goals.update(&goal, version, was_active).await?;
        Ok(goal)
    }

    /// Persists `quests`, activates the lowest-`order` one, generates Skills
    /// for it, and creates its first Drill/Spark plus that Spark's reminder
    /// schedule (spec §4.8).
    pub async fn on_goal_created(
        &self,
        goal: &Goal,
        quests: Vec<QuestSeed>,
    ) -> Result<OnGoalCreatedResult, EngineError> {
        let mut persisted = Vec::with_capacity(quests.len());
        for seed in quests {
            let quest = Quest::new(goal.id, seed.title, seed.description, seed.order)?;
            self.quests.insert(&quest).await?;
            persisted.push(quest);
        }
        persisted.sort_by_key(|q| q.order);
        let mut active_quest = persisted
            .first()
            .cloned()
            .ok_or_else(|| EngineError::Validation("onGoalCreated requires at least one quest".into()))?;

        let (_, version) = self.quests.require(active_quest.id).await?;
        self.start_quest(&mut active_quest, version).await?;
        if let Some(slot) = persisted.iter_mut().find(|q| q.id == active_quest.id) {
            *slot = active_quest.clone();
        }

        let skills = self.generate_skills_for_quest(&active_quest, goal).await?;
        let first_skill = skills
            .first()
            .ok_or_else(|| EngineError::Validation("skill generation produced no skills".into()))?;

        let today = today_in_timezone(&goal.timezone, Utc::now())?;
        let drill = self.create_initial_drill(first_skill, goal, today).await?;
        let spark = self.create_initial_spark(&drill).await?;
        let reminders_scheduled = self.schedule_spark_reminders(&spark, &drill, goal, today).await?;

        Ok(OnGoalCreatedResult {
            quests: persisted,
            active_quest_id: active_quest.id,
            skills,
            drill,
            spark,
            reminders_scheduled,
        })
    }

    /// Aggregates completion state for a Goal (spec §4.8 `getPathProgress`).
    pub async fn get_path_progress(
        &self,
        requester: UserId,
        goal_id: GoalId,
    ) -> Result<GoalProgress, EngineError> {
        let (goal, _) = self.goals.require(goal_id).await?;
        self.check_goal_ownership(&goal, requester)?;

        let quests = self.quests.list_for_goal(goal_id).await?;
        let total_quests = quests.len();
        let completed_quests = quests.iter().filter(|q| q.status == QuestStatus::Completed).count();

        let skills = self.skills.list_for_goal(goal_id).await?;
        let total_skills = skills.len();
        let completed_skills = skills.iter().filter(|s| s.is_mastered()).count();
        let percentage = if total_skills > 0 {
            (completed_skills as f64 / total_skills as f64 * 100.0).round()
        } else {
            0.0
        };

        let today = today_in_timezone(&goal.timezone, Utc::now())?;
        let mut days_behind = 0usize;
        let mut estimated_completion_date: Option<NaiveDate> = None;
        for skill in &skills {
            for drill in self.drills.list_for_skill(skill.id).await? {
                if drill.status == DrillStatus::Scheduled {
                    if drill.scheduled_date <= today {
                        days_behind += 1;
                    }
                    estimated_completion_date = Some(
                        estimated_completion_date
                            .map(|d: NaiveDate| d.max(drill.scheduled_date))
                            .unwrap_or(drill.scheduled_date),
                    );
                }
            }
        }

        let rated_completed: Vec<f64> = skills
            .iter()
            .filter(|s| s.is_mastered())
            .filter_map(|s| s.difficulty_rating)
            .collect();
        let average_difficulty = if rated_completed.is_empty() {
            None
        } else {
            Some(rated_completed.iter().sum::<f64>() / rated_completed.len() as f64)
        };

        let last_activity_at = skills
            .iter()
            .filter(|s| s.is_mastered())
            .filter_map(|s| s.last_practiced_at)
            .max();

        Ok(GoalProgress {
            goal_id,
            completed_quests,
            total_quests,
            completed_skills,
            total_skills,
            percentage,
            on_track: days_behind == 0,
            days_behind,
            estimated_completion_date,
            average_difficulty,
            last_activity_at,
        })
    }

    /// Starts `quest`, first atomically pushing any sibling Quest of the same
    /// Goal still `active` to [`SIBLING_DEACTIVATION_TARGET`] (spec §4.2:
    /// "Starting a Quest must atomically transition any sibling active Quest
    /// of the same Goal to a non-active state"). Both call sites that start a
    /// Quest (`onGoalCreated`'s first Quest, and quest succession once a
    /// Quest completes) go through here rather than calling `Quest::apply`
    /// directly, so the invariant holds regardless of how many Quests happen
    /// to be active when a new one starts.
    pub(crate) async fn start_quest(&self, quest: &mut Quest, version: u64) -> Result<(), EngineError> {
        for sibling in self.quests.list_for_goal(quest.goal_id).await? {
            if sibling.id == quest.id || sibling.status != QuestStatus::Active {
                continue;
            }
            let (mut sibling, sibling_version) = self.quests.require(sibling.id).await?;
            sibling.status = SIBLING_DEACTIVATION_TARGET;
            sibling.updated_at = Utc::now();
            self.quests.update(&sibling, sibling_version).await?;
        }
        quest.apply(QuestEvent::Start)?;
        self.quests.update(quest, version).await?;
        Ok(())
    }

    pub(crate) fn check_goal_ownership(&self, goal: &Goal, requester: UserId) -> Result<(), EngineError> {
        if goal.owner_user_id != requester {
            return Err(EngineError::not_found(format!("goal {}", goal.id)));
        }
        Ok(())
    }

    /// Generates the practice Skills for a freshly-started Quest (spec §4.2:
    /// "Starting a Quest triggers Skill generation for that Quest if none
    /// exist"). The spec leaves the generation algorithm itself external —
    /// richer plans come from an LLM-assisted caller that builds
    /// `QuestSeed`s/Skills upstream — so the orchestrator's own fallback is
    /// a single foundational Skill seeded from the Quest's title, which
    /// guarantees the invariant holds even with no curriculum input.
    pub(crate) async fn generate_skills_for_quest(
        &self,
        quest: &Quest,
        goal: &Goal,
    ) -> Result<Vec<Skill>, EngineError> {
        let existing = self.skills.list_for_quest(quest.id).await?;
        if !existing.is_empty() {
            return Ok(existing);
        }
        let skill = Skill::new(
            quest.id,
            goal.id,
            goal.owner_user_id,
            format!("Practice: {}", quest.title),
            "Completes the practice session".to_string(),
            vec!["core".to_string()],
            20,
            Difficulty::Foundation,
            1,
        )?;
        self.skills.insert(&skill).await?;
        Ok(vec![skill])
    }

    pub(crate) async fn create_initial_drill(
        &self,
        skill: &Skill,
        goal: &Goal,
        scheduled_date: NaiveDate,
    ) -> Result<DailyDrill, EngineError> {
        let drill = DailyDrill::new(
            WeekPlanId::new(),
            skill.id,
            goal.owner_user_id,
            goal.id,
            scheduled_date,
            1,
            skill.action.clone(),
            skill.success_signal.clone(),
            String::new(),
            skill.estimated_minutes,
            false,
            0,
        )?;
        self.drills.insert(&drill).await?;
        Ok(drill)
    }

    pub(crate) async fn create_initial_spark(&self, drill: &DailyDrill) -> Result<Spark, EngineError> {
        let spark = Spark::new(
            drill.id,
            drill.user_id,
            SparkVariant::Full,
            0,
            drill.estimated_minutes.clamp(5, 120),
        )?;
        self.sparks.insert(&spark).await?;
        Ok(spark)
    }

    /// Schedules `spark`'s reminders for `date` via §4.5, using the
    /// engine's configured reminder defaults combined with the Goal's
    /// timezone. Channels default to push only — per-user channel
    /// preference isn't modeled anywhere in the domain (spec §6: delivery
    /// surfaces are a Non-goal), so the orchestrator picks the one channel
    /// every environment is assumed to have.
    pub(crate) async fn schedule_spark_reminders(
        &self,
        spark: &Spark,
        drill: &DailyDrill,
        goal: &Goal,
        date: NaiveDate,
    ) -> Result<usize, EngineError> {
        let sched_cfg = SchedulerReminderConfig {
            enabled: self.config.reminder.enabled,
            timezone: goal.timezone.clone(),
            first_hour: self.config.reminder.first_hour,
            last_hour: self.config.reminder.last_hour,
            interval_hours: self.config.reminder.interval_hours,
            max_per_day: self.config.reminder.max_per_day,
            quiet_days: self.config.reminder.quiet_days.clone(),
            shrink_on_escalation: self.config.reminder.shrink_on_escalation,
        };
        let slots = generate_schedule_for_date(date, &sched_cfg)?;
        let channels: BTreeSet<Channel> = BTreeSet::from([Channel::Push]);
        for slot in &slots {
            let reminder = Reminder::new(
                drill.user_id,
                drill.id,
                spark.id,
                slot.scheduled_time,
                slot.escalation_level,
                slot.spark_variant,
                slot.tone,
                channels.clone(),
            );
            self.reminders.insert(&reminder).await?;
        }
        Ok(slots.len())
    }

    /// Completes the owning Quest and activates the next pending one
    /// (lowest order) when a Skill reaches mastery and no sibling Skill
    /// remains after it in the same Quest (spec §4.8 `markSparkComplete`).
    /// Generates that Quest's Skills (and its first Drill/Spark/reminders)
    /// the same way `onGoalCreated` does, since starting it triggers Skill
    /// generation exactly as a freshly-created Goal's first Quest does.
    pub(crate) async fn progress_past_mastered_skill(
        &self,
        goal: &Goal,
        mastered: &Skill,
    ) -> Result<(), EngineError> {
        let siblings = self.skills.list_for_quest(mastered.quest_id).await?;
        if let Some(next_skill) = siblings.iter().find(|s| s.order == mastered.order + 1) {
            let existing_drills = self.drills.list_for_skill(next_skill.id).await?;
            if existing_drills.is_empty() {
                let today = today_in_timezone(&goal.timezone, Utc::now())?;
                let drill = self.create_initial_drill(next_skill, goal, today).await?;
                let spark = self.create_initial_spark(&drill).await?;
                self.schedule_spark_reminders(&spark, &drill, goal, today).await?;
            }
            return Ok(());
        }

        let (mut quest, version) = self.quests.require(mastered.quest_id).await?;
        if quest.status != QuestStatus::Active {
            return Ok(());
        }
        quest.apply(QuestEvent::Complete)?;
        self.quests.update(&quest, version).await?;

        let mut remaining = self.quests.list_for_goal(goal.id).await?;
        remaining.retain(|q| q.status == QuestStatus::Pending);
        remaining.sort_by_key(|q| q.order);
        let Some(mut next) = remaining.into_iter().next() else {
            return Ok(());
        };

        let (_, next_version) = self.quests.require(next.id).await?;
        self.start_quest(&mut next, next_version).await?;

        let skills = self.generate_skills_for_quest(&next, goal).await?;
        if let Some(first_skill) = skills.first() {
            let existing_drills = self.drills.list_for_skill(first_skill.id).await?;
            if existing_drills.is_empty() {
                let today = today_in_timezone(&goal.timezone, Utc::now())?;
                let drill = self.create_initial_drill(first_skill, goal, today).await?;
                let spark = self.create_initial_spark(&drill).await?;
                self.schedule_spark_reminders(&spark, &drill, goal, today).await?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use practice_config::{AppConfig, CacheConfig, LlmConfig, ReminderConfig};
    use practice_store::{MemoryBackend, SecureStore};
    use std::sync::Arc;

    fn config() -> AppConfig {
        AppConfig {
            bind_address: "127.0.0.1:0".into(),
            jwt_secret: "test-secret".into(),
            encryption_key_base64: None,
            redis_url: None,
            default_timezone: "UTC".into(),
            mastery_threshold: 3,
            cache: CacheConfig::default(),
            reminder: ReminderConfig::default(),
            llm: LlmConfig::default(),
            provider_timeout_ms: 5_000,
        }
    }

    fn engine() -> Engine<MemoryBackend> {
        let store = SecureStore::new(Arc::new(MemoryBackend::new()), None);
        Engine::new(store, config())
    }

    /// Starting a second Quest of the same Goal demotes the first, still
    /// `active`, Quest to `pending` rather than leaving two Quests active
    /// at once (spec §4.2).
    #[tokio::test]
    async fn starting_a_quest_deactivates_an_active_sibling() {
        let engine = engine();
        let user = UserId::new();
        let goal = Goal::new(user, "Learn Rust".into(), "".into(), "UTC".into(), Some(1)).unwrap();
        engine.goals.insert(&goal).await.unwrap();

        let mut first = Quest::new(goal.id, "Basics".into(), "".into(), 1).unwrap();
        engine.quests.insert(&first).await.unwrap();
        let (_, first_version) = engine.quests.require(first.id).await.unwrap();
        engine.start_quest(&mut first, first_version).await.unwrap();
        assert_eq!(first.status, QuestStatus::Active);

        let mut second = Quest::new(goal.id, "Intermediate".into(), "".into(), 2).unwrap();
        engine.quests.insert(&second).await.unwrap();
        let (_, second_version) = engine.quests.require(second.id).await.unwrap();
        engine.start_quest(&mut second, second_version).await.unwrap();

        let (reloaded_first, _) = engine.quests.require(first.id).await.unwrap();
        assert_eq!(reloaded_first.status, QuestStatus::Pending);
        assert_eq!(second.status, QuestStatus::Active);
    }

    /// A mastered Skill's next sibling (order + 1) gets its own initial
    /// Drill/Spark chain created rather than leaving it unreachable from
    /// the scheduler.
    #[tokio::test]
    async fn mastering_a_skill_creates_the_next_sibling_skills_drill() {
        let engine = engine();
        let user = UserId::new();
        let goal = Goal::new(user, "Learn Rust".into(), "".into(), "UTC".into(), Some(1)).unwrap();
        engine.goals.insert(&goal).await.unwrap();

        let mut quest = Quest::new(goal.id, "Basics".into(), "".into(), 1).unwrap();
        engine.quests.insert(&quest).await.unwrap();
        let (_, version) = engine.quests.require(quest.id).await.unwrap();
        engine.start_quest(&mut quest, version).await.unwrap();

        let first_skill = Skill::new(
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
        engine.skills.insert(&first_skill).await.unwrap();

        let second_skill = Skill::new(
            quest.id,
            goal.id,
            user,
            "Write a function".into(),
            "returns a value".into(),
            vec!["syntax".into()],
            20,
            Difficulty::Foundation,
            2,
        )
        .unwrap();
        engine.skills.insert(&second_skill).await.unwrap();

        engine.progress_past_mastered_skill(&goal, &first_skill).await.unwrap();

        let drills = engine.drills.list_for_skill(second_skill.id).await.unwrap();
        assert_eq!(drills.len(), 1);
        let sparks = engine
            .sparks
            .list_for_drill(drills[0].id)
            .await
            .unwrap();
        assert_eq!(sparks.len(), 1);

        let (quest_after, _) = engine.quests.require(quest.id).await.unwrap();
        assert_eq!(quest_after.status, QuestStatus::Active);
    }
}

//! Reminder dispatch tick (spec §4.5): pops all reminders due at or before
//! now, reloads each, and attempts delivery exactly once.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;

use practice_domain::{DrillStatus, Reminder, ReminderEvent};
use practice_store::{DrillRepository, KvBackend, ReminderRepository};

use crate::error::SchedulerError;
use crate::notification::NotificationChannel;

#[derive(Debug, Default, Clone, Copy, serde::Serialize)]
pub struct DispatchOutcome {
    pub sent: usize,
    pub failed: usize,
    /// Reminders that were no longer `pending`, or whose drill had already
    /// completed/skipped — consumed without dispatch (spec §4.5, idempotent).
    pub consumed: usize,
}

pub struct ReminderDispatcher<B: KvBackend> {
    reminders: ReminderRepository<B>,
    drills: DrillRepository<B>,
    channels: Vec<Arc<dyn NotificationChannel>>,
}

impl<B: KvBackend> ReminderDispatcher<B> {
    pub fn new(
        reminders: ReminderRepository<B>,
        drills: DrillRepository<B>,
        channels: Vec<Arc<dyn NotificationChannel>>,
    ) -> Self {
        Self { reminders, drills, channels }
    }

    /// Runs one dispatch pass over every reminder due at or before `now`.
    pub async fn tick(&self, now: chrono::DateTime<Utc>) -> Result<DispatchOutcome, SchedulerError> {
        let mut outcome = DispatchOutcome::default();
        let due = self.reminders.due_before(now).await?;

        for stub in due {
            let Some((reminder, version)) = self.reminders.get(stub.id).await? else {
                outcome.consumed += 1;
                continue;
            };
            if !reminder.is_pending() {
                outcome.consumed += 1;
                continue;
            }

            if let Some((drill, _)) = self.drills.get(reminder.drill_id).await? {
                if matches!(drill.status, DrillStatus::Completed | DrillStatus::Skipped) {
                    let mut cancelled = reminder;
                    cancelled
                        .apply(ReminderEvent::Cancel)
                        .map_err(SchedulerError::Domain)?;
                    // Best-effort: a concurrent winner may have already moved
                    // this reminder out of pending between our reload and
                    // here, which the store's CAS rejects harmlessly.
                    let _ = self.reminders.update(&cancelled, version).await;
                    outcome.consumed += 1;
                    continue;
                }
            }

            match self.deliver(&reminder).await {
                Ok(()) => {
                    let mut sent = reminder;
                    sent.apply(ReminderEvent::Send).map_err(SchedulerError::Domain)?;
                    if self.reminders.update(&sent, version).await.is_ok() {
                        outcome.sent += 1;
                    } else {
                        outcome.consumed += 1;
                    }
                }
                Err(_) => {
                    let mut failed = reminder;
                    failed.apply(ReminderEvent::Fail).map_err(SchedulerError::Domain)?;
                    if self.reminders.update(&failed, version).await.is_ok() {
                        outcome.failed += 1;
                    } else {
                        outcome.consumed += 1;
                    }
                }
            }
        }

        Ok(outcome)
    }

    async fn deliver(&self, reminder: &Reminder) -> Result<(), SchedulerError> {
        let mut any_channel = false;
        for channel in &self.channels {
            if !reminder.channels.contains(&channel.channel_type()) || !channel.is_enabled() {
                continue;
            }
            any_channel = true;
            channel.send(reminder).await?;
        }
        if !any_channel {
            return Err(SchedulerError::DeliveryFailed {
                channel: "none".to_string(),
                message: "no enabled channel matches reminder.channels".to_string(),
            });
        }
        Ok(())
    }

    /// Spawns the periodic dispatch tick (spec §4.5, default every 60s),
    /// owned by the caller so tests can construct a dispatcher without a
    /// background loop running.
    pub fn spawn_tick(self: Arc<Self>, interval: Duration) -> tokio::task::JoinHandle<()>
    where
        B: 'static,
    {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                match self.tick(Utc::now()).await {
                    Ok(outcome) if outcome.sent > 0 || outcome.failed > 0 => {
                        tracing::info!(sent = outcome.sent, failed = outcome.failed, consumed = outcome.consumed, "reminder dispatch tick");
                    }
                    Ok(_) => {}
                    Err(e) => tracing::error!(error = %e, "reminder dispatch tick failed"),
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notification::FakeChannel;
    use practice_domain::{
        Channel, DailyDrill, Difficulty, Goal, Quest, QuestEvent, Skill, Spark, SparkVariant, Tone, UserId, WeekPlanId,
    };
    use practice_store::{GoalRepository, MemoryBackend, QuestRepository, SecureStore, SkillRepository, SparkRepository};
    use std::collections::BTreeSet;

    async fn setup_drill(store: &SecureStore<MemoryBackend>) -> DailyDrill {
        let goals = GoalRepository::new(store.clone());
        let quests = QuestRepository::new(store.clone());
        let skills = SkillRepository::new(store.clone());
        let drills = DrillRepository::new(store.clone());

        let user = UserId::new();
        let goal = Goal::new(user, "g".into(), "".into(), "UTC".into(), Some(1)).unwrap();
        goals.insert(&goal).await.unwrap();
        let mut quest = Quest::new(goal.id, "q".into(), "".into(), 1).unwrap();
        quest.apply(QuestEvent::Start).unwrap();
        quests.insert(&quest).await.unwrap();
        let skill = Skill::new(quest.id, goal.id, user, "a".into(), "b".into(), vec!["x".into()], 20, Difficulty::Foundation, 1).unwrap();
        skills.insert(&skill).await.unwrap();
        let drill = DailyDrill::new(
            WeekPlanId::new(),
            skill.id,
            user,
            goal.id,
            chrono::Utc::now().date_naive(),
            1,
            "a".into(),
            "b".into(),
            "c".into(),
            20,
            false,
            0,
        )
        .unwrap();
        drills.insert(&drill).await.unwrap();
        drill
    }

    #[tokio::test]
    async fn due_reminder_is_sent_exactly_once() {
        let store = SecureStore::new(std::sync::Arc::new(MemoryBackend::new()), None);
        let drill = setup_drill(&store).await;
        let spark = Spark::new(drill.id, drill.user_id, SparkVariant::Full, 0, 20).unwrap();
        let sparks = SparkRepository::new(store.clone());
        sparks.insert(&spark).await.unwrap();

        let reminders = ReminderRepository::new(store.clone());
        let reminder = Reminder::new(
            drill.user_id,
            drill.id,
            spark.id,
            Utc::now() - chrono::Duration::minutes(1),
            0,
            SparkVariant::Full,
            Tone::Encouraging,
            BTreeSet::from([Channel::Push]),
        );
        reminders.insert(&reminder).await.unwrap();

        let channel = Arc::new(FakeChannel::new("push-1", Channel::Push));
        let dispatcher = ReminderDispatcher::new(
            reminders.clone(),
            DrillRepository::new(store.clone()),
            vec![channel.clone()],
        );

        let outcome = dispatcher.tick(Utc::now()).await.unwrap();
        assert_eq!(outcome.sent, 1);
        assert_eq!(channel.sent_ids(), vec![reminder.id]);

        // A second tick finds the reminder already sent — consumed, not resent.
        let outcome2 = dispatcher.tick(Utc::now()).await.unwrap();
        assert_eq!(outcome2.sent, 0);
        assert_eq!(channel.sent_ids().len(), 1);
    }

    #[tokio::test]
    async fn reminder_for_completed_drill_is_consumed_without_dispatch() {
        let store = SecureStore::new(std::sync::Arc::new(MemoryBackend::new()), None);
        let mut drill = setup_drill(&store).await;
        let drills = DrillRepository::new(store.clone());
        let (_, version) = drills.get(drill.id).await.unwrap().unwrap();
        drill.apply(practice_domain::DrillEvent::Activate, None).unwrap();
        let version = drills.update(&drill, version).await.unwrap();
        drill.apply(practice_domain::DrillEvent::Record(practice_domain::DrillOutcome::Pass), None).unwrap();
        drills.update(&drill, version).await.unwrap();

        let spark = Spark::new(drill.id, drill.user_id, SparkVariant::Full, 0, 20).unwrap();
        let sparks = SparkRepository::new(store.clone());
        sparks.insert(&spark).await.unwrap();
        let reminders = ReminderRepository::new(store.clone());
        let reminder = Reminder::new(
            drill.user_id,
            drill.id,
            spark.id,
            Utc::now() - chrono::Duration::minutes(1),
            0,
            SparkVariant::Full,
            Tone::Encouraging,
            BTreeSet::from([Channel::Push]),
        );
        reminders.insert(&reminder).await.unwrap();

        let channel = Arc::new(FakeChannel::new("push-1", Channel::Push));
        let dispatcher = ReminderDispatcher::new(reminders, drills, vec![channel.clone()]);
        let outcome = dispatcher.tick(Utc::now()).await.unwrap();
        assert_eq!(outcome.consumed, 1);
        assert!(channel.sent_ids().is_empty());
    }
}

//! The orchestrator struct (spec §4.8): holds one repository per entity plus
//! the cascade deleter, all sharing the same `SecureStore`, and the
//! configuration the goal/practice flows need (mastery threshold, reminder
//! defaults, default timezone).

use std::sync::Arc;
use std::time::Duration;

use practice_config::AppConfig;
use practice_scheduler::{NotificationChannel, ReminderDispatcher};
use practice_store::{
    CascadeDeleter, DrillRepository, GoalRepository, KvBackend, QuestRepository,
    ReminderRepository, SecureStore, SkillRepository, SparkRepository,
};

#[derive(Clone)]
pub struct Engine<B: KvBackend> {
    pub(crate) config: AppConfig,
    pub(crate) goals: GoalRepository<B>,
    pub(crate) quests: QuestRepository<B>,
    pub(crate) skills: SkillRepository<B>,
    pub(crate) drills: DrillRepository<B>,
    pub(crate) sparks: SparkRepository<B>,
    pub(crate) reminders: ReminderRepository<B>,
    pub(crate) cascade: CascadeDeleter<B>,
}

impl<B: KvBackend> Engine<B> {
    pub fn new(store: SecureStore<B>, config: AppConfig) -> Self {
        Self {
            config,
            goals: GoalRepository::new(store.clone()),
            quests: QuestRepository::new(store.clone()),
            skills: SkillRepository::new(store.clone()),
            drills: DrillRepository::new(store.clone()),
            sparks: SparkRepository::new(store.clone()),
            reminders: ReminderRepository::new(store.clone()),
            cascade: CascadeDeleter::new(store),
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Exposes the underlying backend for shallow liveness probes (e.g. an
    /// HTTP `/ready` endpoint). Not used by any orchestrator operation.
    pub fn store_backend(&self) -> &Arc<B> {
        self.goals.backend()
    }

    /// Starts the reminder dispatch tick (spec §4.5, SPEC_FULL.md §4.5
    /// supplement) as an explicit, separately-callable background task —
    /// not started inside `main` directly, so tests can build an `Engine`
    /// with no background loop running. Drill expiry is deliberately
    /// exposed as `expire_overdue_drills` instead of a second unconditional
    /// sweep (see SPEC_FULL.md §4.5 supplement).
    pub fn spawn_background_tasks(
        &self,
        channels: Vec<Arc<dyn NotificationChannel>>,
    ) -> tokio::task::JoinHandle<()>
    where
        B: 'static,
    {
        let dispatcher = Arc::new(ReminderDispatcher::new(
            self.reminders.clone(),
            self.drills.clone(),
            channels,
        ));
        dispatcher.spawn_tick(Duration::from_millis(self.config.reminder.dispatch_tick_ms))
    }
}

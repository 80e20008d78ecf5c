//! Reminder repository: the `reminderSchedule` sorted-set index the
//! dispatch tick scans for due sends (spec §4.5).

use chrono::{DateTime, Utc};

use practice_domain::{Reminder, ReminderEvent, ReminderId, ReminderStatus, SparkId};

use crate::backend::KvBackend;
use crate::error::StoreError;
use crate::keys;
use crate::store::SecureStore;

#[derive(Clone)]
pub struct ReminderRepository<B: KvBackend> {
    store: SecureStore<B>,
}

impl<B: KvBackend> ReminderRepository<B> {
    pub fn new(store: SecureStore<B>) -> Self {
        Self { store }
    }

    pub async fn insert(&self, reminder: &Reminder) -> Result<(), StoreError> {
        let key = keys::reminder(reminder.id);
        self.store.create(&key, reminder).await?;
        let backend = self.store.backend();
        if let Err(e) = backend
            .zadd(
                &keys::reminder_schedule(),
                reminder.scheduled_time.timestamp() as f64,
                &reminder.id.to_string(),
            )
            .await
        {
            self.store.delete(&key).await.ok();
            return Err(e);
        }
        if let Err(e) = backend
            .set_add(&keys::spark_reminders(reminder.spark_id), &reminder.id.to_string())
            .await
        {
            backend.zrem(&keys::reminder_schedule(), &reminder.id.to_string()).await.ok();
            self.store.delete(&key).await.ok();
            return Err(e);
        }
        Ok(())
    }

    /// All reminders ever scheduled for `spark_id`, regardless of status
    /// (spec §4.5 "cancel all still-pending reminders for that sparkId").
    pub async fn list_for_spark(&self, spark_id: SparkId) -> Result<Vec<(Reminder, u64)>, StoreError> {
        let ids = self.store.backend().set_members(&keys::spark_reminders(spark_id)).await?;
        let mut reminders = Vec::with_capacity(ids.len());
        for id in ids {
            let reminder_id: ReminderId = id
                .parse()
                .map_err(|_| StoreError::InvalidData(format!("corrupt reminder id in index: {id}")))?;
            if let Some(entry) = self.get(reminder_id).await? {
                reminders.push(entry);
            }
        }
        Ok(reminders)
    }

    /// Cancels every still-pending reminder for `spark_id` (spec §3, §4.5).
    /// Idempotent: reminders already terminal are left untouched.
    pub async fn cancel_pending_for_spark(&self, spark_id: SparkId) -> Result<usize, StoreError> {
        let mut cancelled = 0;
        for (mut reminder, version) in self.list_for_spark(spark_id).await? {
            if reminder.is_pending() {
                reminder
                    .apply(ReminderEvent::Cancel)
                    .map_err(|e| StoreError::InvalidData(e.to_string()))?;
                self.update(&reminder, version).await?;
                cancelled += 1;
            }
        }
        Ok(cancelled)
    }

    pub async fn get(&self, id: ReminderId) -> Result<Option<(Reminder, u64)>, StoreError> {
        self.store.load(&keys::reminder(id)).await
    }

    pub async fn require(&self, id: ReminderId) -> Result<(Reminder, u64), StoreError> {
        self.get(id)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("reminder {id}")))
    }

    /// Updates the reminder and drops it from the schedule index once it
    /// reaches a terminal status — the dispatch tick only ever needs to see
    /// reminders still awaiting delivery.
    pub async fn update(&self, reminder: &Reminder, expected_version: u64) -> Result<u64, StoreError> {
        let new_version = self
            .store
            .save(&keys::reminder(reminder.id), reminder, expected_version)
            .await?;
        if reminder.status.is_terminal() {
            self.store
                .backend()
                .zrem(&keys::reminder_schedule(), &reminder.id.to_string())
                .await?;
        }
        Ok(new_version)
    }

    /// Reminders scheduled at or before `now`, for the dispatch tick.
    pub async fn due_before(&self, now: DateTime<Utc>) -> Result<Vec<Reminder>, StoreError> {
        let ids = self
            .store
            .backend()
            .zrange_by_score(&keys::reminder_schedule(), 0.0, now.timestamp() as f64)
            .await?;
        let mut reminders = Vec::with_capacity(ids.len());
        for id in ids {
            let reminder_id: ReminderId = id
                .parse()
                .map_err(|_| StoreError::InvalidData(format!("corrupt reminder id in index: {id}")))?;
            if let Some((reminder, _)) = self.get(reminder_id).await? {
                reminders.push(reminder);
            }
        }
        Ok(reminders)
    }

    pub async fn delete(&self, reminder: &Reminder) -> Result<(), StoreError> {
        self.store
            .backend()
            .zrem(&keys::reminder_schedule(), &reminder.id.to_string())
            .await?;
        self.store.delete(&keys::reminder(reminder.id)).await?;
        Ok(())
    }

    /// Sweeps Sent/Cancelled reminders older than `ttl` (spec §4.1 retention:
    /// terminal Reminders expire after 1h).
    pub async fn sweep_terminal_older_than(&self, ttl: chrono::Duration) -> Result<usize, StoreError> {
        let keys = self.store.backend().keys_by_pattern("reminder:*").await?;
        let cutoff = Utc::now() - ttl;
        let mut swept = 0;
        for key in keys {
            if let Some((reminder, _)) = self.store.load::<Reminder>(&key).await? {
                let stale = match reminder.status {
                    ReminderStatus::Sent | ReminderStatus::Cancelled | ReminderStatus::Failed => {
                        reminder.sent_at.unwrap_or(cutoff) < cutoff
                    }
                    ReminderStatus::Pending => false,
                };
                if stale {
                    self.delete(&reminder).await?;
                    swept += 1;
                }
            }
        }
        Ok(swept)
    }
}

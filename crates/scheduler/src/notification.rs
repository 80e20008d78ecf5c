//! Notification channel contract (spec §6). The reminder engine only calls
//! `send`; formatting the actual push/email/SMS body is each channel's job,
//! not this crate's (spec §1 Non-goals: "end-user notification delivery
//! surfaces").

use async_trait::async_trait;

use practice_domain::{Channel, Reminder};

use crate::error::SchedulerError;

#[async_trait]
pub trait NotificationChannel: Send + Sync {
    fn id(&self) -> &str;
    fn channel_type(&self) -> Channel;
    fn is_enabled(&self) -> bool;
    async fn send(&self, reminder: &Reminder) -> Result<(), SchedulerError>;
    async fn test(&self) -> Result<(), SchedulerError>;
}

/// In-memory fake used by tests and local development — records every
/// reminder it was asked to send instead of calling out anywhere.
pub struct FakeChannel {
    id: String,
    channel_type: Channel,
    enabled: bool,
    sent: std::sync::Mutex<Vec<practice_domain::ReminderId>>,
    fail_next: std::sync::atomic::AtomicBool,
}

impl FakeChannel {
    pub fn new(id: impl Into<String>, channel_type: Channel) -> Self {
        Self {
            id: id.into(),
            channel_type,
            enabled: true,
            sent: std::sync::Mutex::new(Vec::new()),
            fail_next: std::sync::atomic::AtomicBool::new(false),
        }
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    pub fn fail_next_send(&self) {
        self.fail_next.store(true, std::sync::atomic::Ordering::SeqCst);
    }

    pub fn sent_ids(&self) -> Vec<practice_domain::ReminderId> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl NotificationChannel for FakeChannel {
    fn id(&self) -> &str {
        &self.id
    }

    fn channel_type(&self) -> Channel {
        self.channel_type
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    async fn send(&self, reminder: &Reminder) -> Result<(), SchedulerError> {
        if self.fail_next.swap(false, std::sync::atomic::Ordering::SeqCst) {
            return Err(SchedulerError::DeliveryFailed {
                channel: self.id.clone(),
                message: "simulated failure".to_string(),
            });
        }
        self.sent.lock().unwrap().push(reminder.id);
        Ok(())
    }

    async fn test(&self) -> Result<(), SchedulerError> {
        Ok(())
    }
}

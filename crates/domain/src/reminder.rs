//! Reminder entity: a scheduled outbound nudge (spec §3, §4.5).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::EngineError;
use crate::ids::{DrillId, ReminderId, SparkId, UserId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReminderStatus {
    Pending,
    Sent,
    Cancelled,
    Failed,
}

impl ReminderStatus {
    fn as_str(self) -> &'static str {
        match self {
            ReminderStatus::Pending => "pending",
            ReminderStatus::Sent => "sent",
            ReminderStatus::Cancelled => "cancelled",
            ReminderStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(self) -> bool {
        !matches!(self, ReminderStatus::Pending)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tone {
    Encouraging,
    Gentle,
    LastChance,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    Push,
    Email,
    Sms,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReminderEvent {
    Send,
    Fail,
    Cancel,
}

use crate::spark::SparkVariant;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reminder {
    pub id: ReminderId,
    pub user_id: UserId,
    pub drill_id: DrillId,
    pub spark_id: SparkId,
    pub scheduled_time: DateTime<Utc>,
    pub escalation_level: u8,
    pub spark_variant: SparkVariant,
    pub tone: Tone,
    pub status: ReminderStatus,
    pub channels: BTreeSet<Channel>,
    pub sent_at: Option<DateTime<Utc>>,
}

impl Reminder {
    pub fn new(
        user_id: UserId,
        drill_id: DrillId,
        spark_id: SparkId,
        scheduled_time: DateTime<Utc>,
        escalation_level: u8,
        spark_variant: SparkVariant,
        tone: Tone,
        channels: BTreeSet<Channel>,
    ) -> Self {
        Self {
            id: ReminderId::new(),
            user_id,
            drill_id,
            spark_id,
            scheduled_time,
            escalation_level,
            spark_variant,
            tone,
            status: ReminderStatus::Pending,
            channels,
            sent_at: None,
        }
    }

    /// Reminders are immutable once `status != pending` (spec §3 invariant).
    pub fn apply(&mut self, event: ReminderEvent) -> Result<(), EngineError> {
        if self.status != ReminderStatus::Pending {
            return Err(EngineError::invalid_transition(
                self.status.as_str(),
                match event {
                    ReminderEvent::Send => "send",
                    ReminderEvent::Fail => "fail",
                    ReminderEvent::Cancel => "cancel",
                },
                vec![],
            ));
        }
        match event {
            ReminderEvent::Send => {
                self.status = ReminderStatus::Sent;
                self.sent_at = Some(Utc::now());
            }
            ReminderEvent::Fail => self.status = ReminderStatus::Failed,
            ReminderEvent::Cancel => self.status = ReminderStatus::Cancelled,
        }
        Ok(())
    }

    pub fn is_pending(&self) -> bool {
        self.status == ReminderStatus::Pending
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reminder() -> Reminder {
        Reminder::new(
            UserId::new(),
            DrillId::new(),
            SparkId::new(),
            Utc::now(),
            0,
            SparkVariant::Full,
            Tone::Encouraging,
            BTreeSet::from([Channel::Push]),
        )
    }

    #[test]
    fn send_sets_sent_at() {
        let mut r = reminder();
        r.apply(ReminderEvent::Send).unwrap();
        assert_eq!(r.status, ReminderStatus::Sent);
        assert!(r.sent_at.is_some());
    }

    #[test]
    fn sent_reminder_is_immutable() {
        let mut r = reminder();
        r.apply(ReminderEvent::Send).unwrap();
        assert!(r.apply(ReminderEvent::Cancel).is_err());
    }
}

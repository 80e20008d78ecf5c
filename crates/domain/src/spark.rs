//! Spark entity: a delivered prompt for a drill (spec §3, §4.2).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::EngineError;
use crate::ids::{DrillId, SparkId, UserId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SparkStatus {
    Pending,
    Completed,
    Skipped,
}

impl SparkStatus {
    fn as_str(self) -> &'static str {
        match self {
            SparkStatus::Pending => "pending",
            SparkStatus::Completed => "completed",
            SparkStatus::Skipped => "skipped",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SparkVariant {
    Full,
    Reduced,
    Minimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SparkEvent {
    Complete,
    Skip,
}

impl SparkEvent {
    fn as_str(self) -> &'static str {
        match self {
            SparkEvent::Complete => "complete",
            SparkEvent::Skip => "skip",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Spark {
    pub id: SparkId,
    pub drill_id: DrillId,
    pub user_id: UserId,
    pub status: SparkStatus,
    pub variant: SparkVariant,
    pub escalation_level: u8,
    pub estimated_minutes: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Spark {
    pub fn new(
        drill_id: DrillId,
        user_id: UserId,
        variant: SparkVariant,
        escalation_level: u8,
        estimated_minutes: u32,
    ) -> Result<Self, EngineError> {
        if !(5..=120).contains(&estimated_minutes) {
            return Err(EngineError::Validation(
                "estimatedMinutes must be in [5, 120]".into(),
            ));
        }
        if escalation_level > 3 {
            return Err(EngineError::Validation("escalationLevel must be 0..=3".into()));
        }
        Ok(Self {
            id: SparkId::new(),
            drill_id,
            user_id,
            status: SparkStatus::Pending,
            variant,
            escalation_level,
            estimated_minutes,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        })
    }

    fn allowed_events(&self) -> Vec<&'static str> {
        match self.status {
            SparkStatus::Pending => vec!["complete", "skip"],
            SparkStatus::Completed | SparkStatus::Skipped => vec![],
        }
    }

    fn reject(&self, event: SparkEvent) -> EngineError {
        EngineError::invalid_transition(
            self.status.as_str(),
            event.as_str(),
            self.allowed_events().into_iter().map(str::to_string).collect(),
        )
    }

    pub fn apply(&mut self, event: SparkEvent) -> Result<(), EngineError> {
        let next = match (self.status, event) {
            (SparkStatus::Pending, SparkEvent::Complete) => SparkStatus::Completed,
            (SparkStatus::Pending, SparkEvent::Skip) => SparkStatus::Skipped,
            _ => return Err(self.reject(event)),
        };
        self.status = next;
        self.updated_at = Utc::now();
        Ok(())
    }

    pub fn is_pending(&self) -> bool {
        self.status == SparkStatus::Pending
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn estimated_minutes_boundaries() {
        assert!(Spark::new(DrillId::new(), UserId::new(), SparkVariant::Full, 0, 1).is_err());
        assert!(Spark::new(DrillId::new(), UserId::new(), SparkVariant::Full, 0, 5).is_ok());
        assert!(Spark::new(DrillId::new(), UserId::new(), SparkVariant::Full, 0, 120).is_ok());
        assert!(Spark::new(DrillId::new(), UserId::new(), SparkVariant::Full, 0, 121).is_err());
    }

    #[test]
    fn complete_then_skip_is_invalid() {
        let mut s = Spark::new(DrillId::new(), UserId::new(), SparkVariant::Full, 0, 20).unwrap();
        s.apply(SparkEvent::Complete).unwrap();
        assert!(s.apply(SparkEvent::Skip).is_err());
    }
}

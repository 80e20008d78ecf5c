//! Goal entity and its closed transition table (spec §3, §4.2).

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::EngineError;
use crate::ids::{GoalId, UserId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GoalStatus {
    Active,
    Paused,
    Completed,
    Abandoned,
}

impl GoalStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, GoalStatus::Completed | GoalStatus::Abandoned)
    }

    fn as_str(self) -> &'static str {
        match self {
            GoalStatus::Active => "active",
            GoalStatus::Paused => "paused",
            GoalStatus::Completed => "completed",
            GoalStatus::Abandoned => "abandoned",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GoalEvent {
    Pause,
    Resume,
    Complete,
    Abandon,
}

impl GoalEvent {
    fn as_str(self) -> &'static str {
        match self {
            GoalEvent::Pause => "pause",
            GoalEvent::Resume => "resume",
            GoalEvent::Complete => "complete",
            GoalEvent::Abandon => "abandon",
        }
    }
}

pub const DEFAULT_PRIORITY: u32 = 999;

/// The user's stated outcome.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct Goal {
    pub id: GoalId,
    pub owner_user_id: UserId,
    #[validate(length(max = 500))]
    pub title: String,
    #[validate(length(max = 10000))]
    pub description: String,
    pub status: GoalStatus,
    pub priority: u32,
    pub paused_until: Option<NaiveDate>,
    pub timezone: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub version: u64,
}

impl Goal {
    pub fn new(
        owner_user_id: UserId,
        title: String,
        description: String,
        timezone: String,
        priority: Option<u32>,
    ) -> Result<Self, EngineError> {
        let goal = Self {
            id: GoalId::new(),
            owner_user_id,
            title,
            description,
            status: GoalStatus::Active,
            priority: priority.unwrap_or(DEFAULT_PRIORITY).max(1),
            paused_until: None,
            timezone,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            version: 1,
        };
        goal.check_invariants()?;
        Ok(goal)
    }

    /// `status = paused ⇔ pausedUntil is set` (spec §3), plus the field
    /// constraints declared on the struct via `#[validate(...)]`.
    pub fn check_invariants(&self) -> Result<(), EngineError> {
        self.validate()
            .map_err(|e| EngineError::Validation(e.to_string()))?;
        let paused = self.status == GoalStatus::Paused;
        if paused != self.paused_until.is_some() {
            return Err(EngineError::Validation(
                "paused status must coincide with pausedUntil being set".to_string(),
            ));
        }
        if self.priority == 0 {
            return Err(EngineError::Validation("priority must be positive".into()));
        }
        Ok(())
    }

    fn allowed_events(&self) -> Vec<GoalEvent> {
        match self.status {
            GoalStatus::Active => vec![GoalEvent::Pause, GoalEvent::Complete, GoalEvent::Abandon],
            GoalStatus::Paused => vec![GoalEvent::Resume, GoalEvent::Abandon],
            GoalStatus::Completed | GoalStatus::Abandoned => vec![],
        }
    }

    fn reject(&self, event: GoalEvent) -> EngineError {
        EngineError::invalid_transition(
            self.status.as_str(),
            event.as_str(),
            self.allowed_events()
                .into_iter()
                .map(|e| e.as_str().to_string())
                .collect(),
        )
    }

    /// Apply `event`, mutating `self` in place. Fails with `InvalidTransition`
    /// for any event not in the current state's table (spec §4.2).
    pub fn apply(&mut self, event: GoalEvent, paused_until: Option<NaiveDate>) -> Result<(), EngineError> {
        let next = match (self.status, event) {
            (GoalStatus::Active, GoalEvent::Pause) => GoalStatus::Paused,
            (GoalStatus::Active, GoalEvent::Complete) => GoalStatus::Completed,
            (GoalStatus::Active, GoalEvent::Abandon) => GoalStatus::Abandoned,
            (GoalStatus::Paused, GoalEvent::Resume) => GoalStatus::Active,
            (GoalStatus::Paused, GoalEvent::Abandon) => GoalStatus::Abandoned,
            _ => return Err(self.reject(event)),
        };

        self.status = next;
        self.paused_until = if next == GoalStatus::Paused {
            Some(paused_until.unwrap_or(far_future_date()))
        } else {
            None
        };
        self.updated_at = Utc::now();
        self.check_invariants()
    }

    /// Whether this goal should be treated as active for scheduling purposes:
    /// active, or paused with `pausedUntil <= today` (spec §4.4 — the field
    /// itself is only cleared by the `resume` event, not by the scheduler).
    pub fn is_schedulable(&self, today: NaiveDate) -> bool {
        match self.status {
            GoalStatus::Active => true,
            GoalStatus::Paused => self.paused_until.map(|d| d <= today).unwrap_or(false),
            GoalStatus::Completed | GoalStatus::Abandoned => false,
        }
    }
}

fn far_future_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(9999, 12, 31).expect("valid constant date")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn goal() -> Goal {
        Goal::new(
            UserId::new(),
            "Learn Python".into(),
            "".into(),
            "America/New_York".into(),
            Some(1),
        )
        .unwrap()
    }

    #[test]
    fn pause_sets_paused_until() {
        let mut g = goal();
        g.apply(GoalEvent::Pause, None).unwrap();
        assert_eq!(g.status, GoalStatus::Paused);
        assert!(g.paused_until.is_some());
    }

    #[test]
    fn resume_clears_paused_until() {
        let mut g = goal();
        g.apply(GoalEvent::Pause, None).unwrap();
        g.apply(GoalEvent::Resume, None).unwrap();
        assert_eq!(g.status, GoalStatus::Active);
        assert!(g.paused_until.is_none());
    }

    #[test]
    fn complete_then_pause_is_invalid() {
        let mut g = goal();
        g.apply(GoalEvent::Complete, None).unwrap();
        let err = g.apply(GoalEvent::Pause, None).unwrap_err();
        assert!(matches!(err, EngineError::InvalidTransition { .. }));
    }

    #[test]
    fn schedulable_when_pause_expired() {
        let mut g = goal();
        let today = NaiveDate::from_ymd_opt(2025, 1, 15).unwrap();
        g.apply(GoalEvent::Pause, Some(today)).unwrap();
        assert!(g.is_schedulable(today));
        assert!(!g.is_schedulable(today.pred_opt().unwrap()));
    }
}

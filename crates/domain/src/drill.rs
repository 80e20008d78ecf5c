//! DailyDrill entity: one scheduled day of practice for a Skill (spec §3, §4.2).

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::EngineError;
use crate::ids::{DrillId, GoalId, SkillId, UserId, WeekPlanId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DrillStatus {
    Scheduled,
    Active,
    Completed,
    Skipped,
    Expired,
}

impl DrillStatus {
    fn as_str(self) -> &'static str {
        match self {
            DrillStatus::Scheduled => "scheduled",
            DrillStatus::Active => "active",
            DrillStatus::Completed => "completed",
            DrillStatus::Skipped => "skipped",
            DrillStatus::Expired => "expired",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DrillOutcome {
    Pass,
    Partial,
    Fail,
    Skipped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DrillEvent {
    Activate,
    Record(DrillOutcome),
    Expire,
}

impl DrillEvent {
    fn as_str(self) -> &'static str {
        match self {
            DrillEvent::Activate => "activate",
            DrillEvent::Record(_) => "record",
            DrillEvent::Expire => "expire",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailyDrill {
    pub id: DrillId,
    pub week_plan_id: WeekPlanId,
    pub skill_id: SkillId,
    pub user_id: UserId,
    pub goal_id: GoalId,
    pub scheduled_date: NaiveDate,
    pub day_number: u32,
    pub status: DrillStatus,
    pub action: String,
    pub pass_signal: String,
    pub constraint: String,
    pub estimated_minutes: u32,
    pub outcome: Option<DrillOutcome>,
    pub observation: Option<String>,
    pub carry_forward: Option<String>,
    pub is_retry: bool,
    pub retry_count: u32,
    pub repeat_tomorrow: bool,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl DailyDrill {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        week_plan_id: WeekPlanId,
        skill_id: SkillId,
        user_id: UserId,
        goal_id: GoalId,
        scheduled_date: NaiveDate,
        day_number: u32,
        action: String,
        pass_signal: String,
        constraint: String,
        estimated_minutes: u32,
        is_retry: bool,
        retry_count: u32,
    ) -> Result<Self, EngineError> {
        if day_number == 0 {
            return Err(EngineError::Validation("dayNumber must be >= 1".into()));
        }
        if estimated_minutes == 0 {
            return Err(EngineError::Validation(
                "estimatedMinutes must be positive".into(),
            ));
        }
        Ok(Self {
            id: DrillId::new(),
            week_plan_id,
            skill_id,
            user_id,
            goal_id,
            scheduled_date,
            day_number,
            status: DrillStatus::Scheduled,
            action,
            pass_signal,
            constraint,
            estimated_minutes,
            outcome: None,
            observation: None,
            carry_forward: None,
            is_retry,
            retry_count,
            repeat_tomorrow: false,
            completed_at: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        })
    }

    fn allowed_events(&self) -> Vec<&'static str> {
        match self.status {
            DrillStatus::Scheduled => vec!["activate", "expire"],
            DrillStatus::Active => vec!["record"],
            DrillStatus::Completed | DrillStatus::Skipped | DrillStatus::Expired => vec![],
        }
    }

    fn reject(&self, event: DrillEvent) -> EngineError {
        EngineError::invalid_transition(
            self.status.as_str(),
            event.as_str(),
            self.allowed_events().into_iter().map(str::to_string).collect(),
        )
    }

    /// `scheduled —activate→ active`, `active —record(outcome)→ completed`
    /// (spec §4.2). Records `outcome`, `completedAt`, `repeatTomorrow`;
    /// the caller is responsible for clearing `userActiveDrill` and
    /// cancelling pending reminders — those touch other aggregates and live
    /// in the orchestrator.
    pub fn apply(&mut self, event: DrillEvent, observation: Option<String>) -> Result<(), EngineError> {
        match (self.status, event) {
            (DrillStatus::Scheduled, DrillEvent::Activate) => {
                self.status = DrillStatus::Active;
            }
            (DrillStatus::Scheduled, DrillEvent::Expire) => {
                self.status = DrillStatus::Expired;
            }
            (DrillStatus::Active, DrillEvent::Record(outcome)) => {
                if outcome == DrillOutcome::Skipped {
                    self.status = DrillStatus::Skipped;
                } else {
                    self.status = DrillStatus::Completed;
                }
                self.outcome = Some(outcome);
                self.completed_at = Some(Utc::now());
                self.observation = observation.clone();
                self.repeat_tomorrow = matches!(outcome, DrillOutcome::Fail | DrillOutcome::Partial);
                self.carry_forward = if self.repeat_tomorrow { observation } else { None };
            }
            _ => return Err(self.reject(event)),
        }
        self.updated_at = Utc::now();
        self.check_invariants()
    }

    pub fn check_invariants(&self) -> Result<(), EngineError> {
        if self.status == DrillStatus::Completed
            && (self.outcome.is_none() || self.completed_at.is_none())
        {
            return Err(EngineError::Validation(
                "completed drill must set outcome and completedAt".into(),
            ));
        }
        let expects_repeat = matches!(self.outcome, Some(DrillOutcome::Fail) | Some(DrillOutcome::Partial));
        if self.repeat_tomorrow != expects_repeat {
            return Err(EngineError::Validation(
                "repeatTomorrow must match outcome in {fail, partial}".into(),
            ));
        }
        Ok(())
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self.status,
            DrillStatus::Completed | DrillStatus::Skipped | DrillStatus::Expired
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drill() -> DailyDrill {
        DailyDrill::new(
            WeekPlanId::new(),
            SkillId::new(),
            UserId::new(),
            GoalId::new(),
            NaiveDate::from_ymd_opt(2025, 1, 15).unwrap(),
            1,
            "Write a for loop".into(),
            "Loop prints all items".into(),
            "no imports".into(),
            20,
            false,
            0,
        )
        .unwrap()
    }

    #[test]
    fn activate_then_record_pass_completes() {
        let mut d = drill();
        d.apply(DrillEvent::Activate, None).unwrap();
        d.apply(DrillEvent::Record(DrillOutcome::Pass), None).unwrap();
        assert_eq!(d.status, DrillStatus::Completed);
        assert_eq!(d.outcome, Some(DrillOutcome::Pass));
        assert!(d.completed_at.is_some());
        assert!(!d.repeat_tomorrow);
    }

    #[test]
    fn record_fail_sets_repeat_tomorrow() {
        let mut d = drill();
        d.apply(DrillEvent::Activate, None).unwrap();
        d.apply(DrillEvent::Record(DrillOutcome::Fail), Some("struggled with syntax".into()))
            .unwrap();
        assert!(d.repeat_tomorrow);
        assert_eq!(d.carry_forward.as_deref(), Some("struggled with syntax"));
    }

    #[test]
    fn record_skipped_goes_to_skipped_not_completed() {
        let mut d = drill();
        d.apply(DrillEvent::Activate, None).unwrap();
        d.apply(DrillEvent::Record(DrillOutcome::Skipped), None).unwrap();
        assert_eq!(d.status, DrillStatus::Skipped);
        assert!(!d.repeat_tomorrow);
    }

    #[test]
    fn record_before_activate_is_invalid() {
        let mut d = drill();
        let err = d.apply(DrillEvent::Record(DrillOutcome::Pass), None).unwrap_err();
        assert!(matches!(err, EngineError::InvalidTransition { .. }));
    }
}

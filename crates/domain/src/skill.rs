//! Skill entity: a unit of practiced capability under a Quest (spec §3, §4.2).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::EngineError;
use crate::drill::DrillOutcome;
use crate::ids::{GoalId, QuestId, SkillId, UserId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
    Foundation,
    Practice,
    Challenge,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mastery {
    NotStarted,
    Practicing,
    Mastered,
}

pub const DEFAULT_MASTERY_THRESHOLD: u32 = 3;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Skill {
    pub id: SkillId,
    pub quest_id: QuestId,
    pub goal_id: GoalId,
    pub user_id: UserId,
    pub action: String,
    pub success_signal: String,
    pub locked_variables: Vec<String>,
    pub estimated_minutes: u32,
    pub difficulty: Difficulty,
    pub order: u32,
    pub mastery: Mastery,
    pub pass_count: u32,
    pub fail_count: u32,
    pub consecutive_passes: u32,
    pub last_practiced_at: Option<DateTime<Utc>>,
    pub difficulty_rating: Option<f64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Skill {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        quest_id: QuestId,
        goal_id: GoalId,
        user_id: UserId,
        action: String,
        success_signal: String,
        locked_variables: Vec<String>,
        estimated_minutes: u32,
        difficulty: Difficulty,
        order: u32,
    ) -> Result<Self, EngineError> {
        if locked_variables.is_empty() {
            return Err(EngineError::Validation(
                "lockedVariables must have at least one entry".into(),
            ));
        }
        if estimated_minutes == 0 {
            return Err(EngineError::Validation(
                "estimatedMinutes must be positive".into(),
            ));
        }
        Ok(Self {
            id: SkillId::new(),
            quest_id,
            goal_id,
            user_id,
            action,
            success_signal,
            locked_variables,
            estimated_minutes,
            difficulty,
            order,
            mastery: Mastery::NotStarted,
            pass_count: 0,
            fail_count: 0,
            consecutive_passes: 0,
            last_practiced_at: None,
            difficulty_rating: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        })
    }

    /// Verifies the denormalized (goalId, userId) agree with the owning
    /// Quest's Goal (spec §3 invariant). Callers pass the authoritative pair
    /// from the loaded Goal.
    pub fn check_denormalization(&self, goal_id: GoalId, user_id: UserId) -> Result<(), EngineError> {
        if self.goal_id != goal_id || self.user_id != user_id {
            return Err(EngineError::Validation(
                "skill denormalized goalId/userId disagree with owning quest".into(),
            ));
        }
        Ok(())
    }

    /// Mastery update on drill completion (spec §4.2). `skipped` performs no
    /// update.
    pub fn record_outcome(&mut self, outcome: DrillOutcome, threshold: u32) {
        match outcome {
            DrillOutcome::Pass => {
                self.pass_count += 1;
                self.consecutive_passes += 1;
            }
            DrillOutcome::Fail | DrillOutcome::Partial => {
                self.fail_count += 1;
                self.consecutive_passes = 0;
            }
            DrillOutcome::Skipped => return,
        }

        self.mastery = if self.consecutive_passes >= threshold {
            Mastery::Mastered
        } else if self.pass_count > 0 || self.fail_count > 0 {
            Mastery::Practicing
        } else {
            Mastery::NotStarted
        };
        self.last_practiced_at = Some(Utc::now());
        self.updated_at = Utc::now();
    }

    pub fn check_invariants(&self, threshold: u32) -> Result<(), EngineError> {
        if self.mastery == Mastery::Mastered && self.consecutive_passes < threshold {
            return Err(EngineError::Validation(
                "mastered skill must have consecutivePasses >= threshold".into(),
            ));
        }
        if self.pass_count + self.fail_count < self.consecutive_passes {
            return Err(EngineError::Validation(
                "passCount+failCount must be >= consecutivePasses".into(),
            ));
        }
        Ok(())
    }

    pub fn is_mastered(&self) -> bool {
        self.mastery == Mastery::Mastered
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn skill() -> Skill {
        Skill::new(
            QuestId::new(),
            GoalId::new(),
            UserId::new(),
            "Write a for loop".into(),
            "Loop prints all items".into(),
            vec!["syntax".into()],
            20,
            Difficulty::Foundation,
            1,
        )
        .unwrap()
    }

    #[test]
    fn three_consecutive_passes_masters() {
        let mut s = skill();
        for _ in 0..3 {
            s.record_outcome(DrillOutcome::Pass, DEFAULT_MASTERY_THRESHOLD);
        }
        assert_eq!(s.mastery, Mastery::Mastered);
        s.check_invariants(DEFAULT_MASTERY_THRESHOLD).unwrap();
    }

    #[test]
    fn fail_resets_consecutive_passes() {
        let mut s = skill();
        s.record_outcome(DrillOutcome::Pass, DEFAULT_MASTERY_THRESHOLD);
        s.record_outcome(DrillOutcome::Pass, DEFAULT_MASTERY_THRESHOLD);
        s.record_outcome(DrillOutcome::Fail, DEFAULT_MASTERY_THRESHOLD);
        assert_eq!(s.consecutive_passes, 0);
        assert_eq!(s.mastery, Mastery::Practicing);
    }

    #[test]
    fn skipped_outcome_does_not_touch_counters() {
        let mut s = skill();
        s.record_outcome(DrillOutcome::Pass, DEFAULT_MASTERY_THRESHOLD);
        let (pass, fail, consec) = (s.pass_count, s.fail_count, s.consecutive_passes);
        s.record_outcome(DrillOutcome::Skipped, DEFAULT_MASTERY_THRESHOLD);
        assert_eq!((s.pass_count, s.fail_count, s.consecutive_passes), (pass, fail, consec));
    }

    #[test]
    fn estimated_minutes_zero_rejected() {
        let err = Skill::new(
            QuestId::new(),
            GoalId::new(),
            UserId::new(),
            "a".into(),
            "b".into(),
            vec!["x".into()],
            0,
            Difficulty::Foundation,
            1,
        )
        .unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));
    }
}

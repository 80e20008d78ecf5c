//! Request/response shapes for the orchestrator operations that don't just
//! pass an existing entity through (spec §4.8).

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use practice_domain::{DailyDrill, GoalId, Quest, QuestId, Skill, Spark};

#[derive(Debug, Clone, Deserialize)]
pub struct CreateGoalParams {
    pub title: String,
    pub description: String,
    pub timezone: String,
    pub priority: Option<u32>,
}

/// A caller-supplied Quest to persist under a just-created Goal (spec §4.8
/// `onGoalCreated(goal, quests)`). Quests are built externally — by a
/// curriculum step, or a client-supplied plan — and handed to the
/// orchestrator to persist and activate.
#[derive(Debug, Clone, Deserialize)]
pub struct QuestSeed {
    pub title: String,
    pub description: String,
    pub order: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct OnGoalCreatedResult {
    pub quests: Vec<Quest>,
    pub active_quest_id: QuestId,
    pub skills: Vec<Skill>,
    pub drill: DailyDrill,
    pub spark: Spark,
    pub reminders_scheduled: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct GoalProgress {
    pub goal_id: GoalId,
    pub completed_quests: usize,
    pub total_quests: usize,
    pub completed_skills: usize,
    pub total_skills: usize,
    pub percentage: f64,
    pub on_track: bool,
    pub days_behind: usize,
    pub estimated_completion_date: Option<NaiveDate>,
    pub average_difficulty: Option<f64>,
    pub last_activity_at: Option<DateTime<Utc>>,
}

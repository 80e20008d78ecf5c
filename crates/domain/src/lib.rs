//! Domain types and state machines for the practice engine.
//!
//! Every entity owns only downward references (parent → child indices) plus
//! denormalized parent ids inside children (spec §9 redesign note) — there
//! are no bidirectional pointer graphs here.

pub mod drill;
pub mod error;
pub mod goal;
pub mod ids;
pub mod quest;
pub mod reminder;
pub mod skill;
pub mod spark;
pub mod value;

pub use drill::{DailyDrill, DrillEvent, DrillOutcome, DrillStatus};
pub use error::{EngineError, ErrorBody};
pub use goal::{DEFAULT_PRIORITY, Goal, GoalEvent, GoalStatus};
pub use ids::{DrillId, GoalId, QuestId, ReminderId, SkillId, SparkId, UserId, WeekPlanId};
pub use quest::{Quest, QuestEvent, QuestStatus, SIBLING_DEACTIVATION_TARGET};
pub use reminder::{Channel, Reminder, ReminderEvent, ReminderStatus, Tone};
pub use skill::{DEFAULT_MASTERY_THRESHOLD, Difficulty, Mastery, Skill};
pub use spark::{Spark, SparkEvent, SparkStatus, SparkVariant};
pub use value::{Metadata, MetadataValue};

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Authenticated user record. Authentication itself is external (spec §6);
/// the core only ever trusts the `UserId` the auth layer hands it.
#[derive(Debug, Clone, Serialize, serde::Deserialize)]
pub struct User {
    pub id: UserId,
    pub timezone: String,
    pub created_at: DateTime<Utc>,
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub build_sha: String,
    pub uptime_seconds: u64,
}

/// Ready check response.
#[derive(Debug, Serialize)]
pub struct ReadyResponse {
    pub status: String,
    pub store: String,
}

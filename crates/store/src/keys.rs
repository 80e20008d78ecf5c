//! Namespaced key builders (spec §4.1). Centralized here so a rename of a
//! namespace touches one file instead of every repository.

use chrono::NaiveDate;

use practice_domain::{DrillId, GoalId, QuestId, ReminderId, SkillId, SparkId, UserId};

pub fn goal(id: GoalId) -> String {
    format!("goal:{id}")
}

pub fn quest(id: QuestId) -> String {
    format!("quest:{id}")
}

pub fn skill(id: SkillId) -> String {
    format!("skill:{id}")
}

pub fn drill(id: DrillId) -> String {
    format!("drill:{id}")
}

pub fn spark(id: SparkId) -> String {
    format!("spark:{id}")
}

pub fn reminder(id: ReminderId) -> String {
    format!("reminder:{id}")
}

pub fn user_goals(user_id: UserId) -> String {
    format!("index:userGoals:{user_id}")
}

pub fn user_active_goals(user_id: UserId) -> String {
    format!("index:userActiveGoals:{user_id}")
}

pub fn goal_quests(goal_id: GoalId) -> String {
    format!("index:goalQuests:{goal_id}")
}

pub fn quest_skills(quest_id: QuestId) -> String {
    format!("index:questSkills:{quest_id}")
}

pub fn goal_skills(goal_id: GoalId) -> String {
    format!("index:goalSkills:{goal_id}")
}

pub fn user_skills(user_id: UserId) -> String {
    format!("index:userSkills:{user_id}")
}

pub fn week_drills(user_id: UserId, week_start: NaiveDate) -> String {
    format!("index:weekDrills:{user_id}:{week_start}")
}

/// All drills ever scheduled under a Skill, so cascade delete can tear a
/// Skill's drill subtree down without scanning every week bucket.
pub fn skill_drills(skill_id: SkillId) -> String {
    format!("index:skillDrills:{skill_id}")
}

pub fn drill_by_date(goal_id: GoalId, date: NaiveDate) -> String {
    format!("index:drillByDate:{goal_id}:{date}")
}

pub fn user_active_drill(user_id: UserId) -> String {
    format!("index:userActiveDrill:{user_id}")
}

/// All Sparks ever created for a drill (a drill may accumulate more than
/// one over time — e.g. a fresh Spark generated after a prior one was
/// skipped). Downward child index, per spec §9's redesign note.
pub fn drill_sparks(drill_id: DrillId) -> String {
    format!("index:drillSparks:{drill_id}")
}

/// The drill's current pending Spark, if any (spec §3: at most one pending
/// Spark per drill). Cleared once that Spark leaves `pending`.
pub fn drill_pending_spark(drill_id: DrillId) -> String {
    format!("index:drillPendingSpark:{drill_id}")
}

/// Reminders scheduled against a given Spark, so cancelling the Spark can
/// find "all still-pending reminders for that sparkId" (spec §3, §4.5)
/// without scanning every reminder key.
pub fn spark_reminders(spark_id: SparkId) -> String {
    format!("index:sparkReminders:{spark_id}")
}

/// Sorted set of pending reminders scored by scheduled unix-timestamp, so
/// the dispatcher can `zrange_by_score(0, now)` to find due reminders.
pub fn reminder_schedule() -> String {
    "index:reminderSchedule".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn keys_are_namespaced_and_stable() {
        let id = GoalId::from(Uuid::nil());
        assert_eq!(goal(id), format!("goal:{}", Uuid::nil()));
        assert_eq!(reminder_schedule(), "index:reminderSchedule");
    }
}

//! "What to practice today" resolution (spec §4.4).

use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use serde::Serialize;

use practice_domain::{DailyDrill, GoalId, QuestId, Spark, SparkVariant, UserId};
use practice_store::{DrillRepository, GoalRepository, KvBackend, SkillRepository, SparkRepository};

use crate::error::SchedulerError;

#[derive(Debug, Clone, Serialize)]
pub struct TodayForUser {
    pub has_content: bool,
    pub drill: Option<DailyDrill>,
    pub spark: Option<Spark>,
    pub date: NaiveDate,
    pub timezone: String,
    pub goal_id: Option<GoalId>,
    pub quest_id: Option<QuestId>,
}

impl TodayForUser {
    fn empty(date: NaiveDate, timezone: String) -> Self {
        Self {
            has_content: false,
            drill: None,
            spark: None,
            date,
            timezone,
            goal_id: None,
            quest_id: None,
        }
    }
}

/// Resolves the current drill and spark for `user_id` at instant `now`
/// (spec §4.4). Candidate goals are every Goal the user owns that's
/// schedulable right now — `Active`, or `Paused` with an expired
/// `pausedUntil` — rather than strictly the `userActiveGoals` index, so a
/// goal whose pause window lapsed surfaces again before its explicit
/// `resume` event (the index only tracks literal `Active` status; see
/// `Goal::is_schedulable`, which exists precisely to cover this case).
pub async fn resolve_today_for_user<B: KvBackend>(
    user_id: UserId,
    now: DateTime<Utc>,
    goals: &GoalRepository<B>,
    skills: &SkillRepository<B>,
    drills: &DrillRepository<B>,
    sparks: &SparkRepository<B>,
    default_timezone: &str,
) -> Result<TodayForUser, SchedulerError> {
    let all_goals = goals.list_for_user(user_id).await?;

    // Tentative timezone/today just to evaluate pause expiry; goals compare
    // `pausedUntil` against a plain date, so any reasonable estimate of
    // "today" works for this filter pass — refined below once candidates
    // are known.
    let provisional_tz: Tz = default_timezone
        .parse()
        .map_err(|_| SchedulerError::InvalidDate(format!("unknown timezone {default_timezone}")))?;
    let provisional_today = now.with_timezone(&provisional_tz).date_naive();

    let mut candidates: Vec<_> = all_goals
        .into_iter()
        .filter(|g| g.is_schedulable(provisional_today))
        .collect();
    candidates.sort_by(|a, b| {
        a.priority
            .cmp(&b.priority)
            .then(a.created_at.cmp(&b.created_at))
            .then(a.id.cmp(&b.id))
    });

    let timezone = candidates
        .first()
        .map(|g| g.timezone.clone())
        .unwrap_or_else(|| default_timezone.to_string());
    let tz: Tz = timezone
        .parse()
        .map_err(|_| SchedulerError::InvalidDate(format!("unknown timezone {timezone}")))?;
    let today = now.with_timezone(&tz).date_naive();

    // Re-filter against the resolved timezone's `today` in case it differs
    // from the provisional estimate (only possible right at a tz boundary).
    candidates.retain(|g| g.is_schedulable(today));

    for goal in &candidates {
        let Some(drill) = drills.get_for_date(goal.id, today).await? else {
            continue;
        };

        let spark = match sparks.get_pending_for_drill(drill.id).await? {
            Some((spark, _)) => spark,
            None => {
                let fresh = Spark::new(drill.id, user_id, SparkVariant::Full, 0, drill.estimated_minutes.clamp(5, 120))
                    .map_err(SchedulerError::Domain)?;
                sparks.insert(&fresh).await?;
                fresh
            }
        };

        let quest_id = skills.get(drill.skill_id).await?.map(|(s, _)| s.quest_id);

        return Ok(TodayForUser {
            has_content: true,
            drill: Some(drill),
            spark: Some(spark),
            date: today,
            timezone,
            goal_id: Some(goal.id),
            quest_id,
        });
    }

    Ok(TodayForUser::empty(today, timezone))
}

#[cfg(test)]
mod tests {
    use super::*;
    use practice_domain::{Difficulty, Goal, Quest, QuestEvent, Skill, WeekPlanId};
    use practice_store::{MemoryBackend, SecureStore};
    use std::sync::Arc;

    fn repos() -> (
        GoalRepository<MemoryBackend>,
        SkillRepository<MemoryBackend>,
        DrillRepository<MemoryBackend>,
        SparkRepository<MemoryBackend>,
    ) {
        let store = SecureStore::new(Arc::new(MemoryBackend::new()), None);
        (
            GoalRepository::new(store.clone()),
            SkillRepository::new(store.clone()),
            DrillRepository::new(store.clone()),
            SparkRepository::new(store),
        )
    }

    /// Scenario A: daily practice happy path.
    #[tokio::test]
    async fn scenario_a_daily_practice_happy_path() {
        let (goals, skills, drills, sparks) = repos();
        let user = UserId::new();

        let goal = Goal::new(
            user,
            "Learn Python".into(),
            "".into(),
            "America/New_York".into(),
            Some(1),
        )
        .unwrap();
        goals.insert(&goal).await.unwrap();

        let mut quest = Quest::new(goal.id, "Basics".into(), "".into(), 1).unwrap();
        quest.apply(QuestEvent::Start).unwrap();

        let skill = Skill::new(
            quest.id,
            goal.id,
            user,
            "Write a for loop".into(),
            "Loop prints all items".into(),
            vec!["syntax".into()],
            20,
            Difficulty::Foundation,
            1,
        )
        .unwrap();
        skills.insert(&skill).await.unwrap();

        let drill = DailyDrill::new(
            WeekPlanId::new(),
            skill.id,
            user,
            goal.id,
            NaiveDate::from_ymd_opt(2025, 1, 15).unwrap(),
            1,
            "Write a for loop over a list".into(),
            "loop prints every item".into(),
            "no imports".into(),
            20,
            false,
            0,
        )
        .unwrap();
        drills.insert(&drill).await.unwrap();

        let now = "2025-01-15T12:00:00-05:00".parse::<DateTime<Utc>>().unwrap();
        let result = resolve_today_for_user(user, now, &goals, &skills, &drills, &sparks, "UTC")
            .await
            .unwrap();

        assert!(result.has_content);
        assert_eq!(result.drill.unwrap().scheduled_date, NaiveDate::from_ymd_opt(2025, 1, 15).unwrap());
        let spark = result.spark.unwrap();
        assert_eq!(spark.escalation_level, 0);
        assert_eq!(spark.variant, SparkVariant::Full);
        assert_eq!(result.timezone, "America/New_York");
    }

    #[tokio::test]
    async fn no_active_goals_yields_no_content() {
        let (goals, skills, drills, sparks) = repos();
        let user = UserId::new();
        let now = Utc::now();
        let result = resolve_today_for_user(user, now, &goals, &skills, &drills, &sparks, "UTC")
            .await
            .unwrap();
        assert!(!result.has_content);
    }

    #[tokio::test]
    async fn existing_pending_spark_is_reused_not_regenerated() {
        let (goals, skills, drills, sparks) = repos();
        let user = UserId::new();
        let goal = Goal::new(user, "Learn Rust".into(), "".into(), "UTC".into(), Some(1)).unwrap();
        goals.insert(&goal).await.unwrap();
        let mut quest = Quest::new(goal.id, "Basics".into(), "".into(), 1).unwrap();
        quest.apply(QuestEvent::Start).unwrap();
        let skill = Skill::new(
            quest.id,
            goal.id,
            user,
            "a".into(),
            "b".into(),
            vec!["x".into()],
            20,
            Difficulty::Foundation,
            1,
        )
        .unwrap();
        skills.insert(&skill).await.unwrap();
        let date = NaiveDate::from_ymd_opt(2025, 1, 15).unwrap();
        let drill = DailyDrill::new(
            WeekPlanId::new(),
            skill.id,
            user,
            goal.id,
            date,
            1,
            "a".into(),
            "b".into(),
            "c".into(),
            20,
            false,
            0,
        )
        .unwrap();
        drills.insert(&drill).await.unwrap();

        let existing = Spark::new(drill.id, user, SparkVariant::Reduced, 2, 20).unwrap();
        sparks.insert(&existing).await.unwrap();

        let now = DateTime::parse_from_rfc3339("2025-01-15T12:00:00Z").unwrap().with_timezone(&Utc);
        let result = resolve_today_for_user(user, now, &goals, &skills, &drills, &sparks, "UTC")
            .await
            .unwrap();
        assert_eq!(result.spark.unwrap().id, existing.id);
    }
}

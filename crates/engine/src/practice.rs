//! Daily-practice operations (spec §4.8): `getTodayForUser`,
//! `markSparkComplete`, `skipSpark`, `rateDifficulty`, `activateDrill`,
//! `recordDrillOutcome`, `expireOverdueDrills`.

use chrono::{DateTime, Utc};

use practice_domain::{
    DailyDrill, DrillEvent, DrillId, DrillOutcome, DrillStatus, EngineError, Skill, SkillId,
    Spark, SparkEvent, SparkId, SparkStatus, UserId,
};
use practice_scheduler::{TodayForUser, resolve_today_for_user};
use practice_store::KvBackend;

use crate::engine::Engine;

impl<B: KvBackend> Engine<B> {
    pub async fn get_today_for_user(
        &self,
        requester: UserId,
        now: DateTime<Utc>,
    ) -> Result<TodayForUser, EngineError> {
        Ok(resolve_today_for_user(
            requester,
            now,
            &self.goals,
            &self.skills,
            &self.drills,
            &self.sparks,
            &self.config.default_timezone,
        )
        .await?)
    }

    fn check_spark_ownership(&self, spark: &Spark, requester: UserId) -> Result<(), EngineError> {
        if spark.user_id != requester {
            return Err(EngineError::not_found(format!("spark {}", spark.id)));
        }
        Ok(())
    }

    /// Completes a Spark and cascades the consequences the spec describes
    /// for it: cancel its still-pending reminders, record a `pass` on the
    /// owning Drill once every Spark that Drill ever produced is terminal,
    /// run the Skill's mastery update, and progress the Quest/Skill chain
    /// if that mastered the Skill. `actual_minutes` has no home in the
    /// domain model (no entity tracks it), so it's accepted for parity with
    /// the spec signature and only used for observability.
    pub async fn mark_spark_complete(
        &self,
        requester: UserId,
        spark_id: SparkId,
        actual_minutes: Option<u32>,
    ) -> Result<Spark, EngineError> {
        let (mut spark, version) = self.sparks.require(spark_id).await?;
        self.check_spark_ownership(&spark, requester)?;
        spark.apply(SparkEvent::Complete)?;
        self.sparks.update(&spark, version).await?;

        if let Some(actual) = actual_minutes {
            tracing::debug!(
                spark_id = %spark.id,
                estimated_minutes = spark.estimated_minutes,
                actual_minutes = actual,
                "spark completed"
            );
        }

        self.reminders.cancel_pending_for_spark(spark.id).await?;
        self.complete_drill_if_sparks_exhausted(spark.drill_id, DrillOutcome::Pass, None)
            .await?;

        Ok(spark)
    }

    pub async fn skip_spark(
        &self,
        requester: UserId,
        spark_id: SparkId,
        reason: Option<String>,
    ) -> Result<Spark, EngineError> {
        let (mut spark, version) = self.sparks.require(spark_id).await?;
        self.check_spark_ownership(&spark, requester)?;
        spark.apply(SparkEvent::Skip)?;
        self.sparks.update(&spark, version).await?;

        if let Some(reason) = reason {
            tracing::debug!(spark_id = %spark.id, reason, "spark skipped");
        }

        self.reminders.cancel_pending_for_spark(spark.id).await?;
        Ok(spark)
    }

    /// Attaches an opaque difficulty rating to a Skill; no state transition
    /// (spec §4.8 `rateDifficulty`).
    pub async fn rate_difficulty(
        &self,
        requester: UserId,
        skill_id: SkillId,
        rating: f64,
    ) -> Result<Skill, EngineError> {
        let (mut skill, version) = self.skills.require(skill_id).await?;
        if skill.user_id != requester {
            return Err(EngineError::not_found(format!("skill {skill_id}")));
        }
        skill.difficulty_rating = Some(rating);
        self.skills.update(&skill, version).await?;
        Ok(skill)
    }

    fn check_drill_ownership(
        &self,
        drill: &DailyDrill,
        requester: UserId,
    ) -> Result<(), EngineError> {
        if drill.user_id != requester {
            return Err(EngineError::not_found(format!("drill {}", drill.id)));
        }
        Ok(())
    }

    pub async fn activate_drill(
        &self,
        requester: UserId,
        drill_id: DrillId,
    ) -> Result<DailyDrill, EngineError> {
        let (mut drill, version) = self.drills.require(drill_id).await?;
        self.check_drill_ownership(&drill, requester)?;
        drill.apply(DrillEvent::Activate, None)?;
        self.drills.update(&drill, version).await?;
        Ok(drill)
    }

    /// Records a Drill outcome directly, distinct from the Spark-driven
    /// path in `mark_spark_complete` (spec SPEC_FULL.md §4.8 supplement —
    /// `partial`/`fail` aren't reachable through Spark completion since
    /// Spark only has complete/skip). Cancels any still-pending reminders
    /// for the drill's pending Spark, runs the mastery update, and
    /// progresses the Quest/Skill chain on mastery, mirroring
    /// `mark_spark_complete`.
    pub async fn record_drill_outcome(
        &self,
        requester: UserId,
        drill_id: DrillId,
        outcome: DrillOutcome,
        observation: Option<String>,
    ) -> Result<DailyDrill, EngineError> {
        let (drill, _) = self.drills.require(drill_id).await?;
        self.check_drill_ownership(&drill, requester)?;

        if let Some((spark, _)) = self.sparks.get_pending_for_drill(drill_id).await? {
            self.reminders.cancel_pending_for_spark(spark.id).await?;
        }

        self.complete_drill_if_sparks_exhausted(drill_id, outcome, observation)
            .await
    }

    /// Expires overdue Scheduled Drills for `requester` (spec SPEC_FULL.md
    /// §4.8 supplement: an explicit operation rather than a background
    /// sweep).
    pub async fn expire_overdue_drills(&self, requester: UserId) -> Result<usize, EngineError> {
        let today = crate::goals::today_in_timezone(&self.config.default_timezone, Utc::now())?;
        Ok(self.drills.expire_overdue(requester, today).await?)
    }

    /// Transitions the Drill to `completed`/`skipped` with `outcome` once
    /// every Spark it ever produced is terminal — i.e. there's no
    /// outstanding pending Spark left for it — then runs the Skill mastery
    /// update and, on mastery, progresses to the next Skill/Quest. Already
    /// having only one pending Spark at a time (spec §3 invariant) means
    /// this fires as soon as the current one completes in the common case;
    /// a Drill already terminal is left untouched (idempotent).
    async fn complete_drill_if_sparks_exhausted(
        &self,
        drill_id: DrillId,
        outcome: DrillOutcome,
        observation: Option<String>,
    ) -> Result<DailyDrill, EngineError> {
        let (mut drill, version) = self.drills.require(drill_id).await?;
        if drill.is_terminal() {
            return Ok(drill);
        }
        if drill.status != DrillStatus::Active {
            return Ok(drill);
        }

        let sparks = self.sparks.list_for_drill(drill_id).await?;
        let sparks_exhausted = sparks.iter().all(|s| s.status != SparkStatus::Pending);
        if !sparks_exhausted {
            return Ok(drill);
        }

        drill.apply(DrillEvent::Record(outcome), observation)?;
        self.drills.update(&drill, version).await?;

        let (mut skill, skill_version) = self.skills.require(drill.skill_id).await?;
        let was_mastered = skill.is_mastered();
        skill.record_outcome(outcome, self.config.mastery_threshold);
        skill.check_invariants(self.config.mastery_threshold)?;
        self.skills.update(&skill, skill_version).await?;

        if !was_mastered && skill.is_mastered() {
            let (goal, _) = self.goals.require(drill.goal_id).await?;
            self.progress_past_mastered_skill(&goal, &skill).await?;
        }

        Ok(drill)
    }
}

//! Daily-practice handlers (spec §4.8).

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;
use chrono::Utc;
use serde::Deserialize;

use practice_domain::{DailyDrill, DrillId, DrillOutcome, EngineError, Skill, SkillId, Spark, SparkId};
use practice_scheduler::TodayForUser;
use practice_store::KvBackend;

use crate::AppState;
use crate::middleware::auth::AuthUser;

pub async fn get_today<B: KvBackend + 'static>(
    State(state): State<Arc<AppState<B>>>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<TodayForUser>, EngineError> {
    Ok(Json(state.engine.get_today_for_user(user_id, Utc::now()).await?))
}

#[derive(Debug, Deserialize, Default)]
pub struct MarkSparkCompleteRequest {
    pub actual_minutes: Option<u32>,
}

pub async fn mark_spark_complete<B: KvBackend + 'static>(
    State(state): State<Arc<AppState<B>>>,
    AuthUser(user_id): AuthUser,
    Path(spark_id): Path<SparkId>,
    body: Option<Json<MarkSparkCompleteRequest>>,
) -> Result<Json<Spark>, EngineError> {
    let actual_minutes = body.and_then(|Json(req)| req.actual_minutes);
    Ok(Json(
        state
            .engine
            .mark_spark_complete(user_id, spark_id, actual_minutes)
            .await?,
    ))
}

#[derive(Debug, Deserialize, Default)]
pub struct SkipSparkRequest {
    pub reason: Option<String>,
}

pub async fn skip_spark<B: KvBackend + 'static>(
    State(state): State<Arc<AppState<B>>>,
    AuthUser(user_id): AuthUser,
    Path(spark_id): Path<SparkId>,
    body: Option<Json<SkipSparkRequest>>,
) -> Result<Json<Spark>, EngineError> {
    let reason = body.and_then(|Json(req)| req.reason);
    Ok(Json(state.engine.skip_spark(user_id, spark_id, reason).await?))
}

#[derive(Debug, Deserialize)]
pub struct RateDifficultyRequest {
    pub rating: f64,
}

pub async fn rate_difficulty<B: KvBackend + 'static>(
    State(state): State<Arc<AppState<B>>>,
    AuthUser(user_id): AuthUser,
    Path(skill_id): Path<SkillId>,
    Json(req): Json<RateDifficultyRequest>,
) -> Result<Json<Skill>, EngineError> {
    Ok(Json(
        state
            .engine
            .rate_difficulty(user_id, skill_id, req.rating)
            .await?,
    ))
}

pub async fn activate_drill<B: KvBackend + 'static>(
    State(state): State<Arc<AppState<B>>>,
    AuthUser(user_id): AuthUser,
    Path(drill_id): Path<DrillId>,
) -> Result<Json<DailyDrill>, EngineError> {
    Ok(Json(state.engine.activate_drill(user_id, drill_id).await?))
}

#[derive(Debug, Deserialize)]
pub struct RecordDrillOutcomeRequest {
    pub outcome: DrillOutcome,
    pub observation: Option<String>,
}

pub async fn record_drill_outcome<B: KvBackend + 'static>(
    State(state): State<Arc<AppState<B>>>,
    AuthUser(user_id): AuthUser,
    Path(drill_id): Path<DrillId>,
    Json(req): Json<RecordDrillOutcomeRequest>,
) -> Result<Json<DailyDrill>, EngineError> {
    Ok(Json(
        state
            .engine
            .record_drill_outcome(user_id, drill_id, req.outcome, req.observation)
            .await?,
    ))
}

//! Goal lifecycle handlers (spec §4.8, §6 response shape): thin wrappers
//! around `Engine` operations. Each handler pulls `AuthUser` from the bearer
//! token and lets the orchestrator's ownership check turn a mismatch into
//! `NOT_FOUND` rather than `FORBIDDEN` (spec §4.2).

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::{Json, http::StatusCode};
use chrono::NaiveDate;
use serde::Deserialize;

use practice_domain::{EngineError, Goal, GoalId};
use practice_engine::{CreateGoalParams, GoalProgress, OnGoalCreatedResult, QuestSeed};
use practice_store::{CascadeCount, KvBackend};

use crate::AppState;
use crate::middleware::auth::AuthUser;

pub async fn create_goal<B: KvBackend + 'static>(
    State(state): State<Arc<AppState<B>>>,
    AuthUser(user_id): AuthUser,
    Json(params): Json<CreateGoalParams>,
) -> Result<(StatusCode, Json<Goal>), EngineError> {
    let goal = state.engine.create_goal(user_id, params).await?;
    Ok((StatusCode::CREATED, Json(goal)))
}

pub async fn list_goals<B: KvBackend + 'static>(
    State(state): State<Arc<AppState<B>>>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<Vec<Goal>>, EngineError> {
    Ok(Json(state.engine.list_goals(user_id).await?))
}

pub async fn get_goal<B: KvBackend + 'static>(
    State(state): State<Arc<AppState<B>>>,
    AuthUser(user_id): AuthUser,
    Path(goal_id): Path<GoalId>,
) -> Result<Json<Goal>, EngineError> {
    Ok(Json(state.engine.get_goal(user_id, goal_id).await?))
}

pub async fn delete_goal<B: KvBackend + 'static>(
    State(state): State<Arc<AppState<B>>>,
    AuthUser(user_id): AuthUser,
    Path(goal_id): Path<GoalId>,
) -> Result<Json<CascadeCount>, EngineError> {
    Ok(Json(state.engine.delete_goal(user_id, goal_id).await?))
}

#[derive(Debug, Deserialize)]
pub struct OnGoalCreatedRequest {
    pub quests: Vec<QuestSeed>,
}

/// `POST /v1/goals/{id}/quests` — spec §4.8 `onGoalCreated(goal, quests)`.
/// The caller supplies the just-created Goal's Quest list (built
/// out-of-band, e.g. by a curriculum step); the orchestrator persists them,
/// activates the first, and seeds its initial Skill/Drill/Spark/reminders.
pub async fn on_goal_created<B: KvBackend + 'static>(
    State(state): State<Arc<AppState<B>>>,
    AuthUser(user_id): AuthUser,
    Path(goal_id): Path<GoalId>,
    Json(req): Json<OnGoalCreatedRequest>,
) -> Result<(StatusCode, Json<OnGoalCreatedResult>), EngineError> {
    let goal = state.engine.get_goal(user_id, goal_id).await?;
    let result = state.engine.on_goal_created(&goal, req.quests).await?;
    Ok((StatusCode::CREATED, Json(result)))
}

#[derive(Debug, Deserialize)]
pub struct SetPriorityRequest {
    pub priority: u32,
}

pub async fn set_priority<B: KvBackend + 'static>(
    State(state): State<Arc<AppState<B>>>,
    AuthUser(user_id): AuthUser,
    Path(goal_id): Path<GoalId>,
    Json(req): Json<SetPriorityRequest>,
) -> Result<Json<Goal>, EngineError> {
    Ok(Json(
        state
            .engine
            .set_goal_priority(user_id, goal_id, req.priority)
            .await?,
    ))
}

#[derive(Debug, Deserialize, Default)]
pub struct PauseGoalRequest {
    pub until: Option<NaiveDate>,
}

pub async fn pause_goal<B: KvBackend + 'static>(
    State(state): State<Arc<AppState<B>>>,
    AuthUser(user_id): AuthUser,
    Path(goal_id): Path<GoalId>,
    body: Option<Json<PauseGoalRequest>>,
) -> Result<Json<Goal>, EngineError> {
    let until = body.and_then(|Json(req)| req.until);
    Ok(Json(state.engine.pause_goal(user_id, goal_id, until).await?))
}

pub async fn resume_goal<B: KvBackend + 'static>(
    State(state): State<Arc<AppState<B>>>,
    AuthUser(user_id): AuthUser,
    Path(goal_id): Path<GoalId>,
) -> Result<Json<Goal>, EngineError> {
    Ok(Json(state.engine.resume_goal(user_id, goal_id).await?))
}

pub async fn get_path_progress<B: KvBackend + 'static>(
    State(state): State<Arc<AppState<B>>>,
    AuthUser(user_id): AuthUser,
    Path(goal_id): Path<GoalId>,
) -> Result<Json<GoalProgress>, EngineError> {
    Ok(Json(state.engine.get_path_progress(user_id, goal_id).await?))
}

//! Votes, reactions and favorites on submitted evidence.

use axum::extract::{Path, State};
use axum::Json;
use database::{ReactionType, VoteValue};
use engine::{ToggleAction, VoteOutcome};
use serde::{Deserialize, Serialize};

use crate::auth::UserId;
use crate::error::Result;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct VoteRequest {
    pub assigned_mission_id: String,
    pub vote: VoteValue,
}

#[derive(Deserialize)]
pub struct ReactRequest {
    pub assigned_mission_id: String,
    pub reaction_type: ReactionType,
}

#[derive(Deserialize)]
pub struct FavoriteRequest {
    pub assigned_mission_id: String,
}

#[derive(Serialize)]
pub struct ToggleResponse {
    pub action: ToggleAction,
}

pub async fn vote(
    State(state): State<AppState>,
    UserId(user_id): UserId,
    Path(operation_id): Path<String>,
    Json(req): Json<VoteRequest>,
) -> Result<Json<VoteOutcome>> {
    let outcome = state
        .engine
        .cast_vote(&operation_id, &req.assigned_mission_id, &user_id, req.vote)
        .await?;
    Ok(Json(outcome))
}

pub async fn react(
    State(state): State<AppState>,
    UserId(user_id): UserId,
    Path(operation_id): Path<String>,
    Json(req): Json<ReactRequest>,
) -> Result<Json<ToggleResponse>> {
    let action = state
        .engine
        .toggle_reaction(
            &operation_id,
            &req.assigned_mission_id,
            &user_id,
            req.reaction_type,
        )
        .await?;
    Ok(Json(ToggleResponse { action }))
}

pub async fn favorite(
    State(state): State<AppState>,
    UserId(user_id): UserId,
    Path(operation_id): Path<String>,
    Json(req): Json<FavoriteRequest>,
) -> Result<Json<ToggleResponse>> {
    let action = state
        .engine
        .toggle_favorite(&operation_id, &req.assigned_mission_id, &user_id)
        .await?;
    Ok(Json(ToggleResponse { action }))
}

//! Operation lifecycle routes.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use database::{FeedEntry, Membership, Operation};
use engine::{JoinOutcome, LeaveOutcome, NewOperation};
use serde::Deserialize;
use tracing::info;

use crate::auth::UserId;
use crate::error::Result;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct JoinRequest {
    pub invite_code: String,
}

pub async fn create(
    State(state): State<AppState>,
    UserId(user_id): UserId,
    Json(req): Json<NewOperation>,
) -> Result<(StatusCode, Json<Operation>)> {
    let operation = state.engine.create_operation(&user_id, req).await?;
    info!(operation_id = %operation.id, "Created via API");
    Ok((StatusCode::CREATED, Json(operation)))
}

pub async fn join(
    State(state): State<AppState>,
    UserId(user_id): UserId,
    Json(req): Json<JoinRequest>,
) -> Result<Json<JoinOutcome>> {
    let outcome = state.engine.join_operation(&user_id, &req.invite_code).await?;
    Ok(Json(outcome))
}

pub async fn cancel(
    State(state): State<AppState>,
    UserId(user_id): UserId,
    Path(operation_id): Path<String>,
) -> Result<StatusCode> {
    state.engine.cancel_operation(&operation_id, &user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn start(
    State(state): State<AppState>,
    UserId(user_id): UserId,
    Path(operation_id): Path<String>,
) -> Result<Json<Operation>> {
    let operation = state.engine.start_operation(&operation_id, &user_id).await?;
    Ok(Json(operation))
}

pub async fn leave(
    State(state): State<AppState>,
    UserId(user_id): UserId,
    Path(operation_id): Path<String>,
) -> Result<Json<LeaveOutcome>> {
    let outcome = state.engine.leave_operation(&operation_id, &user_id).await?;
    Ok(Json(outcome))
}

/// Members ordered by points.
pub async fn ranking(
    State(state): State<AppState>,
    UserId(user_id): UserId,
    Path(operation_id): Path<String>,
) -> Result<Json<Vec<Membership>>> {
    let roster = state.engine.operation_roster(&operation_id, &user_id).await?;
    Ok(Json(roster))
}

pub async fn feed(
    State(state): State<AppState>,
    UserId(user_id): UserId,
    Path(operation_id): Path<String>,
) -> Result<Json<Vec<FeedEntry>>> {
    let entries = state.engine.operation_feed(&operation_id, &user_id).await?;
    Ok(Json(entries))
}

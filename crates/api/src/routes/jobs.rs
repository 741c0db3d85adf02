//! Maintenance job triggers, meant to be hit by an external scheduler.

use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use engine::{CompletionSummary, PurgeSummary, ResetSummary};

use crate::auth::authorize_job;
use crate::error::Result;
use crate::state::AppState;

pub async fn complete_operations(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<CompletionSummary>> {
    authorize_job(state.job_token.as_deref(), &headers)?;
    Ok(Json(state.engine.complete_expired_operations().await?))
}

pub async fn cleanup_operations(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<PurgeSummary>> {
    authorize_job(state.job_token.as_deref(), &headers)?;
    Ok(Json(state.engine.purge_old_completed_operations().await?))
}

pub async fn notify_daily_reset(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<ResetSummary>> {
    authorize_job(state.job_token.as_deref(), &headers)?;
    Ok(Json(state.engine.notify_daily_reset().await?))
}

//! Daily missions: listing, selection and evidence upload.

use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::Json;
use database::AssignedMission;
use engine::{PhotoUpload, SubmissionReceipt, TodayMissions};
use serde::Deserialize;

use crate::auth::UserId;
use crate::error::{ApiError, Result};
use crate::state::AppState;

/// Upload size accepted by the submit route.
pub const MAX_PHOTO_BYTES: usize = 10 * 1024 * 1024;

#[derive(Deserialize)]
pub struct SelectRequest {
    pub mission_id: String,
}

pub async fn today(
    State(state): State<AppState>,
    UserId(user_id): UserId,
    Path(operation_id): Path<String>,
) -> Result<Json<TodayMissions>> {
    let today = state.engine.missions_for_today(&operation_id, &user_id).await?;
    Ok(Json(today))
}

pub async fn select(
    State(state): State<AppState>,
    UserId(user_id): UserId,
    Path(operation_id): Path<String>,
    Json(req): Json<SelectRequest>,
) -> Result<(StatusCode, Json<AssignedMission>)> {
    let assigned = state
        .engine
        .select_mission(&operation_id, &user_id, &req.mission_id)
        .await?;
    Ok((StatusCode::CREATED, Json(assigned)))
}

/// Multipart fields: `assigned_mission_id`, `photo` (file), `caption` (optional).
pub async fn submit(
    State(state): State<AppState>,
    UserId(user_id): UserId,
    Path(operation_id): Path<String>,
    mut multipart: Multipart,
) -> Result<Json<SubmissionReceipt>> {
    let mut assigned_mission_id = None;
    let mut caption = None;
    let mut photo = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(e.body_text()))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "assigned_mission_id" => {
                assigned_mission_id = Some(field_text(field).await?);
            }
            "caption" => {
                caption = Some(field_text(field).await?);
            }
            "photo" => {
                let file_name = field.file_name().map(str::to_string);
                let content_type = field.content_type().map(str::to_string);
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::BadRequest(e.body_text()))?;
                photo = Some(PhotoUpload {
                    bytes: bytes.to_vec(),
                    file_name,
                    content_type,
                });
            }
            _ => {}
        }
    }

    let assigned_mission_id = assigned_mission_id
        .ok_or_else(|| ApiError::BadRequest("assigned_mission_id is required".to_string()))?;
    let photo = photo.ok_or_else(|| ApiError::BadRequest("photo is required".to_string()))?;

    let receipt = state
        .engine
        .submit(
            &operation_id,
            &assigned_mission_id,
            &user_id,
            photo,
            caption.as_deref(),
        )
        .await?;
    Ok(Json(receipt))
}

async fn field_text(field: axum::extract::multipart::Field<'_>) -> Result<String> {
    field
        .text()
        .await
        .map_err(|e| ApiError::BadRequest(e.body_text()))
}

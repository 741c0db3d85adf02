//! Evidence submission.

use database::{assignment, mission, AssignmentStatus};
use dispatch::{DomainEvent, Notification};
use serde::Serialize;
use serde_json::json;
use tracing::{info, warn};

use crate::engine::Engine;
use crate::error::{EngineError, Result};
use crate::storage::photo_path;
use crate::validation::{normalize_caption, photo_extension, ValidationError};

/// An uploaded evidence photo.
#[derive(Debug, Clone)]
pub struct PhotoUpload {
    pub bytes: Vec<u8>,
    /// Original file name; only its extension is used.
    pub file_name: Option<String>,
    pub content_type: Option<String>,
}

impl PhotoUpload {
    fn content_type_for(&self, ext: &str) -> String {
        if let Some(content_type) = self.content_type.as_deref().filter(|c| !c.is_empty()) {
            return content_type.to_string();
        }
        match ext {
            "png" => "image/png",
            "webp" => "image/webp",
            "gif" => "image/gif",
            "heic" => "image/heic",
            _ => "image/jpeg",
        }
        .to_string()
    }
}

/// Result of a successful submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubmissionReceipt {
    pub assigned_mission_id: String,
    pub photo_url: String,
}

impl Engine {
    /// Attach evidence to a selected mission and put it up for review.
    ///
    /// The photo is stored before the row changes; if storing fails nothing
    /// is modified.
    pub async fn submit(
        &self,
        operation_id: &str,
        assigned_mission_id: &str,
        user_id: &str,
        photo: PhotoUpload,
        caption: Option<&str>,
    ) -> Result<SubmissionReceipt> {
        let caption = normalize_caption(caption)?;
        if photo.bytes.is_empty() {
            return Err(ValidationError::Empty("photo".to_string()).into());
        }

        let assigned = self
            .load_assignment_in(operation_id, assigned_mission_id)
            .await?;
        if assigned.user_id != user_id {
            return Err(EngineError::NotOwner);
        }
        if assigned.status != AssignmentStatus::Selected {
            return Err(EngineError::WrongAssignmentStatus {
                expected: AssignmentStatus::Selected.as_str(),
                actual: assigned.status.as_str(),
            });
        }

        let ext = photo_extension(photo.file_name.as_deref());
        let content_type = photo.content_type_for(&ext);
        let path = photo_path(user_id, assigned_mission_id, &ext);
        let photo_url = self.storage.put(&path, photo.bytes, &content_type).await?;

        let evidence = assignment::Evidence {
            photo_url: &photo_url,
            photo_path: &path,
            caption: caption.as_deref(),
        };
        let now = self.now();
        let result =
            assignment::mark_submitted(self.db.pool(), assigned_mission_id, user_id, &evidence, now)
                .await;
        let submitted = match result {
            Ok(submitted) => submitted,
            Err(e) => {
                self.discard_upload(&path).await;
                return Err(e.into());
            }
        };

        if !submitted {
            let current = assignment::get_assignment(self.db.pool(), assigned_mission_id).await?;
            // Keep the object if the winning submission points at the same key.
            if current.photo_path.as_deref() != Some(path.as_str()) {
                self.discard_upload(&path).await;
            }
            return Err(EngineError::WrongAssignmentStatus {
                expected: AssignmentStatus::Selected.as_str(),
                actual: current.status.as_str(),
            });
        }

        info!(
            operation_id = %operation_id,
            user_id = %user_id,
            assigned_mission_id = %assigned_mission_id,
            "Evidence submitted"
        );

        let title = match mission::get_mission(self.db.pool(), &assigned.mission_id).await {
            Ok(m) => m.title,
            Err(_) => "nova missao".to_string(),
        };
        let notification = Notification::new(
            "Nova evidencia no feed",
            format!("Um agente enviou: {}", title),
        )
        .with_data(json!({
            "operationId": operation_id,
            "assignedMissionId": assigned_mission_id,
            "type": "submission",
        }));
        self.notify_members(operation_id, Some(user_id), notification).await;

        self.publish(DomainEvent::MissionSubmitted {
            operation_id: operation_id.to_string(),
            assigned_mission_id: assigned_mission_id.to_string(),
            user_id: user_id.to_string(),
        });

        Ok(SubmissionReceipt {
            assigned_mission_id: assigned_mission_id.to_string(),
            photo_url,
        })
    }

    async fn discard_upload(&self, path: &str) {
        if let Err(e) = self.storage.delete_many(&[path.to_string()]).await {
            warn!(path = %path, "Could not remove orphaned photo: {}", e);
        }
    }
}

//! Scheduled jobs: completion, retention purge and daily reset notices.
//!
//! Each job is safe to run repeatedly and concurrently. Operations are
//! processed independently; a failure on one is logged and reported in the
//! summary, never allowed to stop the batch.

use chrono::Timelike;
use database::{assignment, notification_log, operation, Operation};
use dispatch::{DomainEvent, Notification};
use serde::Serialize;
use serde_json::json;
use tracing::{debug, error, info, warn};

use crate::engine::Engine;
use crate::error::Result;
use crate::progress::operation_badges;

/// Notification log key for the daily reset notice.
pub const DAILY_RESET: &str = "daily_reset";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CompletionSummary {
    /// Operations this run moved to `completed`.
    pub completed: Vec<String>,
    pub failed: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PurgeSummary {
    pub removed_operations: Vec<String>,
    pub removed_photos: usize,
    /// Operations kept for the next run.
    pub failed: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ResetSummary {
    /// Operations whose members were notified by this run.
    pub notified: Vec<String>,
    pub failed: Vec<String>,
}

impl Engine {
    /// Complete every active operation whose end time has passed.
    pub async fn complete_expired_operations(&self) -> Result<CompletionSummary> {
        let now = self.now();
        let expired = operation::list_expired_active(self.db.pool(), now).await?;
        let mut summary = CompletionSummary::default();

        for op in &expired {
            match self.complete_operation(op).await {
                Ok(true) => summary.completed.push(op.id.clone()),
                Ok(false) => debug!(operation_id = %op.id, "Already completed"),
                Err(e) => {
                    error!(operation_id = %op.id, "Failed to complete operation: {}", e);
                    summary.failed.push(op.id.clone());
                }
            }
        }

        if !expired.is_empty() {
            info!(
                completed = summary.completed.len(),
                failed = summary.failed.len(),
                "Completion job finished"
            );
        }
        Ok(summary)
    }

    /// Move one operation to `completed` and award its badges.
    ///
    /// Returns false if it was not active. Only the caller that performs the
    /// transition notifies members.
    pub async fn complete_operation(&self, op: &Operation) -> Result<bool> {
        let now = self.now();
        let completion =
            operation::complete_and_award(self.db.pool(), &op.id, now, |roster, outcomes| {
                operation_badges(op, roster, outcomes, now)
            })
            .await?;

        let Some(completion) = completion else {
            return Ok(false);
        };
        info!(
            operation_id = %op.id,
            badges = completion.badges_awarded,
            "Operation completed"
        );

        let notification = Notification::new(
            "Operacao encerrada",
            format!("Cerimonia disponivel: {}", op.name),
        )
        .with_data(json!({ "operationId": op.id, "type": "operation_completed" }));
        let recipients = completion.roster.into_iter().map(|m| m.user_id).collect();
        self.notify(recipients, notification).await;

        self.publish(DomainEvent::OperationCompleted {
            operation_id: op.id.clone(),
        });
        Ok(true)
    }

    /// Delete completed operations older than the retention window.
    ///
    /// Photos are removed from storage before the rows; an operation whose
    /// photos cannot be removed is kept for the next run.
    pub async fn purge_old_completed_operations(&self) -> Result<PurgeSummary> {
        let cutoff = self.now() - self.policy.retention();
        let stale = operation::list_completed_before(self.db.pool(), cutoff).await?;
        let mut summary = PurgeSummary::default();

        for op in &stale {
            match self.purge_operation(op).await {
                Ok(Some(photos)) => {
                    summary.removed_operations.push(op.id.clone());
                    summary.removed_photos += photos;
                }
                Ok(None) => debug!(operation_id = %op.id, "Operation already purged"),
                Err(e) => {
                    warn!(operation_id = %op.id, "Failed to purge operation: {}", e);
                    summary.failed.push(op.id.clone());
                }
            }
        }

        if !stale.is_empty() {
            info!(
                removed = summary.removed_operations.len(),
                photos = summary.removed_photos,
                failed = summary.failed.len(),
                "Purge job finished"
            );
        }
        Ok(summary)
    }

    /// Returns the number of photos removed, or `None` if another run got there first.
    async fn purge_operation(&self, op: &Operation) -> Result<Option<usize>> {
        let pool = self.db.pool();
        let paths = assignment::list_photo_paths(pool, &op.id).await?;

        self.storage.delete_many(&paths).await?;
        if !operation::delete_completed(pool, &op.id).await? {
            return Ok(None);
        }

        info!(operation_id = %op.id, photos = paths.len(), "Operation purged");
        Ok(Some(paths.len()))
    }

    /// Tell members of operations resetting this hour that new missions are up.
    pub async fn notify_daily_reset(&self) -> Result<ResetSummary> {
        let now = self.now();
        let hour = i64::from(now.hour());
        let active = operation::list_active(self.db.pool()).await?;
        let mut summary = ResetSummary::default();

        for op in active.iter().filter(|op| op.daily_reset_hour == hour) {
            match self.send_daily_reset(op).await {
                Ok(true) => summary.notified.push(op.id.clone()),
                Ok(false) => {}
                Err(e) => {
                    warn!(operation_id = %op.id, "Daily reset notice failed: {}", e);
                    summary.failed.push(op.id.clone());
                }
            }
        }

        Ok(summary)
    }

    async fn send_daily_reset(&self, op: &Operation) -> Result<bool> {
        let day_number = self.day_of(op);
        let first_time = notification_log::record_once(
            self.db.pool(),
            &op.id,
            i64::from(day_number),
            DAILY_RESET,
            self.now(),
        )
        .await?;
        if !first_time {
            debug!(operation_id = %op.id, day_number, "Daily reset already sent");
            return Ok(false);
        }

        let notification = Notification::new(
            "Novas missoes disponiveis",
            format!("Dia {:02} da operacao {}", day_number, op.name),
        )
        .with_data(json!({
            "operationId": op.id,
            "type": DAILY_RESET,
            "dayNumber": day_number,
        }));
        self.notify_members(&op.id, None, notification).await;

        info!(operation_id = %op.id, day_number, "Daily reset notified");
        Ok(true)
    }
}


//! Mission selection.

use database::{
    assignment, mission, AssignedMission, AssignmentStatus, DatabaseError, Mission,
    OperationStatus,
};
use serde::Serialize;
use tracing::info;

use crate::engine::Engine;
use crate::error::{EngineError, Result};

/// What a member sees on the missions screen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TodayMissions {
    /// `None` while the operation is not running.
    pub day_number: Option<u32>,
    /// Seconds until the next day starts.
    pub seconds_until_reset: Option<i64>,
    pub missions: Vec<Mission>,
    /// The member's own assignments for today.
    pub assigned: Vec<AssignedMission>,
}

impl TodayMissions {
    fn idle() -> Self {
        Self {
            day_number: None,
            seconds_until_reset: None,
            missions: Vec::new(),
            assigned: Vec::new(),
        }
    }
}

impl Engine {
    /// Today's pool and the caller's assignments.
    ///
    /// Empty for operations that are not active.
    pub async fn missions_for_today(
        &self,
        operation_id: &str,
        user_id: &str,
    ) -> Result<TodayMissions> {
        let operation = self.load_operation(operation_id).await?;
        self.require_member(operation_id, user_id).await?;

        if operation.status != OperationStatus::Active {
            return Ok(TodayMissions::idle());
        }

        let day_number = self.day_of(&operation);
        let pool = self.get_or_create_pool(operation_id, day_number).await?;
        let assigned = assignment::list_for_member_day(
            self.db.pool(),
            operation_id,
            user_id,
            i64::from(day_number),
        )
        .await?;
        let until_reset =
            crate::clock::time_until_reset(operation.daily_reset_hour as u32, self.now());

        Ok(TodayMissions {
            day_number: Some(day_number),
            seconds_until_reset: Some(until_reset.num_seconds()),
            missions: pool.missions,
            assigned,
        })
    }

    /// Pick a mission from today's pool.
    pub async fn select_mission(
        &self,
        operation_id: &str,
        user_id: &str,
        mission_id: &str,
    ) -> Result<AssignedMission> {
        let operation = self.load_operation(operation_id).await?;
        if operation.status != OperationStatus::Active {
            return Err(EngineError::WrongOperationStatus {
                expected: OperationStatus::Active.as_str(),
                actual: operation.status.as_str(),
            });
        }
        self.require_member(operation_id, user_id).await?;

        let day_number = self.day_of(&operation);
        let pool = self.get_or_create_pool(operation_id, day_number).await?;
        if !pool.contains(mission_id) {
            return Err(EngineError::MissionOutsidePool);
        }

        let day = i64::from(day_number);
        if assignment::count_selected(self.db.pool(), operation_id, user_id, day).await? > 0 {
            return Err(EngineError::AlreadyInProgress);
        }

        let mission = mission::get_mission(self.db.pool(), mission_id).await?;
        let now = self.now();
        let assigned = AssignedMission {
            id: uuid::Uuid::new_v4().to_string(),
            operation_id: operation_id.to_string(),
            user_id: user_id.to_string(),
            mission_id: mission.id,
            day_number: day,
            category_assigned: mission.category,
            status: AssignmentStatus::Selected,
            photo_url: None,
            photo_path: None,
            caption: None,
            selected_at: Some(now),
            submitted_at: None,
            completed_at: None,
            scored_at: None,
            decision: None,
            created_at: now,
        };

        // A concurrent selection that slipped past the count check trips the
        // unique index instead.
        match assignment::insert_selected(self.db.pool(), &assigned).await {
            Ok(()) => {}
            Err(DatabaseError::AlreadyExists { .. }) => return Err(EngineError::AlreadyInProgress),
            Err(e) => return Err(e.into()),
        }

        info!(
            operation_id = %operation_id,
            user_id = %user_id,
            mission_id = %mission_id,
            day_number,
            "Mission selected"
        );
        Ok(assigned)
    }
}

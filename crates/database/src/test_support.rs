//! Fixtures shared by the unit tests of this crate.

use chrono::Utc;

use crate::models::{
    AssignedMission, AssignmentStatus, Category, Difficulty, Mission, Operation, OperationStatus,
};
use crate::{assignment, mission, operation, Database};

pub async fn test_db() -> Database {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    db.migrate().await.unwrap();
    db
}

/// Creates operation `op1` (creator `alice`), mission `m1`, and a submitted
/// assignment owned by alice.
pub async fn seed_submission(db: &Database, assignment_id: &str) {
    let now = Utc::now();
    if operation::find_by_invite_code(db.pool(), "FIXT22").await.unwrap().is_none() {
        let op = Operation {
            id: "op1".to_string(),
            name: "Fixture".to_string(),
            creator_id: "alice".to_string(),
            duration_days: 7,
            daily_reset_hour: 0,
            status: OperationStatus::Inactive,
            invite_code: "FIXT22".to_string(),
            started_at: None,
            ends_at: None,
            completed_at: None,
            created_at: now,
        };
        operation::create_with_creator(db.pool(), &op).await.unwrap();
        let catalog = vec![Mission {
            id: "m1".to_string(),
            category: Category::Coleta,
            title: "Souvenir".to_string(),
            objective: "Collect a receipt from a bakery.".to_string(),
            difficulty: Difficulty::Easy,
            points: 10,
        }];
        mission::insert_missions(db.pool(), &catalog).await.unwrap();
    }

    let row = AssignedMission {
        id: assignment_id.to_string(),
        operation_id: "op1".to_string(),
        user_id: "alice".to_string(),
        mission_id: "m1".to_string(),
        day_number: 1,
        category_assigned: Category::Coleta,
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
    assignment::insert_selected(db.pool(), &row).await.unwrap();
    let evidence = assignment::Evidence {
        photo_url: "http://cdn/photo.jpg",
        photo_path: "alice/photo.jpg",
        caption: None,
    };
    assignment::mark_submitted(db.pool(), assignment_id, "alice", &evidence, now)
        .await
        .unwrap();
}

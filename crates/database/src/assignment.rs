//! Assigned mission storage.
//!
//! The scoring updates here are the linearization point of peer review:
//! `scored_at` is only written while it is still NULL, and callers act on the
//! outcome only when the update reports a changed row.

use chrono::{DateTime, Utc};
use sqlx::{Executor, Sqlite, SqlitePool};

use crate::error::{DatabaseError, Result};
use crate::member;
use crate::models::{AssignedMission, FeedEntry, MemberOutcome};
use crate::profile::{self, ProfileStat};

/// Evidence attached to an assignment on submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Evidence<'a> {
    pub photo_url: &'a str,
    pub photo_path: &'a str,
    pub caption: Option<&'a str>,
}

/// Insert a freshly selected assignment.
///
/// The partial unique index on selected rows turns a second in-flight
/// mission for the same member/day into `AlreadyExists`.
pub async fn insert_selected(pool: &SqlitePool, assigned: &AssignedMission) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO assigned_missions (
            id, operation_id, user_id, mission_id, day_number, category_assigned,
            status, selected_at, created_at
        )
        VALUES (?, ?, ?, ?, ?, ?, 'selected', ?, ?)
        "#,
    )
    .bind(&assigned.id)
    .bind(&assigned.operation_id)
    .bind(&assigned.user_id)
    .bind(&assigned.mission_id)
    .bind(assigned.day_number)
    .bind(assigned.category_assigned)
    .bind(assigned.selected_at)
    .bind(assigned.created_at)
    .execute(pool)
    .await
    .map_err(|e| {
        DatabaseError::conflict(
            e,
            "SelectedMission",
            format!(
                "{}/{}/{}",
                assigned.operation_id, assigned.user_id, assigned.day_number
            ),
        )
    })?;

    Ok(())
}

/// Get an assignment by ID.
pub async fn get_assignment(pool: &SqlitePool, id: &str) -> Result<AssignedMission> {
    sqlx::query_as::<_, AssignedMission>(
        r#"
        SELECT id, operation_id, user_id, mission_id, day_number, category_assigned, status,
               photo_url, photo_path, caption, selected_at, submitted_at, completed_at,
               scored_at, decision, created_at
        FROM assigned_missions
        WHERE id = ?
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| DatabaseError::NotFound {
        entity: "AssignedMission",
        id: id.to_string(),
    })
}

/// A member's assignments for one day of an operation.
pub async fn list_for_member_day(
    pool: &SqlitePool,
    operation_id: &str,
    user_id: &str,
    day_number: i64,
) -> Result<Vec<AssignedMission>> {
    let rows = sqlx::query_as::<_, AssignedMission>(
        r#"
        SELECT id, operation_id, user_id, mission_id, day_number, category_assigned, status,
               photo_url, photo_path, caption, selected_at, submitted_at, completed_at,
               scored_at, decision, created_at
        FROM assigned_missions
        WHERE operation_id = ? AND user_id = ? AND day_number = ?
        ORDER BY created_at
        "#,
    )
    .bind(operation_id)
    .bind(user_id)
    .bind(day_number)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Count a member's selected (in-flight) assignments for a day.
pub async fn count_selected(
    pool: &SqlitePool,
    operation_id: &str,
    user_id: &str,
    day_number: i64,
) -> Result<i64> {
    let count = sqlx::query_scalar::<_, i64>(
        r#"
        SELECT COUNT(*)
        FROM assigned_missions
        WHERE operation_id = ? AND user_id = ? AND day_number = ? AND status = 'selected'
        "#,
    )
    .bind(operation_id)
    .bind(user_id)
    .bind(day_number)
    .fetch_one(pool)
    .await?;

    Ok(count)
}

/// Attach evidence and move a selected assignment to `completed`.
///
/// Returns false if the row is not (or no longer) selected by this user.
pub async fn mark_submitted(
    pool: &SqlitePool,
    id: &str,
    user_id: &str,
    evidence: &Evidence<'_>,
    now: DateTime<Utc>,
) -> Result<bool> {
    let result = sqlx::query(
        r#"
        UPDATE assigned_missions
        SET status = 'completed',
            photo_url = ?,
            photo_path = ?,
            caption = ?,
            submitted_at = ?,
            completed_at = ?
        WHERE id = ? AND user_id = ? AND status = 'selected'
        "#,
    )
    .bind(evidence.photo_url)
    .bind(evidence.photo_path)
    .bind(evidence.caption)
    .bind(now)
    .bind(now)
    .bind(id)
    .bind(user_id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() == 1)
}

/// What an approval credited to the submitter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApprovalCredit {
    /// False when the submitter left the operation before the approval.
    pub member_credited: bool,
    /// The submitter's approved-mission count including this one.
    pub missions_completed: i64,
}

/// Approve a submission and credit the submitter, all or nothing.
///
/// The claim on `scored_at` is the first statement of the transaction, so the
/// write lock is held before anything is credited. Returns `None` for every
/// caller except the one whose claim changed the row. `rank_for` maps the new
/// approved-mission count to the rank stored on the profile.
pub async fn approve_and_credit<F>(
    pool: &SqlitePool,
    id: &str,
    points: i64,
    now: DateTime<Utc>,
    rank_for: F,
) -> Result<Option<ApprovalCredit>>
where
    F: FnOnce(i64) -> &'static str,
{
    let mut tx = pool.begin().await?;

    let claimed = sqlx::query_as::<_, (String, String)>(
        r#"
        UPDATE assigned_missions
        SET scored_at = ?, decision = 'approved'
        WHERE id = ? AND status = 'completed' AND scored_at IS NULL
        RETURNING operation_id, user_id
        "#,
    )
    .bind(now)
    .bind(id)
    .fetch_optional(&mut *tx)
    .await?;

    let Some((operation_id, user_id)) = claimed else {
        tx.rollback().await?;
        return Ok(None);
    };

    let member_credited = member::add_points(&mut *tx, &operation_id, &user_id, points).await?;
    let missions_completed = profile::increment_stat(
        &mut *tx,
        &user_id,
        ProfileStat::TotalMissionsCompleted,
        now,
    )
    .await?;
    let rank = rank_for(missions_completed);
    profile::set_rank_if_current(&mut *tx, &user_id, rank, missions_completed).await?;

    tx.commit().await?;

    Ok(Some(ApprovalCredit {
        member_credited,
        missions_completed,
    }))
}

/// Claim the rejection of a submission.
///
/// Returns true for exactly one caller per assignment.
pub async fn claim_rejection(pool: &SqlitePool, id: &str, now: DateTime<Utc>) -> Result<bool> {
    let result = sqlx::query(
        r#"
        UPDATE assigned_missions
        SET status = 'rejected', scored_at = ?, decision = 'rejected'
        WHERE id = ? AND status = 'completed' AND scored_at IS NULL
        "#,
    )
    .bind(now)
    .bind(id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() == 1)
}

/// Storage paths of every photo attached to an operation's assignments.
pub async fn list_photo_paths(pool: &SqlitePool, operation_id: &str) -> Result<Vec<String>> {
    let paths = sqlx::query_scalar::<_, String>(
        r#"
        SELECT photo_path
        FROM assigned_missions
        WHERE operation_id = ? AND photo_path IS NOT NULL
        ORDER BY created_at
        "#,
    )
    .bind(operation_id)
    .fetch_all(pool)
    .await?;

    Ok(paths)
}

/// Submitted evidence for an operation, newest first, with vote tallies.
pub async fn list_feed(pool: &SqlitePool, operation_id: &str, limit: i64) -> Result<Vec<FeedEntry>> {
    let rows = sqlx::query_as::<_, FeedEntry>(
        r#"
        SELECT a.id, a.operation_id, a.user_id, a.mission_id, a.day_number, a.category_assigned,
               a.status, a.photo_url, a.photo_path, a.caption, a.selected_at, a.submitted_at,
               a.completed_at, a.scored_at, a.decision, a.created_at,
               m.title AS mission_title,
               m.points AS mission_points,
               (SELECT COUNT(*) FROM votes v
                WHERE v.assigned_mission_id = a.id AND v.vote = 'approve') AS approves,
               (SELECT COUNT(*) FROM votes v
                WHERE v.assigned_mission_id = a.id AND v.vote = 'reject') AS rejects
        FROM assigned_missions a
        INNER JOIN missions m ON m.id = a.mission_id
        WHERE a.operation_id = ? AND a.submitted_at IS NOT NULL
        ORDER BY a.submitted_at DESC
        LIMIT ?
        "#,
    )
    .bind(operation_id)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Review results per member of an operation.
pub async fn member_outcomes<'e, E>(executor: E, operation_id: &str) -> Result<Vec<MemberOutcome>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let rows = sqlx::query_as::<_, MemberOutcome>(
        r#"
        SELECT user_id,
               COALESCE(SUM(CASE WHEN decision = 'approved' THEN 1 ELSE 0 END), 0) AS approved,
               COALESCE(SUM(CASE WHEN decision = 'rejected' THEN 1 ELSE 0 END), 0) AS rejected,
               COUNT(DISTINCT CASE WHEN decision = 'approved' THEN day_number END) AS approved_days
        FROM assigned_missions
        WHERE operation_id = ?
        GROUP BY user_id
        ORDER BY user_id
        "#,
    )
    .bind(operation_id)
    .fetch_all(executor)
    .await?;

    Ok(rows)
}

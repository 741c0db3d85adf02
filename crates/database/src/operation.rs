//! Operation persistence and status transitions.
//!
//! Every status change is a conditional update on the current status, so a
//! transition observed by two callers is applied by exactly one of them.

use chrono::{DateTime, Utc};
use sqlx::{Executor, Sqlite, SqlitePool};

use crate::error::{is_unique_violation, DatabaseError, Result};
use crate::models::{Badge, MemberOutcome, MemberRole, Membership, Operation};
use crate::{assignment, member, profile};

/// Result of the transition that completed an operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    /// Final roster, highest score first.
    pub roster: Vec<Membership>,
    pub badges_awarded: usize,
}

/// Insert a new operation together with its creator's membership.
///
/// Both rows are written in one transaction. A collision on the invite code
/// is reported as `AlreadyExists { entity: "InviteCode", .. }` so the caller
/// can retry with a fresh code; a creator who already belongs to another open
/// operation gets `AlreadyExists { entity: "OpenMembership", .. }`.
pub async fn create_with_creator(pool: &SqlitePool, operation: &Operation) -> Result<()> {
    let mut tx = pool.begin().await?;

    sqlx::query(
        r#"
        INSERT INTO operations (
            id, name, creator_id, duration_days, daily_reset_hour, status,
            invite_code, started_at, ends_at, completed_at, created_at
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&operation.id)
    .bind(&operation.name)
    .bind(&operation.creator_id)
    .bind(operation.duration_days)
    .bind(operation.daily_reset_hour)
    .bind(operation.status)
    .bind(&operation.invite_code)
    .bind(operation.started_at)
    .bind(operation.ends_at)
    .bind(operation.completed_at)
    .bind(operation.created_at)
    .execute(&mut *tx)
    .await
    .map_err(|e| {
        if is_unique_violation(&e) && e.to_string().contains("invite_code") {
            return DatabaseError::AlreadyExists {
                entity: "InviteCode",
                id: operation.invite_code.clone(),
            };
        }
        DatabaseError::conflict(e, "Operation", operation.id.clone())
    })?;

    // The creator may not hold another open membership.
    let inserted = sqlx::query(
        r#"
        INSERT INTO operation_members (operation_id, user_id, role, total_points, joined_at)
        SELECT ?, ?, ?, 0, ?
        WHERE NOT EXISTS (
            SELECT 1
            FROM operation_members m
            INNER JOIN operations o ON o.id = m.operation_id
            WHERE m.user_id = ? AND m.operation_id != ? AND o.status IN ('inactive', 'active')
        )
        "#,
    )
    .bind(&operation.id)
    .bind(&operation.creator_id)
    .bind(MemberRole::Creator)
    .bind(operation.created_at)
    .bind(&operation.creator_id)
    .bind(&operation.id)
    .execute(&mut *tx)
    .await?;

    if inserted.rows_affected() != 1 {
        tx.rollback().await?;
        return Err(DatabaseError::AlreadyExists {
            entity: "OpenMembership",
            id: operation.creator_id.clone(),
        });
    }

    tx.commit().await?;

    tracing::debug!(
        operation_id = %operation.id,
        invite_code = %operation.invite_code,
        "Operation inserted"
    );
    Ok(())
}

/// Get an operation by ID.
pub async fn get_operation(pool: &SqlitePool, id: &str) -> Result<Operation> {
    sqlx::query_as::<_, Operation>(
        r#"
        SELECT id, name, creator_id, duration_days, daily_reset_hour, status,
               invite_code, started_at, ends_at, completed_at, created_at
        FROM operations
        WHERE id = ?
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| DatabaseError::NotFound {
        entity: "Operation",
        id: id.to_string(),
    })
}

/// Look up an operation by invite code.
pub async fn find_by_invite_code(pool: &SqlitePool, code: &str) -> Result<Option<Operation>> {
    let operation = sqlx::query_as::<_, Operation>(
        r#"
        SELECT id, name, creator_id, duration_days, daily_reset_hour, status,
               invite_code, started_at, ends_at, completed_at, created_at
        FROM operations
        WHERE invite_code = ?
        "#,
    )
    .bind(code)
    .fetch_optional(pool)
    .await?;

    Ok(operation)
}

/// The non-completed operation a user currently belongs to, if any.
pub async fn open_operation_for_user(pool: &SqlitePool, user_id: &str) -> Result<Option<Operation>> {
    let operation = sqlx::query_as::<_, Operation>(
        r#"
        SELECT o.id, o.name, o.creator_id, o.duration_days, o.daily_reset_hour, o.status,
               o.invite_code, o.started_at, o.ends_at, o.completed_at, o.created_at
        FROM operations o
        INNER JOIN operation_members m ON m.operation_id = o.id
        WHERE m.user_id = ? AND o.status IN ('inactive', 'active')
        ORDER BY o.created_at DESC
        LIMIT 1
        "#,
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await?;

    Ok(operation)
}

/// Move an operation from `inactive` to `active`.
///
/// Returns false if the operation was not inactive.
pub async fn activate(
    pool: &SqlitePool,
    id: &str,
    started_at: DateTime<Utc>,
    ends_at: DateTime<Utc>,
) -> Result<bool> {
    let result = sqlx::query(
        r#"
        UPDATE operations
        SET status = 'active', started_at = ?, ends_at = ?
        WHERE id = ? AND status = 'inactive'
        "#,
    )
    .bind(started_at)
    .bind(ends_at)
    .bind(id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() == 1)
}

/// Move an operation from `active` to `completed`.
///
/// Returns false if another caller completed it first (or it was never active).
pub async fn mark_completed<'e, E>(executor: E, id: &str, now: DateTime<Utc>) -> Result<bool>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query(
        r#"
        UPDATE operations
        SET status = 'completed', completed_at = ?
        WHERE id = ? AND status = 'active'
        "#,
    )
    .bind(now)
    .bind(id)
    .execute(executor)
    .await?;

    Ok(result.rows_affected() == 1)
}

/// Complete an operation and store the badges its final roster earned.
///
/// The status change and every badge write share one transaction; if any of
/// them fails the operation stays active for the next run. `awards_for` sees
/// the roster and review outcomes read under the write lock. Returns the
/// roster for the caller that performed the transition, `None` otherwise.
pub async fn complete_and_award<F>(
    pool: &SqlitePool,
    id: &str,
    now: DateTime<Utc>,
    awards_for: F,
) -> Result<Option<Completion>>
where
    F: FnOnce(&[Membership], &[MemberOutcome]) -> Vec<(String, Badge)>,
{
    let mut tx = pool.begin().await?;

    if !mark_completed(&mut *tx, id, now).await? {
        tx.rollback().await?;
        return Ok(None);
    }

    let roster = member::list_members(&mut *tx, id).await?;
    let outcomes = assignment::member_outcomes(&mut *tx, id).await?;
    let awards = awards_for(&roster, &outcomes);
    for (user_id, badge) in &awards {
        profile::append_badge(&mut *tx, user_id, badge, now).await?;
    }

    tx.commit().await?;

    Ok(Some(Completion {
        roster,
        badges_awarded: awards.len(),
    }))
}

/// Delete an operation that is still in the lobby.
///
/// Memberships cascade. Returns false if the operation is no longer inactive.
pub async fn delete_inactive(pool: &SqlitePool, id: &str) -> Result<bool> {
    let result = sqlx::query(
        r#"
        DELETE FROM operations
        WHERE id = ? AND status = 'inactive'
        "#,
    )
    .bind(id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() == 1)
}

/// Delete a completed operation and everything hanging off it.
pub async fn delete_completed(pool: &SqlitePool, id: &str) -> Result<bool> {
    let result = sqlx::query(
        r#"
        DELETE FROM operations
        WHERE id = ? AND status = 'completed'
        "#,
    )
    .bind(id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() == 1)
}

/// List all active operations.
pub async fn list_active(pool: &SqlitePool) -> Result<Vec<Operation>> {
    let operations = sqlx::query_as::<_, Operation>(
        r#"
        SELECT id, name, creator_id, duration_days, daily_reset_hour, status,
               invite_code, started_at, ends_at, completed_at, created_at
        FROM operations
        WHERE status = 'active'
        ORDER BY started_at
        "#,
    )
    .fetch_all(pool)
    .await?;

    Ok(operations)
}

/// List active operations whose end time has passed.
pub async fn list_expired_active(pool: &SqlitePool, now: DateTime<Utc>) -> Result<Vec<Operation>> {
    let operations = sqlx::query_as::<_, Operation>(
        r#"
        SELECT id, name, creator_id, duration_days, daily_reset_hour, status,
               invite_code, started_at, ends_at, completed_at, created_at
        FROM operations
        WHERE status = 'active' AND ends_at <= ?
        ORDER BY ends_at
        "#,
    )
    .bind(now)
    .fetch_all(pool)
    .await?;

    Ok(operations)
}

/// List completed operations that ended on or before the cutoff.
pub async fn list_completed_before(
    pool: &SqlitePool,
    cutoff: DateTime<Utc>,
) -> Result<Vec<Operation>> {
    let operations = sqlx::query_as::<_, Operation>(
        r#"
        SELECT id, name, creator_id, duration_days, daily_reset_hour, status,
               invite_code, started_at, ends_at, completed_at, created_at
        FROM operations
        WHERE status = 'completed' AND ends_at <= ?
        ORDER BY ends_at
        "#,
    )
    .bind(cutoff)
    .fetch_all(pool)
    .await?;

    Ok(operations)
}

//! Operation membership: roster queries, guarded joins, points and departures.

use chrono::{DateTime, Utc};
use sqlx::{Executor, Sqlite, SqlitePool};

use crate::error::Result;
use crate::models::{MemberRole, Membership};

/// Result of removing a member inside the departure transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Departure {
    /// The user was not a member.
    NotMember,
    /// A regular member left.
    Left,
    /// The creator left; leadership moved to another member.
    LeadershipTransferred { new_creator_id: String },
    /// The creator was the last member; the operation was deleted.
    Disbanded,
}

/// Get a single membership.
pub async fn get_member(
    pool: &SqlitePool,
    operation_id: &str,
    user_id: &str,
) -> Result<Option<Membership>> {
    let member = sqlx::query_as::<_, Membership>(
        r#"
        SELECT operation_id, user_id, role, total_points, joined_at
        FROM operation_members
        WHERE operation_id = ? AND user_id = ?
        "#,
    )
    .bind(operation_id)
    .bind(user_id)
    .fetch_optional(pool)
    .await?;

    Ok(member)
}

/// List an operation's members, highest score first.
pub async fn list_members<'e, E>(executor: E, operation_id: &str) -> Result<Vec<Membership>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let members = sqlx::query_as::<_, Membership>(
        r#"
        SELECT operation_id, user_id, role, total_points, joined_at
        FROM operation_members
        WHERE operation_id = ?
        ORDER BY total_points DESC, joined_at ASC
        "#,
    )
    .bind(operation_id)
    .fetch_all(executor)
    .await?;

    Ok(members)
}

/// User IDs of an operation's members.
pub async fn member_ids(pool: &SqlitePool, operation_id: &str) -> Result<Vec<String>> {
    let ids = sqlx::query_scalar::<_, String>(
        r#"
        SELECT user_id
        FROM operation_members
        WHERE operation_id = ?
        ORDER BY joined_at
        "#,
    )
    .bind(operation_id)
    .fetch_all(pool)
    .await?;

    Ok(ids)
}

/// Count an operation's members.
pub async fn count_members(pool: &SqlitePool, operation_id: &str) -> Result<i64> {
    let count = sqlx::query_scalar::<_, i64>(
        r#"
        SELECT COUNT(*) FROM operation_members WHERE operation_id = ?
        "#,
    )
    .bind(operation_id)
    .fetch_one(pool)
    .await?;

    Ok(count)
}

/// Add a regular member if the roster has room and the user has no other
/// open operation.
///
/// Both conditions are evaluated by the same statement that inserts the row.
/// Returns false when either guard fails (or the user is already a member).
pub async fn insert_member_guarded(
    pool: &SqlitePool,
    operation_id: &str,
    user_id: &str,
    capacity: i64,
    joined_at: DateTime<Utc>,
) -> Result<bool> {
    let result = sqlx::query(
        r#"
        INSERT INTO operation_members (operation_id, user_id, role, total_points, joined_at)
        SELECT ?, ?, 'member', 0, ?
        WHERE (SELECT COUNT(*) FROM operation_members WHERE operation_id = ?) < ?
          AND NOT EXISTS (
              SELECT 1
              FROM operation_members m
              INNER JOIN operations o ON o.id = m.operation_id
              WHERE m.user_id = ? AND o.status IN ('inactive', 'active')
          )
        ON CONFLICT(operation_id, user_id) DO NOTHING
        "#,
    )
    .bind(operation_id)
    .bind(user_id)
    .bind(joined_at)
    .bind(operation_id)
    .bind(capacity)
    .bind(user_id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() == 1)
}

/// Atomically add points to a member's total.
///
/// Returns false if the membership no longer exists.
pub async fn add_points<'e, E>(
    executor: E,
    operation_id: &str,
    user_id: &str,
    points: i64,
) -> Result<bool>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query(
        r#"
        UPDATE operation_members
        SET total_points = total_points + ?
        WHERE operation_id = ? AND user_id = ?
        "#,
    )
    .bind(points)
    .bind(operation_id)
    .bind(user_id)
    .execute(executor)
    .await?;

    Ok(result.rows_affected() == 1)
}

/// Remove a member, handing leadership over when the creator leaves.
///
/// Runs as one transaction whose first statement is the delete, so the write
/// lock is held before the remaining roster is read. `pick_heir` receives the
/// number of remaining members and returns the index of the new creator.
pub async fn remove_member<F>(
    pool: &SqlitePool,
    operation_id: &str,
    user_id: &str,
    pick_heir: F,
) -> Result<Departure>
where
    F: FnOnce(usize) -> usize,
{
    let mut tx = pool.begin().await?;

    let removed = sqlx::query_as::<_, Membership>(
        r#"
        DELETE FROM operation_members
        WHERE operation_id = ? AND user_id = ?
        RETURNING operation_id, user_id, role, total_points, joined_at
        "#,
    )
    .bind(operation_id)
    .bind(user_id)
    .fetch_optional(&mut *tx)
    .await?;

    let Some(removed) = removed else {
        tx.rollback().await?;
        return Ok(Departure::NotMember);
    };

    if removed.role != MemberRole::Creator {
        tx.commit().await?;
        return Ok(Departure::Left);
    }

    let remaining = sqlx::query_scalar::<_, String>(
        r#"
        SELECT user_id
        FROM operation_members
        WHERE operation_id = ?
        ORDER BY joined_at, user_id
        "#,
    )
    .bind(operation_id)
    .fetch_all(&mut *tx)
    .await?;

    if remaining.is_empty() {
        sqlx::query(
            r#"
            DELETE FROM operations WHERE id = ?
            "#,
        )
        .bind(operation_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        return Ok(Departure::Disbanded);
    }

    let heir = remaining[pick_heir(remaining.len()) % remaining.len()].clone();

    sqlx::query(
        r#"
        UPDATE operation_members
        SET role = 'creator'
        WHERE operation_id = ? AND user_id = ?
        "#,
    )
    .bind(operation_id)
    .bind(&heir)
    .execute(&mut *tx)
    .await?;

    sqlx::query(
        r#"
        UPDATE operations
        SET creator_id = ?
        WHERE id = ?
        "#,
    )
    .bind(&heir)
    .bind(operation_id)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    Ok(Departure::LeadershipTransferred {
        new_creator_id: heir,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Operation, OperationStatus};
    use crate::{operation, Database};

    async fn test_db() -> Database {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        db.migrate().await.unwrap();
        db
    }

    async fn seed_operation(db: &Database, id: &str, creator: &str) {
        let op = Operation {
            id: id.to_string(),
            name: format!("Op {}", id),
            creator_id: creator.to_string(),
            duration_days: 7,
            daily_reset_hour: 0,
            status: OperationStatus::Inactive,
            invite_code: format!("C{}", id.to_uppercase()),
            started_at: None,
            ends_at: None,
            completed_at: None,
            created_at: Utc::now(),
        };
        operation::create_with_creator(db.pool(), &op).await.unwrap();
    }

    #[tokio::test]
    async fn test_guarded_insert_respects_capacity() {
        let db = test_db().await;
        seed_operation(&db, "op1", "alice").await;

        assert!(insert_member_guarded(db.pool(), "op1", "bob", 3, Utc::now()).await.unwrap());
        assert!(insert_member_guarded(db.pool(), "op1", "carol", 3, Utc::now()).await.unwrap());
        assert!(!insert_member_guarded(db.pool(), "op1", "dave", 3, Utc::now()).await.unwrap());
        assert_eq!(count_members(db.pool(), "op1").await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_guarded_insert_rejects_second_open_operation() {
        let db = test_db().await;
        seed_operation(&db, "op1", "alice").await;
        seed_operation(&db, "op2", "bob").await;

        assert!(!insert_member_guarded(db.pool(), "op2", "alice", 5, Utc::now()).await.unwrap());
        assert!(get_member(db.pool(), "op2", "alice").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_add_points_accumulates() {
        let db = test_db().await;
        seed_operation(&db, "op1", "alice").await;

        assert!(add_points(db.pool(), "op1", "alice", 10).await.unwrap());
        assert!(add_points(db.pool(), "op1", "alice", 30).await.unwrap());
        assert!(!add_points(db.pool(), "op1", "ghost", 30).await.unwrap());

        let member = get_member(db.pool(), "op1", "alice").await.unwrap().unwrap();
        assert_eq!(member.total_points, 40);
    }

    #[tokio::test]
    async fn test_remove_member_variants() {
        let db = test_db().await;
        seed_operation(&db, "op1", "alice").await;
        insert_member_guarded(db.pool(), "op1", "bob", 5, Utc::now()).await.unwrap();
        insert_member_guarded(db.pool(), "op1", "carol", 5, Utc::now()).await.unwrap();

        let result = remove_member(db.pool(), "op1", "ghost", |_| 0).await.unwrap();
        assert_eq!(result, Departure::NotMember);

        let result = remove_member(db.pool(), "op1", "carol", |_| 0).await.unwrap();
        assert_eq!(result, Departure::Left);

        let result = remove_member(db.pool(), "op1", "alice", |_| 0).await.unwrap();
        assert_eq!(
            result,
            Departure::LeadershipTransferred {
                new_creator_id: "bob".to_string()
            }
        );
        let op = operation::get_operation(db.pool(), "op1").await.unwrap();
        assert_eq!(op.creator_id, "bob");
        let bob = get_member(db.pool(), "op1", "bob").await.unwrap().unwrap();
        assert_eq!(bob.role, MemberRole::Creator);

        let result = remove_member(db.pool(), "op1", "bob", |_| 0).await.unwrap();
        assert_eq!(result, Departure::Disbanded);
        assert!(operation::get_operation(db.pool(), "op1").await.is_err());
    }
}

//! Profile aggregates, updated as side effects of play.

use chrono::{DateTime, Utc};
use sqlx::{Executor, Sqlite, SqlitePool};

use crate::error::Result;
use crate::models::{Badge, Profile};

/// Counter columns that play can increment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileStat {
    /// Operations created or joined.
    TotalOperations,
    /// Submissions approved by peers.
    TotalMissionsCompleted,
}

impl ProfileStat {
    /// Get the database column name for this stat.
    pub fn column_name(&self) -> &'static str {
        match self {
            ProfileStat::TotalOperations => "total_operations",
            ProfileStat::TotalMissionsCompleted => "total_missions_completed",
        }
    }
}

/// Get a user's profile.
pub async fn get_profile(pool: &SqlitePool, id: &str) -> Result<Option<Profile>> {
    let record = sqlx::query_as::<_, Profile>(
        r#"
        SELECT id, username, total_operations, total_missions_completed, rank,
               badges_earned, created_at
        FROM profiles
        WHERE id = ?
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(record)
}

/// Atomically increment a stat, creating the profile if needed.
///
/// Returns the new value.
pub async fn increment_stat<'e, E>(
    executor: E,
    id: &str,
    stat: ProfileStat,
    now: DateTime<Utc>,
) -> Result<i64>
where
    E: Executor<'e, Database = Sqlite>,
{
    // The column comes from the ProfileStat enum, never from input.
    let column = stat.column_name();
    let query = format!(
        r#"
        INSERT INTO profiles (id, {column}, created_at)
        VALUES (?, 1, ?)
        ON CONFLICT(id) DO UPDATE SET {column} = {column} + 1
        RETURNING {column}
        "#,
        column = column
    );

    let value = sqlx::query_scalar::<_, i64>(&query)
        .bind(id)
        .bind(now)
        .fetch_one(executor)
        .await?;

    Ok(value)
}

/// Store a rank derived from `completed`, unless the counter has moved on.
///
/// A later increment writes its own rank, so a stale writer never wins.
pub async fn set_rank_if_current<'e, E>(
    executor: E,
    id: &str,
    rank: &str,
    completed: i64,
) -> Result<bool>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query(
        r#"
        UPDATE profiles
        SET rank = ?
        WHERE id = ? AND total_missions_completed = ?
        "#,
    )
    .bind(rank)
    .bind(id)
    .bind(completed)
    .execute(executor)
    .await?;

    Ok(result.rows_affected() == 1)
}

/// Append a badge to a profile, creating the profile if needed.
pub async fn append_badge<'e, E>(
    executor: E,
    id: &str,
    badge: &Badge,
    now: DateTime<Utc>,
) -> Result<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    let encoded = serde_json::to_string(badge).map_err(|e| sqlx::Error::Encode(Box::new(e)))?;

    sqlx::query(
        r#"
        INSERT INTO profiles (id, badges_earned, created_at)
        VALUES (?, json_array(json(?)), ?)
        ON CONFLICT(id) DO UPDATE SET
            badges_earned = json_insert(profiles.badges_earned, '$[#]', json(?))
        "#,
    )
    .bind(id)
    .bind(&encoded)
    .bind(now)
    .bind(&encoded)
    .execute(executor)
    .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::test_db;

    #[tokio::test]
    async fn test_get_profile_not_found() {
        let db = test_db().await;
        assert!(get_profile(db.pool(), "nobody").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_increment_creates_and_counts() {
        let db = test_db().await;
        let now = Utc::now();

        let first = increment_stat(db.pool(), "alice", ProfileStat::TotalMissionsCompleted, now)
            .await
            .unwrap();
        let second = increment_stat(db.pool(), "alice", ProfileStat::TotalMissionsCompleted, now)
            .await
            .unwrap();
        assert_eq!((first, second), (1, 2));

        increment_stat(db.pool(), "alice", ProfileStat::TotalOperations, now)
            .await
            .unwrap();

        let profile = get_profile(db.pool(), "alice").await.unwrap().unwrap();
        assert_eq!(profile.total_missions_completed, 2);
        assert_eq!(profile.total_operations, 1);
        assert_eq!(profile.rank, "RECRUTA");
    }

    #[tokio::test]
    async fn test_stale_rank_is_not_written() {
        let db = test_db().await;
        let now = Utc::now();
        for _ in 0..5 {
            increment_stat(db.pool(), "alice", ProfileStat::TotalMissionsCompleted, now)
                .await
                .unwrap();
        }

        assert!(!set_rank_if_current(db.pool(), "alice", "RECRUTA", 4).await.unwrap());
        assert!(set_rank_if_current(db.pool(), "alice", "AGENTE", 5).await.unwrap());

        let profile = get_profile(db.pool(), "alice").await.unwrap().unwrap();
        assert_eq!(profile.rank, "AGENTE");
    }

    #[tokio::test]
    async fn test_append_badge() {
        let db = test_db().await;
        let now = Utc::now();
        let badge = |kind: &str| Badge {
            kind: kind.to_string(),
            name: kind.to_uppercase(),
            description: None,
            operation_id: Some("op1".to_string()),
            earned_at: Some(now),
        };
        append_badge(db.pool(), "alice", &badge("mvp"), now).await.unwrap();
        append_badge(db.pool(), "alice", &badge("flawless"), now).await.unwrap();
        append_badge(db.pool(), "bob", &badge("mvp"), now).await.unwrap();

        let alice = get_profile(db.pool(), "alice").await.unwrap().unwrap();
        let kinds: Vec<_> = alice.badges_earned.0.iter().map(|b| b.kind.as_str()).collect();
        assert_eq!(kinds, vec!["mvp", "flawless"]);
        assert!(alice.username.is_none());

        let bob = get_profile(db.pool(), "bob").await.unwrap().unwrap();
        assert_eq!(bob.badges_earned.0.len(), 1);
    }
}

//! Reactions and favorites: uniqueness-constrained edges with toggle semantics.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use crate::error::Result;
use crate::models::ReactionType;

/// Whether the user already left this reaction.
pub async fn reaction_exists(
    pool: &SqlitePool,
    assigned_mission_id: &str,
    user_id: &str,
    reaction_type: ReactionType,
) -> Result<bool> {
    let found = sqlx::query_scalar::<_, i32>(
        r#"
        SELECT 1
        FROM reactions
        WHERE assigned_mission_id = ? AND user_id = ? AND reaction_type = ?
        "#,
    )
    .bind(assigned_mission_id)
    .bind(user_id)
    .bind(reaction_type)
    .fetch_optional(pool)
    .await?;

    Ok(found.is_some())
}

/// Add a reaction. Returns false if it was already present.
pub async fn add_reaction(
    pool: &SqlitePool,
    assigned_mission_id: &str,
    user_id: &str,
    reaction_type: ReactionType,
    now: DateTime<Utc>,
) -> Result<bool> {
    let result = sqlx::query(
        r#"
        INSERT INTO reactions (assigned_mission_id, user_id, reaction_type, created_at)
        VALUES (?, ?, ?, ?)
        ON CONFLICT(assigned_mission_id, user_id, reaction_type) DO NOTHING
        "#,
    )
    .bind(assigned_mission_id)
    .bind(user_id)
    .bind(reaction_type)
    .bind(now)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() == 1)
}

/// Remove a reaction. Returns false if it was not present.
pub async fn remove_reaction(
    pool: &SqlitePool,
    assigned_mission_id: &str,
    user_id: &str,
    reaction_type: ReactionType,
) -> Result<bool> {
    let result = sqlx::query(
        r#"
        DELETE FROM reactions
        WHERE assigned_mission_id = ? AND user_id = ? AND reaction_type = ?
        "#,
    )
    .bind(assigned_mission_id)
    .bind(user_id)
    .bind(reaction_type)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Whether the user has favorited this photo.
pub async fn favorite_exists(
    pool: &SqlitePool,
    assigned_mission_id: &str,
    user_id: &str,
) -> Result<bool> {
    let found = sqlx::query_scalar::<_, i32>(
        r#"
        SELECT 1
        FROM favorite_photos
        WHERE assigned_mission_id = ? AND user_id = ?
        "#,
    )
    .bind(assigned_mission_id)
    .bind(user_id)
    .fetch_optional(pool)
    .await?;

    Ok(found.is_some())
}

/// Add a favorite. Returns false if it was already present.
pub async fn add_favorite(
    pool: &SqlitePool,
    assigned_mission_id: &str,
    user_id: &str,
    now: DateTime<Utc>,
) -> Result<bool> {
    let result = sqlx::query(
        r#"
        INSERT INTO favorite_photos (assigned_mission_id, user_id, created_at)
        VALUES (?, ?, ?)
        ON CONFLICT(assigned_mission_id, user_id) DO NOTHING
        "#,
    )
    .bind(assigned_mission_id)
    .bind(user_id)
    .bind(now)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() == 1)
}

/// Remove a favorite. Returns false if it was not present.
pub async fn remove_favorite(
    pool: &SqlitePool,
    assigned_mission_id: &str,
    user_id: &str,
) -> Result<bool> {
    let result = sqlx::query(
        r#"
        DELETE FROM favorite_photos
        WHERE assigned_mission_id = ? AND user_id = ?
        "#,
    )
    .bind(assigned_mission_id)
    .bind(user_id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{seed_submission, test_db};

    #[tokio::test]
    async fn test_reaction_edges() {
        let db = test_db().await;
        seed_submission(&db, "a1").await;
        let pool = db.pool();

        assert!(!reaction_exists(pool, "a1", "bob", ReactionType::Funny).await.unwrap());
        assert!(add_reaction(pool, "a1", "bob", ReactionType::Funny, Utc::now()).await.unwrap());
        assert!(!add_reaction(pool, "a1", "bob", ReactionType::Funny, Utc::now()).await.unwrap());
        assert!(add_reaction(pool, "a1", "bob", ReactionType::Bold, Utc::now()).await.unwrap());
        assert!(add_reaction(pool, "a1", "carol", ReactionType::Funny, Utc::now()).await.unwrap());

        assert!(reaction_exists(pool, "a1", "carol", ReactionType::Funny).await.unwrap());

        assert!(remove_reaction(pool, "a1", "bob", ReactionType::Funny).await.unwrap());
        assert!(!remove_reaction(pool, "a1", "bob", ReactionType::Funny).await.unwrap());
    }

    #[tokio::test]
    async fn test_favorite_edges() {
        let db = test_db().await;
        seed_submission(&db, "a1").await;
        let pool = db.pool();

        assert!(add_favorite(pool, "a1", "bob", Utc::now()).await.unwrap());
        assert!(favorite_exists(pool, "a1", "bob").await.unwrap());
        assert!(remove_favorite(pool, "a1", "bob").await.unwrap());
        assert!(!favorite_exists(pool, "a1", "bob").await.unwrap());
    }
}

//! Mission catalog storage.

use sqlx::{QueryBuilder, Sqlite, SqlitePool};

use crate::error::{DatabaseError, Result};
use crate::models::Mission;

/// Insert catalog missions, skipping ids that already exist.
///
/// Returns how many rows were actually inserted.
pub async fn insert_missions(pool: &SqlitePool, missions: &[Mission]) -> Result<u64> {
    let mut tx = pool.begin().await?;
    let mut inserted = 0;

    for mission in missions {
        let result = sqlx::query(
            r#"
            INSERT OR IGNORE INTO missions (id, category, title, objective, difficulty, points)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&mission.id)
        .bind(mission.category)
        .bind(&mission.title)
        .bind(&mission.objective)
        .bind(mission.difficulty)
        .bind(mission.points)
        .execute(&mut *tx)
        .await?;
        inserted += result.rows_affected();
    }

    tx.commit().await?;
    Ok(inserted)
}

/// Get a mission by ID.
pub async fn get_mission(pool: &SqlitePool, id: &str) -> Result<Mission> {
    sqlx::query_as::<_, Mission>(
        r#"
        SELECT id, category, title, objective, difficulty, points
        FROM missions
        WHERE id = ?
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or_else(|| DatabaseError::NotFound {
        entity: "Mission",
        id: id.to_string(),
    })
}

/// List the whole catalog in a stable (id) order.
pub async fn list_missions(pool: &SqlitePool) -> Result<Vec<Mission>> {
    let missions = sqlx::query_as::<_, Mission>(
        r#"
        SELECT id, category, title, objective, difficulty, points
        FROM missions
        ORDER BY id
        "#,
    )
    .fetch_all(pool)
    .await?;

    Ok(missions)
}

/// Fetch missions by id, returned in the order of `ids`.
///
/// Ids that no longer exist are skipped.
pub async fn get_missions_by_ids(pool: &SqlitePool, ids: &[String]) -> Result<Vec<Mission>> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }

    let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new(
        "SELECT id, category, title, objective, difficulty, points FROM missions WHERE id IN (",
    );
    let mut separated = builder.separated(", ");
    for id in ids {
        separated.push_bind(id);
    }
    separated.push_unseparated(")");

    let found = builder.build_query_as::<Mission>().fetch_all(pool).await?;

    let ordered = ids
        .iter()
        .filter_map(|id| found.iter().find(|m| &m.id == id).cloned())
        .collect();

    Ok(ordered)
}

/// Count catalog entries.
pub async fn count_missions(pool: &SqlitePool) -> Result<i64> {
    let count = sqlx::query_scalar::<_, i64>(
        r#"
        SELECT COUNT(*) FROM missions
        "#,
    )
    .fetch_one(pool)
    .await?;

    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Category, Difficulty};
    use crate::Database;

    async fn test_db() -> Database {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        db.migrate().await.unwrap();
        db
    }

    fn mission(id: &str, difficulty: Difficulty) -> Mission {
        Mission {
            id: id.to_string(),
            category: Category::Coleta,
            title: format!("Mission {}", id),
            objective: "Bring back proof.".to_string(),
            difficulty,
            points: difficulty.points(),
        }
    }

    #[tokio::test]
    async fn test_insert_is_idempotent() {
        let db = test_db().await;
        let catalog = vec![mission("m1", Difficulty::Easy), mission("m2", Difficulty::Hard)];

        assert_eq!(insert_missions(db.pool(), &catalog).await.unwrap(), 2);
        assert_eq!(insert_missions(db.pool(), &catalog).await.unwrap(), 0);
        assert_eq!(count_missions(db.pool()).await.unwrap(), 2);

        let hard = get_mission(db.pool(), "m2").await.unwrap();
        assert_eq!(hard.points, 30);
        assert_eq!(hard.difficulty, Difficulty::Hard);
    }

    #[tokio::test]
    async fn test_get_by_ids_preserves_order() {
        let db = test_db().await;
        let catalog = vec![
            mission("m1", Difficulty::Easy),
            mission("m2", Difficulty::Medium),
            mission("m3", Difficulty::Hard),
        ];
        insert_missions(db.pool(), &catalog).await.unwrap();

        let ids = vec!["m3".to_string(), "gone".to_string(), "m1".to_string()];
        let found = get_missions_by_ids(db.pool(), &ids).await.unwrap();
        let found_ids: Vec<_> = found.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(found_ids, vec!["m3", "m1"]);

        assert!(get_missions_by_ids(db.pool(), &[]).await.unwrap().is_empty());
    }
}

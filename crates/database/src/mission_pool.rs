//! Daily mission pool storage.

use sqlx::SqlitePool;

use crate::error::Result;
use crate::models::DailyMissionPool;

/// Get the pool for an operation/day, if it has been created.
pub async fn get_pool(
    pool: &SqlitePool,
    operation_id: &str,
    day_number: i64,
) -> Result<Option<DailyMissionPool>> {
    let record = sqlx::query_as::<_, DailyMissionPool>(
        r#"
        SELECT id, operation_id, day_number, category, mission_ids, created_at
        FROM daily_mission_pools
        WHERE operation_id = ? AND day_number = ?
        "#,
    )
    .bind(operation_id)
    .bind(day_number)
    .fetch_optional(pool)
    .await?;

    Ok(record)
}

/// Insert a pool unless one already exists for the same operation/day.
///
/// Returns true if this call created the row. Losers of a race get false and
/// should re-read with [`get_pool`].
pub async fn insert_pool_if_absent(pool: &SqlitePool, record: &DailyMissionPool) -> Result<bool> {
    let result = sqlx::query(
        r#"
        INSERT INTO daily_mission_pools (id, operation_id, day_number, category, mission_ids, created_at)
        VALUES (?, ?, ?, ?, ?, ?)
        ON CONFLICT(operation_id, day_number) DO NOTHING
        "#,
    )
    .bind(&record.id)
    .bind(&record.operation_id)
    .bind(record.day_number)
    .bind(record.category)
    .bind(&record.mission_ids)
    .bind(record.created_at)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() == 1)
}

//! Once-only notification log.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use crate::error::{is_unique_violation, Result};

/// Record that a notification was sent for an operation/day/type.
///
/// Returns false if the entry already existed, meaning the notification has
/// been sent before and must be skipped.
pub async fn record_once(
    pool: &SqlitePool,
    operation_id: &str,
    day_number: i64,
    notification_type: &str,
    now: DateTime<Utc>,
) -> Result<bool> {
    let result = sqlx::query(
        r#"
        INSERT INTO operation_notification_log (operation_id, day_number, notification_type, created_at)
        VALUES (?, ?, ?, ?)
        "#,
    )
    .bind(operation_id)
    .bind(day_number)
    .bind(notification_type)
    .bind(now)
    .execute(pool)
    .await;

    match result {
        Ok(_) => Ok(true),
        Err(e) if is_unique_violation(&e) => Ok(false),
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{seed_submission, test_db};

    #[tokio::test]
    async fn test_record_once() {
        let db = test_db().await;
        seed_submission(&db, "a1").await;

        assert!(record_once(db.pool(), "op1", 3, "daily_reset", Utc::now()).await.unwrap());
        assert!(!record_once(db.pool(), "op1", 3, "daily_reset", Utc::now()).await.unwrap());
        assert!(record_once(db.pool(), "op1", 4, "daily_reset", Utc::now()).await.unwrap());
        assert!(record_once(db.pool(), "op1", 3, "digest", Utc::now()).await.unwrap());
    }
}

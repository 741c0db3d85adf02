//! Peer vote storage.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use crate::error::Result;
use crate::models::{VoteTally, VoteValue};

/// Record a vote, overwriting the voter's previous vote on the same submission.
pub async fn upsert_vote(
    pool: &SqlitePool,
    assigned_mission_id: &str,
    voter_id: &str,
    vote: VoteValue,
    now: DateTime<Utc>,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO votes (assigned_mission_id, voter_id, vote, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?)
        ON CONFLICT(assigned_mission_id, voter_id) DO UPDATE SET
            vote = excluded.vote,
            updated_at = excluded.updated_at
        "#,
    )
    .bind(assigned_mission_id)
    .bind(voter_id)
    .bind(vote)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await?;

    Ok(())
}

/// Count approve and reject votes for a submission.
pub async fn tally(pool: &SqlitePool, assigned_mission_id: &str) -> Result<VoteTally> {
    let tally = sqlx::query_as::<_, VoteTally>(
        r#"
        SELECT
            COALESCE(SUM(CASE WHEN vote = 'approve' THEN 1 ELSE 0 END), 0) AS approves,
            COALESCE(SUM(CASE WHEN vote = 'reject' THEN 1 ELSE 0 END), 0) AS rejects
        FROM votes
        WHERE assigned_mission_id = ?
        "#,
    )
    .bind(assigned_mission_id)
    .fetch_one(pool)
    .await?;

    Ok(tally)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{seed_submission, test_db};

    #[tokio::test]
    async fn test_revote_overwrites() {
        let db = test_db().await;
        seed_submission(&db, "a1").await;

        upsert_vote(db.pool(), "a1", "bob", VoteValue::Approve, Utc::now()).await.unwrap();
        upsert_vote(db.pool(), "a1", "carol", VoteValue::Approve, Utc::now()).await.unwrap();
        upsert_vote(db.pool(), "a1", "bob", VoteValue::Reject, Utc::now()).await.unwrap();

        let counts = tally(db.pool(), "a1").await.unwrap();
        assert_eq!(counts, VoteTally { approves: 1, rejects: 1 });
    }

    #[tokio::test]
    async fn test_tally_without_votes() {
        let db = test_db().await;
        seed_submission(&db, "a1").await;

        let counts = tally(db.pool(), "a1").await.unwrap();
        assert_eq!(counts, VoteTally::default());
    }
}

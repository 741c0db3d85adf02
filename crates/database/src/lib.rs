//! SQLite persistence layer for Sombra.
//!
//! This crate provides async database operations for operations, memberships,
//! the mission catalog, daily pools, assigned missions, votes and profiles
//! using SQLx with SQLite.
//!
//! Functions that guard an invariant (unique pools, one selected mission per
//! member/day, at-most-once scoring) report whether they changed a row, so
//! callers can tell a won race from a lost one without extra reads.
//!
//! # Example
//!
//! ```no_run
//! use database::{Database, mission_pool};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Connect and run migrations
//!     let db = Database::connect("sqlite:sombra.db?mode=rwc").await?;
//!     db.migrate().await?;
//!
//!     let pool = mission_pool::get_pool(db.pool(), "op-id", 1).await?;
//!     println!("pool exists: {}", pool.is_some());
//!
//!     Ok(())
//! }
//! ```

pub mod assignment;
pub mod engagement;
pub mod error;
pub mod member;
pub mod mission;
pub mod mission_pool;
pub mod models;
pub mod notification_log;
pub mod operation;
pub mod profile;
pub mod vote;

#[cfg(test)]
mod test_support;

pub use error::{DatabaseError, Result};
pub use member::Departure;
pub use models::{
    AssignedMission, AssignmentStatus, Badge, Category, DailyMissionPool, Decision, Difficulty,
    FeedEntry, MemberOutcome, MemberRole, Membership, Mission, Operation, OperationStatus,
    Profile, ReactionType, VoteTally, VoteValue,
};
pub use profile::ProfileStat;
pub use sqlx::types::Json;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::str::FromStr;
use std::time::Duration;

/// Database connection wrapper.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Default pool size for database connections.
    /// Sized for many concurrent players hitting the same operation rows.
    const DEFAULT_POOL_SIZE: u32 = 20;

    /// How long a connection waits on a locked database before failing.
    const BUSY_TIMEOUT: Duration = Duration::from_secs(10);

    /// Connect to a SQLite database.
    ///
    /// The URL should be in the format `sqlite:path/to/db.sqlite?mode=rwc`.
    /// Use `?mode=rwc` to create the database file if it doesn't exist.
    ///
    /// # Example
    ///
    /// ```no_run
    /// # async fn example() -> database::Result<()> {
    /// // File database
    /// let db = database::Database::connect("sqlite:data/sombra.db?mode=rwc").await?;
    ///
    /// // In-memory database (for testing)
    /// let db = database::Database::connect("sqlite::memory:").await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn connect(url: &str) -> Result<Self> {
        Self::connect_with_pool_size(url, Self::DEFAULT_POOL_SIZE).await
    }

    /// Connect to a SQLite database with a custom pool size.
    pub async fn connect_with_pool_size(url: &str, pool_size: u32) -> Result<Self> {
        // Cascading deletes (cancel, disband, purge) rely on foreign keys.
        let options = SqliteConnectOptions::from_str(url)?
            .create_if_missing(true)
            .foreign_keys(true)
            .busy_timeout(Self::BUSY_TIMEOUT);

        let pool = SqlitePoolOptions::new()
            .max_connections(pool_size)
            .acquire_timeout(Duration::from_secs(30))
            .connect_with(options)
            .await?;

        tracing::info!(
            "Connected to database: {} (pool size: {})",
            url,
            pool_size
        );

        Ok(Self { pool })
    }

    /// Run database migrations.
    ///
    /// This should be called once after connecting to ensure the schema is up to date.
    pub async fn migrate(&self) -> Result<()> {
        tracing::info!("Running database migrations...");

        sqlx::migrate!("./migrations").run(&self.pool).await?;

        tracing::info!("Migrations complete");
        Ok(())
    }

    /// Get a reference to the connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Close the database connection pool.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

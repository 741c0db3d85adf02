//! Game engine for Sombra operations.
//!
//! An operation is a small group challenge that runs for a fixed number of
//! days. Every day each member picks one mission from a shared pool, submits
//! a photo as evidence, and the rest of the group votes it up or down. A
//! strict majority decides, and the decision is scored exactly once.
//!
//! All state lives in the database crate; the engine adds the rules on top
//! and talks to two collaborators:
//!
//! - [`PhotoStorage`] for evidence photos
//! - [`dispatch::Notifier`] for push notifications, always best-effort
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use database::Database;
//! use dispatch::LoggingNotifier;
//! use engine::{Engine, MemoryPhotoStorage, NewOperation};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let db = Database::connect("sqlite:sombra.db?mode=rwc").await?;
//!     db.migrate().await?;
//!
//!     let engine = Engine::new(db, Arc::new(MemoryPhotoStorage::new()), Arc::new(LoggingNotifier));
//!     engine.seed_default_catalog().await?;
//!
//!     let op = engine
//!         .create_operation(
//!             "alice",
//!             NewOperation {
//!                 name: "Sombra Norte".to_string(),
//!                 duration_days: 7,
//!                 daily_reset_hour: 9,
//!             },
//!         )
//!         .await?;
//!     println!("invite code: {}", op.invite_code);
//!
//!     Ok(())
//! }
//! ```

pub mod assignment;
pub mod catalog;
pub mod clock;
pub mod engagement;
pub mod engine;
pub mod error;
pub mod invite;
pub mod lifecycle;
pub mod maintenance;
pub mod policy;
pub mod pool;
pub mod progress;
pub mod storage;
pub mod submission;
pub mod validation;
pub mod voting;

pub use assignment::TodayMissions;
pub use catalog::default_catalog;
pub use clock::{current_day, time_until_reset, Clock, ManualClock, SystemClock};
pub use engagement::ToggleAction;
pub use engine::Engine;
pub use error::{EngineError, ErrorKind, Result};
pub use invite::{FixedInviteCodes, InviteCodes, RandomInviteCodes};
pub use lifecycle::{JoinOutcome, LeaveOutcome, NewOperation};
pub use maintenance::{CompletionSummary, PurgeSummary, ResetSummary};
pub use policy::{Policy, PolicyError};
pub use pool::MissionPool;
pub use progress::{did_rank_up, Rank};
pub use storage::{LocalPhotoStorage, MemoryPhotoStorage, PhotoStorage, StorageError};
pub use submission::{PhotoUpload, SubmissionReceipt};
pub use validation::ValidationError;
pub use voting::{majority, VoteOutcome};

//! Database models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;

/// Lifecycle phase of an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum OperationStatus {
    /// Lobby: members can join, nothing is scored yet.
    Inactive,
    /// Running: missions are provisioned daily.
    Active,
    /// Finished. Immutable from here on.
    Completed,
}

impl OperationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationStatus::Inactive => "inactive",
            OperationStatus::Active => "active",
            OperationStatus::Completed => "completed",
        }
    }
}

/// Role of a member inside an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum MemberRole {
    Creator,
    Member,
}

/// Mission category. One category is drawn per operation/day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum Category {
    Vigilancia,
    Coleta,
    Infiltracao,
    Disfarce,
    Reconhecimento,
}

impl Category {
    /// Every category, in catalog order.
    pub const ALL: [Category; 5] = [
        Category::Vigilancia,
        Category::Coleta,
        Category::Infiltracao,
        Category::Disfarce,
        Category::Reconhecimento,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Vigilancia => "vigilancia",
            Category::Coleta => "coleta",
            Category::Infiltracao => "infiltracao",
            Category::Disfarce => "disfarce",
            Category::Reconhecimento => "reconhecimento",
        }
    }
}

/// Mission difficulty tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    /// Every tier, easiest first.
    pub const ALL: [Difficulty; 3] = [Difficulty::Easy, Difficulty::Medium, Difficulty::Hard];

    /// Points awarded for an approved mission of this tier.
    pub fn points(&self) -> i64 {
        match self {
            Difficulty::Easy => 10,
            Difficulty::Medium => 20,
            Difficulty::Hard => 30,
        }
    }
}

/// Status of a member's assigned mission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum AssignmentStatus {
    Available,
    /// Picked from the pool, evidence not yet submitted.
    Selected,
    /// Evidence submitted; awaiting (or past) peer review.
    Completed,
    Failed,
    /// Peer review rejected the evidence.
    Rejected,
}

impl AssignmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssignmentStatus::Available => "available",
            AssignmentStatus::Selected => "selected",
            AssignmentStatus::Completed => "completed",
            AssignmentStatus::Failed => "failed",
            AssignmentStatus::Rejected => "rejected",
        }
    }
}

/// Final peer-review decision on a submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum Decision {
    Approved,
    Rejected,
}

/// A single peer vote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum VoteValue {
    Approve,
    Reject,
}

/// Reaction kinds members can leave on a submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum ReactionType {
    Funny,
    Creative,
    Precise,
    Bold,
    Gross,
}

/// A time-boxed group challenge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Operation {
    pub id: String,
    pub name: String,
    /// Current leader. Reassigned on leadership transfer.
    pub creator_id: String,
    /// One of 7, 14 or 30.
    pub duration_days: i64,
    /// UTC hour (0-23) at which the operation's day advances.
    pub daily_reset_hour: i64,
    pub status: OperationStatus,
    pub invite_code: String,
    pub started_at: Option<DateTime<Utc>>,
    pub ends_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Membership of a user in an operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Membership {
    pub operation_id: String,
    pub user_id: String,
    pub role: MemberRole,
    /// Never decreases within an operation.
    pub total_points: i64,
    pub joined_at: DateTime<Utc>,
}

/// A catalog mission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Mission {
    pub id: String,
    pub category: Category,
    pub title: String,
    pub objective: String,
    pub difficulty: Difficulty,
    pub points: i64,
}

/// The missions offered to every member of an operation on a given day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct DailyMissionPool {
    pub id: String,
    pub operation_id: String,
    pub day_number: i64,
    /// Category drawn for the day.
    pub category: Category,
    /// Mission ids in presentation order.
    pub mission_ids: Json<Vec<String>>,
    pub created_at: DateTime<Utc>,
}

/// A member's personal instance of a chosen mission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct AssignedMission {
    pub id: String,
    pub operation_id: String,
    pub user_id: String,
    pub mission_id: String,
    pub day_number: i64,
    pub category_assigned: Category,
    pub status: AssignmentStatus,
    pub photo_url: Option<String>,
    /// Object-storage key of the evidence photo.
    pub photo_path: Option<String>,
    pub caption: Option<String>,
    pub selected_at: Option<DateTime<Utc>>,
    pub submitted_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    /// Set exactly once, when peer review reaches a decision.
    pub scored_at: Option<DateTime<Utc>>,
    pub decision: Option<Decision>,
    pub created_at: DateTime<Utc>,
}

/// Vote counts for a submission.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct VoteTally {
    pub approves: i64,
    pub rejects: i64,
}

/// A submission as shown in the operation feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct FeedEntry {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub assignment: AssignedMission,
    pub mission_title: String,
    pub mission_points: i64,
    pub approves: i64,
    pub rejects: i64,
}

/// Per-member review results inside one operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct MemberOutcome {
    pub user_id: String,
    pub approved: i64,
    pub rejected: i64,
    /// Distinct days with at least one approved submission.
    pub approved_days: i64,
}

/// A badge stored on a profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Badge {
    #[serde(rename = "type")]
    pub kind: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub earned_at: Option<DateTime<Utc>>,
}

/// Aggregate per-user stats, maintained by side effects of play.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct Profile {
    pub id: String,
    pub username: Option<String>,
    pub total_operations: i64,
    pub total_missions_completed: i64,
    pub rank: String,
    pub badges_earned: Json<Vec<Badge>>,
    pub created_at: DateTime<Utc>,
}

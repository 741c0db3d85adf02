//! Error types for engine operations.

use database::DatabaseError;
use thiserror::Error;

use crate::storage::StorageError;
use crate::validation::ValidationError;

/// How a failure should be reported to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The request broke a precondition; retrying it unchanged will not help.
    Invalid,
    /// The caller lacks the role or membership the action needs.
    Forbidden,
    NotFound,
    /// The request collides with state another request created.
    Conflict,
    Internal,
}

/// Errors that can occur during engine operations.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("{0}")]
    Validation(#[from] ValidationError),

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// Caller is not a member of the operation.
    #[error("not a member of this operation")]
    NotMember,

    /// Only the creator may perform this action.
    #[error("only the operation creator can {action}")]
    NotCreator { action: &'static str },

    /// Operation is in the wrong lifecycle phase.
    #[error("operation is {actual}, expected {expected}")]
    WrongOperationStatus {
        expected: &'static str,
        actual: &'static str,
    },

    /// Operation has already completed.
    #[error("operation has already completed")]
    OperationCompleted,

    /// Assigned mission is in the wrong status.
    #[error("mission is {actual}, expected {expected}")]
    WrongAssignmentStatus {
        expected: &'static str,
        actual: &'static str,
    },

    /// The assigned mission belongs to someone else.
    #[error("mission belongs to another member")]
    NotOwner,

    #[error("cannot vote on your own submission")]
    SelfVote,

    #[error("mission is not part of today's pool")]
    MissionOutsidePool,

    #[error("a mission is already in progress today")]
    AlreadyInProgress,

    #[error("operation is full ({capacity} members)")]
    CapacityReached { capacity: i64 },

    /// User already belongs to another non-completed operation.
    #[error("already taking part in another operation")]
    AlreadyInOperation,

    #[error("at least {required} members are needed to start (have {actual})")]
    NotEnoughMembers { required: i64, actual: i64 },

    /// Invite code generation kept colliding.
    #[error("could not allocate an invite code after {attempts} attempts")]
    InviteCodeExhausted { attempts: usize },

    #[error("photo storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("database error: {0}")]
    Database(DatabaseError),
}

impl EngineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            EngineError::Validation(_)
            | EngineError::WrongOperationStatus { .. }
            | EngineError::OperationCompleted
            | EngineError::WrongAssignmentStatus { .. }
            | EngineError::SelfVote
            | EngineError::MissionOutsidePool
            | EngineError::NotEnoughMembers { .. } => ErrorKind::Invalid,
            EngineError::NotMember | EngineError::NotCreator { .. } | EngineError::NotOwner => {
                ErrorKind::Forbidden
            }
            EngineError::NotFound { .. } => ErrorKind::NotFound,
            EngineError::AlreadyInProgress
            | EngineError::CapacityReached { .. }
            | EngineError::AlreadyInOperation => ErrorKind::Conflict,
            EngineError::InviteCodeExhausted { .. }
            | EngineError::Storage(_)
            | EngineError::Database(_) => ErrorKind::Internal,
        }
    }
}

impl From<DatabaseError> for EngineError {
    fn from(e: DatabaseError) -> Self {
        match e {
            // A vanished row is a not-found, not an internal failure.
            DatabaseError::NotFound { entity, id } => EngineError::NotFound { entity, id },
            other => EngineError::Database(other),
        }
    }
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, EngineError>;

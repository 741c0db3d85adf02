//! Operation lifecycle: lobby, start, leave, cancel.
//!
//! ```text
//! create ──> inactive ──start──> active ──(ends_at passed)──> completed
//!               │
//!               └──cancel / last member leaves──> deleted
//! ```

use chrono::Duration;
use database::{
    assignment, member, operation, profile, DatabaseError, Departure, FeedEntry, MemberRole,
    Membership, Operation, OperationStatus, ProfileStat,
};
use dispatch::{DomainEvent, Notification};
use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, warn};

use crate::engine::Engine;
use crate::error::{EngineError, Result};
use crate::validation::{
    normalize_invite_code, validate_duration, validate_operation_name, validate_reset_hour,
};

/// Parameters for a new operation.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NewOperation {
    pub name: String,
    pub duration_days: i64,
    pub daily_reset_hour: i64,
}

/// Result of joining by invite code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JoinOutcome {
    pub operation: Operation,
    pub membership: Membership,
    /// True when the caller was already on the roster.
    pub already_member: bool,
}

/// What happened when a member left.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum LeaveOutcome {
    Left,
    LeadershipTransferred { new_creator_id: String },
    /// The creator was the last member; the operation is gone.
    Disbanded,
}

fn require_creator(operation: &Operation, user_id: &str, action: &'static str) -> Result<()> {
    if operation.creator_id != user_id {
        return Err(EngineError::NotCreator { action });
    }
    Ok(())
}

fn require_status(operation: &Operation, expected: OperationStatus) -> Result<()> {
    if operation.status != expected {
        return Err(EngineError::WrongOperationStatus {
            expected: expected.as_str(),
            actual: operation.status.as_str(),
        });
    }
    Ok(())
}

impl Engine {
    /// Create an operation in the lobby with the caller as creator.
    pub async fn create_operation(&self, creator_id: &str, params: NewOperation) -> Result<Operation> {
        let name = validate_operation_name(&params.name)?;
        validate_duration(params.duration_days)?;
        validate_reset_hour(params.daily_reset_hour)?;

        if operation::open_operation_for_user(self.db.pool(), creator_id)
            .await?
            .is_some()
        {
            return Err(EngineError::AlreadyInOperation);
        }

        let attempts = self.policy.invite_code_attempts;
        for attempt in 1..=attempts {
            let candidate = Operation {
                id: uuid::Uuid::new_v4().to_string(),
                name: name.clone(),
                creator_id: creator_id.to_string(),
                duration_days: params.duration_days,
                daily_reset_hour: params.daily_reset_hour,
                status: OperationStatus::Inactive,
                invite_code: self.invite_codes.next_code(),
                started_at: None,
                ends_at: None,
                completed_at: None,
                created_at: self.now(),
            };

            match operation::create_with_creator(self.db.pool(), &candidate).await {
                Ok(()) => {
                    info!(
                        operation_id = %candidate.id,
                        creator_id = %creator_id,
                        invite_code = %candidate.invite_code,
                        "Operation created"
                    );
                    self.bump_operations(creator_id).await;
                    return Ok(candidate);
                }
                Err(DatabaseError::AlreadyExists { entity: "InviteCode", .. }) => {
                    warn!(attempt, "Invite code collision, retrying");
                }
                Err(DatabaseError::AlreadyExists { entity: "OpenMembership", .. }) => {
                    return Err(EngineError::AlreadyInOperation);
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(EngineError::InviteCodeExhausted { attempts })
    }

    /// Join an operation by invite code. Joining twice is not an error.
    pub async fn join_operation(&self, user_id: &str, code: &str) -> Result<JoinOutcome> {
        let code = normalize_invite_code(code)?;
        let pool = self.db.pool();

        let target = operation::find_by_invite_code(pool, &code)
            .await?
            .ok_or_else(|| EngineError::NotFound {
                entity: "Operation",
                id: code.clone(),
            })?;
        if target.status == OperationStatus::Completed {
            return Err(EngineError::OperationCompleted);
        }

        if let Some(existing) = member::get_member(pool, &target.id, user_id).await? {
            return Ok(JoinOutcome {
                operation: target,
                membership: existing,
                already_member: true,
            });
        }

        let capacity = self.policy.max_members;
        let joined =
            member::insert_member_guarded(pool, &target.id, user_id, capacity, self.now()).await?;

        if !joined {
            return Err(self.explain_rejected_join(&target, user_id).await?);
        }

        let membership = self.require_member(&target.id, user_id).await?;
        info!(operation_id = %target.id, user_id = %user_id, "Member joined");
        self.bump_operations(user_id).await;

        self.publish(DomainEvent::MemberJoined {
            operation_id: target.id.clone(),
            user_id: user_id.to_string(),
        });
        let notification = Notification::new(
            "Novo agente recrutado",
            format!("Um agente entrou na operacao {}", target.name),
        )
        .with_data(json!({ "operationId": target.id, "type": "member_joined" }));
        self.notify(vec![target.creator_id.clone()], notification).await;

        Ok(JoinOutcome {
            operation: target,
            membership,
            already_member: false,
        })
    }

    /// Work out which guard turned a join away.
    async fn explain_rejected_join(&self, target: &Operation, user_id: &str) -> Result<EngineError> {
        let pool = self.db.pool();

        if let Some(open) = operation::open_operation_for_user(pool, user_id).await? {
            if open.id != target.id {
                return Ok(EngineError::AlreadyInOperation);
            }
        }
        let current = self.load_operation(&target.id).await?;
        if current.status == OperationStatus::Completed {
            return Ok(EngineError::OperationCompleted);
        }
        Ok(EngineError::CapacityReached {
            capacity: self.policy.max_members,
        })
    }

    async fn bump_operations(&self, user_id: &str) {
        if let Err(e) =
            profile::increment_stat(self.db.pool(), user_id, ProfileStat::TotalOperations, self.now())
                .await
        {
            warn!(user_id = %user_id, "Could not update profile: {}", e);
        }
    }

    /// Start the operation. Creator only, from the lobby.
    pub async fn start_operation(&self, operation_id: &str, caller_id: &str) -> Result<Operation> {
        let pool = self.db.pool();
        let lobby = self.load_operation(operation_id).await?;
        require_creator(&lobby, caller_id, "start")?;
        require_status(&lobby, OperationStatus::Inactive)?;

        let members = member::count_members(pool, operation_id).await?;
        let required = self.policy.min_members_to_start;
        if members < required {
            return Err(EngineError::NotEnoughMembers {
                required,
                actual: members,
            });
        }

        let started_at = self.now();
        let ends_at = started_at + Duration::days(lobby.duration_days);
        if !operation::activate(pool, operation_id, started_at, ends_at).await? {
            let current = self.load_operation(operation_id).await?;
            return Err(EngineError::WrongOperationStatus {
                expected: OperationStatus::Inactive.as_str(),
                actual: current.status.as_str(),
            });
        }

        info!(operation_id = %operation_id, members, %ends_at, "Operation started");

        if let Err(e) = self.get_or_create_pool(operation_id, 1).await {
            warn!(operation_id = %operation_id, "Could not provision day 1 pool: {}", e);
        }

        self.publish(DomainEvent::OperationStarted {
            operation_id: operation_id.to_string(),
        });
        let notification = Notification::new(
            "Operacao iniciada",
            format!("{} comecou. Escolha sua primeira missao.", lobby.name),
        )
        .with_data(json!({ "operationId": operation_id, "type": "operation_started" }));
        self.notify_members(operation_id, Some(caller_id), notification).await;

        self.load_operation(operation_id).await
    }

    /// Leave an operation that has not completed.
    ///
    /// A departing creator hands leadership to a random remaining member; the
    /// last member leaving disbands the operation.
    pub async fn leave_operation(&self, operation_id: &str, user_id: &str) -> Result<LeaveOutcome> {
        let current = self.load_operation(operation_id).await?;
        if current.status == OperationStatus::Completed {
            return Err(EngineError::OperationCompleted);
        }

        let departure = member::remove_member(self.db.pool(), operation_id, user_id, |remaining| {
            rand::thread_rng().gen_range(0..remaining)
        })
        .await?;

        let outcome = match departure {
            Departure::NotMember => return Err(EngineError::NotMember),
            Departure::Left => LeaveOutcome::Left,
            Departure::LeadershipTransferred { new_creator_id } => {
                LeaveOutcome::LeadershipTransferred { new_creator_id }
            }
            Departure::Disbanded => LeaveOutcome::Disbanded,
        };

        info!(operation_id = %operation_id, user_id = %user_id, ?outcome, "Member left");

        let (new_creator_id, disbanded) = match &outcome {
            LeaveOutcome::LeadershipTransferred { new_creator_id } => (Some(new_creator_id.clone()), false),
            LeaveOutcome::Disbanded => (None, true),
            LeaveOutcome::Left => (None, false),
        };

        if let Some(heir) = &new_creator_id {
            let notification = Notification::new(
                "Voce assumiu o comando",
                format!("Agora voce lidera a operacao {}", current.name),
            )
            .with_data(json!({ "operationId": operation_id, "type": "leadership_transferred" }));
            self.notify(vec![heir.clone()], notification).await;
        }

        self.publish(DomainEvent::MemberLeft {
            operation_id: operation_id.to_string(),
            user_id: user_id.to_string(),
            new_creator_id,
            disbanded,
        });

        Ok(outcome)
    }

    /// Delete an operation still in the lobby. Creator only.
    pub async fn cancel_operation(&self, operation_id: &str, caller_id: &str) -> Result<()> {
        let pool = self.db.pool();
        let lobby = self.load_operation(operation_id).await?;
        require_creator(&lobby, caller_id, "cancel")?;
        require_status(&lobby, OperationStatus::Inactive)?;

        let recipients: Vec<String> = member::member_ids(pool, operation_id)
            .await?
            .into_iter()
            .filter(|id| id != caller_id)
            .collect();

        if !operation::delete_inactive(pool, operation_id).await? {
            let current = self.load_operation(operation_id).await?;
            return Err(EngineError::WrongOperationStatus {
                expected: OperationStatus::Inactive.as_str(),
                actual: current.status.as_str(),
            });
        }

        info!(operation_id = %operation_id, "Operation cancelled");

        let notification = Notification::new(
            "Operacao cancelada",
            format!("A operacao {} foi cancelada pelo criador.", lobby.name),
        )
        .with_data(json!({ "operationId": operation_id, "type": "operation_cancelled" }));
        self.notify(recipients, notification).await;
        Ok(())
    }

    /// Members ranked by points, earliest joiner first on ties.
    pub async fn operation_roster(&self, operation_id: &str, viewer_id: &str) -> Result<Vec<Membership>> {
        self.load_operation(operation_id).await?;
        self.require_member(operation_id, viewer_id).await?;
        Ok(member::list_members(self.db.pool(), operation_id).await?)
    }

    /// Submitted evidence, newest first, with vote counts.
    pub async fn operation_feed(&self, operation_id: &str, viewer_id: &str) -> Result<Vec<FeedEntry>> {
        self.load_operation(operation_id).await?;
        self.require_member(operation_id, viewer_id).await?;
        Ok(assignment::list_feed(self.db.pool(), operation_id, self.policy.feed_limit).await?)
    }

    /// The caller's role in an operation, if any.
    pub async fn member_role(&self, operation_id: &str, user_id: &str) -> Result<Option<MemberRole>> {
        Ok(member::get_member(self.db.pool(), operation_id, user_id)
            .await?
            .map(|m| m.role))
    }
}

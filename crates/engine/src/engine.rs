//! The engine handle shared by every operation.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use database::{assignment, member, operation, AssignedMission, Database, Membership, Operation};
use dispatch::{DomainEvent, EventBus, Notification, Notifier};
use tracing::warn;

use crate::clock::{current_day, Clock, SystemClock};
use crate::error::{EngineError, Result};
use crate::invite::{InviteCodes, RandomInviteCodes};
use crate::policy::Policy;
use crate::storage::PhotoStorage;

/// Entry point for all game operations.
///
/// Cheap to clone; clones share the database pool and collaborators.
#[derive(Clone)]
pub struct Engine {
    pub(crate) db: Database,
    pub(crate) storage: Arc<dyn PhotoStorage>,
    pub(crate) notifier: Arc<dyn Notifier>,
    pub(crate) events: EventBus,
    pub(crate) clock: Arc<dyn Clock>,
    pub(crate) invite_codes: Arc<dyn InviteCodes>,
    pub(crate) policy: Policy,
}

impl Engine {
    /// Create an engine with the system clock, random invite codes, default
    /// policy and a fresh event bus.
    pub fn new(
        db: Database,
        storage: Arc<dyn PhotoStorage>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            db,
            storage,
            notifier,
            events: EventBus::default(),
            clock: Arc::new(SystemClock),
            invite_codes: Arc::new(RandomInviteCodes),
            policy: Policy::default(),
        }
    }

    pub fn with_policy(mut self, policy: Policy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_invite_codes(mut self, invite_codes: Arc<dyn InviteCodes>) -> Self {
        self.invite_codes = invite_codes;
        self
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    pub fn policy(&self) -> &Policy {
        &self.policy
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Day number of a running operation at the engine's current time.
    pub fn day_of(&self, operation: &Operation) -> u32 {
        match operation.started_at {
            Some(started_at) => current_day(
                started_at,
                operation.daily_reset_hour as u32,
                self.now(),
            ),
            None => 1,
        }
    }

    pub(crate) async fn load_operation(&self, operation_id: &str) -> Result<Operation> {
        Ok(operation::get_operation(self.db.pool(), operation_id).await?)
    }

    /// Load an assignment, treating one from another operation as missing.
    pub(crate) async fn load_assignment_in(
        &self,
        operation_id: &str,
        assigned_mission_id: &str,
    ) -> Result<AssignedMission> {
        let assigned = assignment::get_assignment(self.db.pool(), assigned_mission_id).await?;
        if assigned.operation_id != operation_id {
            return Err(EngineError::NotFound {
                entity: "AssignedMission",
                id: assigned_mission_id.to_string(),
            });
        }
        Ok(assigned)
    }

    pub(crate) async fn require_member(
        &self,
        operation_id: &str,
        user_id: &str,
    ) -> Result<Membership> {
        member::get_member(self.db.pool(), operation_id, user_id)
            .await?
            .ok_or(EngineError::NotMember)
    }

    /// Deliver a notification, logging instead of failing.
    pub(crate) async fn notify(&self, user_ids: Vec<String>, notification: Notification) {
        if user_ids.is_empty() {
            return;
        }
        if let Err(e) = self.notifier.notify(&user_ids, &notification).await {
            warn!(
                kind = notification.kind().unwrap_or("-"),
                recipients = user_ids.len(),
                "Notification failed: {}",
                e
            );
        }
    }

    /// Notify every member of an operation except `except`.
    pub(crate) async fn notify_members(
        &self,
        operation_id: &str,
        except: Option<&str>,
        notification: Notification,
    ) {
        match member::member_ids(self.db.pool(), operation_id).await {
            Ok(ids) => {
                let recipients = ids
                    .into_iter()
                    .filter(|id| Some(id.as_str()) != except)
                    .collect();
                self.notify(recipients, notification).await;
            }
            Err(e) => warn!(operation_id = %operation_id, "Could not load recipients: {}", e),
        }
    }

    pub(crate) fn publish(&self, event: DomainEvent) {
        self.events.publish(event);
    }
}

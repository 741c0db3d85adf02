//! In-process domain event bus.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Default number of events buffered per subscriber.
const DEFAULT_CAPACITY: usize = 256;

/// Something that happened to an operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DomainEvent {
    MemberJoined {
        operation_id: String,
        user_id: String,
    },
    MemberLeft {
        operation_id: String,
        user_id: String,
        /// Set when the creator left and leadership moved.
        new_creator_id: Option<String>,
        disbanded: bool,
    },
    OperationStarted {
        operation_id: String,
    },
    MissionSubmitted {
        operation_id: String,
        assigned_mission_id: String,
        user_id: String,
    },
    VoteScored {
        operation_id: String,
        assigned_mission_id: String,
        approved: bool,
        points: i64,
    },
    OperationCompleted {
        operation_id: String,
    },
}

impl DomainEvent {
    pub fn operation_id(&self) -> &str {
        match self {
            DomainEvent::MemberJoined { operation_id, .. }
            | DomainEvent::MemberLeft { operation_id, .. }
            | DomainEvent::OperationStarted { operation_id }
            | DomainEvent::MissionSubmitted { operation_id, .. }
            | DomainEvent::VoteScored { operation_id, .. }
            | DomainEvent::OperationCompleted { operation_id } => operation_id,
        }
    }

    /// Event name as used on the wire.
    pub fn name(&self) -> &'static str {
        match self {
            DomainEvent::MemberJoined { .. } => "member_joined",
            DomainEvent::MemberLeft { .. } => "member_left",
            DomainEvent::OperationStarted { .. } => "operation_started",
            DomainEvent::MissionSubmitted { .. } => "mission_submitted",
            DomainEvent::VoteScored { .. } => "vote_scored",
            DomainEvent::OperationCompleted { .. } => "operation_completed",
        }
    }
}

/// Fan-out of domain events to any number of subscribers.
///
/// Publishing never blocks; subscribers that fall behind lose the oldest
/// events and see a `Lagged` error on their receiver.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<DomainEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Publish an event. Returns how many subscribers received it.
    pub fn publish(&self, event: DomainEvent) -> usize {
        tracing::debug!(event = event.name(), operation_id = %event.operation_id(), "Publishing event");
        self.sender.send(event).unwrap_or(0)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<DomainEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

//! Notification delivery and domain events for Sombra.
//!
//! The game core never waits on delivery: notifications are best-effort and
//! domain events are fanned out to whoever is subscribed at the time.
//!
//! # Example
//!
//! ```no_run
//! use dispatch::{LoggingNotifier, Notification, Notifier};
//!
//! # async fn example() -> Result<(), dispatch::DispatchError> {
//! let notifier = LoggingNotifier;
//! let notification = Notification::new("Nova evidencia", "Confira o feed da operacao")
//!     .with_data(serde_json::json!({ "operationId": "op-1" }));
//!
//! notifier.notify(&["user-1".to_string()], &notification).await?;
//! # Ok(())
//! # }
//! ```

mod error;
mod events;
mod notifier;
mod push;

pub use error::DispatchError;
pub use events::{DomainEvent, EventBus};
pub use notifier::{LoggingNotifier, NoOpNotifier, Notification, Notifier, RecordingNotifier};
pub use push::{PushRelayConfig, PushRelayNotifier};


//! Notifier trait and in-process implementations.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::DispatchError;

/// A push notification addressed to one or more users.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub title: String,
    pub body: String,
    /// Opaque payload the client uses to route the tap.
    #[serde(default)]
    pub data: serde_json::Value,
}

impl Notification {
    pub fn new(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
            data: serde_json::Value::Object(Default::default()),
        }
    }

    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = data;
        self
    }

    /// The `type` field of the payload, if any.
    pub fn kind(&self) -> Option<&str> {
        self.data.get("type").and_then(|v| v.as_str())
    }
}

/// Trait for delivering notifications to users.
///
/// Abstracted to support different transports (push relay, logs, tests).
/// Callers treat delivery as fire-and-forget and only log errors.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver a notification to every user in `user_ids`.
    async fn notify(
        &self,
        user_ids: &[String],
        notification: &Notification,
    ) -> Result<(), DispatchError>;
}

#[async_trait]
impl<T: Notifier + ?Sized> Notifier for Arc<T> {
    async fn notify(
        &self,
        user_ids: &[String],
        notification: &Notification,
    ) -> Result<(), DispatchError> {
        (**self).notify(user_ids, notification).await
    }
}

/// A no-op notifier that discards all notifications.
#[derive(Debug, Clone, Default)]
pub struct NoOpNotifier;

#[async_trait]
impl Notifier for NoOpNotifier {
    async fn notify(
        &self,
        _user_ids: &[String],
        _notification: &Notification,
    ) -> Result<(), DispatchError> {
        Ok(())
    }
}

/// A notifier that only logs what it would deliver.
#[derive(Debug, Clone, Default)]
pub struct LoggingNotifier;

#[async_trait]
impl Notifier for LoggingNotifier {
    async fn notify(
        &self,
        user_ids: &[String],
        notification: &Notification,
    ) -> Result<(), DispatchError> {
        tracing::info!(
            recipients = user_ids.len(),
            kind = notification.kind().unwrap_or("-"),
            "Notify {:?}: {} - {}",
            user_ids,
            notification.title,
            notification.body
        );
        Ok(())
    }
}

/// A notifier that keeps every delivery in memory.
///
/// Clones share the same log, so a test can hand one clone to the code
/// under test and inspect the other.
#[derive(Debug, Clone, Default)]
pub struct RecordingNotifier {
    sent: Arc<Mutex<Vec<(Vec<String>, Notification)>>>,
    failing: Arc<AtomicBool>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent deliveries fail (after being recorded).
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Every delivery so far, oldest first.
    pub fn sent(&self) -> Vec<(Vec<String>, Notification)> {
        self.sent.lock().map(|s| s.clone()).unwrap_or_default()
    }

    /// Deliveries whose payload `type` equals `kind`.
    pub fn sent_of_kind(&self, kind: &str) -> Vec<(Vec<String>, Notification)> {
        self.sent()
            .into_iter()
            .filter(|(_, n)| n.kind() == Some(kind))
            .collect()
    }

    pub fn clear(&self) {
        if let Ok(mut sent) = self.sent.lock() {
            sent.clear();
        }
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(
        &self,
        user_ids: &[String],
        notification: &Notification,
    ) -> Result<(), DispatchError> {
        if let Ok(mut sent) = self.sent.lock() {
            sent.push((user_ids.to_vec(), notification.clone()));
        }
        if self.failing.load(Ordering::SeqCst) {
            return Err(DispatchError::Failed("recording notifier set to fail".to_string()));
        }
        Ok(())
    }
}

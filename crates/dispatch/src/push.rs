//! Push relay client.
//!
//! The relay owns device subscriptions; this side only says who should be
//! notified and with what.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use tracing::{debug, warn};

use crate::error::DispatchError;
use crate::notifier::{Notification, Notifier};

/// Default request timeout for the relay.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Configuration for [`PushRelayNotifier`].
#[derive(Debug, Clone)]
pub struct PushRelayConfig {
    /// Endpoint receiving `POST` notification requests.
    pub url: String,
    /// Bearer token sent with every request.
    pub token: Option<String>,
    pub timeout: Duration,
}

impl PushRelayConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            token: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Request body understood by the relay.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PushRequest<'a> {
    user_ids: &'a [String],
    title: &'a str,
    body: &'a str,
    data: &'a serde_json::Value,
}

/// Delivers notifications through an HTTP push relay.
#[derive(Clone)]
pub struct PushRelayNotifier {
    http: Client,
    config: PushRelayConfig,
}

impl PushRelayNotifier {
    pub fn new(config: PushRelayConfig) -> Result<Self, DispatchError> {
        if config.url.trim().is_empty() {
            return Err(DispatchError::Config("push relay URL is empty".to_string()));
        }

        let http = Client::builder().timeout(config.timeout).build()?;
        Ok(Self { http, config })
    }

    pub fn config(&self) -> &PushRelayConfig {
        &self.config
    }
}

#[async_trait]
impl Notifier for PushRelayNotifier {
    async fn notify(
        &self,
        user_ids: &[String],
        notification: &Notification,
    ) -> Result<(), DispatchError> {
        if user_ids.is_empty() {
            return Ok(());
        }

        let payload = PushRequest {
            user_ids,
            title: &notification.title,
            body: &notification.body,
            data: &notification.data,
        };

        let mut request = self.http.post(&self.config.url).json(&payload);
        if let Some(token) = &self.config.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), "Push relay rejected notification");
            return Err(DispatchError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        debug!(recipients = user_ids.len(), "Push relay accepted notification");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::post;
    use axum::{Json, Router};
    use std::sync::{Arc, Mutex};

    type Captured = Arc<Mutex<Vec<(Option<String>, serde_json::Value)>>>;

    async fn spawn_relay(status: StatusCode) -> (String, Captured) {
        let captured: Captured = Arc::default();
        let sink = captured.clone();
        let app = Router::new().route(
            "/push",
            post(move |headers: HeaderMap, Json(body): Json<serde_json::Value>| {
                let sink = sink.clone();
                async move {
                    let auth = headers
                        .get("authorization")
                        .and_then(|v| v.to_str().ok())
                        .map(str::to_string);
                    sink.lock().unwrap().push((auth, body));
                    status
                }
            }),
        );

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        (format!("http://{}/push", addr), captured)
    }

    #[test]
    fn test_empty_url_rejected() {
        let result = PushRelayNotifier::new(PushRelayConfig::new("  "));
        assert!(matches!(result, Err(DispatchError::Config(_))));
    }

    #[tokio::test]
    async fn test_posts_payload_with_bearer() {
        let (url, captured) = spawn_relay(StatusCode::OK).await;
        let notifier = PushRelayNotifier::new(PushRelayConfig::new(url).with_token("secret")).unwrap();

        let notification = Notification::new("Missao aprovada", "+20 pontos")
            .with_data(serde_json::json!({ "type": "vote_result", "operationId": "op1" }));
        notifier
            .notify(&["u1".to_string(), "u2".to_string()], &notification)
            .await
            .unwrap();

        let captured = captured.lock().unwrap();
        assert_eq!(captured.len(), 1);
        let (auth, body) = &captured[0];
        assert_eq!(auth.as_deref(), Some("Bearer secret"));
        assert_eq!(body["userIds"], serde_json::json!(["u1", "u2"]));
        assert_eq!(body["title"], "Missao aprovada");
        assert_eq!(body["body"], "+20 pontos");
        assert_eq!(body["data"]["operationId"], "op1");
    }

    #[tokio::test]
    async fn test_error_status_is_reported() {
        let (url, _captured) = spawn_relay(StatusCode::INTERNAL_SERVER_ERROR).await;
        let notifier = PushRelayNotifier::new(PushRelayConfig::new(url)).unwrap();

        let result = notifier
            .notify(&["u1".to_string()], &Notification::new("t", "b"))
            .await;
        assert!(matches!(result, Err(DispatchError::Rejected { status: 500, .. })));
    }

    #[tokio::test]
    async fn test_no_recipients_skips_request() {
        let (url, captured) = spawn_relay(StatusCode::OK).await;
        let notifier = PushRelayNotifier::new(PushRelayConfig::new(url)).unwrap();

        notifier.notify(&[], &Notification::new("t", "b")).await.unwrap();
        assert!(captured.lock().unwrap().is_empty());
    }
}

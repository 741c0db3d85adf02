//! Route handlers for the HTTP API.

pub mod events;
pub mod health;
pub mod jobs;
pub mod missions;
pub mod operations;
pub mod review;

use axum::extract::DefaultBodyLimit;
use axum::routing::{delete, get, post};
use axum::Router;

use crate::state::AppState;

/// Build the router with all routes.
pub fn router() -> Router<AppState> {
    Router::new()
        // Health check
        .route("/health", get(health::health))
        // Lifecycle
        .route("/operations", post(operations::create))
        .route("/operations/join", post(operations::join))
        .route("/operations/:id", delete(operations::cancel))
        .route("/operations/:id/start", post(operations::start))
        .route("/operations/:id/leave", post(operations::leave))
        .route("/operations/:id/ranking", get(operations::ranking))
        .route("/operations/:id/feed", get(operations::feed))
        .route("/operations/:id/events", get(events::stream))
        // Daily missions
        .route("/operations/:id/missions", get(missions::today))
        .route("/operations/:id/missions/select", post(missions::select))
        .route(
            "/operations/:id/missions/submit",
            post(missions::submit).layer(DefaultBodyLimit::max(missions::MAX_PHOTO_BYTES)),
        )
        // Review
        .route("/operations/:id/vote", post(review::vote))
        .route("/operations/:id/react", post(review::react))
        .route("/operations/:id/favorite", post(review::favorite))
        // Scheduled jobs
        .route("/jobs/complete-operations", post(jobs::complete_operations))
        .route("/jobs/cleanup-operations", post(jobs::cleanup_operations))
        .route("/jobs/notify-daily-reset", post(jobs::notify_daily_reset))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use database::Database;
    use dispatch::RecordingNotifier;
    use engine::{Engine, MemoryPhotoStorage};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::*;

    async fn app(job_token: Option<&str>) -> Router {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        db.migrate().await.unwrap();
        let engine = Engine::new(
            db,
            Arc::new(MemoryPhotoStorage::new()),
            Arc::new(RecordingNotifier::new()),
        );
        engine.seed_default_catalog().await.unwrap();
        router().with_state(AppState::new(engine, job_token.map(str::to_string)))
    }

    fn request(method: &str, uri: &str, user: Option<&str>, body: Option<Value>) -> Request<Body> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(user) = user {
            builder = builder.header("x-user-id", user);
        }
        match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        }
    }

    async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
        let response = app.clone().oneshot(req).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }

    async fn create(app: &Router, user: &str) -> Value {
        let (status, body) = send(
            app,
            request(
                "POST",
                "/operations",
                Some(user),
                Some(json!({ "name": "Sombra Sul", "duration_days": 7, "daily_reset_hour": 0 })),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        body
    }

    #[tokio::test]
    async fn test_health() {
        let app = app(None).await;
        let (status, body) = send(&app, request("GET", "/health", None, None)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn test_requires_user_header() {
        let app = app(None).await;
        let (status, body) = send(
            &app,
            request("POST", "/operations/join", None, Some(json!({ "invite_code": "ABCDEF" }))),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn test_lifecycle_over_http() {
        let app = app(None).await;
        let op = create(&app, "alice").await;
        let id = op["id"].as_str().unwrap().to_string();
        let code = op["invite_code"].as_str().unwrap().to_string();

        for user in ["bob", "carol"] {
            let (status, body) = send(
                &app,
                request("POST", "/operations/join", Some(user), Some(json!({ "invite_code": code }))),
            )
            .await;
            assert_eq!(status, StatusCode::OK);
            assert_eq!(body["already_member"], false);
        }

        let (status, _) = send(
            &app,
            request("POST", &format!("/operations/{}/start", id), Some("bob"), None),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        let (status, body) = send(
            &app,
            request("POST", &format!("/operations/{}/start", id), Some("alice"), None),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "active");

        let (status, today) = send(
            &app,
            request("GET", &format!("/operations/{}/missions", id), Some("bob"), None),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(today["day_number"], 1);
        let mission_id = today["missions"][0]["id"].as_str().unwrap().to_string();

        let select = |user: &'static str| {
            request(
                "POST",
                &format!("/operations/{}/missions/select", id),
                Some(user),
                Some(json!({ "mission_id": mission_id })),
            )
        };
        let (status, _) = send(&app, select("bob")).await;
        assert_eq!(status, StatusCode::CREATED);
        let (status, _) = send(&app, select("bob")).await;
        assert_eq!(status, StatusCode::CONFLICT);

        let (status, ranking) = send(
            &app,
            request("GET", &format!("/operations/{}/ranking", id), Some("carol"), None),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(ranking.as_array().unwrap().len(), 3);

        let (status, body) = send(
            &app,
            request("POST", &format!("/operations/{}/leave", id), Some("carol"), None),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["outcome"], "left");

        let (status, _) = send(
            &app,
            request("GET", &format!("/operations/{}/feed", id), Some("carol"), None),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_submit_and_vote_over_http() {
        let app = app(None).await;
        let op = create(&app, "alice").await;
        let id = op["id"].as_str().unwrap().to_string();
        let code = op["invite_code"].as_str().unwrap().to_string();
        for user in ["bob", "carol"] {
            send(
                &app,
                request("POST", "/operations/join", Some(user), Some(json!({ "invite_code": code }))),
            )
            .await;
        }
        send(&app, request("POST", &format!("/operations/{}/start", id), Some("alice"), None)).await;

        let (_, today) = send(
            &app,
            request("GET", &format!("/operations/{}/missions", id), Some("alice"), None),
        )
        .await;
        let mission_id = today["missions"][0]["id"].as_str().unwrap();
        let (_, assigned) = send(
            &app,
            request(
                "POST",
                &format!("/operations/{}/missions/select", id),
                Some("alice"),
                Some(json!({ "mission_id": mission_id })),
            ),
        )
        .await;
        let assigned_id = assigned["id"].as_str().unwrap().to_string();

        let boundary = "sombra-boundary";
        let multipart = format!(
            "--{b}\r\nContent-Disposition: form-data; name=\"assigned_mission_id\"\r\n\r\n{id}\r\n\
             --{b}\r\nContent-Disposition: form-data; name=\"caption\"\r\n\r\nfeito\r\n\
             --{b}\r\nContent-Disposition: form-data; name=\"photo\"; filename=\"shot.png\"\r\n\
             Content-Type: image/png\r\n\r\nPNGDATA\r\n--{b}--\r\n",
            b = boundary,
            id = assigned_id,
        );
        let req = Request::builder()
            .method("POST")
            .uri(format!("/operations/{}/missions/submit", id))
            .header("x-user-id", "alice")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={}", boundary),
            )
            .body(Body::from(multipart))
            .unwrap();
        let (status, receipt) = send(&app, req).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            receipt["photo_url"],
            format!("memory://alice/{}.png", assigned_id)
        );

        let vote = |user: &'static str, value: &str| {
            request(
                "POST",
                &format!("/operations/{}/vote", id),
                Some(user),
                Some(json!({ "assigned_mission_id": assigned_id, "vote": value })),
            )
        };
        let (status, _) = send(&app, vote("alice", "approve")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) = send(&app, vote("bob", "approve")).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["decided"].is_null());
        let (_, body) = send(&app, vote("carol", "approve")).await;
        assert_eq!(body["decided"], "approved");

        let (status, body) = send(
            &app,
            request(
                "POST",
                &format!("/operations/{}/react", id),
                Some("bob"),
                Some(json!({ "assigned_mission_id": assigned_id, "reaction_type": "creative" })),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["action"], "added");
    }

    #[tokio::test]
    async fn test_cancel_and_missing_operation() {
        let app = app(None).await;
        let op = create(&app, "alice").await;
        let id = op["id"].as_str().unwrap().to_string();

        let (status, _) = send(&app, request("DELETE", &format!("/operations/{}", id), Some("alice"), None)).await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (status, _) = send(&app, request("DELETE", &format!("/operations/{}", id), Some("alice"), None)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_jobs_require_token() {
        let app = app(Some("s3cret")).await;

        let (status, _) = send(&app, request("POST", "/jobs/complete-operations", None, None)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        for path in [
            "/jobs/complete-operations",
            "/jobs/cleanup-operations",
            "/jobs/notify-daily-reset",
        ] {
            let req = Request::builder()
                .method("POST")
                .uri(path)
                .header(header::AUTHORIZATION, "Bearer s3cret")
                .body(Body::empty())
                .unwrap();
            let (status, body) = send(&app, req).await;
            assert_eq!(status, StatusCode::OK, "{}", path);
            assert!(body.is_object());
        }
    }
}

//! Server-sent stream of an operation's domain events.

use std::convert::Infallible;

use axum::extract::{Path, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use engine::EngineError;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::{Stream, StreamExt};
use tracing::{debug, warn};

use crate::auth::UserId;
use crate::error::Result;
use crate::state::AppState;

pub async fn stream(
    State(state): State<AppState>,
    UserId(user_id): UserId,
    Path(operation_id): Path<String>,
) -> Result<Sse<impl Stream<Item = std::result::Result<Event, Infallible>>>> {
    if state
        .engine
        .member_role(&operation_id, &user_id)
        .await?
        .is_none()
    {
        return Err(EngineError::NotMember.into());
    }

    debug!(operation_id = %operation_id, user_id = %user_id, "Event stream opened");

    let events = BroadcastStream::new(state.engine.events().subscribe()).filter_map(move |item| {
        let event = match item {
            Ok(event) => event,
            Err(e) => {
                warn!("Event stream lagged: {}", e);
                return None;
            }
        };
        if event.operation_id() != operation_id {
            return None;
        }
        match Event::default().event(event.name()).json_data(&event) {
            Ok(sse) => Some(Ok(sse)),
            Err(e) => {
                warn!("Could not encode event: {}", e);
                None
            }
        }
    });

    Ok(Sse::new(events).keep_alive(KeepAlive::default()))
}

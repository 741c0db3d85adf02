//! Application state shared across handlers.

use engine::Engine;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub engine: Engine,
    /// Bearer token for the /jobs routes. `None` leaves them open.
    pub job_token: Option<String>,
}

impl AppState {
    /// Create new application state.
    pub fn new(engine: Engine, job_token: Option<String>) -> Self {
        Self { engine, job_token }
    }
}

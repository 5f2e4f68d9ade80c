use tracing::warn;

use crate::{dto::health::HealthResponse, state::SharedState};

/// Respond with a static health payload while logging connectivity issues.
///
/// A failing ping is worth a log line but not a failing probe: the game keeps
/// running on its in-memory sessions while the store recovers.
pub async fn health_status(state: &SharedState) -> HealthResponse {
    if let Err(err) = state.store().health_check().await {
        warn!(error = %err, "storage health check failed");
    }
    HealthResponse::ok()
}

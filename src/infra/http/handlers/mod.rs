pub mod media;
pub mod posts;

use axum::extract::State;
use axum::http::StatusCode;

use crate::infra::http::AppState;
use crate::infra::http::error::ApiError;

/// Liveness and readiness probe. With a database backend this round-trips a
/// trivial query; the file backend only reports that the process is up.
pub async fn healthz(State(state): State<AppState>) -> Result<StatusCode, ApiError> {
    if let Some(db) = &state.db {
        db.health_check().await.map_err(|err| {
            crate::application::store::StoreError::unavailable(format!(
                "database health check failed: {err}"
            ))
        })?;
    }
    Ok(StatusCode::NO_CONTENT)
}

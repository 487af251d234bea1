use std::sync::Arc;

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::actor::Actor;
use crate::state::AppState;

/// Set by the auth gateway in front of this service once the caller's token is verified.
pub const USER_ID_HEADER: &str = "x-user-id";

#[async_trait]
impl FromRequestParts<Arc<AppState>> for Actor {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let id = parts
            .headers
            .get(USER_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .and_then(|raw| Uuid::parse_str(raw.trim()).ok())
            .ok_or(AppError::Unauthenticated)?;

        state
            .actors
            .find_actor(id)
            .await?
            .ok_or(AppError::Unauthenticated)
    }
}

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::patch;
use axum::Json;
use axum::Router;
use tracing::info;
use uuid::Uuid;

use crate::error::{AppError, NotFoundError};
use crate::models::actor::Actor;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/admin/users/:id/ban", patch(ban_user))
        .route("/admin/users/:id/unban", patch(unban_user))
}

async fn ban_user(
    State(state): State<Arc<AppState>>,
    admin: Actor,
    Path(id): Path<Uuid>,
) -> Result<Json<Actor>, AppError> {
    set_banned(&state, &admin, id, true).await
}

async fn unban_user(
    State(state): State<Arc<AppState>>,
    admin: Actor,
    Path(id): Path<Uuid>,
) -> Result<Json<Actor>, AppError> {
    set_banned(&state, &admin, id, false).await
}

async fn set_banned(
    state: &AppState,
    admin: &Actor,
    id: Uuid,
    banned: bool,
) -> Result<Json<Actor>, AppError> {
    admin.require_admin()?;

    if state.actors.set_banned(id, banned).await? == 0 {
        return Err(NotFoundError::ActorNotFound(id).into());
    }

    let actor = state
        .actors
        .find_actor(id)
        .await?
        .ok_or(NotFoundError::ActorNotFound(id))?;

    info!(user_id = %id, admin_id = %admin.id, banned, "ban flag updated");
    Ok(Json(actor))
}

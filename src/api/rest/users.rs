use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::routing::{get, post};
use axum::Json;
use axum::Router;
use chrono::Utc;
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use crate::error::{AppError, ValidationError};
use crate::models::actor::Actor;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/users", post(register_user))
        .route("/users/me", get(current_user))
}

#[derive(Deserialize)]
pub struct RegisterUserRequest {
    pub name: String,
    #[serde(default)]
    pub is_courier: bool,
}

async fn register_user(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<RegisterUserRequest>, JsonRejection>,
) -> Result<Json<Actor>, AppError> {
    let Json(payload) = payload?;

    let name = payload.name.trim();
    if name.is_empty() {
        return Err(ValidationError::InvalidRequest("name cannot be empty".to_string()).into());
    }

    let actor = Actor {
        id: Uuid::new_v4(),
        name: name.to_string(),
        is_admin: false,
        is_courier: payload.is_courier,
        is_banned: false,
        created_at: Utc::now(),
    };

    state.actors.register(&actor).await?;
    info!(user_id = %actor.id, is_courier = actor.is_courier, "user registered");

    Ok(Json(actor))
}

async fn current_user(actor: Actor) -> Json<Actor> {
    Json(actor)
}

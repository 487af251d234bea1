use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::routing::post;
use axum::Json;
use axum::Router;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::models::actor::Actor;
use crate::models::geo::GeoPoint;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/price/estimate", post(estimate_price))
}

#[derive(Deserialize)]
pub struct EstimateRequest {
    pub type_id: i32,
    pub origin: GeoPoint,
    pub destination: GeoPoint,
    #[serde(default)]
    pub has_load_assist: bool,
}

#[derive(Serialize)]
pub struct EstimateResponse {
    pub price: Decimal,
}

async fn estimate_price(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    payload: Result<Json<EstimateRequest>, JsonRejection>,
) -> Result<Json<EstimateResponse>, AppError> {
    actor.require_active()?;
    let Json(payload) = payload?;

    let price = state
        .orchestrator
        .estimate(
            payload.type_id,
            payload.origin,
            payload.destination,
            payload.has_load_assist,
        )
        .await?;

    Ok(Json(EstimateResponse { price }))
}

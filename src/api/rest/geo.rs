use std::sync::Arc;

use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::routing::get;
use axum::Json;
use axum::Router;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, NotFoundError, ValidationError};
use crate::models::actor::Actor;
use crate::models::geo::GeoPoint;
use crate::state::AppState;
use crate::upstream::{with_deadline, UpstreamError};

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/geo/coords", get(coordinates_for_address))
        .route("/geo/address", get(address_for_coordinates))
}

#[derive(Deserialize)]
pub struct CoordinatesQuery {
    #[serde(default)]
    pub q: String,
}

#[derive(Deserialize)]
pub struct AddressQuery {
    pub lat: f64,
    pub lon: f64,
}

#[derive(Serialize)]
pub struct AddressResponse {
    pub address: String,
}

fn geocoding_error(err: UpstreamError) -> AppError {
    match err {
        UpstreamError::NotFound => NotFoundError::AddressNotFound.into(),
        UpstreamError::EmptyQuery => ValidationError::EmptyQuery.into(),
        UpstreamError::ZeroCoordinate => ValidationError::ZeroCoordinate { field: "point" }.into(),
        other => AppError::GeocodingFailed(other),
    }
}

async fn coordinates_for_address(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    query: Result<Query<CoordinatesQuery>, QueryRejection>,
) -> Result<Json<GeoPoint>, AppError> {
    actor.require_active()?;
    let Query(query) = query?;

    let point = with_deadline(
        state.upstream_timeout,
        state.geo.resolve_coordinates(query.q.trim()),
    )
    .await
    .map_err(geocoding_error)?;

    Ok(Json(point))
}

async fn address_for_coordinates(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    query: Result<Query<AddressQuery>, QueryRejection>,
) -> Result<Json<AddressResponse>, AppError> {
    actor.require_active()?;
    let Query(query) = query?;

    let address = with_deadline(
        state.upstream_timeout,
        state.geo.resolve_address(GeoPoint::new(query.lat, query.lon)),
    )
    .await
    .map_err(geocoding_error)?;

    Ok(Json(AddressResponse { address }))
}

use std::sync::Arc;
use std::time::Instant;

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::routing::{get, patch, post};
use axum::Json;
use axum::Router;
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use crate::engine::orchestrator::CreateDelivery;
use crate::engine::rate_limit::Admission;
use crate::error::{AppError, AuthorizationError, NotFoundError, ValidationError};
use crate::models::actor::Actor;
use crate::models::delivery::{Delivery, DeliveryStatus};
use crate::models::geo::GeoPoint;
use crate::state::AppState;
use crate::store::Page;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/delivery", post(create_delivery))
        .route("/delivery/my", get(list_own_deliveries))
        .route("/delivery/search", get(search_deliveries))
        .route("/delivery/:id", get(get_delivery))
        .route("/delivery/:id/accept", patch(accept_delivery))
        .route("/delivery/:id/status", patch(change_delivery_status))
        .route("/delivery/:id/cancel", patch(cancel_delivery))
}

#[derive(Deserialize)]
pub struct CreateDeliveryRequest {
    pub type_id: i32,
    pub origin: GeoPoint,
    pub destination: GeoPoint,
    #[serde(default)]
    pub has_load_assist: bool,
}

#[derive(Deserialize)]
pub struct PageQuery {
    #[serde(default = "first_page")]
    pub page: u32,
}

#[derive(Deserialize)]
pub struct SearchQuery {
    pub lat: f64,
    pub lon: f64,
    #[serde(default = "first_page")]
    pub page: u32,
}

#[derive(Deserialize)]
pub struct ChangeStatusRequest {
    pub status_id: i32,
}

fn first_page() -> u32 {
    1
}

fn outcome_label<T>(result: &Result<T, AppError>) -> &'static str {
    match result {
        Ok(_) => "success",
        Err(err) => err.reason(),
    }
}

async fn create_delivery(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    payload: Result<Json<CreateDeliveryRequest>, JsonRejection>,
) -> Result<Json<Delivery>, AppError> {
    let Json(payload) = payload?;
    actor.require_active()?;

    if state.rate_limiter.admit(actor.id).await == Admission::Denied {
        state.metrics.rate_limited_total.inc();
        return Err(AuthorizationError::RateLimited.into());
    }

    let started = Instant::now();
    let result = state
        .orchestrator
        .create(CreateDelivery {
            client_id: actor.id,
            type_id: payload.type_id,
            origin: payload.origin,
            destination: payload.destination,
            has_load_assist: payload.has_load_assist,
        })
        .await;

    let outcome = if result.is_ok() { "success" } else { "error" };
    state
        .metrics
        .record_creation(outcome, started.elapsed().as_secs_f64());

    let delivery = result?;
    info!(
        order_id = %delivery.id,
        client_id = %delivery.client_id,
        price = %delivery.price,
        distance_meters = delivery.geo.distance_meters,
        "delivery created"
    );

    Ok(Json(delivery))
}

async fn get_delivery(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Path(id): Path<Uuid>,
) -> Result<Json<Delivery>, AppError> {
    let delivery = state
        .orders
        .find(id)
        .await?
        .ok_or(NotFoundError::DeliveryNotFound(id))?;

    // open offers are visible to every courier so they can decide whether to accept
    let visible = actor.is_admin
        || delivery.client_id == actor.id
        || delivery.courier_id == Some(actor.id)
        || (actor.is_courier && delivery.status == DeliveryStatus::Proposed);

    if !visible {
        return Err(AuthorizationError::NotOwner.into());
    }

    Ok(Json(delivery))
}

async fn list_own_deliveries(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    query: Result<Query<PageQuery>, QueryRejection>,
) -> Result<Json<Vec<Delivery>>, AppError> {
    let Query(query) = query?;
    let page = Page::new(query.page, state.page_size)?;

    let deliveries = state.orders.list_for_client(actor.id, page).await?;
    Ok(Json(deliveries))
}

async fn search_deliveries(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    query: Result<Query<SearchQuery>, QueryRejection>,
) -> Result<Json<Vec<Delivery>>, AppError> {
    let Query(query) = query?;
    actor.require_active()?;
    actor.require_courier()?;

    let deliveries = state
        .proximity
        .search(query.lat, query.lon, query.page)
        .await?;

    Ok(Json(deliveries))
}

async fn accept_delivery(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Path(id): Path<Uuid>,
) -> Result<Json<Delivery>, AppError> {
    let result = state.lifecycle.accept(&actor, id).await;
    state
        .metrics
        .record_transition("accept", outcome_label(&result));

    let delivery = result?;
    info!(order_id = %delivery.id, courier_id = %actor.id, "delivery accepted");
    Ok(Json(delivery))
}

async fn change_delivery_status(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Path(id): Path<Uuid>,
    payload: Result<Json<ChangeStatusRequest>, JsonRejection>,
) -> Result<Json<Delivery>, AppError> {
    let Json(payload) = payload?;
    let status = DeliveryStatus::from_id(payload.status_id)
        .ok_or(ValidationError::InvalidStatus(payload.status_id))?;

    let result = state.lifecycle.change_status(&actor, id, status).await;
    state
        .metrics
        .record_transition("status", outcome_label(&result));

    let delivery = result?;
    info!(order_id = %delivery.id, status = ?delivery.status, "delivery status changed");
    Ok(Json(delivery))
}

async fn cancel_delivery(
    State(state): State<Arc<AppState>>,
    actor: Actor,
    Path(id): Path<Uuid>,
) -> Result<Json<Delivery>, AppError> {
    let result = state.lifecycle.cancel(&actor, id).await;
    state
        .metrics
        .record_transition("cancel", outcome_label(&result));

    let delivery = result?;
    info!(order_id = %delivery.id, client_id = %actor.id, "delivery cancelled");
    Ok(Json(delivery))
}

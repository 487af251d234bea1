use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;
use uuid::Uuid;

use crate::models::delivery::DeliveryStatus;
use crate::store::StoreError;
use crate::upstream::UpstreamError;

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("{field} coordinates must be non-zero")]
    ZeroCoordinate { field: &'static str },

    #[error("type id {0} is outside 1..=5")]
    InvalidTypeId(i32),

    #[error("page must be at least 1")]
    InvalidPage,

    #[error("unknown status id {0}")]
    InvalidStatus(i32),

    #[error("cannot move delivery from {from:?} to {to:?}")]
    InvalidStatusTransition {
        from: DeliveryStatus,
        to: DeliveryStatus,
    },

    #[error("query must not be empty")]
    EmptyQuery,

    #[error("{0}")]
    InvalidRequest(String),
}

impl ValidationError {
    pub fn reason(&self) -> &'static str {
        match self {
            ValidationError::ZeroCoordinate { .. } => "zero_coordinate",
            ValidationError::InvalidTypeId(_) => "invalid_type_id",
            ValidationError::InvalidPage => "invalid_page",
            ValidationError::InvalidStatus(_) => "invalid_status",
            ValidationError::InvalidStatusTransition { .. } => "invalid_status_transition",
            ValidationError::EmptyQuery => "empty_query",
            ValidationError::InvalidRequest(_) => "invalid_request",
        }
    }
}

#[derive(Debug, Error)]
pub enum AuthorizationError {
    #[error("actor is not the client who created this delivery")]
    NotOwner,

    #[error("actor is not the courier performing this delivery")]
    NotPerformer,

    #[error("courier already performs an accepted delivery")]
    ConcurrentAcceptLimitExceeded,

    #[error("courier role required")]
    CourierRequired,

    #[error("administrator role required")]
    AdminRequired,

    #[error("account is banned")]
    Banned,

    #[error("too many delivery requests, retry later")]
    RateLimited,
}

impl AuthorizationError {
    pub fn reason(&self) -> &'static str {
        match self {
            AuthorizationError::NotOwner => "not_owner",
            AuthorizationError::NotPerformer => "not_performer",
            AuthorizationError::ConcurrentAcceptLimitExceeded => "concurrent_accept_limit_exceeded",
            AuthorizationError::CourierRequired => "courier_required",
            AuthorizationError::AdminRequired => "admin_required",
            AuthorizationError::Banned => "banned",
            AuthorizationError::RateLimited => "rate_limited",
        }
    }
}

#[derive(Debug, Error)]
pub enum NotFoundError {
    #[error("no deliveries found")]
    ResultsNotFound,

    #[error("delivery {0} not found")]
    DeliveryNotFound(Uuid),

    #[error("user {0} not found")]
    ActorNotFound(Uuid),

    #[error("no address matches the query")]
    AddressNotFound,
}

impl NotFoundError {
    pub fn reason(&self) -> &'static str {
        match self {
            NotFoundError::ResultsNotFound => "results_not_found",
            NotFoundError::DeliveryNotFound(_) => "delivery_not_found",
            NotFoundError::ActorNotFound(_) => "actor_not_found",
            NotFoundError::AddressNotFound => "address_not_found",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Upstream,
    Persistence,
    Authorization,
    NotFound,
    Authentication,
    Internal,
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("origin address resolution failed: {0}")]
    OriginResolutionFailed(#[source] UpstreamError),

    #[error("destination address resolution failed: {0}")]
    DestinationResolutionFailed(#[source] UpstreamError),

    #[error("distance computation failed: {0}")]
    DistanceComputationFailed(#[source] UpstreamError),

    #[error("price quote failed: {0}")]
    PricingFailed(#[source] UpstreamError),

    #[error("geocoding failed: {0}")]
    GeocodingFailed(#[source] UpstreamError),

    #[error("persistence failed: {0}")]
    PersistenceFailed(#[from] StoreError),

    #[error("delivery {0} is no longer in the expected state")]
    TransitionFailed(Uuid),

    #[error(transparent)]
    Authorization(#[from] AuthorizationError),

    #[error(transparent)]
    NotFound(#[from] NotFoundError),

    #[error("authentication required")]
    Unauthenticated,

    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AppError::Validation(_) => ErrorKind::Validation,
            AppError::OriginResolutionFailed(_)
            | AppError::DestinationResolutionFailed(_)
            | AppError::DistanceComputationFailed(_)
            | AppError::PricingFailed(_)
            | AppError::GeocodingFailed(_) => ErrorKind::Upstream,
            AppError::PersistenceFailed(_) | AppError::TransitionFailed(_) => {
                ErrorKind::Persistence
            }
            AppError::Authorization(_) => ErrorKind::Authorization,
            AppError::NotFound(_) => ErrorKind::NotFound,
            AppError::Unauthenticated => ErrorKind::Authentication,
            AppError::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Stable machine-readable reason; clients match on this, not on the status code.
    pub fn reason(&self) -> &'static str {
        match self {
            AppError::Validation(err) => err.reason(),
            AppError::OriginResolutionFailed(_) => "origin_resolution_failed",
            AppError::DestinationResolutionFailed(_) => "destination_resolution_failed",
            AppError::DistanceComputationFailed(_) => "distance_computation_failed",
            AppError::PricingFailed(_) => "pricing_failed",
            AppError::GeocodingFailed(_) => "geocoding_failed",
            AppError::PersistenceFailed(_) => "persistence_failed",
            AppError::TransitionFailed(_) => "transition_failed",
            AppError::Authorization(err) => err.reason(),
            AppError::NotFound(err) => err.reason(),
            AppError::Unauthenticated => "unauthenticated",
            AppError::Internal(_) => "internal",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::OriginResolutionFailed(err)
            | AppError::DestinationResolutionFailed(err)
            | AppError::DistanceComputationFailed(err)
            | AppError::PricingFailed(err)
            | AppError::GeocodingFailed(err) => {
                if err.is_timeout() {
                    StatusCode::GATEWAY_TIMEOUT
                } else {
                    StatusCode::BAD_GATEWAY
                }
            }
            AppError::PersistenceFailed(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::TransitionFailed(_) => StatusCode::CONFLICT,
            AppError::Authorization(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Unauthenticated => StatusCode::UNAUTHORIZED,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::Validation(ValidationError::InvalidRequest(rejection.body_text()))
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::Validation(ValidationError::InvalidRequest(rejection.body_text()))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let reason = self.reason();

        if status.is_server_error() {
            tracing::error!(reason, error = %self, "request failed");
        } else {
            tracing::debug!(reason, error = %self, "request rejected");
        }

        let body = Json(json!({
            "error": self.to_string(),
            "reason": reason,
        }));

        (status, body).into_response()
    }
}

//! Contracts for the external geocoding and pricing services, plus the HTTP
//! clients that implement them.

pub mod geocoder;
pub mod pricing;

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use thiserror::Error;

use crate::models::delivery::DeliveryTypeId;
use crate::models::geo::GeoPoint;

#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("coordinates must be non-zero")]
    ZeroCoordinate,

    #[error("query must not be empty")]
    EmptyQuery,

    #[error("no results found")]
    NotFound,

    #[error("bad upstream response: {0}")]
    BadUpstream(String),

    #[error("upstream request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("upstream call exceeded {0:?}")]
    Timeout(Duration),
}

impl UpstreamError {
    pub fn is_timeout(&self) -> bool {
        match self {
            UpstreamError::Timeout(_) => true,
            UpstreamError::Transport(err) => err.is_timeout(),
            _ => false,
        }
    }
}

#[async_trait]
pub trait GeoResolver: Send + Sync {
    async fn resolve_address(&self, point: GeoPoint) -> Result<String, UpstreamError>;

    async fn resolve_coordinates(&self, query: &str) -> Result<GeoPoint, UpstreamError>;

    /// Road distance in meters.
    async fn distance(&self, from: GeoPoint, to: GeoPoint) -> Result<f64, UpstreamError>;
}

#[async_trait]
pub trait PriceQuoter: Send + Sync {
    async fn quote(
        &self,
        type_id: DeliveryTypeId,
        has_load_assist: bool,
        at: DateTime<Utc>,
        distance_meters: f64,
    ) -> Result<Decimal, UpstreamError>;
}

/// Bounds an upstream call; an expired deadline is reported like any other upstream failure.
pub async fn with_deadline<T, F>(deadline: Duration, call: F) -> Result<T, UpstreamError>
where
    F: Future<Output = Result<T, UpstreamError>>,
{
    match tokio::time::timeout(deadline, call).await {
        Ok(result) => result,
        Err(_) => Err(UpstreamError::Timeout(deadline)),
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::{with_deadline, UpstreamError};

    #[tokio::test]
    async fn deadline_expiry_becomes_timeout_error() {
        let result: Result<(), UpstreamError> = with_deadline(Duration::from_millis(10), async {
            tokio::time::sleep(Duration::from_millis(200)).await;
            Ok(())
        })
        .await;

        let err = result.unwrap_err();
        assert!(matches!(err, UpstreamError::Timeout(_)));
        assert!(err.is_timeout());
    }

    #[tokio::test]
    async fn fast_calls_pass_through() {
        let result = with_deadline(Duration::from_secs(1), async { Ok::<_, UpstreamError>(42) }).await;
        assert_eq!(result.unwrap(), 42);
    }
}

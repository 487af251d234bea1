use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::models::delivery::DeliveryTypeId;
use crate::upstream::{PriceQuoter, UpstreamError};

/// Client for the internal price estimator service.
#[derive(Clone)]
pub struct HttpPriceQuoter {
    client: reqwest::Client,
    base_url: String,
}

#[derive(Debug, Serialize)]
struct QuoteRequest {
    type_id: i32,
    has_loader: bool,
    time: DateTime<Utc>,
    // the estimator works in kilometers
    distance: f64,
}

#[derive(Debug, Deserialize)]
struct QuoteResponse {
    price: f64,
}

impl QuoteRequest {
    fn new(
        type_id: DeliveryTypeId,
        has_load_assist: bool,
        at: DateTime<Utc>,
        distance_meters: f64,
    ) -> Self {
        Self {
            type_id: type_id.into(),
            has_loader: has_load_assist,
            time: at,
            distance: distance_meters / 1000.0,
        }
    }
}

impl HttpPriceQuoter {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
        }
    }
}

fn price_from_wire(raw: f64) -> Result<Decimal, UpstreamError> {
    if !raw.is_finite() || raw < 0.0 {
        return Err(UpstreamError::BadUpstream(format!("invalid price {raw}")));
    }

    Decimal::try_from(raw)
        .map(|price| price.round_dp(2))
        .map_err(|err| UpstreamError::BadUpstream(format!("unrepresentable price {raw}: {err}")))
}

#[async_trait]
impl PriceQuoter for HttpPriceQuoter {
    async fn quote(
        &self,
        type_id: DeliveryTypeId,
        has_load_assist: bool,
        at: DateTime<Utc>,
        distance_meters: f64,
    ) -> Result<Decimal, UpstreamError> {
        let url = format!("{}/price", self.base_url.trim_end_matches('/'));
        let body = QuoteRequest::new(type_id, has_load_assist, at, distance_meters);

        let response = self.client.post(url).json(&body).send().await?;
        if !response.status().is_success() {
            return Err(UpstreamError::BadUpstream(format!(
                "price estimator returned status {}",
                response.status()
            )));
        }

        let quote: QuoteResponse = response.json().await?;
        price_from_wire(quote.price)
    }
}

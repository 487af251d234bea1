use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::models::actor::Actor;
use crate::models::delivery::{Delivery, DeliveryStatus, DeliveryTypeId};
use crate::models::geo::{Geo, GeoPoint};
use crate::upstream::{GeoResolver, PriceQuoter, UpstreamError};

pub fn sample_delivery(client_id: Uuid, origin: GeoPoint) -> Delivery {
    Delivery {
        id: Uuid::new_v4(),
        client_id,
        courier_id: None,
        type_id: DeliveryTypeId::try_from(1).unwrap(),
        status: DeliveryStatus::Proposed,
        has_load_assist: false,
        price: Decimal::new(300, 0),
        geo: Geo {
            id: Uuid::new_v4(),
            origin,
            origin_address: "origin".to_string(),
            destination: GeoPoint::new(origin.lat + 0.01, origin.lon + 0.01),
            destination_address: "destination".to_string(),
            distance_meters: 1200.0,
        },
        created_at: Utc::now(),
    }
}

pub fn actor(is_courier: bool) -> Actor {
    Actor {
        id: Uuid::new_v4(),
        name: "test-actor".to_string(),
        is_admin: false,
        is_courier,
        is_banned: false,
        created_at: Utc::now(),
    }
}

fn key(point: GeoPoint) -> String {
    format!("{:.3},{:.3}", point.lat, point.lon)
}

/// Deterministic geo resolver keyed by coordinates rounded to three decimals.
#[derive(Default)]
pub struct StubGeo {
    addresses: HashMap<String, String>,
    failing: HashSet<String>,
    distance: Option<f64>,
    delay: Option<Duration>,
    pub calls: AtomicUsize,
}

impl StubGeo {
    pub fn new(distance_meters: f64) -> Self {
        Self {
            distance: Some(distance_meters),
            ..Self::default()
        }
    }

    pub fn with_address(mut self, point: GeoPoint, address: &str) -> Self {
        self.addresses.insert(key(point), address.to_string());
        self
    }

    pub fn failing_at(mut self, point: GeoPoint) -> Self {
        self.failing.insert(key(point));
        self
    }

    pub fn without_distance(mut self) -> Self {
        self.distance = None;
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    async fn pause(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait]
impl GeoResolver for StubGeo {
    async fn resolve_address(&self, point: GeoPoint) -> Result<String, UpstreamError> {
        self.pause().await;
        let key = key(point);
        if self.failing.contains(&key) {
            return Err(UpstreamError::BadUpstream(format!("stub failure at {key}")));
        }
        Ok(self
            .addresses
            .get(&key)
            .cloned()
            .unwrap_or_else(|| format!("address {key}")))
    }

    async fn resolve_coordinates(&self, query: &str) -> Result<GeoPoint, UpstreamError> {
        self.pause().await;
        self.addresses
            .iter()
            .find(|(_, address)| address.as_str() == query)
            .and_then(|(key, _)| {
                let (lat, lon) = key.split_once(',')?;
                Some(GeoPoint::new(lat.parse().ok()?, lon.parse().ok()?))
            })
            .ok_or(UpstreamError::NotFound)
    }

    async fn distance(&self, _from: GeoPoint, _to: GeoPoint) -> Result<f64, UpstreamError> {
        self.pause().await;
        self.distance
            .ok_or_else(|| UpstreamError::BadUpstream("stub has no route".to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QuoteCall {
    pub type_id: DeliveryTypeId,
    pub has_load_assist: bool,
    pub at: DateTime<Utc>,
    pub distance_meters: f64,
}

pub struct StubQuoter {
    price: Option<Decimal>,
    pub calls: Mutex<Vec<QuoteCall>>,
}

impl StubQuoter {
    pub fn new(price: Decimal) -> Self {
        Self {
            price: Some(price),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            price: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn recorded(&self) -> Vec<QuoteCall> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl PriceQuoter for StubQuoter {
    async fn quote(
        &self,
        type_id: DeliveryTypeId,
        has_load_assist: bool,
        at: DateTime<Utc>,
        distance_meters: f64,
    ) -> Result<Decimal, UpstreamError> {
        self.calls.lock().unwrap().push(QuoteCall {
            type_id,
            has_load_assist,
            at,
            distance_meters,
        });
        self.price
            .ok_or_else(|| UpstreamError::BadUpstream("stub estimator is down".to_string()))
    }
}

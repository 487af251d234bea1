use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use rust_decimal::Decimal;
use tracing::instrument;
use uuid::Uuid;

use crate::error::{AppError, ValidationError};
use crate::models::delivery::{Delivery, DeliveryStatus, DeliveryTypeId};
use crate::models::geo::{Geo, GeoPoint};
use crate::store::OrderStore;
use crate::upstream::{with_deadline, GeoResolver, PriceQuoter};

#[derive(Debug, Clone)]
pub struct CreateDelivery {
    pub client_id: Uuid,
    pub type_id: i32,
    pub origin: GeoPoint,
    pub destination: GeoPoint,
    pub has_load_assist: bool,
}

#[derive(Debug)]
struct EnrichedRoute {
    origin_address: String,
    destination_address: String,
    distance_meters: f64,
}

/// Turns a client's route request into a priced, persisted delivery.
///
/// Enrichment runs as three concurrent legs joined at a single barrier; only a
/// fully enriched route is priced, and only a priced route is written.
pub struct DeliveryOrchestrator {
    geo: Arc<dyn GeoResolver>,
    quoter: Arc<dyn PriceQuoter>,
    store: Arc<dyn OrderStore>,
    upstream_timeout: Duration,
}

fn ensure_non_zero(field: &'static str, point: GeoPoint) -> Result<(), ValidationError> {
    if point.has_zero_coordinate() {
        return Err(ValidationError::ZeroCoordinate { field });
    }
    Ok(())
}

impl DeliveryOrchestrator {
    pub fn new(
        geo: Arc<dyn GeoResolver>,
        quoter: Arc<dyn PriceQuoter>,
        store: Arc<dyn OrderStore>,
        upstream_timeout: Duration,
    ) -> Self {
        Self {
            geo,
            quoter,
            store,
            upstream_timeout,
        }
    }

    #[instrument(skip_all, fields(client_id = %request.client_id, type_id = request.type_id))]
    pub async fn create(&self, request: CreateDelivery) -> Result<Delivery, AppError> {
        let type_id = DeliveryTypeId::try_from(request.type_id)?;
        ensure_non_zero("origin", request.origin)?;
        ensure_non_zero("destination", request.destination)?;

        let route = self.enrich(request.origin, request.destination).await?;

        // priced from the resolved distance only
        let price = with_deadline(
            self.upstream_timeout,
            self.quoter.quote(
                type_id,
                request.has_load_assist,
                Utc::now(),
                route.distance_meters,
            ),
        )
        .await
        .map_err(AppError::PricingFailed)?;

        let delivery = Delivery {
            id: Uuid::new_v4(),
            client_id: request.client_id,
            courier_id: None,
            type_id,
            status: DeliveryStatus::Proposed,
            has_load_assist: request.has_load_assist,
            price,
            geo: Geo {
                id: Uuid::new_v4(),
                origin: request.origin,
                origin_address: route.origin_address,
                destination: request.destination,
                destination_address: route.destination_address,
                distance_meters: route.distance_meters,
            },
            created_at: Utc::now(),
        };

        self.store.create_order(&delivery).await?;
        Ok(delivery)
    }

    /// Quote for a route without creating anything.
    #[instrument(skip_all, fields(type_id = type_id))]
    pub async fn estimate(
        &self,
        type_id: i32,
        origin: GeoPoint,
        destination: GeoPoint,
        has_load_assist: bool,
    ) -> Result<Decimal, AppError> {
        let type_id = DeliveryTypeId::try_from(type_id)?;
        ensure_non_zero("origin", origin)?;
        ensure_non_zero("destination", destination)?;

        let distance_meters = with_deadline(
            self.upstream_timeout,
            self.geo.distance(origin, destination),
        )
        .await
        .map_err(AppError::DistanceComputationFailed)?;

        with_deadline(
            self.upstream_timeout,
            self.quoter
                .quote(type_id, has_load_assist, Utc::now(), distance_meters),
        )
        .await
        .map_err(AppError::PricingFailed)
    }

    async fn enrich(
        &self,
        origin: GeoPoint,
        destination: GeoPoint,
    ) -> Result<EnrichedRoute, AppError> {
        let deadline = self.upstream_timeout;

        // join, not try_join: every leg runs to completion before any result is inspected
        let (origin_address, destination_address, distance) = tokio::join!(
            with_deadline(deadline, self.geo.resolve_address(origin)),
            with_deadline(deadline, self.geo.resolve_address(destination)),
            with_deadline(deadline, self.geo.distance(origin, destination)),
        );

        Ok(EnrichedRoute {
            origin_address: origin_address.map_err(AppError::OriginResolutionFailed)?,
            destination_address: destination_address
                .map_err(AppError::DestinationResolutionFailed)?,
            distance_meters: distance.map_err(AppError::DistanceComputationFailed)?,
        })
    }
}

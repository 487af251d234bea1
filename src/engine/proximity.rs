use std::sync::Arc;

use tracing::instrument;

use crate::error::{AppError, NotFoundError, ValidationError};
use crate::geo::BoundingBox;
use crate::models::delivery::Delivery;
use crate::models::geo::GeoPoint;
use crate::store::{OrderStore, Page};

/// Finds open deliveries near a courier.
///
/// The search window is a lat/lon box, not a circle: corners of the box lie
/// farther than the radius from the center.
pub struct ProximitySearch {
    store: Arc<dyn OrderStore>,
    radius_km: f64,
    page_size: u32,
}

impl ProximitySearch {
    pub fn new(store: Arc<dyn OrderStore>, radius_km: f64, page_size: u32) -> Self {
        Self {
            store,
            radius_km,
            page_size,
        }
    }

    pub fn bounding_box(&self, center: GeoPoint) -> BoundingBox {
        BoundingBox::around(center, self.radius_km)
    }

    #[instrument(skip(self))]
    pub async fn search(&self, lat: f64, lon: f64, page: u32) -> Result<Vec<Delivery>, AppError> {
        let center = GeoPoint::new(lat, lon);
        if center.has_zero_coordinate() {
            return Err(ValidationError::ZeroCoordinate { field: "center" }.into());
        }
        let page = Page::new(page, self.page_size)?;

        let found = self
            .store
            .search_by_bounding_box(self.bounding_box(center), page)
            .await?;

        if found.is_empty() {
            return Err(NotFoundError::ResultsNotFound.into());
        }

        tracing::debug!(count = found.len(), "proximity search matched");
        Ok(found)
    }
}

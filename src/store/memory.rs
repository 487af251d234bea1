use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::geo::BoundingBox;
use crate::models::actor::Actor;
use crate::models::delivery::{Delivery, DeliveryStatus, DeliveryTypeId};
use crate::models::geo::Geo;
use crate::store::{ActorDirectory, OrderStore, Page, StoreError};

#[derive(Debug, Clone)]
struct DeliveryRow {
    id: Uuid,
    client_id: Uuid,
    courier_id: Option<Uuid>,
    type_id: DeliveryTypeId,
    status: DeliveryStatus,
    has_load_assist: bool,
    price: Decimal,
    geo_id: Uuid,
    created_at: DateTime<Utc>,
}

impl From<&Delivery> for DeliveryRow {
    fn from(delivery: &Delivery) -> Self {
        Self {
            id: delivery.id,
            client_id: delivery.client_id,
            courier_id: delivery.courier_id,
            type_id: delivery.type_id,
            status: delivery.status,
            has_load_assist: delivery.has_load_assist,
            price: delivery.price,
            geo_id: delivery.geo.id,
            created_at: delivery.created_at,
        }
    }
}

/// Process-local store with the same row layout as the SQL schema: one geo
/// table and one delivery table referencing it.
#[derive(Debug, Default)]
pub struct MemoryStore {
    geos: DashMap<Uuid, Geo>,
    deliveries: DashMap<Uuid, DeliveryRow>,
    actors: DashMap<Uuid, Actor>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn delivery_count(&self) -> usize {
        self.deliveries.len()
    }

    pub fn geo_count(&self) -> usize {
        self.geos.len()
    }

    fn hydrate(&self, row: DeliveryRow) -> Result<Delivery, StoreError> {
        let geo = self
            .geos
            .get(&row.geo_id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| {
                StoreError::Corrupt(format!("delivery {} has no geo {}", row.id, row.geo_id))
            })?;

        Ok(Delivery {
            id: row.id,
            client_id: row.client_id,
            courier_id: row.courier_id,
            type_id: row.type_id,
            status: row.status,
            has_load_assist: row.has_load_assist,
            price: row.price,
            geo,
            created_at: row.created_at,
        })
    }

    fn collect_page<F>(&self, page: Page, filter: F) -> Result<Vec<Delivery>, StoreError>
    where
        F: Fn(&DeliveryRow) -> bool,
    {
        let mut rows: Vec<DeliveryRow> = self
            .deliveries
            .iter()
            .filter(|entry| filter(entry.value()))
            .map(|entry| entry.value().clone())
            .collect();

        rows.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| a.id.cmp(&b.id))
        });

        rows.into_iter()
            .skip(page.offset() as usize)
            .take(page.size as usize)
            .map(|row| self.hydrate(row))
            .collect()
    }
}

#[async_trait]
impl OrderStore for MemoryStore {
    async fn create_order(&self, delivery: &Delivery) -> Result<(), StoreError> {
        let geo_id = delivery.geo.id;

        match self.geos.entry(geo_id) {
            Entry::Occupied(_) => {
                return Err(StoreError::RowCount {
                    expected: 1,
                    actual: 0,
                });
            }
            Entry::Vacant(slot) => {
                slot.insert(delivery.geo.clone());
            }
        }

        let inserted = match self.deliveries.entry(delivery.id) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(DeliveryRow::from(delivery));
                true
            }
        };

        if !inserted {
            // rollback
            self.geos.remove(&geo_id);
            return Err(StoreError::RowCount {
                expected: 1,
                actual: 0,
            });
        }

        Ok(())
    }

    async fn find(&self, id: Uuid) -> Result<Option<Delivery>, StoreError> {
        let row = self.deliveries.get(&id).map(|entry| entry.value().clone());
        row.map(|row| self.hydrate(row)).transpose()
    }

    async fn update_status(
        &self,
        id: Uuid,
        new_status: DeliveryStatus,
        expected_prior: DeliveryStatus,
    ) -> Result<u64, StoreError> {
        let Some(mut row) = self.deliveries.get_mut(&id) else {
            return Ok(0);
        };

        if row.status != expected_prior {
            return Ok(0);
        }

        row.status = new_status;
        Ok(1)
    }

    async fn accept(&self, id: Uuid, courier_id: Uuid) -> Result<u64, StoreError> {
        let Some(mut row) = self.deliveries.get_mut(&id) else {
            return Ok(0);
        };

        if row.status != DeliveryStatus::Proposed {
            return Ok(0);
        }

        row.status = DeliveryStatus::Accepted;
        row.courier_id = Some(courier_id);
        Ok(1)
    }

    async fn search_by_bounding_box(
        &self,
        bbox: BoundingBox,
        page: Page,
    ) -> Result<Vec<Delivery>, StoreError> {
        self.collect_page(page, |row| {
            row.status == DeliveryStatus::Proposed
                && self
                    .geos
                    .get(&row.geo_id)
                    .is_some_and(|geo| bbox.contains(geo.origin))
        })
    }

    async fn list_for_client(
        &self,
        client_id: Uuid,
        page: Page,
    ) -> Result<Vec<Delivery>, StoreError> {
        self.collect_page(page, |row| row.client_id == client_id)
    }

    async fn is_owner(&self, actor_id: Uuid, id: Uuid) -> Result<bool, StoreError> {
        Ok(self
            .deliveries
            .get(&id)
            .is_some_and(|row| row.client_id == actor_id))
    }

    async fn is_performer(&self, actor_id: Uuid, id: Uuid) -> Result<bool, StoreError> {
        Ok(self
            .deliveries
            .get(&id)
            .is_some_and(|row| row.courier_id == Some(actor_id)))
    }

    async fn active_accepted_count(&self, courier_id: Uuid) -> Result<u64, StoreError> {
        let count = self
            .deliveries
            .iter()
            .filter(|entry| {
                let row = entry.value();
                row.status == DeliveryStatus::Accepted && row.courier_id == Some(courier_id)
            })
            .count();

        Ok(count as u64)
    }
}

#[async_trait]
impl ActorDirectory for MemoryStore {
    async fn find_actor(&self, id: Uuid) -> Result<Option<Actor>, StoreError> {
        Ok(self.actors.get(&id).map(|entry| entry.value().clone()))
    }

    async fn register(&self, actor: &Actor) -> Result<(), StoreError> {
        match self.actors.entry(actor.id) {
            Entry::Occupied(_) => Err(StoreError::RowCount {
                expected: 1,
                actual: 0,
            }),
            Entry::Vacant(slot) => {
                slot.insert(actor.clone());
                Ok(())
            }
        }
    }

    async fn set_banned(&self, id: Uuid, banned: bool) -> Result<u64, StoreError> {
        let Some(mut actor) = self.actors.get_mut(&id) else {
            return Ok(0);
        };

        actor.is_banned = banned;
        Ok(1)
    }
}

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::error::ValidationError;
use crate::geo::BoundingBox;
use crate::models::actor::Actor;
use crate::models::delivery::{Delivery, DeliveryStatus};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("expected to affect {expected} row(s), affected {actual}")]
    RowCount { expected: u64, actual: u64 },

    #[error("corrupt row: {0}")]
    Corrupt(String),

    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub number: u32,
    pub size: u32,
}

impl Page {
    pub fn new(number: u32, size: u32) -> Result<Self, ValidationError> {
        if number == 0 {
            return Err(ValidationError::InvalidPage);
        }
        Ok(Self { number, size })
    }

    pub fn offset(&self) -> u64 {
        u64::from(self.number - 1) * u64::from(self.size)
    }
}

/// Delivery persistence. Status changes are conditional single-row updates that
/// report how many rows matched; callers decide what a mismatch means.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Inserts the geo row and the delivery row atomically.
    async fn create_order(&self, delivery: &Delivery) -> Result<(), StoreError>;

    async fn find(&self, id: Uuid) -> Result<Option<Delivery>, StoreError>;

    async fn update_status(
        &self,
        id: Uuid,
        new_status: DeliveryStatus,
        expected_prior: DeliveryStatus,
    ) -> Result<u64, StoreError>;

    /// Sets the courier and moves the delivery to `Accepted`, only while it is `Proposed`.
    async fn accept(&self, id: Uuid, courier_id: Uuid) -> Result<u64, StoreError>;

    /// Proposed deliveries whose origin lies inside `bbox`, newest first.
    async fn search_by_bounding_box(
        &self,
        bbox: BoundingBox,
        page: Page,
    ) -> Result<Vec<Delivery>, StoreError>;

    async fn list_for_client(&self, client_id: Uuid, page: Page)
        -> Result<Vec<Delivery>, StoreError>;

    async fn is_owner(&self, actor_id: Uuid, id: Uuid) -> Result<bool, StoreError>;

    async fn is_performer(&self, actor_id: Uuid, id: Uuid) -> Result<bool, StoreError>;

    async fn active_accepted_count(&self, courier_id: Uuid) -> Result<u64, StoreError>;
}

#[async_trait]
pub trait ActorDirectory: Send + Sync {
    async fn find_actor(&self, id: Uuid) -> Result<Option<Actor>, StoreError>;

    async fn register(&self, actor: &Actor) -> Result<(), StoreError>;

    async fn set_banned(&self, id: Uuid, banned: bool) -> Result<u64, StoreError>;
}

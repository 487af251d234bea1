//! Delivery state machine.
//!
//! ```text
//! Proposed ──accept──▶ Accepted ──complete──▶ Completed
//!     │                    │
//!     └──────cancel────────┴──────────────────▶ Cancelled
//! ```
//!
//! Guards are fresh reads taken just before the write, outside any transaction.
//! Each write is itself conditional on the prior status, so two couriers racing
//! for the same delivery cannot both win even if both pass the guard.

use std::sync::Arc;

use tracing::instrument;
use uuid::Uuid;

use crate::error::{AppError, AuthorizationError, NotFoundError, ValidationError};
use crate::models::actor::Actor;
use crate::models::delivery::{Delivery, DeliveryStatus};
use crate::store::OrderStore;

pub struct LifecycleManager {
    store: Arc<dyn OrderStore>,
}

fn expect_single_row(rows: u64, delivery_id: Uuid) -> Result<(), AppError> {
    if rows != 1 {
        return Err(AppError::TransitionFailed(delivery_id));
    }
    Ok(())
}

impl LifecycleManager {
    pub fn new(store: Arc<dyn OrderStore>) -> Self {
        Self { store }
    }

    async fn load(&self, delivery_id: Uuid) -> Result<Delivery, AppError> {
        self.store
            .find(delivery_id)
            .await?
            .ok_or_else(|| NotFoundError::DeliveryNotFound(delivery_id).into())
    }

    #[instrument(skip_all, fields(order_id = %delivery_id, courier_id = %actor.id))]
    pub async fn accept(&self, actor: &Actor, delivery_id: Uuid) -> Result<Delivery, AppError> {
        actor.require_active()?;
        actor.require_courier()?;

        let mut delivery = self.load(delivery_id).await?;

        if self.store.active_accepted_count(actor.id).await? > 0 {
            return Err(AuthorizationError::ConcurrentAcceptLimitExceeded.into());
        }

        let rows = self.store.accept(delivery_id, actor.id).await?;
        expect_single_row(rows, delivery_id)?;

        delivery.status = DeliveryStatus::Accepted;
        delivery.courier_id = Some(actor.id);
        Ok(delivery)
    }

    /// Status reported by the courier performing the delivery.
    #[instrument(skip_all, fields(order_id = %delivery_id, courier_id = %actor.id, ?new_status))]
    pub async fn change_status(
        &self,
        actor: &Actor,
        delivery_id: Uuid,
        new_status: DeliveryStatus,
    ) -> Result<Delivery, AppError> {
        if !DeliveryStatus::Accepted.can_transition_to(new_status) {
            return Err(ValidationError::InvalidStatusTransition {
                from: DeliveryStatus::Accepted,
                to: new_status,
            }
            .into());
        }

        let mut delivery = self.load(delivery_id).await?;

        if !self.store.is_performer(actor.id, delivery_id).await? {
            return Err(AuthorizationError::NotPerformer.into());
        }

        let rows = self
            .store
            .update_status(delivery_id, new_status, DeliveryStatus::Accepted)
            .await?;
        expect_single_row(rows, delivery_id)?;

        delivery.status = new_status;
        Ok(delivery)
    }

    #[instrument(skip_all, fields(order_id = %delivery_id, client_id = %actor.id))]
    pub async fn cancel(&self, actor: &Actor, delivery_id: Uuid) -> Result<Delivery, AppError> {
        let mut delivery = self.load(delivery_id).await?;

        if !self.store.is_owner(actor.id, delivery_id).await? {
            return Err(AuthorizationError::NotOwner.into());
        }

        if delivery.status.is_terminal() {
            return Err(ValidationError::InvalidStatusTransition {
                from: delivery.status,
                to: DeliveryStatus::Cancelled,
            }
            .into());
        }

        let rows = self
            .store
            .update_status(delivery_id, DeliveryStatus::Cancelled, delivery.status)
            .await?;
        expect_single_row(rows, delivery_id)?;

        delivery.status = DeliveryStatus::Cancelled;
        Ok(delivery)
    }
}

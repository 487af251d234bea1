use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ValidationError;
use crate::models::geo::Geo;

/// One of the five delivery classes offered to clients.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(try_from = "i32", into = "i32")]
pub struct DeliveryTypeId(u8);

impl DeliveryTypeId {
    pub const MIN: i32 = 1;
    pub const MAX: i32 = 5;

    pub fn get(self) -> u8 {
        self.0
    }
}

impl TryFrom<i32> for DeliveryTypeId {
    type Error = ValidationError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        if (Self::MIN..=Self::MAX).contains(&value) {
            Ok(Self(value as u8))
        } else {
            Err(ValidationError::InvalidTypeId(value))
        }
    }
}

impl From<DeliveryTypeId> for i32 {
    fn from(value: DeliveryTypeId) -> Self {
        value.0 as i32
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum DeliveryStatus {
    Proposed,
    Accepted,
    Completed,
    Cancelled,
}

impl DeliveryStatus {
    pub fn id(self) -> i16 {
        match self {
            DeliveryStatus::Proposed => 1,
            DeliveryStatus::Accepted => 2,
            DeliveryStatus::Completed => 3,
            DeliveryStatus::Cancelled => 4,
        }
    }

    pub fn from_id(id: i32) -> Option<Self> {
        match id {
            1 => Some(DeliveryStatus::Proposed),
            2 => Some(DeliveryStatus::Accepted),
            3 => Some(DeliveryStatus::Completed),
            4 => Some(DeliveryStatus::Cancelled),
            _ => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, DeliveryStatus::Completed | DeliveryStatus::Cancelled)
    }

    pub fn can_transition_to(self, next: DeliveryStatus) -> bool {
        matches!(
            (self, next),
            (DeliveryStatus::Proposed, DeliveryStatus::Accepted)
                | (DeliveryStatus::Proposed, DeliveryStatus::Cancelled)
                | (DeliveryStatus::Accepted, DeliveryStatus::Completed)
                | (DeliveryStatus::Accepted, DeliveryStatus::Cancelled)
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Delivery {
    pub id: Uuid,
    pub client_id: Uuid,
    pub courier_id: Option<Uuid>,
    pub type_id: DeliveryTypeId,
    pub status: DeliveryStatus,
    pub has_load_assist: bool,
    pub price: Decimal,
    pub geo: Geo,
    pub created_at: DateTime<Utc>,
}

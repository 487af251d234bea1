use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AuthorizationError;

/// Caller identity with role flags, loaded fresh for every request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Actor {
    pub id: Uuid,
    pub name: String,
    pub is_admin: bool,
    pub is_courier: bool,
    pub is_banned: bool,
    pub created_at: DateTime<Utc>,
}

impl Actor {
    pub fn require_active(&self) -> Result<(), AuthorizationError> {
        if self.is_banned {
            return Err(AuthorizationError::Banned);
        }
        Ok(())
    }

    pub fn require_courier(&self) -> Result<(), AuthorizationError> {
        if !self.is_courier {
            return Err(AuthorizationError::CourierRequired);
        }
        Ok(())
    }

    pub fn require_admin(&self) -> Result<(), AuthorizationError> {
        if !self.is_admin {
            return Err(AuthorizationError::AdminRequired);
        }
        Ok(())
    }
}

//! Branch model — a physical salon location with its own slot capacity.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// Street address of a branch (stored in `addresses`).
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Address {
    pub street: String,
    pub city: String,
    pub province: String,
    pub postal_code: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Branch {
    pub id: Uuid,

    pub name: String,

    pub phone: Option<String>,

    /// How many appointments may overlap any one slot window
    pub slot_capacity: i32,

    pub image_url: Option<String>,

    #[serde(skip_serializing)]
    pub address_id: Uuid,

    #[sqlx(flatten)]
    pub address: Address,

    #[serde(skip_serializing)]
    pub is_deleted: bool,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct AddressInput {
    #[validate(length(min = 1, max = 255, message = "Street is required"))]
    pub street: String,

    #[validate(length(min = 1, max = 100, message = "City is required"))]
    pub city: String,

    #[validate(length(min = 1, max = 100, message = "Province is required"))]
    pub province: String,

    #[validate(length(max = 16))]
    pub postal_code: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateBranchRequest {
    #[validate(length(min = 1, max = 100, message = "Branch name must be 1-100 characters"))]
    pub name: String,

    #[validate(regex(path = *crate::validation::PHONE_REGEX, message = "Invalid phone number"))]
    pub phone: Option<String>,

    #[validate(range(min = 1, max = 100, message = "Slot capacity must be 1-100"))]
    pub slot_capacity: i32,

    #[validate(nested)]
    pub address: AddressInput,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateBranchRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: Option<String>,

    #[validate(regex(path = *crate::validation::PHONE_REGEX, message = "Invalid phone number"))]
    pub phone: Option<String>,

    #[validate(range(min = 1, max = 100, message = "Slot capacity must be 1-100"))]
    pub slot_capacity: Option<i32>,

    #[validate(length(min = 1, max = 255))]
    pub street: Option<String>,

    #[validate(length(min = 1, max = 100))]
    pub city: Option<String>,

    #[validate(length(min = 1, max = 100))]
    pub province: Option<String>,

    #[validate(length(max = 16))]
    pub postal_code: Option<String>,
}

/// `GET /branch/{id}/availability?service_id=..&date=YYYY-MM-DD`
#[derive(Debug, Deserialize)]
pub struct AvailabilityQuery {
    pub service_id: Option<Uuid>,
    pub date: Option<String>,
}

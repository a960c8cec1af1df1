//! Aesthetician model — a practitioner assigned to one branch.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Experience {
    Junior,
    Senior,
    Pro,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Aesthetician {
    pub id: Uuid,
    pub branch_id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub sex: Option<String>,
    pub experience: Experience,
    /// Whether the aesthetician currently accepts bookings
    pub is_available: bool,
    pub image_url: Option<String>,
    #[serde(skip_serializing)]
    pub is_deleted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Aesthetician {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateAestheticianRequest {
    pub branch_id: Uuid,

    #[validate(length(min = 1, max = 64, message = "First name must be 1-64 characters"))]
    pub first_name: String,

    #[validate(length(min = 1, max = 64, message = "Last name must be 1-64 characters"))]
    pub last_name: String,

    #[validate(length(max = 16))]
    pub sex: Option<String>,

    pub experience: Experience,

    pub is_available: Option<bool>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateAestheticianRequest {
    pub branch_id: Option<Uuid>,

    #[validate(length(min = 1, max = 64))]
    pub first_name: Option<String>,

    #[validate(length(min = 1, max = 64))]
    pub last_name: Option<String>,

    #[validate(length(max = 16))]
    pub sex: Option<String>,

    pub experience: Option<Experience>,

    pub is_available: Option<bool>,
}

/// `GET /aesthetician?branch_id=..&available=true`
#[derive(Debug, Default, Deserialize)]
pub struct AestheticianFilter {
    pub branch_id: Option<Uuid>,
    pub available: Option<bool>,
}

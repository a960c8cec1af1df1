//! Registered customer profile.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// A customer profile. `email` is joined in from the owning auth row.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: Uuid,

    /// Owning auth account
    pub auth_id: Uuid,

    pub email: String,

    pub first_name: String,
    pub last_name: String,
    pub phone: Option<String>,

    /// Public image URL
    pub image_url: Option<String>,

    #[serde(skip_serializing)]
    pub is_deleted: bool,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateUserRequest {
    #[validate(length(min = 1, max = 64))]
    pub first_name: Option<String>,

    #[validate(length(min = 1, max = 64))]
    pub last_name: Option<String>,

    #[validate(regex(path = *crate::validation::PHONE_REGEX, message = "Invalid phone number"))]
    pub phone: Option<String>,
}

//! Service catalog model.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::error::SalonError;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Service {
    pub id: Uuid,
    pub name: String,
    pub category: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub duration_minutes: i32,
    /// Standing discount, 0-100
    pub discount_percent: Decimal,
    pub image_url: Option<String>,
    #[serde(skip_serializing)]
    pub is_deleted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateServiceRequest {
    #[validate(length(min = 1, max = 100, message = "Service name must be 1-100 characters"))]
    pub name: String,

    #[validate(length(min = 1, max = 64, message = "Category must be 1-64 characters"))]
    pub category: String,

    #[validate(length(max = 2000))]
    pub description: Option<String>,

    pub price: Decimal,

    #[validate(range(min = 5, max = 600, message = "Duration must be 5-600 minutes"))]
    pub duration_minutes: i32,

    pub discount_percent: Option<Decimal>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateServiceRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: Option<String>,

    #[validate(length(min = 1, max = 64))]
    pub category: Option<String>,

    #[validate(length(max = 2000))]
    pub description: Option<String>,

    pub price: Option<Decimal>,

    #[validate(range(min = 5, max = 600, message = "Duration must be 5-600 minutes"))]
    pub duration_minutes: Option<i32>,

    pub discount_percent: Option<Decimal>,
}

/// Validate the decimal fields `validator` can't express.
pub fn check_price_fields(
    price: Option<Decimal>,
    discount_percent: Option<Decimal>,
) -> Result<(), SalonError> {
    if price.is_some_and(|p| p.is_sign_negative()) {
        return Err(SalonError::validation("Price cannot be negative"));
    }
    if discount_percent.is_some_and(|d| d < Decimal::ZERO || d > Decimal::ONE_HUNDRED) {
        return Err(SalonError::validation("Discount must be between 0 and 100 percent"));
    }
    Ok(())
}

/// `GET /service?category=..&search=..`
#[derive(Debug, Default, Deserialize)]
pub struct ServiceFilter {
    pub category: Option<String>,
    pub search: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn price_fields_bounds() {
        assert!(check_price_fields(Some(Decimal::new(150000, 2)), Some(Decimal::TEN)).is_ok());
        assert!(check_price_fields(Some(Decimal::new(-1, 0)), None).is_err());
        assert!(check_price_fields(None, Some(Decimal::new(101, 0))).is_err());
        assert!(check_price_fields(None, None).is_ok());
    }
}

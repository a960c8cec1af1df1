//! Voucher model — promo codes redeemed at booking time.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::error::SalonError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum DiscountType {
    /// `value` is a percentage of the discounted service price
    Percentage,
    /// `value` is a flat amount off
    Fixed,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Voucher {
    pub id: Uuid,
    /// Always stored upper-case
    pub code: String,
    pub description: Option<String>,
    pub discount_type: DiscountType,
    pub value: Decimal,
    /// None means unlimited
    pub max_uses: Option<i32>,
    pub used_count: i32,
    pub valid_from: Option<DateTime<Utc>>,
    pub valid_until: Option<DateTime<Utc>>,
    #[serde(skip_serializing)]
    pub is_deleted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Voucher {
    /// Reject vouchers that are outside their validity window or used up.
    pub fn check_redeemable(&self, now: DateTime<Utc>) -> Result<(), SalonError> {
        if self.is_deleted {
            return Err(SalonError::not_found("Voucher"));
        }
        if self.valid_from.is_some_and(|from| now < from) {
            return Err(SalonError::conflict("Voucher is not active yet"));
        }
        if self.valid_until.is_some_and(|until| now > until) {
            return Err(SalonError::conflict("Voucher has expired"));
        }
        if self.max_uses.is_some_and(|max| self.used_count >= max) {
            return Err(SalonError::conflict("Voucher has been fully redeemed"));
        }
        Ok(())
    }
}

/// Normalize a user-entered code for lookup and storage.
pub fn normalize_code(code: &str) -> String {
    code.trim().to_uppercase()
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateVoucherRequest {
    #[validate(length(min = 3, max = 32, message = "Code must be 3-32 characters"))]
    pub code: String,

    #[validate(length(max = 255))]
    pub description: Option<String>,

    pub discount_type: DiscountType,

    pub value: Decimal,

    #[validate(range(min = 1))]
    pub max_uses: Option<i32>,

    pub valid_from: Option<DateTime<Utc>>,

    pub valid_until: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateVoucherRequest {
    #[validate(length(max = 255))]
    pub description: Option<String>,

    pub discount_type: Option<DiscountType>,

    pub value: Option<Decimal>,

    #[validate(range(min = 1))]
    pub max_uses: Option<i32>,

    pub valid_from: Option<DateTime<Utc>>,

    pub valid_until: Option<DateTime<Utc>>,
}

/// Validate value/type combination and window ordering.
pub fn check_voucher_terms(
    discount_type: DiscountType,
    value: Decimal,
    valid_from: Option<DateTime<Utc>>,
    valid_until: Option<DateTime<Utc>>,
) -> Result<(), SalonError> {
    if value <= Decimal::ZERO {
        return Err(SalonError::validation("Voucher value must be positive"));
    }
    if discount_type == DiscountType::Percentage && value > Decimal::ONE_HUNDRED {
        return Err(SalonError::validation("Percentage vouchers cannot exceed 100"));
    }
    if let (Some(from), Some(until)) = (valid_from, valid_until) {
        if from >= until {
            return Err(SalonError::validation("valid_from must precede valid_until"));
        }
    }
    Ok(())
}

#[derive(Debug, Deserialize)]
pub struct VoucherQuoteQuery {
    pub service_id: Uuid,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn voucher() -> Voucher {
        let now = Utc::now();
        Voucher {
            id: Uuid::nil(),
            code: "GLOW10".into(),
            description: None,
            discount_type: DiscountType::Percentage,
            value: Decimal::TEN,
            max_uses: Some(2),
            used_count: 0,
            valid_from: Some(now - Duration::days(1)),
            valid_until: Some(now + Duration::days(1)),
            is_deleted: false,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn redeemable_inside_window() {
        assert!(voucher().check_redeemable(Utc::now()).is_ok());
    }

    #[test]
    fn expired_and_exhausted_are_rejected() {
        let v = voucher();
        assert!(v.check_redeemable(Utc::now() + Duration::days(2)).is_err());
        assert!(v.check_redeemable(Utc::now() - Duration::days(2)).is_err());

        let used_up = Voucher { used_count: 2, ..voucher() };
        assert!(used_up.check_redeemable(Utc::now()).is_err());
    }

    #[test]
    fn codes_are_normalized() {
        assert_eq!(normalize_code("  glow10 "), "GLOW10");
    }

    #[test]
    fn terms_validation() {
        assert!(check_voucher_terms(DiscountType::Fixed, Decimal::new(250, 0), None, None).is_ok());
        assert!(check_voucher_terms(DiscountType::Percentage, Decimal::new(120, 0), None, None).is_err());
        assert!(check_voucher_terms(DiscountType::Fixed, Decimal::ZERO, None, None).is_err());
        let now = Utc::now();
        assert!(check_voucher_terms(DiscountType::Fixed, Decimal::ONE, Some(now), Some(now)).is_err());
    }
}

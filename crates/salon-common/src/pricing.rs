//! Booking price computation.
//!
//! The service's standing discount applies first; a voucher then applies to
//! what remains. Amounts are rounded to centavos and never go below zero.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;

use crate::models::voucher::{DiscountType, Voucher};

/// Frozen price breakdown stored on an appointment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PriceQuote {
    pub base_price: Decimal,
    pub service_discount: Decimal,
    pub voucher_code: Option<String>,
    pub voucher_discount: Decimal,
    pub final_price: Decimal,
}

fn money(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

fn percent_of(amount: Decimal, percent: Decimal) -> Decimal {
    money(amount * percent / Decimal::ONE_HUNDRED)
}

/// Price a service, optionally with a voucher.
pub fn quote(base_price: Decimal, discount_percent: Decimal, voucher: Option<&Voucher>) -> PriceQuote {
    let base_price = money(base_price.max(Decimal::ZERO));
    let discount_percent = discount_percent.clamp(Decimal::ZERO, Decimal::ONE_HUNDRED);

    let service_discount = percent_of(base_price, discount_percent);
    let after_service = base_price - service_discount;

    let voucher_discount = match voucher {
        Some(v) => match v.discount_type {
            DiscountType::Percentage => percent_of(after_service, v.value.min(Decimal::ONE_HUNDRED)),
            DiscountType::Fixed => money(v.value),
        }
        .clamp(Decimal::ZERO, after_service),
        None => Decimal::ZERO,
    };

    PriceQuote {
        base_price,
        service_discount,
        voucher_code: voucher.map(|v| v.code.clone()),
        voucher_discount,
        final_price: after_service - voucher_discount,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    fn voucher(discount_type: DiscountType, value: Decimal) -> Voucher {
        Voucher {
            id: Uuid::nil(),
            code: "SPRING".into(),
            description: None,
            discount_type,
            value,
            max_uses: None,
            used_count: 0,
            valid_from: None,
            valid_until: None,
            is_deleted: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn plain_price_without_discounts() {
        let q = quote(Decimal::new(1200, 0), Decimal::ZERO, None);
        assert_eq!(q.final_price, Decimal::new(1200, 0));
        assert_eq!(q.service_discount, Decimal::ZERO);
        assert!(q.voucher_code.is_none());
    }

    #[test]
    fn service_discount_then_percentage_voucher() {
        // 1000 - 20% = 800, then 10% off 800 = 80
        let v = voucher(DiscountType::Percentage, Decimal::TEN);
        let q = quote(Decimal::new(1000, 0), Decimal::new(20, 0), Some(&v));
        assert_eq!(q.service_discount, Decimal::new(200, 0));
        assert_eq!(q.voucher_discount, Decimal::new(80, 0));
        assert_eq!(q.final_price, Decimal::new(720, 0));
        assert_eq!(q.voucher_code.as_deref(), Some("SPRING"));
    }

    #[test]
    fn fixed_voucher_never_goes_negative() {
        let v = voucher(DiscountType::Fixed, Decimal::new(500, 0));
        let q = quote(Decimal::new(300, 0), Decimal::ZERO, Some(&v));
        assert_eq!(q.voucher_discount, Decimal::new(300, 0));
        assert_eq!(q.final_price, Decimal::ZERO);
    }

    #[test]
    fn rounds_to_centavos() {
        // 999.99 * 15% = 149.9985 -> 150.00
        let q = quote(Decimal::new(99999, 2), Decimal::new(15, 0), None);
        assert_eq!(q.service_discount, Decimal::new(15000, 2));
        assert_eq!(q.final_price, Decimal::new(84999, 2));
    }
}

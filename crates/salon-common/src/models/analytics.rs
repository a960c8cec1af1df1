//! Report rows returned by the analytics endpoints.
//!
//! All figures come from appointment snapshot columns, never from the live
//! catalog, so renaming or repricing a service doesn't rewrite history.

use chrono::{Duration, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::SalonError;

/// `?from=YYYY-MM-DD&to=YYYY-MM-DD&branch_id=..&interval=day|month`
#[derive(Debug, Default, Deserialize)]
pub struct AnalyticsQuery {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub branch_id: Option<Uuid>,
    pub interval: Option<RevenueInterval>,
    pub limit: Option<i64>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RevenueInterval {
    #[default]
    Day,
    Month,
}

impl RevenueInterval {
    /// `date_trunc` field name.
    pub fn as_sql(&self) -> &'static str {
        match self {
            Self::Day => "day",
            Self::Month => "month",
        }
    }
}

/// Inclusive date range a report covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ReportRange {
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub branch_id: Option<Uuid>,
}

impl AnalyticsQuery {
    /// Default to the 30 days ending `today`.
    pub fn range(&self, today: NaiveDate) -> Result<ReportRange, SalonError> {
        let to = self.to.unwrap_or(today);
        let from = self.from.unwrap_or(to - Duration::days(29));
        if from > to {
            return Err(SalonError::validation("`from` must not be after `to`"));
        }
        Ok(ReportRange {
            from,
            to,
            branch_id: self.branch_id,
        })
    }

    pub fn top_limit(&self) -> i64 {
        self.limit.unwrap_or(10).clamp(1, 50)
    }
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Summary {
    pub total_appointments: i64,
    pub completed: i64,
    pub cancelled: i64,
    pub active: i64,
    /// Sum of final prices of paid or completed appointments
    pub revenue: Decimal,
    pub average_ticket: Decimal,
    pub discounts_given: Decimal,
    pub unique_customers: i64,
    pub walk_ins: i64,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct RevenueBucket {
    pub bucket: NaiveDate,
    pub appointments: i64,
    pub revenue: Decimal,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct StatusCount {
    pub status: String,
    pub count: i64,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ServiceStat {
    pub service_name: String,
    pub bookings: i64,
    pub revenue: Decimal,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct BranchStat {
    pub branch_id: Uuid,
    pub branch_name: String,
    pub bookings: i64,
    pub completed: i64,
    pub cancelled: i64,
    pub revenue: Decimal,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct AestheticianStat {
    pub aesthetician_id: Uuid,
    pub aesthetician_name: String,
    pub bookings: i64,
    pub completed: i64,
    pub revenue: Decimal,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct HourCount {
    pub hour: i32,
    pub count: i64,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct CustomerMix {
    pub registered: i64,
    pub walk_in: i64,
    pub registered_revenue: Decimal,
    pub walk_in_revenue: Decimal,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct VoucherStat {
    pub code: String,
    pub redemptions: i64,
    pub total_discount: Decimal,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn defaults_to_trailing_thirty_days() {
        let r = AnalyticsQuery::default().range(d(2026, 3, 31)).unwrap();
        assert_eq!(r.from, d(2026, 3, 2));
        assert_eq!(r.to, d(2026, 3, 31));
    }

    #[test]
    fn inverted_range_is_rejected() {
        let q = AnalyticsQuery {
            from: Some(d(2026, 4, 2)),
            to: Some(d(2026, 4, 1)),
            ..Default::default()
        };
        assert!(q.range(d(2026, 4, 5)).is_err());
    }

    #[test]
    fn top_limit_is_clamped() {
        let q = AnalyticsQuery { limit: Some(500), ..Default::default() };
        assert_eq!(q.top_limit(), 50);
        assert_eq!(AnalyticsQuery::default().top_limit(), 10);
    }
}

//! Appointment model — the central booking record.
//!
//! An appointment freezes the service, branch, aesthetician and price as they
//! were when it was booked (`*_snapshot` columns), so reports don't drift when
//! the catalog changes later.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::error::SalonError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum AppointmentStatus {
    /// Booked, awaiting payment or confirmation
    Pending,
    /// Confirmed and queued at the branch
    Waiting,
    /// Service in progress
    OnProcess,
    Completed,
    Cancelled,
}

/// Statuses that hold a slot number and count against branch capacity.
pub const ACTIVE_STATUSES: [AppointmentStatus; 3] = [
    AppointmentStatus::Waiting,
    AppointmentStatus::OnProcess,
    AppointmentStatus::Pending,
];

impl AppointmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Waiting => "waiting",
            Self::OnProcess => "on-process",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn is_active(&self) -> bool {
        ACTIVE_STATUSES.contains(self)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }

    /// Allowed moves of the front-desk workflow.
    pub fn can_transition_to(&self, next: Self) -> bool {
        use AppointmentStatus::*;
        matches!(
            (self, next),
            (Pending, Waiting)
                | (Pending, Cancelled)
                | (Waiting, OnProcess)
                | (Waiting, Cancelled)
                | (Waiting, Pending)
                | (OnProcess, Completed)
                | (OnProcess, Cancelled)
        )
    }

    /// Statuses a customer may still cancel from.
    pub fn customer_cancellable(&self) -> bool {
        matches!(self, Self::Pending | Self::Waiting)
    }
}

/// `ACTIVE_STATUSES` as the text values stored in the database.
pub fn active_status_values() -> Vec<&'static str> {
    ACTIVE_STATUSES.iter().map(AppointmentStatus::as_str).collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Unpaid,
    /// Invoice issued, awaiting payment
    Pending,
    Paid,
    Expired,
    Failed,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unpaid => "unpaid",
            Self::Pending => "pending",
            Self::Paid => "paid",
            Self::Expired => "expired",
            Self::Failed => "failed",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Appointment {
    pub id: Uuid,

    /// Registered customer (exclusive with `walk_in_id`)
    pub user_id: Option<Uuid>,
    /// Front-desk walk-in (exclusive with `user_id`)
    pub walk_in_id: Option<Uuid>,

    pub branch_id: Uuid,
    pub service_id: Uuid,
    pub aesthetician_id: Option<Uuid>,

    /// Salon wall-clock start
    pub start_time: NaiveDateTime,
    pub duration_minutes: i32,

    pub status: AppointmentStatus,
    pub status_updated_at: Option<DateTime<Utc>>,
    /// Queue position within (branch, day); None once inactive
    pub slot_number: Option<i32>,

    // === Snapshots taken at booking ===
    pub customer_name_snapshot: String,
    pub service_name_snapshot: String,
    pub branch_name_snapshot: String,
    pub aesthetician_name_snapshot: Option<String>,
    pub price_snapshot: Decimal,
    pub service_discount: Decimal,
    pub voucher_code_snapshot: Option<String>,
    pub voucher_discount: Decimal,
    pub final_price: Decimal,

    // === Payment ===
    pub payment_status: PaymentStatus,
    pub invoice_id: Option<String>,
    pub invoice_url: Option<String>,
    pub invoice_expires_at: Option<DateTime<Utc>>,
    pub payment_method: Option<String>,
    pub payment_channel: Option<String>,
    pub paid_at: Option<DateTime<Utc>>,

    pub notes: Option<String>,

    #[serde(skip_serializing)]
    pub is_deleted: bool,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Appointment {
    pub fn day(&self) -> NaiveDate {
        self.start_time.date()
    }
}

/// Who an appointment is booked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Owner {
    User(Uuid),
    WalkIn(Uuid),
}

impl Owner {
    /// Exactly one of the two must be given.
    pub fn from_ids(user_id: Option<Uuid>, walk_in_id: Option<Uuid>) -> Result<Self, SalonError> {
        match (user_id, walk_in_id) {
            (Some(u), None) => Ok(Self::User(u)),
            (None, Some(w)) => Ok(Self::WalkIn(w)),
            (Some(_), Some(_)) => Err(SalonError::validation(
                "An appointment belongs to either a user or a walk-in, not both",
            )),
            (None, None) => Err(SalonError::validation("user_id or walk_in_id is required")),
        }
    }

    pub fn user_id(&self) -> Option<Uuid> {
        match self {
            Self::User(id) => Some(*id),
            Self::WalkIn(_) => None,
        }
    }

    pub fn walk_in_id(&self) -> Option<Uuid> {
        match self {
            Self::WalkIn(id) => Some(*id),
            Self::User(_) => None,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateAppointmentRequest {
    pub branch_id: Uuid,
    pub service_id: Uuid,
    pub aesthetician_id: Option<Uuid>,
    pub start_time: NaiveDateTime,

    /// Staff only: book for this registered customer
    pub user_id: Option<Uuid>,
    /// Staff only: book for this walk-in
    pub walk_in_id: Option<Uuid>,

    #[validate(length(min = 3, max = 32))]
    pub voucher_code: Option<String>,

    #[validate(length(max = 1000))]
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateAppointmentRequest {
    pub status: Option<AppointmentStatus>,
    pub branch_id: Option<Uuid>,
    pub aesthetician_id: Option<Uuid>,
    pub start_time: Option<NaiveDateTime>,

    #[validate(length(max = 1000))]
    pub notes: Option<String>,
}

/// `GET /appointment?branch_id=..&date=..&status=..&payment_status=..`
#[derive(Debug, Default, Deserialize)]
pub struct AppointmentFilter {
    pub branch_id: Option<Uuid>,
    pub date: Option<NaiveDate>,
    pub status: Option<AppointmentStatus>,
    pub payment_status: Option<PaymentStatus>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use AppointmentStatus::*;

    #[test]
    fn active_set_matches_queue_statuses() {
        assert!(Pending.is_active());
        assert!(Waiting.is_active());
        assert!(OnProcess.is_active());
        assert!(!Completed.is_active());
        assert!(!Cancelled.is_active());
        assert_eq!(active_status_values(), vec!["waiting", "on-process", "pending"]);
    }

    #[test]
    fn terminal_states_are_frozen() {
        for next in [Pending, Waiting, OnProcess, Completed, Cancelled] {
            assert!(!Completed.can_transition_to(next));
            assert!(!Cancelled.can_transition_to(next));
        }
    }

    #[test]
    fn front_desk_workflow() {
        assert!(Pending.can_transition_to(Waiting));
        assert!(Waiting.can_transition_to(OnProcess));
        assert!(OnProcess.can_transition_to(Completed));
        assert!(!Pending.can_transition_to(Completed));
        assert!(!OnProcess.can_transition_to(Waiting));
    }

    #[test]
    fn status_wire_names() {
        assert_eq!(serde_json::to_value(OnProcess).unwrap(), serde_json::json!("on-process"));
        let parsed: AppointmentStatus = serde_json::from_str("\"on-process\"").unwrap();
        assert_eq!(parsed, OnProcess);
    }

    #[test]
    fn owner_is_exclusive() {
        let id = Uuid::from_u128(5);
        assert_eq!(Owner::from_ids(Some(id), None).unwrap(), Owner::User(id));
        assert_eq!(Owner::from_ids(None, Some(id)).unwrap().walk_in_id(), Some(id));
        assert!(Owner::from_ids(Some(id), Some(id)).is_err());
        assert!(Owner::from_ids(None, None).is_err());
    }
}

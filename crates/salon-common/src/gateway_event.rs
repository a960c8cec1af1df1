//! Gateway event types — shared between API and Gateway crates.
//!
//! The API emits events after an appointment mutation commits and the gateway
//! forwards them to sockets joined to the appointments room.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Name of the single room every identified socket joins.
pub const APPOINTMENTS_ROOM: &str = "appointments";

/// Appointment lifecycle events pushed to clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentEventKind {
    NewAppointment,
    AppointmentUpdated,
    AppointmentDeleted,
}

impl AppointmentEventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NewAppointment => "new_appointment",
            Self::AppointmentUpdated => "appointment_updated",
            Self::AppointmentDeleted => "appointment_deleted",
        }
    }
}

impl std::fmt::Display for AppointmentEventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Events broadcast through the gateway to connected clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayEvent {
    pub event_type: AppointmentEventKind,
    /// Event payload as JSON
    pub data: serde_json::Value,
    /// Branch the appointment belongs to
    pub branch_id: Option<Uuid>,
    /// Registered customer owning the appointment (None for walk-ins)
    pub owner_user_id: Option<Uuid>,
}

impl GatewayEvent {
    pub fn appointment(
        event_type: AppointmentEventKind,
        data: serde_json::Value,
        branch_id: Uuid,
        owner_user_id: Option<Uuid>,
    ) -> Self {
        Self {
            event_type,
            data,
            branch_id: Some(branch_id),
            owner_user_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_names_match_wire_contract() {
        assert_eq!(AppointmentEventKind::NewAppointment.to_string(), "new_appointment");
        assert_eq!(
            serde_json::to_value(AppointmentEventKind::AppointmentDeleted).unwrap(),
            serde_json::json!("appointment_deleted")
        );
    }
}

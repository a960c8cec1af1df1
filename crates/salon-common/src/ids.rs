//! Identifier helpers.
//!
//! Every row key is a UUID v7 so primary keys sort by creation time.

use uuid::Uuid;

const INVOICE_PREFIX: &str = "appt-";

/// Generate a new time-sortable row ID.
pub fn generate_id() -> Uuid {
    Uuid::now_v7()
}

/// External reference sent to the payment provider for an appointment invoice.
pub fn invoice_external_id(appointment_id: Uuid) -> String {
    format!("{INVOICE_PREFIX}{appointment_id}")
}

/// Recover the appointment ID from a provider callback's `external_id`.
pub fn parse_invoice_external_id(external_id: &str) -> Option<Uuid> {
    external_id
        .strip_prefix(INVOICE_PREFIX)
        .and_then(|raw| Uuid::parse_str(raw).ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_time_sortable() {
        let id1 = generate_id();
        std::thread::sleep(std::time::Duration::from_millis(2));
        let id2 = generate_id();
        assert!(id1 < id2);
    }

    #[test]
    fn external_id_maps_back_to_appointment() {
        let id = generate_id();
        let external = invoice_external_id(id);
        assert!(external.starts_with("appt-"));
        assert_eq!(parse_invoice_external_id(&external), Some(id));
    }

    #[test]
    fn foreign_external_ids_are_ignored() {
        assert_eq!(parse_invoice_external_id("order-123"), None);
        assert_eq!(parse_invoice_external_id("appt-not-a-uuid"), None);
    }
}

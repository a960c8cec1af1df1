//! Input validation utilities.
//!
//! Centralized validation helpers used across API routes.

use std::sync::LazyLock;

use validator::Validate;

use crate::error::SalonError;

/// Loose international phone format: optional `+`, digits, spaces, dashes.
pub static PHONE_REGEX: LazyLock<regex::Regex> =
    LazyLock::new(|| regex::Regex::new(r"^\+?[0-9][0-9 \-]{6,18}[0-9]$").unwrap());

/// Validate a request body, returning a SalonError::Validation on failure.
pub fn validate_request<T: Validate>(body: &T) -> Result<(), SalonError> {
    body.validate().map_err(|e| SalonError::Validation {
        message: format_validation_errors(&e),
    })
}

/// Format validation errors into a human-readable string, nested structs included.
fn format_validation_errors(errors: &validator::ValidationErrors) -> String {
    let mut messages = Vec::new();
    collect_messages(errors, &mut messages);
    messages.join("; ")
}

fn collect_messages(errors: &validator::ValidationErrors, out: &mut Vec<String>) {
    for (field, kind) in errors.errors() {
        match kind {
            validator::ValidationErrorsKind::Field(errs) => {
                out.extend(errs.iter().map(|e| {
                    e.message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| format!("Invalid value for '{field}'"))
                }));
            }
            validator::ValidationErrorsKind::Struct(inner) => collect_messages(inner, out),
            validator::ValidationErrorsKind::List(items) => {
                for inner in items.values() {
                    collect_messages(inner, out);
                }
            }
        }
    }
}

/// Reject names that are empty once trimmed.
pub fn validate_name(name: &str) -> Result<(), SalonError> {
    if name.trim().is_empty() {
        return Err(SalonError::Validation {
            message: "Name cannot be empty or whitespace only".into(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::branch::{AddressInput, CreateBranchRequest};

    #[test]
    fn phone_pattern() {
        assert!(PHONE_REGEX.is_match("+63 917 123 4567"));
        assert!(PHONE_REGEX.is_match("09171234567"));
        assert!(!PHONE_REGEX.is_match("call me"));
        assert!(!PHONE_REGEX.is_match("12"));
    }

    #[test]
    fn nested_errors_are_reported() {
        let body = CreateBranchRequest {
            name: "Makati".into(),
            phone: None,
            slot_capacity: 0,
            address: AddressInput {
                street: String::new(),
                city: "Makati".into(),
                province: "Metro Manila".into(),
                postal_code: None,
            },
        };
        let err = validate_request(&body).unwrap_err().to_string();
        assert!(err.contains("Slot capacity must be 1-100"));
        assert!(err.contains("Street is required"));
    }

    #[test]
    fn blank_names_rejected() {
        assert!(validate_name("   ").is_err());
        assert!(validate_name("Glow Makati").is_ok());
    }
}

//! Field rules and the price table for pass issuance.
//!
//! Pure functions; every violated rule is collected so the operator sees the
//! whole list at once instead of fixing fields one at a time.

use std::borrow::Cow;

use validator::{Validate, ValidationError, ValidationErrors};

use super::models::{IssuePassRequest, PassKind};

/// Fixed price table. Amounts are derived from the pass kind here and
/// nowhere else; client-supplied amounts are never trusted.
pub const PRICE_SINGLE: i32 = 499;
pub const PRICE_COUPLE: i32 = 999;

pub fn price_for(kind: PassKind) -> i32 {
    match kind {
        PassKind::Single => PRICE_SINGLE,
        PassKind::Couple => PRICE_COUPLE,
    }
}

/// Exactly 10 ASCII digits.
pub fn validate_phone(phone: &str) -> Result<(), ValidationError> {
    if phone.len() == 10 && phone.bytes().all(|b| b.is_ascii_digit()) {
        Ok(())
    } else {
        Err(rule("phone", "must be exactly 10 digits"))
    }
}

/// Validate an issuance request, combining the unconditional field rules
/// with the kind-dependent ones.
pub fn validate_issue_request(request: &IssuePassRequest) -> Result<(), ValidationErrors> {
    let mut errors = match request.validate() {
        Ok(()) => ValidationErrors::new(),
        Err(errors) => errors,
    };

    match request.pass_type {
        PassKind::Couple => {
            if request.name2.as_deref().map_or(true, |n| n.is_empty()) {
                errors.add("name2", rule("required", "Name 2 is required for couple pass"));
            }
            match request.phone2.as_deref() {
                Some(phone) if validate_phone(phone).is_ok() => {}
                _ => errors.add(
                    "phone2",
                    rule("phone", "Phone 2 must be 10 digits for couple pass"),
                ),
            }
        }
        PassKind::Single => {
            if request.name2.is_some() || request.phone2.is_some() {
                errors.add(
                    "name2",
                    rule("not_allowed", "A single pass has no second holder"),
                );
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn rule(code: &'static str, message: &'static str) -> ValidationError {
    let mut error = ValidationError::new(code);
    error.message = Some(Cow::from(message));
    error
}

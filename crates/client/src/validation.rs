//! Input validation for product configuration and payment data.
//!
//! Lengths are counted in characters, not bytes.

use crate::error::ValidationError;

/// Length of a payment profile id.
pub const PAYMENT_ID_LENGTH: usize = 24;

/// Length of an API key.
pub const API_KEY_LENGTH: usize = 36;

/// Longest accepted point-of-sale id.
pub const MAX_POS_ID_LENGTH: usize = 36;

/// Longest description on a point-of-sale payment.
pub const MAX_POS_DESCRIPTION_LENGTH: usize = 140;

/// Longest description on an invoice or receipt URL.
pub const MAX_TRANSFER_DESCRIPTION_LENGTH: usize = 35;

/// Longest reference, on every product.
pub const MAX_REFERENCE_LENGTH: usize = 35;

/// Longest bulk id.
pub const MAX_BULK_ID_LENGTH: usize = 35;

/// Longest shop id.
pub const MAX_SHOP_ID_LENGTH: usize = 36;

/// Longest shop name.
pub const MAX_SHOP_NAME_LENGTH: usize = 36;

/// Checks a payment profile id.
///
/// # Errors
///
/// Returns [`ValidationError::PaymentId`] unless the id is exactly 24
/// characters long.
pub fn validate_payment_id(payment_id: &str) -> Result<(), ValidationError> {
    if payment_id.chars().count() == PAYMENT_ID_LENGTH {
        Ok(())
    } else {
        Err(ValidationError::PaymentId)
    }
}

/// Checks an API key. Only the length is known to be fixed.
///
/// # Errors
///
/// Returns [`ValidationError::ApiKey`] unless the key is exactly 36
/// characters long.
pub fn validate_api_key(api_key: &str) -> Result<(), ValidationError> {
    if api_key.chars().count() == API_KEY_LENGTH {
        Ok(())
    } else {
        Err(ValidationError::ApiKey)
    }
}

/// Checks a point-of-sale id: 1 to 36 ASCII digits and letters, the letters
/// either all lower case or all upper case.
///
/// # Errors
///
/// Returns [`ValidationError::PosId`] otherwise.
pub fn validate_pos_id(pos_id: &str) -> Result<(), ValidationError> {
    let in_range = (1..=MAX_POS_ID_LENGTH).contains(&pos_id.len());
    let lower = pos_id.bytes().all(|b| b.is_ascii_lowercase() || b.is_ascii_digit());
    let upper = pos_id.bytes().all(|b| b.is_ascii_uppercase() || b.is_ascii_digit());
    if in_range && (lower || upper) {
        Ok(())
    } else {
        Err(ValidationError::PosId)
    }
}

/// Checks an optional field against a character limit.
///
/// # Errors
///
/// Returns `err` when the value is longer than `max` characters.
pub fn ensure_max_len(value: Option<&str>, max: usize, err: ValidationError) -> Result<(), ValidationError> {
    match value {
        Some(value) if value.chars().count() > max => Err(err),
        _ => Ok(()),
    }
}

/// The first `max` characters of `value`.
#[must_use]
pub fn truncate(value: &str, max: usize) -> String {
    value.chars().take(max).collect()
}

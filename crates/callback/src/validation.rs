//! Header claim checks.
//!
//! Small, pure checks applied to a decoded [`JoseHeader`](crate::JoseHeader)
//! before any key is looked up. Each returns the exact rejection the
//! verifier reports.

use chrono::{DateTime, Utc};

use crate::error::{CallbackError, Result};

/// Expected `typ`, compared case-insensitively.
pub const EXPECTED_TYPE: &str = "JOSE+JSON";

/// The only signature algorithm callbacks are signed with.
pub const ACCEPTED_ALGORITHM: &str = "ES256";

/// Expected issuer claim.
pub const EXPECTED_ISSUER: &str = "Payconiq";

/// How far in the future an issue time may lie (100 ms clock skew).
pub const MAX_FUTURE_SKEW: chrono::Duration = chrono::Duration::milliseconds(100);

/// Checks `typ` is `JOSE+JSON` in any case.
///
/// # Errors
///
/// Returns UNSUPPORTED "Unsupported type" otherwise.
pub fn validate_type(typ: &str) -> Result<()> {
    if typ.to_uppercase() == EXPECTED_TYPE {
        Ok(())
    } else {
        Err(CallbackError::unsupported_type())
    }
}

/// Checks `alg` is `ES256` in any case.
///
/// # Errors
///
/// Returns UNSUPPORTED "Unsupported algorithm" otherwise, including for
/// `none` and symmetric algorithms.
///
/// # Examples
///
/// ```
/// use payconiq_callback::validation::validate_algorithm;
///
/// assert!(validate_algorithm("ES256").is_ok());
/// assert!(validate_algorithm("es256").is_ok());
/// assert!(validate_algorithm("RS256").is_err());
/// assert!(validate_algorithm("none").is_err());
/// ```
pub fn validate_algorithm(alg: &str) -> Result<()> {
    if alg.to_uppercase() == ACCEPTED_ALGORITHM {
        Ok(())
    } else {
        Err(CallbackError::unsupported_algorithm())
    }
}

/// Checks the issuer claim is exactly `Payconiq`.
///
/// # Errors
///
/// Returns INVALID "Invalid issuer" otherwise.
pub fn validate_issuer(issuer: &str) -> Result<()> {
    if issuer == EXPECTED_ISSUER { Ok(()) } else { Err(CallbackError::invalid_issuer()) }
}

/// Parses the issue time and checks it lies within `[now - max_age, now + 100ms]`.
///
/// Both bounds are inclusive.
///
/// # Errors
///
/// Returns INVALID "Invalid issued at" when `issued_at` is not RFC 3339 or
/// falls outside the window.
pub fn validate_issued_at(
    issued_at: &str,
    now: DateTime<Utc>,
    max_age: chrono::Duration,
) -> Result<DateTime<Utc>> {
    let iat = DateTime::parse_from_rfc3339(issued_at)
        .map_err(|_| CallbackError::invalid_issued_at())?
        .with_timezone(&Utc);

    if now - iat > max_age || iat - now > MAX_FUTURE_SKEW {
        tracing::warn!(iat = %iat, now = %now, "Invalid issued at");
        return Err(CallbackError::invalid_issued_at());
    }
    Ok(iat)
}

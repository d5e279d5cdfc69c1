//! Callback verification error types.
//!
//! This module defines the errors that can occur while verifying a Payconiq
//! callback signature or while fetching the published signing keys.

use std::{fmt, sync::Arc};

use thiserror::Error;

/// A boxed error type for source chain tracking.
pub type BoxError = Arc<dyn std::error::Error + Send + Sync>;

/// Category of a rejected callback.
///
/// Every category means the same thing to a caller: reject the callback.
/// The category only tells which part of the envelope was wrong.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum VerificationCategory {
    /// The compact detached signature envelope is malformed.
    Incorrect,
    /// A header claim does not match what this verifier expects.
    Invalid,
    /// The header announces a type or algorithm that is not supported.
    Unsupported,
    /// The cryptographic check failed.
    Failed,
}

impl VerificationCategory {
    /// Upper-case name of the category, as used in logs.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Incorrect => "INCORRECT",
            Self::Invalid => "INVALID",
            Self::Unsupported => "UNSUPPORTED",
            Self::Failed => "FAILED",
        }
    }
}

impl fmt::Display for VerificationCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors produced while verifying a callback.
///
/// # Non-exhaustive
///
/// This enum is marked `#[non_exhaustive]`; new variants may be added in
/// future minor releases without a semver-breaking change. Downstream match
/// expressions must include a wildcard arm (`_ =>`).
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CallbackError {
    /// The callback was rejected by one of the verification checks.
    #[error("{message}")]
    Verification {
        /// Which kind of check rejected the callback.
        category: VerificationCategory,
        /// Human-readable reason, stable across releases.
        message: &'static str,
    },

    /// The protected header could not be decoded as base64 JSON.
    #[error("Malformed protected header: {message}")]
    MalformedHeader {
        /// Description of the decoding failure.
        message: String,
    },

    /// The published key set could not be retrieved.
    #[error("Key fetch failed: {message}")]
    KeyFetch {
        /// Description of the fetch failure.
        message: String,
        /// The underlying transport or decoding error.
        #[source]
        source: Option<BoxError>,
    },
}

impl CallbackError {
    /// Creates a `Verification` error with the given category and message.
    #[must_use]
    pub fn verification(category: VerificationCategory, message: &'static str) -> Self {
        Self::Verification { category, message }
    }

    /// The signature does not have the `<header>..<signature>` shape.
    #[must_use]
    pub fn incorrect_signature() -> Self {
        Self::verification(VerificationCategory::Incorrect, "Incorrect compact detached signature")
    }

    /// A required header member is missing or has the wrong JSON type.
    #[must_use]
    pub fn invalid_header() -> Self {
        Self::verification(VerificationCategory::Invalid, "Invalid header")
    }

    /// The `typ` header is not `JOSE+JSON`.
    #[must_use]
    pub fn unsupported_type() -> Self {
        Self::verification(VerificationCategory::Unsupported, "Unsupported type")
    }

    /// The `alg` header is not `ES256`.
    #[must_use]
    pub fn unsupported_algorithm() -> Self {
        Self::verification(VerificationCategory::Unsupported, "Unsupported algorithm")
    }

    /// The issuer claim is not `Payconiq`.
    #[must_use]
    pub fn invalid_issuer() -> Self {
        Self::verification(VerificationCategory::Invalid, "Invalid issuer")
    }

    /// The subject claim is not the bound payment id.
    #[must_use]
    pub fn invalid_subject() -> Self {
        Self::verification(VerificationCategory::Invalid, "Invalid subject")
    }

    /// No callback URL was configured or supplied.
    #[must_use]
    pub fn missing_callback_url() -> Self {
        Self::verification(VerificationCategory::Invalid, "Missing callbackURL")
    }

    /// The path claim does not match the expected callback URL.
    #[must_use]
    pub fn invalid_path() -> Self {
        Self::verification(VerificationCategory::Invalid, "Invalid path")
    }

    /// The issued-at claim is unparseable or outside the freshness window.
    #[must_use]
    pub fn invalid_issued_at() -> Self {
        Self::verification(VerificationCategory::Invalid, "Invalid issued at")
    }

    /// The `kid` is unknown even after a forced key refresh.
    #[must_use]
    pub fn missing_kid() -> Self {
        Self::verification(VerificationCategory::Invalid, "Missing kid")
    }

    /// The signature does not verify against the resolved key.
    #[must_use]
    pub fn failed_verification() -> Self {
        Self::verification(VerificationCategory::Failed, "Failed verification")
    }

    /// The jti was already accepted within the freshness window.
    #[must_use]
    pub fn replayed_jti() -> Self {
        Self::verification(VerificationCategory::Invalid, "Replayed jti")
    }

    /// Creates a `MalformedHeader` error.
    #[must_use]
    pub fn malformed_header(message: impl Into<String>) -> Self {
        Self::MalformedHeader { message: message.into() }
    }

    /// Creates a `KeyFetch` error without a source.
    #[must_use]
    pub fn key_fetch(message: impl Into<String>) -> Self {
        Self::KeyFetch { message: message.into(), source: None }
    }

    /// Creates a `KeyFetch` error with a message and source error.
    #[must_use]
    pub fn key_fetch_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::KeyFetch { message: message.into(), source: Some(Arc::new(source)) }
    }

    /// The verification category, if this error is a rejection.
    ///
    /// Decoding and fetch failures carry no category.
    #[must_use]
    pub fn category(&self) -> Option<VerificationCategory> {
        match self {
            Self::Verification { category, .. } => Some(*category),
            _ => None,
        }
    }
}

/// Result type alias for callback verification.
pub type Result<T> = std::result::Result<T, CallbackError>;

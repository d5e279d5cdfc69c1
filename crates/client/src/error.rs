//! Error types for Payconiq products.
//!
//! [`ValidationError`] covers input the library refuses before anything is
//! sent; [`PayconiqError`] wraps it together with provider and transport
//! failures.

use payconiq_callback::CallbackError;
use thiserror::Error;

/// Input rejected before any request is built.
///
/// The display strings are stable; callers match on them in user-facing
/// messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum ValidationError {
    /// The payment profile id is not 24 characters long.
    #[error("Invalid Payment id")]
    PaymentId,
    /// The API key is not 36 characters long.
    #[error("Invalid API key")]
    ApiKey,
    /// The point-of-sale id is not 1-36 characters of a single letter case.
    #[error("Invalid posId")]
    PosId,
    /// The amount is not a whole number of cents in `1..=999999`.
    #[error("Invalid amount")]
    Amount,
    /// The description exceeds the product's limit.
    #[error("Description too long")]
    DescriptionTooLong,
    /// The reference exceeds 35 characters.
    #[error("Reference too long")]
    ReferenceTooLong,
    /// The bulk id exceeds 35 characters.
    #[error("BulkId too long")]
    BulkIdTooLong,
    /// The shop id exceeds 36 characters.
    #[error("ShopId too long")]
    ShopIdTooLong,
    /// The shop name exceeds 36 characters.
    #[error("ShopName too long")]
    ShopNameTooLong,
    /// The product type name is not one of `predefined`, `invoice`, `receipt`.
    #[error("Invalid product type")]
    ProductType,
    /// A shared key cache serves a different environment than the product.
    #[error("Key cache environment mismatch")]
    EnvironmentMismatch,
}

/// Errors produced by product operations.
///
/// # Non-exhaustive
///
/// New variants may be added in minor releases; match with a wildcard arm.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum PayconiqError {
    /// Input was rejected locally.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The provider refused to create the payment.
    #[error("Error creating payment: {message} ({trace_id})")]
    CreatePayment {
        /// HTTP status returned by the provider.
        status: u16,
        /// Provider message, or the raw body when it was not JSON.
        message: String,
        /// Provider trace id, `-` when absent.
        trace_id: String,
    },

    /// The provider refused to cancel the payment.
    #[error("Error {status} deleting payment: {message} ({trace_id})")]
    CancelPayment {
        /// HTTP status returned by the provider.
        status: u16,
        /// Provider message, or the raw body when it was not JSON.
        message: String,
        /// Provider trace id, `-` when absent.
        trace_id: String,
    },

    /// The payment resource carries no cancel link.
    #[error("No cancel link found")]
    MissingCancelLink,

    /// The request could not be sent or the response could not be read.
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Callback verification failed.
    #[error(transparent)]
    Callback(#[from] CallbackError),
}

impl PayconiqError {
    /// The validation failure, if this is one.
    #[must_use]
    pub fn as_validation(&self) -> Option<ValidationError> {
        match self {
            Self::Validation(err) => Some(*err),
            _ => None,
        }
    }
}

/// Result type alias for product operations.
pub type Result<T> = std::result::Result<T, PayconiqError>;

//! Wire types of the point-of-sale payment API.
//!
//! Field names follow the provider's camelCase JSON. Response types are
//! lenient about optional members; request types omit unset members.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::amount::Amount;

/// Payment currency. Payconiq only settles in euro.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Currency {
    /// Euro.
    #[default]
    #[serde(rename = "EUR")]
    Eur,
}

/// Lifecycle state of a payment.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[non_exhaustive]
pub enum PaymentStatus {
    /// Created, waiting for a customer.
    Pending,
    /// A customer scanned the code.
    Identified,
    /// The customer confirmed the payment.
    Authorized,
    /// The customer's bank refused the payment.
    AuthorizationFailed,
    /// Money is on its way to the merchant.
    Succeeded,
    /// The payment failed.
    Failed,
    /// The merchant cancelled the payment.
    Cancelled,
    /// Nobody paid in time.
    Expired,
    /// A status this library does not know yet.
    #[serde(other)]
    Unknown,
}

impl PaymentStatus {
    /// Whether the payment can no longer change state.
    #[must_use]
    pub fn is_final(&self) -> bool {
        matches!(
            self,
            Self::AuthorizationFailed | Self::Succeeded | Self::Failed | Self::Cancelled | Self::Expired
        )
    }
}

/// Optional fields of a point-of-sale payment.
#[derive(Clone, Debug, Default, PartialEq, Eq, bon::Builder)]
pub struct PosPaymentOptions {
    /// Where the provider posts status callbacks for this payment.
    #[builder(into)]
    pub callback_url: Option<String>,
    /// Payment currency; euro when unset.
    pub currency: Option<Currency>,
    /// Shown to the customer, at most 140 characters.
    #[builder(into)]
    pub description: Option<String>,
    /// Merchant reference, at most 35 characters.
    #[builder(into)]
    pub reference: Option<String>,
    /// Groups payments in one bank transfer, at most 35 characters.
    #[builder(into)]
    pub bulk_id: Option<String>,
    /// Shop identifier, at most 36 characters.
    #[builder(into)]
    pub shop_id: Option<String>,
    /// Shop name, at most 36 characters.
    #[builder(into)]
    pub shop_name: Option<String>,
}

/// Body of `POST /v3/payments/pos`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PosPaymentRequest {
    /// Amount in cents.
    pub amount: i64,
    /// Point-of-sale id the payment is shown on.
    pub pos_id: String,
    /// Payment currency.
    pub currency: Currency,
    /// Callback URL for this payment.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub callback_url: Option<String>,
    /// Description shown to the customer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Merchant reference.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    /// Bulk transfer id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bulk_id: Option<String>,
    /// Shop identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shop_id: Option<String>,
    /// Shop name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shop_name: Option<String>,
}

/// A hypermedia link.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    /// Target URL.
    #[serde(default)]
    pub href: Option<String>,
}

/// Links attached to a payment resource.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Links {
    /// The payment itself.
    #[serde(default, rename = "self")]
    pub self_link: Option<Link>,
    /// Deep link opening the payment in the app.
    #[serde(default)]
    pub deeplink: Option<Link>,
    /// QR code for the payment.
    #[serde(default)]
    pub qrcode: Option<Link>,
    /// `DELETE` target cancelling the payment.
    #[serde(default)]
    pub cancel: Option<Link>,
}

/// The merchant a payment is made to.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Creditor {
    /// Payment profile id.
    #[serde(default)]
    pub profile_id: String,
    /// Merchant id.
    #[serde(default)]
    pub merchant_id: String,
    /// Merchant name.
    #[serde(default)]
    pub name: String,
    /// Merchant account.
    #[serde(default)]
    pub iban: String,
    /// Callback URL registered for the payment.
    #[serde(default)]
    pub callback_url: Option<String>,
}

/// The customer who paid.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Debtor {
    /// Customer name.
    #[serde(default)]
    pub name: Option<String>,
    /// Customer account, usually masked.
    #[serde(default)]
    pub iban: Option<String>,
}

/// A created point-of-sale payment.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PosPaymentResponse {
    /// Provider payment id.
    pub payment_id: String,
    /// Current state.
    pub status: PaymentStatus,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// When the payment stops being payable.
    pub expires_at: DateTime<Utc>,
    /// Description shown to the customer.
    #[serde(default)]
    pub description: Option<String>,
    /// Merchant reference.
    #[serde(default)]
    pub reference: Option<String>,
    /// Amount in cents.
    pub amount: i64,
    /// Payment currency.
    #[serde(default)]
    pub currency: Option<Currency>,
    /// Merchant details.
    #[serde(default)]
    pub creditor: Creditor,
    /// Related links.
    #[serde(default, rename = "_links")]
    pub links: Links,
}

impl PosPaymentResponse {
    /// The URL that cancels this payment, if the provider sent one.
    #[must_use]
    pub fn cancel_link(&self) -> Option<&str> {
        self.links
            .cancel
            .as_ref()
            .and_then(|link| link.href.as_deref())
            .filter(|href| !href.is_empty())
    }
}

/// Body of a point-of-sale status callback.
///
/// Deserialize it only after the callback's signature has been verified
/// over the raw body.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PosCallbackBody {
    /// Provider payment id.
    pub payment_id: String,
    /// Amount in cents.
    pub amount: i64,
    /// Amount transferred to the merchant.
    #[serde(default)]
    pub transfer_amount: i64,
    /// Tip added by the customer.
    #[serde(default)]
    pub tipping_amount: i64,
    /// Amount plus tip.
    #[serde(default)]
    pub total_amount: i64,
    /// Payment currency.
    #[serde(default)]
    pub currency: Option<Currency>,
    /// Description shown to the customer.
    #[serde(default)]
    pub description: Option<String>,
    /// Merchant reference.
    #[serde(default)]
    pub reference: Option<String>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// When the payment stops being payable.
    pub expires_at: DateTime<Utc>,
    /// Completion time, once succeeded.
    #[serde(default)]
    pub succeeded_at: Option<DateTime<Utc>>,
    /// New state.
    pub status: PaymentStatus,
    /// Customer details.
    #[serde(default)]
    pub debtor: Option<Debtor>,
}

/// Error code reported by the provider.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[non_exhaustive]
#[allow(missing_docs)]
pub enum ProviderErrorCode {
    Unauthorized,
    AccessDenied,
    PaymentNotFound,
    TechnicalError,
    CallerNotAllowedToCancel,
    PaymentNotPending,
    PaymentConflict,
    BodyMissing,
    FieldRequired,
    QrNoLongerInUse,
    UnableToPayCreditor,
    TryAgainLater,
    #[serde(other)]
    Unknown,
}

/// Error body returned by the provider on non-success responses.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderErrorBody {
    /// Machine-readable code.
    #[serde(default)]
    pub code: Option<ProviderErrorCode>,
    /// Human-readable message.
    #[serde(default)]
    pub message: String,
    /// Trace id to quote to Payconiq support.
    #[serde(default)]
    pub trace_id: String,
    /// Span id within the trace.
    #[serde(default)]
    pub span_id: String,
}

impl ProviderErrorBody {
    /// Parses an error body, keeping the raw text as the message when it is
    /// not JSON.
    #[must_use]
    pub fn from_text(text: &str) -> Self {
        serde_json::from_str(text).unwrap_or_else(|_| Self { message: text.trim().to_owned(), ..Self::default() })
    }

    /// The trace id, or `-` when the provider sent none.
    #[must_use]
    pub fn trace_id_or_dash(&self) -> String {
        if self.trace_id.is_empty() { "-".to_owned() } else { self.trace_id.clone() }
    }
}

/// What an invoice or receipt URL encodes.
#[derive(Clone, Debug, PartialEq, Eq, bon::Builder, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TransferInfo {
    /// Amount in cents.
    #[builder(into)]
    pub amount: Amount,
    /// Shown to the customer, at most 35 characters.
    #[serde(default)]
    #[builder(into)]
    pub description: Option<String>,
    /// Merchant reference, at most 35 characters.
    #[serde(default)]
    #[builder(into)]
    pub reference: Option<String>,
}

//! Invoice and receipt products.
//!
//! Both encode the whole payment in a URL the customer scans or opens:
//!
//! ```text
//! https://payconiq.com/t/1/{paymentId}?A={amount}[&D={description}][&R={reference}]
//! ```
//!
//! The two products differ only in how Payconiq presents them to the
//! customer.

use url::form_urlencoded;

use crate::{
    error::ValidationError,
    payment::TransferInfo,
    qrcode::{QrCodeOptions, make_qr_code_url},
    validation::{MAX_REFERENCE_LENGTH, MAX_TRANSFER_DESCRIPTION_LENGTH, ensure_max_len},
};

/// Base of invoice and receipt URLs.
pub const TRANSFER_URL_BASE: &str = "https://payconiq.com/t/1";

/// Checks a transfer's amount and field lengths.
///
/// # Errors
///
/// Returns [`ValidationError::Amount`], [`ValidationError::DescriptionTooLong`]
/// or [`ValidationError::ReferenceTooLong`], checked in that order.
pub fn validate_transfer(info: &TransferInfo) -> std::result::Result<i64, ValidationError> {
    let cents = info.amount.cents()?;
    ensure_max_len(info.description.as_deref(), MAX_TRANSFER_DESCRIPTION_LENGTH, ValidationError::DescriptionTooLong)?;
    ensure_max_len(info.reference.as_deref(), MAX_REFERENCE_LENGTH, ValidationError::ReferenceTooLong)?;
    Ok(cents)
}

/// Builds the payment URL for `info` under `payment_id`.
///
/// # Errors
///
/// As [`validate_transfer`].
pub fn transfer_url(payment_id: &str, info: &TransferInfo) -> std::result::Result<String, ValidationError> {
    let cents = validate_transfer(info)?;
    let mut query = form_urlencoded::Serializer::new(String::new());
    query.append_pair("A", &cents.to_string());
    if let Some(description) = info.description.as_deref().filter(|d| !d.is_empty()) {
        query.append_pair("D", description);
    }
    if let Some(reference) = info.reference.as_deref().filter(|r| !r.is_empty()) {
        query.append_pair("R", reference);
    }
    Ok(format!("{TRANSFER_URL_BASE}/{payment_id}?{}", query.finish()))
}

macro_rules! transfer_product {
    ($(#[$doc:meta])* $name:ident) => {
        crate::product::product_wrapper! {
            $(#[$doc])*
            $name
        }

        impl $name {
            /// The payment URL for `info`.
            ///
            /// # Errors
            ///
            /// As [`validate_transfer`].
            pub fn payment_url(&self, info: &TransferInfo) -> std::result::Result<String, ValidationError> {
                transfer_url(self.product.payment_id(), info)
            }

            /// QR-code URL for the payment described by `info`.
            ///
            /// # Errors
            ///
            /// As [`validate_transfer`].
            pub fn qr_code_url(
                &self,
                info: &TransferInfo,
                options: &QrCodeOptions,
            ) -> std::result::Result<String, ValidationError> {
                Ok(self.qr_code_url_for(&self.payment_url(info)?, options))
            }

            /// QR-code URL for an already built payment URL.
            #[must_use]
            pub fn qr_code_url_for(&self, payment_url: &str, options: &QrCodeOptions) -> String {
                make_qr_code_url(payment_url, &self.product.default_qr_options().merged_with(options))
            }
        }
    };
}

transfer_product! {
    /// An invoice product: one URL per invoice, amount and reference included.
    Invoice
}

transfer_product! {
    /// A receipt product: one URL per printed receipt.
    Receipt
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use rstest::rstest;

    use super::*;
    use crate::amount::Amount;

    const PAYMENT_ID: &str = "testPaymentIdpaymenTtesT";

    #[rstest]
    #[case::zero(TransferInfo::builder().amount(0).build(), ValidationError::Amount)]
    #[case::negative(TransferInfo::builder().amount(-1).build(), ValidationError::Amount)]
    #[case::too_large(TransferInfo::builder().amount(1_000_000).build(), ValidationError::Amount)]
    #[case::not_numeric(TransferInfo::builder().amount("abc").build(), ValidationError::Amount)]
    #[case::description(TransferInfo::builder().amount(1).description("d".repeat(36)).build(), ValidationError::DescriptionTooLong)]
    #[case::reference(TransferInfo::builder().amount(1).reference("r".repeat(36)).build(), ValidationError::ReferenceTooLong)]
    #[case::amount_checked_first(TransferInfo::builder().amount(0).description("d".repeat(36)).build(), ValidationError::Amount)]
    fn test_transfer_rejected(#[case] info: TransferInfo, #[case] expected: ValidationError) {
        assert_eq!(transfer_url(PAYMENT_ID, &info), Err(expected));
    }

    #[test]
    fn test_numeric_text_coerced() {
        let info = TransferInfo::builder().amount(Amount::from("1254")).build();
        assert_eq!(transfer_url(PAYMENT_ID, &info).unwrap(), format!("https://payconiq.com/t/1/{PAYMENT_ID}?A=1254"));
    }

    #[test]
    fn test_empty_fields_omitted() {
        let info = TransferInfo::builder().amount(5).description("").reference("").build();
        assert_eq!(transfer_url(PAYMENT_ID, &info).unwrap(), format!("https://payconiq.com/t/1/{PAYMENT_ID}?A=5"));
    }

    #[test]
    fn test_limits_accepted() {
        let info = TransferInfo::builder()
            .amount(999_999)
            .description("d".repeat(35))
            .reference("r".repeat(35))
            .build();
        assert!(transfer_url(PAYMENT_ID, &info).is_ok());
    }
}

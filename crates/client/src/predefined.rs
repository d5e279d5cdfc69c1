//! Predefined point-of-sale products.
//!
//! A predefined product prints one static QR code per point of sale. The
//! code points at `https://payconiq.com/l/1/{paymentId}/{posId}`; payments
//! for it are created over REST and picked up by the customer's app when
//! they scan.

use crate::{
    amount::Amount,
    error::{Result, ValidationError},
    payment::{PosPaymentOptions, PosPaymentRequest, PosPaymentResponse},
    qrcode::{QrCodeOptions, make_qr_code_url},
    validation::{
        MAX_BULK_ID_LENGTH, MAX_POS_DESCRIPTION_LENGTH, MAX_REFERENCE_LENGTH, MAX_SHOP_ID_LENGTH,
        MAX_SHOP_NAME_LENGTH, ensure_max_len, truncate, validate_pos_id,
    },
};

/// Base of point-of-sale deep links.
pub const POS_URL_BASE: &str = "https://payconiq.com/l/1";

crate::product::product_wrapper! {
    /// A predefined point-of-sale product.
    Predefined
}

impl Predefined {
    /// Deep link for the point of sale `pos_id`.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::PosId`] for an invalid `pos_id`.
    pub fn pos_url(&self, pos_id: &str) -> std::result::Result<String, ValidationError> {
        validate_pos_id(pos_id)?;
        Ok(format!("{POS_URL_BASE}/{}/{pos_id}", self.product.payment_id()))
    }

    /// QR-code URL for the point of sale `pos_id`.
    ///
    /// `options` override the product's default options key by key.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::PosId`] for an invalid `pos_id`.
    pub fn qr_code_url(&self, pos_id: &str, options: &QrCodeOptions) -> std::result::Result<String, ValidationError> {
        let target = self.pos_url(pos_id)?;
        Ok(make_qr_code_url(&target, &self.product.default_qr_options().merged_with(options)))
    }

    /// Validates a payment and builds the body sent to the provider.
    ///
    /// Empty optional strings are left out; the rest are cut to their limits.
    ///
    /// # Errors
    ///
    /// Returns the first failing check among posId, amount and the field
    /// lengths.
    pub fn payment_request(
        &self,
        pos_id: &str,
        amount: &Amount,
        options: &PosPaymentOptions,
    ) -> std::result::Result<PosPaymentRequest, ValidationError> {
        validate_pos_id(pos_id)?;
        let amount = amount.cents()?;
        ensure_max_len(options.description.as_deref(), MAX_POS_DESCRIPTION_LENGTH, ValidationError::DescriptionTooLong)?;
        ensure_max_len(options.reference.as_deref(), MAX_REFERENCE_LENGTH, ValidationError::ReferenceTooLong)?;
        ensure_max_len(options.bulk_id.as_deref(), MAX_BULK_ID_LENGTH, ValidationError::BulkIdTooLong)?;
        ensure_max_len(options.shop_id.as_deref(), MAX_SHOP_ID_LENGTH, ValidationError::ShopIdTooLong)?;
        ensure_max_len(options.shop_name.as_deref(), MAX_SHOP_NAME_LENGTH, ValidationError::ShopNameTooLong)?;

        let field = |value: &Option<String>, max: usize| {
            value.as_deref().filter(|v| !v.is_empty()).map(|v| truncate(v, max))
        };

        Ok(PosPaymentRequest {
            amount,
            pos_id: pos_id.to_owned(),
            currency: options.currency.unwrap_or_default(),
            callback_url: options.callback_url.clone().filter(|url| !url.is_empty()),
            description: field(&options.description, MAX_POS_DESCRIPTION_LENGTH),
            reference: field(&options.reference, MAX_REFERENCE_LENGTH),
            bulk_id: field(&options.bulk_id, MAX_BULK_ID_LENGTH),
            shop_id: field(&options.shop_id, MAX_SHOP_ID_LENGTH),
            shop_name: field(&options.shop_name, MAX_SHOP_NAME_LENGTH),
        })
    }

    /// Creates a payment on the point of sale `pos_id`.
    ///
    /// # Errors
    ///
    /// Returns [`PayconiqError::Validation`](crate::PayconiqError::Validation)
    /// before any request for invalid input, otherwise the REST client's
    /// errors.
    pub async fn create_payment(
        &self,
        pos_id: &str,
        amount: impl Into<Amount>,
        options: &PosPaymentOptions,
    ) -> Result<PosPaymentResponse> {
        let request = self.payment_request(pos_id, &amount.into(), options)?;
        self.product.rest().create_pos_payment(&request).await
    }

    /// Cancels a payment created by [`create_payment`](Self::create_payment).
    ///
    /// # Errors
    ///
    /// Returns [`PayconiqError::MissingCancelLink`](crate::PayconiqError::MissingCancelLink)
    /// when the payment carries no cancel link, otherwise the REST client's
    /// errors.
    pub async fn cancel_payment(&self, payment: &PosPaymentResponse) -> Result<()> {
        self.cancel_payment_link(payment.cancel_link().unwrap_or_default()).await
    }

    /// Cancels a payment through a stored cancel link.
    ///
    /// # Errors
    ///
    /// As [`cancel_payment`](Self::cancel_payment).
    pub async fn cancel_payment_link(&self, cancel_link: &str) -> Result<()> {
        self.product.rest().cancel_payment(cancel_link).await
    }
}

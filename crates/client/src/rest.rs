//! Authenticated calls to the point-of-sale payment API.

use std::fmt;

use reqwest::{StatusCode, header::CONTENT_TYPE};
use zeroize::Zeroizing;

use crate::{
    error::{PayconiqError, Result},
    payment::{PosPaymentRequest, PosPaymentResponse, ProviderErrorBody},
};

/// REST client bound to one API key and one payments endpoint.
///
/// Transport settings such as timeouts belong to the `reqwest::Client`
/// passed in; no request is retried.
#[derive(Clone)]
pub struct RestClient {
    http: reqwest::Client,
    api_key: Zeroizing<String>,
    payments_url: String,
}

impl RestClient {
    /// Creates a client posting payments to `payments_url`.
    #[must_use]
    pub fn new(http: reqwest::Client, api_key: Zeroizing<String>, payments_url: impl Into<String>) -> Self {
        Self { http, api_key, payments_url: payments_url.into() }
    }

    /// The endpoint payments are created at.
    #[must_use]
    pub fn payments_url(&self) -> &str {
        &self.payments_url
    }

    /// Creates a point-of-sale payment.
    ///
    /// # Errors
    ///
    /// Returns [`PayconiqError::CreatePayment`] for any status other than
    /// `201 Created` and [`PayconiqError::Transport`] when the request fails
    /// or the response body is not a payment resource.
    #[tracing::instrument(skip_all, fields(pos_id = %request.pos_id, amount = request.amount))]
    pub async fn create_pos_payment(&self, request: &PosPaymentRequest) -> Result<PosPaymentResponse> {
        let response = self
            .http
            .post(&self.payments_url)
            .bearer_auth(self.api_key.as_str())
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::CREATED {
            let payment: PosPaymentResponse = response.json().await?;
            tracing::debug!(payment_id = %payment.payment_id, status = ?payment.status, "payment created");
            return Ok(payment);
        }

        let body = ProviderErrorBody::from_text(&response.text().await?);
        tracing::warn!(status = status.as_u16(), code = ?body.code, trace_id = %body.trace_id, "payment creation refused");
        Err(PayconiqError::CreatePayment {
            status: status.as_u16(),
            trace_id: body.trace_id_or_dash(),
            message: body.message,
        })
    }

    /// Cancels a payment through its cancel link.
    ///
    /// # Errors
    ///
    /// Returns [`PayconiqError::MissingCancelLink`] for an empty link,
    /// [`PayconiqError::CancelPayment`] for any status other than
    /// `204 No Content` and [`PayconiqError::Transport`] when the request
    /// fails.
    #[tracing::instrument(skip(self))]
    pub async fn cancel_payment(&self, cancel_link: &str) -> Result<()> {
        if cancel_link.is_empty() {
            return Err(PayconiqError::MissingCancelLink);
        }

        let response = self
            .http
            .delete(cancel_link)
            .bearer_auth(self.api_key.as_str())
            .header(CONTENT_TYPE, "application/json")
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::NO_CONTENT {
            tracing::debug!("payment cancelled");
            return Ok(());
        }

        let body = ProviderErrorBody::from_text(&response.text().await?);
        tracing::warn!(status = status.as_u16(), code = ?body.code, trace_id = %body.trace_id, "payment cancellation refused");
        Err(PayconiqError::CancelPayment {
            status: status.as_u16(),
            trace_id: body.trace_id_or_dash(),
            message: body.message,
        })
    }
}

impl fmt::Debug for RestClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RestClient")
            .field("payments_url", &self.payments_url)
            .field("api_key", &"<redacted>")
            .finish_non_exhaustive()
    }
}

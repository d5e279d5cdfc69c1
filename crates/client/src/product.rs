//! The configuration and callback verification every product shares.

use std::{fmt, str::FromStr, sync::Arc};

use payconiq_callback::{
    CallbackVerifier, Environment, HttpKeyFetcher, KeyCache, KeyFetcher, ReplayDetector, VerifyOptions,
};
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use crate::{
    config::ProductConfig,
    error::{Result, ValidationError},
    invoice::{Invoice, Receipt},
    predefined::Predefined,
    qrcode::QrCodeOptions,
    rest::RestClient,
    validation::{validate_api_key, validate_payment_id},
};

/// A Payconiq payment profile: its id, credentials and configuration.
///
/// The product types ([`Predefined`], [`Invoice`], [`Receipt`]) wrap one of
/// these. Callback verification lives here because every product receives
/// callbacks the same way.
///
/// ```no_run
/// use payconiq_client::{PayconiqProduct, ProductConfig};
///
/// let product = PayconiqProduct::builder()
///     .payment_id("5fb3a2e1bc1b440006ab9e1f")
///     .api_key("00000000-0000-0000-0000-000000000000")
///     .config(ProductConfig::builder().callback_url("https://shop.example/payconiq/callback").build())
///     .build()?;
/// # Ok::<(), payconiq_client::ValidationError>(())
/// ```
pub struct PayconiqProduct {
    payment_id: String,
    config: ProductConfig,
    verifier: CallbackVerifier,
    rest: RestClient,
}

#[bon::bon]
impl PayconiqProduct {
    /// Creates a product, validating its credentials.
    ///
    /// # Arguments
    ///
    /// * `payment_id` - 24-character payment profile id.
    /// * `api_key` - 36-character API key; kept zeroized on drop.
    ///
    /// # Optional Fields
    ///
    /// * `config` - Product configuration (default: production, no callback URL).
    /// * `http_client` - Client for REST and key fetches (default: a new one).
    /// * `key_cache` - Key cache shared with other products of the same
    ///   environment (default: a new cache fetching from the environment).
    /// * `replay_detector` - Rejects callbacks whose jti was already accepted.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::PaymentId`] or [`ValidationError::ApiKey`]
    /// for malformed credentials, checked in that order, and
    /// [`ValidationError::EnvironmentMismatch`] when `key_cache` serves a
    /// different environment.
    #[builder]
    pub fn new(
        #[builder(into)] payment_id: String,
        #[builder(into)] api_key: String,
        #[builder(default)] config: ProductConfig,
        http_client: Option<reqwest::Client>,
        key_cache: Option<Arc<KeyCache>>,
        replay_detector: Option<Arc<dyn ReplayDetector>>,
    ) -> std::result::Result<Self, ValidationError> {
        let api_key = Zeroizing::new(api_key);
        validate_payment_id(&payment_id)?;
        validate_api_key(&api_key)?;

        let http = http_client.unwrap_or_default();
        let key_cache = match key_cache {
            Some(cache) if cache.environment() != config.environment => {
                return Err(ValidationError::EnvironmentMismatch);
            },
            Some(cache) => cache,
            None => {
                let mut fetcher = HttpKeyFetcher::with_client(http.clone());
                if let Some(url) = &config.certificates_url {
                    fetcher = fetcher.with_endpoint(url.clone());
                }
                Arc::new(KeyCache::new(config.environment, Arc::new(fetcher) as Arc<dyn KeyFetcher>))
            },
        };

        let mut verifier = CallbackVerifier::new(key_cache, config.verifier_config(&payment_id));
        if let Some(detector) = replay_detector {
            verifier = verifier.with_replay_detector(detector);
        }

        let rest = RestClient::new(http, api_key, config.payments_url());
        tracing::debug!(environment = %config.environment, "payconiq product created");
        Ok(Self { payment_id, config, verifier, rest })
    }
}

impl PayconiqProduct {
    /// The payment profile id.
    #[must_use]
    pub fn payment_id(&self) -> &str {
        &self.payment_id
    }

    /// The environment this product talks to.
    #[must_use]
    pub fn environment(&self) -> Environment {
        self.config.environment
    }

    /// The product's configuration.
    #[must_use]
    pub fn config(&self) -> &ProductConfig {
        &self.config
    }

    /// QR-code options applied under every per-call option.
    #[must_use]
    pub fn default_qr_options(&self) -> &QrCodeOptions {
        &self.config.default_qr_options
    }

    /// Replaces the default QR-code options.
    pub fn set_default_qr_options(&mut self, options: QrCodeOptions) {
        self.config.default_qr_options = options;
    }

    /// The callback verifier.
    #[must_use]
    pub fn verifier(&self) -> &CallbackVerifier {
        &self.verifier
    }

    /// The signing key cache, for sharing with other products.
    #[must_use]
    pub fn key_cache(&self) -> &Arc<KeyCache> {
        self.verifier.key_cache()
    }

    pub(crate) fn rest(&self) -> &RestClient {
        &self.rest
    }

    /// Verifies a callback's `Signature` header over its raw body.
    ///
    /// The subject claim must be this product's payment id.
    ///
    /// # Errors
    ///
    /// Returns the verifier's [`CallbackError`](payconiq_callback::CallbackError)
    /// wrapped in [`PayconiqError::Callback`](crate::PayconiqError::Callback).
    pub async fn verify(&self, signature: &str, body: &[u8], options: &VerifyOptions) -> Result<()> {
        Ok(self.verifier.verify(signature, body, options).await?)
    }
}

impl fmt::Debug for PayconiqProduct {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PayconiqProduct")
            .field("payment_id", &self.payment_id)
            .field("config", &self.config)
            .field("rest", &self.rest)
            .finish_non_exhaustive()
    }
}

/// Declares a product type wrapping a [`PayconiqProduct`], with its
/// constructor, product accessors, callback verification and
/// `From<PayconiqProduct>`.
macro_rules! product_wrapper {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug)]
        pub struct $name {
            product: $crate::product::PayconiqProduct,
        }

        impl $name {
            /// Creates a product from credentials and configuration.
            ///
            /// # Errors
            ///
            /// Returns [`ValidationError::PaymentId`](crate::ValidationError::PaymentId)
            /// or [`ValidationError::ApiKey`](crate::ValidationError::ApiKey) for
            /// malformed credentials.
            pub fn new(
                payment_id: impl Into<String>,
                api_key: impl Into<String>,
                config: $crate::config::ProductConfig,
            ) -> std::result::Result<Self, $crate::error::ValidationError> {
                $crate::product::PayconiqProduct::builder()
                    .payment_id(payment_id)
                    .api_key(api_key)
                    .config(config)
                    .build()
                    .map(Self::from)
            }

            /// The shared product.
            #[must_use]
            pub fn product(&self) -> &$crate::product::PayconiqProduct {
                &self.product
            }

            /// Mutable access to the shared product.
            pub fn product_mut(&mut self) -> &mut $crate::product::PayconiqProduct {
                &mut self.product
            }

            /// Verifies a callback. See [`PayconiqProduct::verify`](crate::PayconiqProduct::verify).
            ///
            /// # Errors
            ///
            /// As [`PayconiqProduct::verify`](crate::PayconiqProduct::verify).
            pub async fn verify(
                &self,
                signature: &str,
                body: &[u8],
                options: &payconiq_callback::VerifyOptions,
            ) -> $crate::error::Result<()> {
                self.product.verify(signature, body, options).await
            }
        }

        impl From<$crate::product::PayconiqProduct> for $name {
            fn from(product: $crate::product::PayconiqProduct) -> Self {
                Self { product }
            }
        }
    };
}

pub(crate) use product_wrapper;

/// The kinds of payment product.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProductType {
    /// Fixed point-of-sale codes with payments created over REST.
    Predefined,
    /// Invoice URLs carrying amount, description and reference.
    Invoice,
    /// Receipt URLs, shaped like invoices.
    Receipt,
}

impl ProductType {
    /// Lower-case name.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Predefined => "predefined",
            Self::Invoice => "invoice",
            Self::Receipt => "receipt",
        }
    }

    /// Wraps `product` in the product type this names.
    #[must_use]
    pub fn wrap(self, product: PayconiqProduct) -> Product {
        match self {
            Self::Predefined => Product::Predefined(Predefined::from(product)),
            Self::Invoice => Product::Invoice(Invoice::from(product)),
            Self::Receipt => Product::Receipt(Receipt::from(product)),
        }
    }
}

impl fmt::Display for ProductType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProductType {
    type Err = ValidationError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "predefined" => Ok(Self::Predefined),
            "invoice" => Ok(Self::Invoice),
            "receipt" => Ok(Self::Receipt),
            _ => Err(ValidationError::ProductType),
        }
    }
}

/// A product of a type chosen at runtime.
#[derive(Debug)]
pub enum Product {
    /// A predefined point-of-sale product.
    Predefined(Predefined),
    /// An invoice product.
    Invoice(Invoice),
    /// A receipt product.
    Receipt(Receipt),
}

impl Product {
    /// Which kind of product this is.
    #[must_use]
    pub fn product_type(&self) -> ProductType {
        match self {
            Self::Predefined(_) => ProductType::Predefined,
            Self::Invoice(_) => ProductType::Invoice,
            Self::Receipt(_) => ProductType::Receipt,
        }
    }

    /// The shared product underneath.
    #[must_use]
    pub fn product(&self) -> &PayconiqProduct {
        match self {
            Self::Predefined(p) => p.product(),
            Self::Invoice(p) => p.product(),
            Self::Receipt(p) => p.product(),
        }
    }
}

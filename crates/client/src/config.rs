//! Product configuration.
//!
//! [`ProductConfig`] holds everything about a product except its credentials.
//! It deserializes from any serde format, so it can live in an application's
//! configuration file:
//!
//! ```
//! use payconiq_client::ProductConfig;
//!
//! let config: ProductConfig = serde_json::from_str(
//!     r#"{
//!         "environment": "EXT",
//!         "callback_url": { "expect": "https://shop.example/payconiq/callback" },
//!         "max_callback_age": "10s"
//!     }"#,
//! )?;
//! assert_eq!(config.max_callback_age.as_secs(), 10);
//! # Ok::<(), serde_json::Error>(())
//! ```

use std::time::Duration;

use payconiq_callback::{CallbackPath, DEFAULT_MAX_AGE, Environment, VerifierConfig};
use serde::{Deserialize, Serialize};

use crate::qrcode::QrCodeOptions;

/// Configuration shared by every product type.
#[derive(Debug, Clone, PartialEq, Eq, bon::Builder, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProductConfig {
    /// Which Payconiq environment to talk to.
    #[serde(default)]
    #[builder(default)]
    pub environment: Environment,

    /// Default path check for callbacks. Verification fails with
    /// "Missing callbackURL" when neither this nor the call supplies one.
    #[serde(default)]
    #[builder(into)]
    pub callback_url: Option<CallbackPath>,

    /// QR-code options applied under every per-call option.
    #[serde(default)]
    #[builder(default)]
    pub default_qr_options: QrCodeOptions,

    /// Oldest accepted callback.
    #[serde(with = "humantime_serde", default = "default_max_callback_age")]
    #[builder(default = DEFAULT_MAX_AGE)]
    pub max_callback_age: Duration,

    /// Overrides the environment's signing key URL.
    #[serde(default)]
    #[builder(into)]
    pub certificates_url: Option<String>,

    /// Overrides the environment's point-of-sale payments URL.
    #[serde(default)]
    #[builder(into)]
    pub payments_url: Option<String>,
}

fn default_max_callback_age() -> Duration {
    DEFAULT_MAX_AGE
}

impl Default for ProductConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl ProductConfig {
    /// The payments endpoint in effect.
    #[must_use]
    pub fn payments_url(&self) -> &str {
        self.payments_url.as_deref().unwrap_or_else(|| self.environment.pos_payments_url())
    }

    /// Verifier settings for callbacks addressed to `payment_id`.
    #[must_use]
    pub fn verifier_config(&self, payment_id: &str) -> VerifierConfig {
        VerifierConfig::builder()
            .max_age(self.max_callback_age)
            .subject(payment_id)
            .maybe_callback_url(self.callback_url.clone())
            .build()
    }
}

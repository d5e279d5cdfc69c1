//! Callback signature verification.
//!
//! [`CallbackVerifier`] checks the `Signature` header Payconiq attaches to
//! every payment status callback. Checks run in a fixed order and the first
//! failure decides the error:
//!
//! ```text
//! envelope → header decode → header shape → typ → alg → issuer → subject
//!          → path → issued at → kid lookup → ES256 signature → jti replay
//! ```
//!
//! Everything before the kid lookup is local; the lookup may hit the
//! network through the shared [`KeyCache`].

use std::{sync::Arc, time::Duration};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    error::{CallbackError, Result},
    jose::{DetachedSignature, JoseHeader, decode_header},
    key_cache::KeyCache,
    replay::ReplayDetector,
    time_source::{SystemTimeSource, TimeSource},
    validation::{MAX_FUTURE_SKEW, validate_algorithm, validate_issued_at, validate_issuer, validate_type},
};

/// Default maximum callback age (5 seconds).
pub const DEFAULT_MAX_AGE: Duration = Duration::from_secs(5);

/// How the path claim is checked.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallbackPath {
    /// The path claim must equal this URL exactly.
    Expect(String),
    /// The path claim is not compared.
    Unchecked,
}

impl From<&str> for CallbackPath {
    fn from(url: &str) -> Self {
        Self::Expect(url.to_owned())
    }
}

impl From<String> for CallbackPath {
    fn from(url: String) -> Self {
        Self::Expect(url)
    }
}

/// Verifier-wide settings.
#[derive(Debug, Clone, PartialEq, Eq, bon::Builder, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VerifierConfig {
    /// Oldest accepted callback, measured from its issue time.
    #[serde(with = "humantime_serde", default = "default_max_age")]
    #[builder(default = DEFAULT_MAX_AGE)]
    pub max_age: Duration,

    /// Payment profile id the subject claim must equal; unchecked when unset.
    #[serde(default)]
    #[builder(into)]
    pub subject: Option<String>,

    /// Default path check when a call supplies none.
    #[serde(default)]
    #[builder(into)]
    pub callback_url: Option<CallbackPath>,
}

fn default_max_age() -> Duration {
    DEFAULT_MAX_AGE
}

impl Default for VerifierConfig {
    fn default() -> Self {
        Self { max_age: DEFAULT_MAX_AGE, subject: None, callback_url: None }
    }
}

/// Per-call overrides.
#[derive(Debug, Clone, Default, PartialEq, Eq, bon::Builder)]
pub struct VerifyOptions {
    /// Overrides the verifier's maximum age.
    pub max_age: Option<Duration>,
    /// Reference time; the verifier's clock when unset.
    pub now: Option<DateTime<Utc>>,
    /// Overrides the verifier's default path check.
    #[builder(into)]
    pub callback_url: Option<CallbackPath>,
}

/// Verifies Payconiq callback signatures for one environment.
pub struct CallbackVerifier {
    key_cache: Arc<KeyCache>,
    config: VerifierConfig,
    replay_detector: Option<Arc<dyn ReplayDetector>>,
    time_source: Arc<dyn TimeSource>,
}

impl CallbackVerifier {
    /// Creates a verifier resolving keys through `key_cache`.
    #[must_use]
    pub fn new(key_cache: Arc<KeyCache>, config: VerifierConfig) -> Self {
        Self { key_cache, config, replay_detector: None, time_source: Arc::new(SystemTimeSource) }
    }

    /// Rejects callbacks whose jti was already accepted.
    #[must_use]
    pub fn with_replay_detector(mut self, detector: Arc<dyn ReplayDetector>) -> Self {
        self.replay_detector = Some(detector);
        self
    }

    /// Reads "now" from `time_source` instead of the system clock.
    #[must_use]
    pub fn with_time_source(mut self, time_source: Arc<dyn TimeSource>) -> Self {
        self.time_source = time_source;
        self
    }

    /// The verifier's settings.
    #[must_use]
    pub fn config(&self) -> &VerifierConfig {
        &self.config
    }

    /// The key cache signatures are checked against.
    #[must_use]
    pub fn key_cache(&self) -> &Arc<KeyCache> {
        &self.key_cache
    }

    /// Verifies `signature` over the raw callback `body`.
    ///
    /// # Errors
    ///
    /// Returns [`CallbackError::Verification`] for a rejected callback,
    /// [`CallbackError::MalformedHeader`] when the protected header is not
    /// base64 JSON, and [`CallbackError::KeyFetch`] when the key set cannot be
    /// retrieved.
    #[tracing::instrument(skip_all, fields(environment = %self.key_cache.environment()))]
    pub async fn verify(&self, signature: &str, body: &[u8], options: &VerifyOptions) -> Result<()> {
        let result = self.run_checks(signature, body, options).await;
        if let Err(err) = &result {
            match err.category() {
                Some(category) => tracing::info!(%category, error = %err, "callback rejected"),
                None => tracing::warn!(error = %err, "callback verification failed"),
            }
        }
        result
    }

    async fn run_checks(&self, signature: &str, body: &[u8], options: &VerifyOptions) -> Result<()> {
        let envelope = DetachedSignature::parse(signature)?;
        let header = JoseHeader::from_value(decode_header(envelope.header_b64())?)?;

        validate_type(&header.typ)?;
        validate_algorithm(&header.alg)?;
        validate_issuer(&header.issuer)?;

        if let Some(subject) = &self.config.subject
            && header.subject != *subject
        {
            return Err(CallbackError::invalid_subject());
        }

        match options.callback_url.as_ref().or(self.config.callback_url.as_ref()) {
            None => return Err(CallbackError::missing_callback_url()),
            Some(CallbackPath::Expect(path)) if header.path != *path => {
                return Err(CallbackError::invalid_path());
            },
            Some(_) => {},
        }

        let now = options.now.unwrap_or_else(|| self.time_source.now());
        let max_age = options.max_age.unwrap_or(self.config.max_age);
        let max_age_delta = chrono::Duration::from_std(max_age).unwrap_or(chrono::Duration::MAX);
        validate_issued_at(&header.issued_at, now, max_age_delta)?;

        let key = self
            .key_cache
            .get_key(&header.kid)
            .await?
            .ok_or_else(CallbackError::missing_kid)?;

        let signature_bytes = envelope.signature_bytes().unwrap_or_default();
        if !key.verify_es256(&envelope.signing_input(body), &signature_bytes) {
            return Err(CallbackError::failed_verification());
        }

        if let Some(detector) = &self.replay_detector {
            let skew = MAX_FUTURE_SKEW.to_std().unwrap_or_default();
            detector.check_and_mark(&header.jti, max_age.saturating_add(skew)).await?;
        }

        tracing::debug!(kid = %header.kid, jti = %header.jti, "callback verified");
        Ok(())
    }
}

impl std::fmt::Debug for CallbackVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallbackVerifier")
            .field("key_cache", &self.key_cache)
            .field("config", &self.config)
            .field("replay_detection", &self.replay_detector.is_some())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = VerifierConfig::default();
        assert_eq!(config.max_age, Duration::from_secs(5));
        assert!(config.subject.is_none());
        assert!(config.callback_url.is_none());
        assert_eq!(VerifierConfig::builder().build(), config);
    }

    #[test]
    fn test_config_builder() {
        let config = VerifierConfig::builder()
            .max_age(Duration::from_secs(30))
            .subject("5fb3a2e1bc1b440006ab9e1f")
            .callback_url("https://shop.example/callback")
            .build();
        assert_eq!(config.subject.as_deref(), Some("5fb3a2e1bc1b440006ab9e1f"));
        assert_eq!(
            config.callback_url,
            Some(CallbackPath::Expect("https://shop.example/callback".into()))
        );
    }

    #[test]
    fn test_config_deserialize_humantime() {
        let json = r#"{
            "max_age": "10s",
            "subject": "5fb3a2e1bc1b440006ab9e1f",
            "callback_url": { "expect": "https://shop.example/callback" }
        }"#;
        let config: VerifierConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.max_age, Duration::from_secs(10));
        assert!(matches!(config.callback_url, Some(CallbackPath::Expect(_))));

        let unchecked: VerifierConfig =
            serde_json::from_str(r#"{ "callback_url": "unchecked" }"#).unwrap();
        assert_eq!(unchecked.callback_url, Some(CallbackPath::Unchecked));
        assert_eq!(unchecked.max_age, DEFAULT_MAX_AGE);
    }

    #[test]
    fn test_config_rejects_unknown_fields() {
        assert!(serde_json::from_str::<VerifierConfig>(r#"{ "maxAge": "5s" }"#).is_err());
    }

    #[test]
    fn test_options_builder() {
        let options = VerifyOptions::builder().callback_url(CallbackPath::Unchecked).build();
        assert_eq!(options.callback_url, Some(CallbackPath::Unchecked));
        assert!(options.now.is_none());
    }
}

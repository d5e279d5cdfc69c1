//! # Payconiq Callback Verification
//!
//! Verification of the signed payment status callbacks Payconiq sends to a
//! merchant's callback URL.
//!
//! This crate provides:
//! - **Signature verification**: JOSE compact detached ES256 signatures over the raw body
//! - **Signing key cache**: per-environment key set with a 12 hour lifetime and forced refresh on
//!   unknown key ids
//! - **Key fetching**: the published certificates document, filtered to usable signing keys
//! - **Replay detection**: optional jti tracking within the freshness window
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use payconiq_callback::{
//!     CallbackVerifier, Environment, HttpKeyFetcher, KeyCache, VerifierConfig, VerifyOptions,
//! };
//!
//! # async fn example(signature: &str, body: &[u8]) -> Result<(), Box<dyn std::error::Error>> {
//! let cache = Arc::new(KeyCache::new(Environment::Production, Arc::new(HttpKeyFetcher::new())));
//! let verifier = CallbackVerifier::new(
//!     cache,
//!     VerifierConfig::builder()
//!         .subject("5fb3a2e1bc1b440006ab9e1f")
//!         .callback_url("https://shop.example/payconiq/callback")
//!         .build(),
//! );
//!
//! verifier.verify(signature, body, &VerifyOptions::default()).await?;
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

/// Payconiq environments.
pub mod environment;
/// Verification error types.
pub mod error;
/// Compact detached signature parsing.
pub mod jose;
/// Per-environment signing key cache.
pub mod key_cache;
/// Key set retrieval.
pub mod key_fetcher;
/// jti replay detection.
pub mod replay;
/// Published signing keys.
pub mod signing_key;
/// Test helpers.
#[cfg(any(test, feature = "testutil"))]
#[allow(clippy::expect_used, clippy::panic)]
pub mod testutil;
/// Injectable clock.
pub mod time_source;
/// Header claim checks.
pub mod validation;
/// The verification pipeline.
pub mod verifier;

pub use environment::Environment;
pub use error::{CallbackError, Result, VerificationCategory};
pub use jose::{DetachedSignature, JoseHeader};
pub use key_cache::{KEY_SET_LIFETIME, KeyCache, KeySet};
pub use key_fetcher::{HttpKeyFetcher, KeyFetcher, MemoryKeyFetcher};
pub use replay::{InMemoryReplayDetector, MAX_REPLAY_WINDOW, ReplayDetector};
pub use signing_key::{ACCEPTED_KEYS, Jwk, JwkSet, KeyType, SigningKey};
pub use time_source::{SystemTimeSource, TimeSource};
pub use verifier::{CallbackPath, CallbackVerifier, DEFAULT_MAX_AGE, VerifierConfig, VerifyOptions};

//! Shared helpers for testing callback verification.
//!
//! Generates P-256 key pairs published as JWKs, signs callbacks the way
//! Payconiq does and crafts arbitrary envelopes for attack testing. Gated
//! behind the `testutil` feature so none of it reaches production builds.
//!
//! ```toml
//! [dev-dependencies]
//! payconiq-callback = { path = "../callback", features = ["testutil"] }
//! ```

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::{DateTime, SecondsFormat, Utc};
use p256::ecdsa::{Signature, SigningKey as EcSigningKey, signature::Signer};
use parking_lot::Mutex;
use rand_core::OsRng;
use serde_json::json;

use crate::{
    jose::{CRITICAL_CLAIMS, ISSUED_AT_CLAIM, ISSUER_CLAIM, JTI_CLAIM, PATH_CLAIM, SUBJECT_CLAIM},
    signing_key::Jwk,
    time_source::TimeSource,
};

/// Payment profile id used across tests.
pub const TEST_PAYMENT_ID: &str = "5fb3a2e1bc1b440006ab9e1f";

/// Callback URL used across tests.
pub const TEST_CALLBACK_URL: &str = "https://shop.example/payconiq/callback";

/// Generates a P-256 key pair and its published JWK under `kid`.
///
/// The JWK carries `use: sig`, `alg: ES256` and a placeholder certificate
/// chain, so it passes the key set filter.
pub fn generate_test_keypair(kid: &str) -> (EcSigningKey, Jwk) {
    let signing_key = EcSigningKey::random(&mut OsRng);
    let jwk = jwk_for(&signing_key, kid);
    (signing_key, jwk)
}

/// The published JWK for an existing key.
///
/// # Panics
///
/// Never for keys produced by `p256`; an uncompressed point always carries
/// both coordinates.
pub fn jwk_for(signing_key: &EcSigningKey, kid: &str) -> Jwk {
    let point = signing_key.verifying_key().to_encoded_point(false);
    Jwk {
        kty: "EC".into(),
        key_use: Some("sig".into()),
        kid: Some(kid.into()),
        alg: Some("ES256".into()),
        x5c: vec![URL_SAFE_NO_PAD.encode(format!("test certificate for {kid}"))],
        crv: Some("P-256".into()),
        x: Some(URL_SAFE_NO_PAD.encode(point.x().expect("uncompressed point has x"))),
        y: Some(URL_SAFE_NO_PAD.encode(point.y().expect("uncompressed point has y"))),
        ..Jwk::default()
    }
}

/// Formats `at` the way Payconiq stamps `iat` (RFC 3339, milliseconds, `Z`).
pub fn format_issued_at(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// A genuine-looking protected header for a callback issued at `issued_at`.
pub fn callback_header(kid: &str, issued_at: DateTime<Utc>) -> serde_json::Value {
    json!({
        "typ": "jose+json",
        "alg": "ES256",
        "kid": kid,
        "crit": CRITICAL_CLAIMS,
        SUBJECT_CLAIM: TEST_PAYMENT_ID,
        ISSUER_CLAIM: "Payconiq",
        ISSUED_AT_CLAIM: format_issued_at(issued_at),
        JTI_CLAIM: format!("jti-{}", issued_at.timestamp_micros()),
        PATH_CLAIM: TEST_CALLBACK_URL,
    })
}

/// Base64url-encodes a header value as its protected header segment.
///
/// # Panics
///
/// Panics if the value cannot be serialized.
pub fn encode_header(header: &serde_json::Value) -> String {
    URL_SAFE_NO_PAD.encode(serde_json::to_vec(header).expect("header json"))
}

/// Signs `body` under `header`, producing `<header>..<signature>`.
pub fn sign_callback(signing_key: &EcSigningKey, header: &serde_json::Value, body: &[u8]) -> String {
    let header_b64 = encode_header(header);
    let signing_input = format!("{header_b64}.{}", URL_SAFE_NO_PAD.encode(body));
    let signature: Signature = signing_key.sign(signing_input.as_bytes());
    format!("{header_b64}..{}", URL_SAFE_NO_PAD.encode(signature.to_bytes()))
}

/// Builds an envelope from an arbitrary header and raw signature bytes.
///
/// No signing happens; useful for shape and algorithm-confusion tests.
pub fn craft_signature(header: &serde_json::Value, signature: &[u8]) -> String {
    format!("{}..{}", encode_header(header), URL_SAFE_NO_PAD.encode(signature))
}

/// A [`TimeSource`] that only moves when told to.
#[derive(Debug)]
pub struct ManualTimeSource {
    now: Mutex<DateTime<Utc>>,
}

impl ManualTimeSource {
    /// Creates a clock stopped at `now`.
    pub fn new(now: DateTime<Utc>) -> Self {
        Self { now: Mutex::new(now) }
    }

    /// Moves the clock forward.
    pub fn advance(&self, by: chrono::Duration) {
        *self.now.lock() += by;
    }

    /// Sets the clock.
    pub fn set(&self, now: DateTime<Utc>) {
        *self.now.lock() = now;
    }
}

impl TimeSource for ManualTimeSource {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock()
    }
}

/// Asserts that a verification result is a rejection with the given
/// category and message.
///
/// ```ignore
/// // Requires the `testutil` feature to be enabled.
/// use payconiq_callback::{CallbackError, assert_callback_error};
///
/// let result: Result<(), CallbackError> = Err(CallbackError::invalid_path());
/// assert_callback_error!(result, Invalid, "Invalid path");
/// ```
#[macro_export]
macro_rules! assert_callback_error {
    ($result:expr, $category:ident, $message:expr) => {
        match &$result {
            Err($crate::error::CallbackError::Verification { category, message }) => {
                assert_eq!(
                    *category,
                    $crate::error::VerificationCategory::$category,
                    "unexpected category for {message:?}"
                );
                assert_eq!(*message, $message);
            },
            other => panic!(
                "expected {} rejection {:?}, got: {:?}",
                stringify!($category),
                $message,
                other
            ),
        }
    };
}

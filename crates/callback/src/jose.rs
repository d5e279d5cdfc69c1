//! JOSE compact detached signatures as sent in callback headers.
//!
//! A callback signature has the shape `<protected header>..<signature>`:
//! the payload segment is empty because the signed payload is the raw
//! request body. This module parses that envelope and decodes the
//! protected header into a [`JoseHeader`].

use base64::{
    Engine,
    alphabet,
    engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig},
};
use serde::{Deserialize, Serialize};

use crate::error::{CallbackError, Result};

/// Prefix shared by the Payconiq extension claims.
pub const CLAIM_PREFIX: &str = "https://payconiq.com/";

/// Subject claim: the payment profile id the callback is for.
pub const SUBJECT_CLAIM: &str = "https://payconiq.com/sub";
/// Issuer claim.
pub const ISSUER_CLAIM: &str = "https://payconiq.com/iss";
/// Issued-at claim, an RFC 3339 timestamp.
pub const ISSUED_AT_CLAIM: &str = "https://payconiq.com/iat";
/// Unique callback identifier.
pub const JTI_CLAIM: &str = "https://payconiq.com/jti";
/// Callback URL the notification was sent to.
pub const PATH_CLAIM: &str = "https://payconiq.com/path";

/// The extension claims a `crit` entry may name.
pub const CRITICAL_CLAIMS: [&str; 5] =
    [SUBJECT_CLAIM, ISSUER_CLAIM, ISSUED_AT_CLAIM, JTI_CLAIM, PATH_CLAIM];

/// URL-safe base64 that tolerates missing padding and non-zero trailing
/// bits. Standard-alphabet input is accepted after mapping `+` to `-`.
pub(crate) const LENIENT_URL_SAFE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new()
        .with_decode_allow_trailing_bits(true)
        .with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Decodes base64 in either alphabet, padding optional.
pub(crate) fn decode_lenient(input: &str) -> std::result::Result<Vec<u8>, base64::DecodeError> {
    if input.contains(['+', '/']) {
        let normalized: String = input
            .chars()
            .map(|c| match c {
                '+' => '-',
                '/' => '_',
                other => other,
            })
            .collect();
        LENIENT_URL_SAFE.decode(normalized)
    } else {
        LENIENT_URL_SAFE.decode(input)
    }
}

/// A parsed `<header>..<signature>` envelope.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DetachedSignature<'a> {
    header_b64: &'a str,
    signature_b64: &'a str,
}

impl<'a> DetachedSignature<'a> {
    /// Splits a compact detached signature into its two segments.
    ///
    /// Both segments must be non-empty and consist of `[A-Za-z0-9+_-]`.
    ///
    /// # Errors
    ///
    /// Returns the INCORRECT "Incorrect compact detached signature" error
    /// for any other shape.
    pub fn parse(signature: &'a str) -> Result<Self> {
        let (header_b64, signature_b64) =
            signature.split_once("..").ok_or_else(CallbackError::incorrect_signature)?;
        if !is_segment(header_b64) || !is_segment(signature_b64) {
            return Err(CallbackError::incorrect_signature());
        }
        Ok(Self { header_b64, signature_b64 })
    }

    /// The protected header segment, exactly as received.
    #[must_use]
    pub fn header_b64(&self) -> &'a str {
        self.header_b64
    }

    /// The signature segment, exactly as received.
    #[must_use]
    pub fn signature_b64(&self) -> &'a str {
        self.signature_b64
    }

    /// Decoded signature bytes; `None` when the segment is not valid base64.
    #[must_use]
    pub fn signature_bytes(&self) -> Option<Vec<u8>> {
        decode_lenient(self.signature_b64).ok()
    }

    /// The JWS signing input: `<header>.<base64url(body)>`.
    #[must_use]
    pub fn signing_input(&self, body: &[u8]) -> Vec<u8> {
        let body_b64 = base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(body);
        let mut input = Vec::with_capacity(self.header_b64.len() + 1 + body_b64.len());
        input.extend_from_slice(self.header_b64.as_bytes());
        input.push(b'.');
        input.extend_from_slice(body_b64.as_bytes());
        input
    }
}

fn is_segment(segment: &str) -> bool {
    !segment.is_empty()
        && segment.bytes().all(|b| b.is_ascii_alphanumeric() || matches!(b, b'+' | b'_' | b'-'))
}

/// The protected header of a callback signature.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoseHeader {
    /// Media type; `JOSE+JSON` in any case.
    pub typ: String,
    /// Signature algorithm.
    pub alg: String,
    /// Identifier of the signing key.
    pub kid: String,
    /// Extension claims the recipient must understand.
    pub crit: Vec<String>,
    /// Payment profile id.
    #[serde(rename = "https://payconiq.com/sub")]
    pub subject: String,
    /// Issuer, `Payconiq` for genuine callbacks.
    #[serde(rename = "https://payconiq.com/iss")]
    pub issuer: String,
    /// Issue time as an RFC 3339 string.
    #[serde(rename = "https://payconiq.com/iat")]
    pub issued_at: String,
    /// Unique callback id.
    #[serde(rename = "https://payconiq.com/jti")]
    pub jti: String,
    /// Callback URL the notification targeted.
    #[serde(rename = "https://payconiq.com/path")]
    pub path: String,
}

impl JoseHeader {
    /// Checks the decoded header JSON has the expected members and types.
    ///
    /// # Errors
    ///
    /// Returns the INVALID "Invalid header" error when a member is missing,
    /// has the wrong JSON type, or `crit` names an unknown claim.
    pub fn from_value(value: serde_json::Value) -> Result<Self> {
        let header: Self = serde_json::from_value(value).map_err(|err| {
            tracing::debug!(error = %err, "header shape rejected");
            CallbackError::invalid_header()
        })?;
        if header.crit.iter().any(|claim| !CRITICAL_CLAIMS.contains(&claim.as_str())) {
            return Err(CallbackError::invalid_header());
        }
        Ok(header)
    }
}

/// Decodes a protected header segment into JSON.
///
/// # Errors
///
/// Returns [`CallbackError::MalformedHeader`] when the segment is not
/// base64 or the bytes are not JSON.
pub fn decode_header(header_b64: &str) -> Result<serde_json::Value> {
    let bytes = decode_lenient(header_b64)
        .map_err(|e| CallbackError::malformed_header(format!("base64 decode: {e}")))?;
    serde_json::from_slice(&bytes)
        .map_err(|e| CallbackError::malformed_header(format!("JSON parse: {e}")))
}

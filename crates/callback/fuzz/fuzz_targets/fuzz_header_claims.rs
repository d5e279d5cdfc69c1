//! Structured fuzz target for protected header claims.
//!
//! Builds plausible callback headers from arbitrary claim values, encodes
//! them the way Payconiq does and runs them through decoding and the claim
//! checks, including issued-at parsing against a fixed reference time.

#![no_main]

use arbitrary::Arbitrary;
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use libfuzzer_sys::fuzz_target;
use payconiq_callback::{
    DetachedSignature, JoseHeader,
    jose::{CRITICAL_CLAIMS, ISSUED_AT_CLAIM, ISSUER_CLAIM, JTI_CLAIM, PATH_CLAIM, SUBJECT_CLAIM, decode_header},
    validation::{validate_algorithm, validate_issued_at, validate_type},
};

#[derive(Debug, Arbitrary)]
struct FuzzedHeader {
    typ: String,
    alg: FuzzedAlg,
    kid: String,
    /// Indices into the critical claim list; out-of-range values become unknown claims.
    crit: Vec<u8>,
    subject: String,
    issuer: String,
    issued_at: String,
    jti: String,
    path: String,
    signature: Vec<u8>,
    /// Encode with the standard alphabet instead of the URL-safe one.
    standard_alphabet: bool,
}

#[derive(Debug, Arbitrary)]
enum FuzzedAlg {
    Es256,
    Lowercase,
    None,
    Hs256,
    Rs256,
    Other(String),
}

impl FuzzedAlg {
    fn as_str(&self) -> &str {
        match self {
            Self::Es256 => "ES256",
            Self::Lowercase => "es256",
            Self::None => "none",
            Self::Hs256 => "HS256",
            Self::Rs256 => "RS256",
            Self::Other(alg) => alg,
        }
    }
}

fn build_signature(input: &FuzzedHeader) -> String {
    let crit: Vec<String> = input
        .crit
        .iter()
        .map(|&i| {
            CRITICAL_CLAIMS
                .get(usize::from(i))
                .map_or_else(|| format!("https://payconiq.com/x{i}"), |claim| (*claim).to_owned())
        })
        .collect();

    let mut header = serde_json::Map::new();
    header.insert("typ".into(), input.typ.clone().into());
    header.insert("alg".into(), input.alg.as_str().into());
    header.insert("kid".into(), input.kid.clone().into());
    header.insert("crit".into(), crit.into());
    header.insert(SUBJECT_CLAIM.into(), input.subject.clone().into());
    header.insert(ISSUER_CLAIM.into(), input.issuer.clone().into());
    header.insert(ISSUED_AT_CLAIM.into(), input.issued_at.clone().into());
    header.insert(JTI_CLAIM.into(), input.jti.clone().into());
    header.insert(PATH_CLAIM.into(), input.path.clone().into());

    let json = serde_json::to_vec(&serde_json::Value::Object(header)).unwrap_or_default();
    let header_b64 = if input.standard_alphabet {
        base64::engine::general_purpose::STANDARD_NO_PAD.encode(json).replace('/', "_")
    } else {
        URL_SAFE_NO_PAD.encode(json)
    };
    format!("{header_b64}..{}", URL_SAFE_NO_PAD.encode(&input.signature))
}

fuzz_target!(|input: FuzzedHeader| {
    let signature = build_signature(&input);

    let Ok(envelope) = DetachedSignature::parse(&signature) else {
        return;
    };
    let Ok(header) = decode_header(envelope.header_b64()).and_then(JoseHeader::from_value) else {
        return;
    };

    let _ = validate_type(&header.typ);
    let _ = validate_algorithm(&header.alg);

    let now = chrono::DateTime::UNIX_EPOCH + chrono::Duration::days(20_000);
    let _ = validate_issued_at(&header.issued_at, now, chrono::Duration::seconds(5));
    let _ = validate_issued_at(&header.issued_at, now, chrono::Duration::MAX);
});

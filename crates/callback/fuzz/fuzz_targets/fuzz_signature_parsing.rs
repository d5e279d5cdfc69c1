//! Fuzz target for compact detached signature parsing.
//!
//! Feeds arbitrary strings as callback signatures through envelope parsing,
//! header decoding and the header shape checks. Every input must end in
//! `Ok` or a `CallbackError`, never a panic.

#![no_main]

use libfuzzer_sys::fuzz_target;
use payconiq_callback::{
    DetachedSignature, JoseHeader,
    jose::decode_header,
    validation::{validate_algorithm, validate_issuer, validate_type},
};

fuzz_target!(|data: &[u8]| {
    let Ok(signature) = std::str::from_utf8(data) else {
        return;
    };

    let Ok(envelope) = DetachedSignature::parse(signature) else {
        return;
    };
    let _ = envelope.signature_bytes();
    let _ = envelope.signing_input(data);

    if let Ok(header) = decode_header(envelope.header_b64()).and_then(JoseHeader::from_value) {
        let _ = validate_type(&header.typ);
        let _ = validate_algorithm(&header.alg);
        let _ = validate_issuer(&header.issuer);
    }
});

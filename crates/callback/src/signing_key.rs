//! Published signing keys.
//!
//! Payconiq publishes its callback signing keys as a JWK set. This module
//! holds the wire form ([`Jwk`], [`JwkSet`]), the filter deciding which
//! entries are usable ([`usable_keys`]) and the parsed, immutable
//! [`SigningKey`] the verifier checks signatures with.

use std::fmt;

use base64::Engine;
use p256::ecdsa::{Signature, VerifyingKey, signature::Verifier};
use serde::{Deserialize, Serialize};

use crate::jose::LENIENT_URL_SAFE;

/// Key type / algorithm pairs usable for callback signatures, in every
/// environment.
pub const ACCEPTED_KEYS: &[(KeyType, &str)] = &[(KeyType::Rsa, "RS256"), (KeyType::Ec, "ES256")];

/// Length of one P-256 affine coordinate in bytes.
const P256_COORDINATE_LENGTH: usize = 32;

/// Key type of a published signing key.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KeyType {
    /// RSA key (`kty: "RSA"`).
    #[serde(rename = "RSA")]
    Rsa,
    /// Elliptic curve key (`kty: "EC"`).
    #[serde(rename = "EC")]
    Ec,
}

impl KeyType {
    /// Parses a JWK `kty` value.
    #[must_use]
    pub fn from_kty(kty: &str) -> Option<Self> {
        match kty {
            "RSA" => Some(Self::Rsa),
            "EC" => Some(Self::Ec),
            _ => None,
        }
    }

    /// The JWK `kty` value.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Rsa => "RSA",
            Self::Ec => "EC",
        }
    }
}

impl fmt::Display for KeyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entry of the published key set, as served.
///
/// Only the members the filter and key decoding look at are modelled;
/// anything else in the document is ignored.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Jwk {
    /// Key type (`RSA`, `EC`, ...).
    pub kty: String,
    /// Intended use; only `sig` keys are usable.
    #[serde(rename = "use", default, skip_serializing_if = "Option::is_none")]
    pub key_use: Option<String>,
    /// Key identifier referenced by the callback header's `kid`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kid: Option<String>,
    /// Algorithm the key is meant for.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alg: Option<String>,
    /// Certificate chain, base64 DER, leaf first.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub x5c: Vec<String>,
    /// SHA-256 thumbprint of the leaf certificate.
    #[serde(rename = "x5t#S256", default, skip_serializing_if = "Option::is_none")]
    pub x5t_s256: Option<String>,
    /// Curve name for EC keys.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crv: Option<String>,
    /// EC x coordinate, base64url.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<String>,
    /// EC y coordinate, base64url.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y: Option<String>,
    /// RSA modulus, base64url.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub n: Option<String>,
    /// RSA public exponent, base64url.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub e: Option<String>,
}

/// The published key set document: `{ "keys": [ ... ] }`.
///
/// Entries are kept as raw JSON so that one malformed entry is dropped on
/// its own instead of failing the whole document.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct JwkSet {
    /// Raw key entries.
    #[serde(default)]
    pub keys: Vec<serde_json::Value>,
}

impl JwkSet {
    /// Returns the entries that deserialize as [`Jwk`], in document order.
    pub fn into_jwks(self) -> impl Iterator<Item = Jwk> {
        self.keys.into_iter().filter_map(|value| match serde_json::from_value::<Jwk>(value) {
            Ok(jwk) => Some(jwk),
            Err(err) => {
                tracing::debug!(error = %err, "dropping undecodable key set entry");
                None
            },
        })
    }
}

/// Public key material of a [`SigningKey`].
#[derive(Clone, Debug)]
pub enum KeyMaterial {
    /// P-256 verifying key.
    Ec(VerifyingKey),
    /// RSA components, kept as published.
    ///
    /// Callbacks are always ES256, so RSA keys never verify a callback.
    Rsa {
        /// Modulus, base64url.
        n: String,
        /// Public exponent, base64url.
        e: String,
    },
}

/// A usable signing key from the published key set.
#[derive(Clone, Debug)]
pub struct SigningKey {
    kid: String,
    key_type: KeyType,
    algorithm: String,
    certificate_chain: Vec<String>,
    material: KeyMaterial,
}

impl SigningKey {
    /// Builds a signing key from a published entry.
    ///
    /// # Errors
    ///
    /// Returns the reason the entry is unusable: wrong `use`, a key type /
    /// algorithm pair outside [`ACCEPTED_KEYS`], a missing `kid` or
    /// certificate, or key material that does not decode.
    pub fn from_jwk(jwk: &Jwk) -> Result<Self, &'static str> {
        if jwk.key_use.as_deref() != Some("sig") {
            return Err("key use is not 'sig'");
        }

        let key_type = KeyType::from_kty(&jwk.kty).ok_or("unsupported key type")?;
        let algorithm = jwk.alg.as_deref().ok_or("missing alg")?;
        if !ACCEPTED_KEYS.iter().any(|&(kty, alg)| kty == key_type && alg == algorithm) {
            return Err("key type and algorithm pair not accepted");
        }

        let kid = jwk.kid.as_deref().filter(|kid| !kid.is_empty()).ok_or("missing kid")?;

        match jwk.x5c.first() {
            Some(leaf) if !leaf.is_empty() => {},
            _ => return Err("missing leaf certificate"),
        }

        let material = match key_type {
            KeyType::Ec => KeyMaterial::Ec(decode_ec_key(jwk)?),
            KeyType::Rsa => KeyMaterial::Rsa {
                n: jwk.n.clone().filter(|n| !n.is_empty()).ok_or("missing RSA modulus")?,
                e: jwk.e.clone().filter(|e| !e.is_empty()).ok_or("missing RSA exponent")?,
            },
        };

        Ok(Self {
            kid: kid.to_owned(),
            key_type,
            algorithm: algorithm.to_owned(),
            certificate_chain: jwk.x5c.clone(),
            material,
        })
    }

    /// Creates an EC signing key directly from a verifying key.
    #[must_use]
    pub fn from_verifying_key(
        kid: impl Into<String>,
        key: VerifyingKey,
        certificate_chain: Vec<String>,
    ) -> Self {
        Self {
            kid: kid.into(),
            key_type: KeyType::Ec,
            algorithm: "ES256".to_owned(),
            certificate_chain,
            material: KeyMaterial::Ec(key),
        }
    }

    /// Key identifier.
    #[must_use]
    pub fn kid(&self) -> &str {
        &self.kid
    }

    /// Key type.
    #[must_use]
    pub fn key_type(&self) -> KeyType {
        self.key_type
    }

    /// Algorithm the key is published for.
    #[must_use]
    pub fn algorithm(&self) -> &str {
        &self.algorithm
    }

    /// Certificate chain, base64 DER, leaf first.
    #[must_use]
    pub fn certificate_chain(&self) -> &[String] {
        &self.certificate_chain
    }

    /// Public key material.
    #[must_use]
    pub fn material(&self) -> &KeyMaterial {
        &self.material
    }

    /// Verifies an ES256 signature in P1363 (`r || s`) encoding.
    ///
    /// Returns `false` for wrongly-sized signatures and for non-EC keys.
    #[must_use]
    pub fn verify_es256(&self, message: &[u8], signature: &[u8]) -> bool {
        let KeyMaterial::Ec(key) = &self.material else {
            return false;
        };
        match Signature::from_slice(signature) {
            Ok(signature) => key.verify(message, &signature).is_ok(),
            Err(_) => false,
        }
    }
}

/// Filters published entries down to the usable keys.
///
/// Unusable entries are dropped silently; the output keeps input order.
pub fn usable_keys(jwks: impl IntoIterator<Item = Jwk>) -> Vec<SigningKey> {
    jwks.into_iter()
        .filter_map(|jwk| match SigningKey::from_jwk(&jwk) {
            Ok(key) => Some(key),
            Err(reason) => {
                tracing::debug!(kid = ?jwk.kid, kty = %jwk.kty, reason, "dropping unusable key");
                None
            },
        })
        .collect()
}

/// Decodes the P-256 public point from the JWK `x` and `y` coordinates.
fn decode_ec_key(jwk: &Jwk) -> Result<VerifyingKey, &'static str> {
    if jwk.crv.as_deref().is_some_and(|crv| crv != "P-256") {
        return Err("unsupported curve");
    }
    let x = decode_coordinate(jwk.x.as_deref())?;
    let y = decode_coordinate(jwk.y.as_deref())?;

    let mut sec1 = Vec::with_capacity(1 + 2 * P256_COORDINATE_LENGTH);
    sec1.push(0x04);
    sec1.extend_from_slice(&x);
    sec1.extend_from_slice(&y);

    VerifyingKey::from_sec1_bytes(&sec1).map_err(|_| "EC point is not on P-256")
}

fn decode_coordinate(coordinate: Option<&str>) -> Result<Vec<u8>, &'static str> {
    let bytes = LENIENT_URL_SAFE
        .decode(coordinate.ok_or("missing EC coordinate")?)
        .map_err(|_| "EC coordinate is not base64url")?;
    if bytes.len() != P256_COORDINATE_LENGTH {
        return Err("EC coordinate has the wrong length");
    }
    Ok(bytes)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use p256::ecdsa::{SigningKey as EcSigningKey, signature::Signer};
    use rand_core::OsRng;
    use rstest::rstest;
    use serde_json::json;

    use super::*;

    fn ec_jwk(kid: &str) -> (EcSigningKey, Jwk) {
        let signing_key = EcSigningKey::random(&mut OsRng);
        let point = signing_key.verifying_key().to_encoded_point(false);
        let jwk = Jwk {
            kty: "EC".into(),
            key_use: Some("sig".into()),
            kid: Some(kid.into()),
            alg: Some("ES256".into()),
            x5c: vec!["MIIBleaf".into()],
            crv: Some("P-256".into()),
            x: Some(base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(point.x().unwrap())),
            y: Some(base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(point.y().unwrap())),
            ..Jwk::default()
        };
        (signing_key, jwk)
    }

    fn rsa_jwk(kid: &str) -> Jwk {
        Jwk {
            kty: "RSA".into(),
            key_use: Some("sig".into()),
            kid: Some(kid.into()),
            alg: Some("RS256".into()),
            x5c: vec!["MIIBrsa".into()],
            n: Some("sXchDaQebHnPiGvyDOAT4saGEUetSyo9MKLOoWFsueri23bOdgWp4Dy1Wl".into()),
            e: Some("AQAB".into()),
            ..Jwk::default()
        }
    }

    #[test]
    fn test_ec_key_accepted() {
        let (_, jwk) = ec_jwk("ec-1");
        let key = SigningKey::from_jwk(&jwk).unwrap();
        assert_eq!(key.kid(), "ec-1");
        assert_eq!(key.key_type(), KeyType::Ec);
        assert_eq!(key.algorithm(), "ES256");
        assert_eq!(key.certificate_chain(), ["MIIBleaf".to_owned()]);
    }

    #[test]
    fn test_rsa_key_accepted() {
        let key = SigningKey::from_jwk(&rsa_jwk("rsa-1")).unwrap();
        assert_eq!(key.key_type(), KeyType::Rsa);
        assert!(matches!(key.material(), KeyMaterial::Rsa { .. }));
    }

    #[rstest]
    #[case::wrong_use(|jwk: &mut Jwk| jwk.key_use = Some("enc".into()))]
    #[case::missing_use(|jwk: &mut Jwk| jwk.key_use = None)]
    #[case::missing_kid(|jwk: &mut Jwk| jwk.kid = None)]
    #[case::empty_kid(|jwk: &mut Jwk| jwk.kid = Some(String::new()))]
    #[case::no_certificate(|jwk: &mut Jwk| jwk.x5c.clear())]
    #[case::empty_certificate(|jwk: &mut Jwk| jwk.x5c = vec![String::new()])]
    #[case::ec_with_rs256(|jwk: &mut Jwk| jwk.alg = Some("RS256".into()))]
    #[case::ec_with_es384(|jwk: &mut Jwk| jwk.alg = Some("ES384".into()))]
    #[case::other_curve(|jwk: &mut Jwk| jwk.crv = Some("P-384".into()))]
    #[case::short_coordinate(|jwk: &mut Jwk| jwk.x = Some("AAAA".into()))]
    #[case::oct_key(|jwk: &mut Jwk| jwk.kty = "oct".into())]
    fn test_unusable_ec_entries_rejected(#[case] mutate: fn(&mut Jwk)) {
        let (_, mut jwk) = ec_jwk("ec-bad");
        mutate(&mut jwk);
        assert!(SigningKey::from_jwk(&jwk).is_err());
    }

    #[test]
    fn test_rsa_with_es256_rejected() {
        let mut jwk = rsa_jwk("rsa-bad");
        jwk.alg = Some("ES256".into());
        assert!(SigningKey::from_jwk(&jwk).is_err());
    }

    #[test]
    fn test_usable_keys_filters_and_preserves_order() {
        let (_, first) = ec_jwk("first");
        let (_, mut dropped) = ec_jwk("dropped");
        dropped.key_use = Some("enc".into());
        let third = rsa_jwk("third");
        let (_, fourth) = ec_jwk("fourth");

        let keys = usable_keys(vec![first, dropped, third, fourth]);
        let kids: Vec<&str> = keys.iter().map(SigningKey::kid).collect();
        assert_eq!(kids, ["first", "third", "fourth"]);
    }

    #[test]
    fn test_jwk_set_drops_undecodable_entries() {
        let (_, jwk) = ec_jwk("good");
        let document = json!({
            "keys": [
                serde_json::to_value(&jwk).unwrap(),
                { "kty": "EC", "use": "sig", "kid": "numeric-x5c", "alg": "ES256", "x5c": [1, 2] },
                { "use": "sig" },
            ]
        });
        let set: JwkSet = serde_json::from_value(document).unwrap();
        let jwks: Vec<Jwk> = set.into_jwks().collect();
        assert_eq!(jwks.len(), 1);
        assert_eq!(jwks[0].kid.as_deref(), Some("good"));
    }

    #[test]
    fn test_verify_es256_round_trip() {
        let (signing_key, jwk) = ec_jwk("ec-verify");
        let key = SigningKey::from_jwk(&jwk).unwrap();

        let signature: Signature = signing_key.sign(b"header.body");
        assert!(key.verify_es256(b"header.body", &signature.to_bytes()));
        assert!(!key.verify_es256(b"header.other", &signature.to_bytes()));
        assert!(!key.verify_es256(b"header.body", &signature.to_bytes()[..63]));
    }

    #[test]
    fn test_rsa_key_never_verifies_es256() {
        let key = SigningKey::from_jwk(&rsa_jwk("rsa")).unwrap();
        assert!(!key.verify_es256(b"header.body", &[0u8; 64]));
    }
}

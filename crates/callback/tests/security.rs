//! Security-focused callback verification tests.
//!
//! Every check of the verification pipeline is exercised in isolation: a
//! genuine callback is mutated in exactly one place and re-signed, so the
//! rejection observed is the one that check produces. Also covers key
//! rotation, key set staleness, forged signatures and replays.
#![allow(clippy::expect_used, clippy::unwrap_used, clippy::panic)]

use std::{sync::Arc, time::Duration};

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::{DateTime, SubsecRound, Utc};
use p256::ecdsa::SigningKey as EcSigningKey;
use payconiq_callback::{
    CallbackError, CallbackPath, CallbackVerifier, Environment, InMemoryReplayDetector, Jwk,
    KeyCache, KeyFetcher, MemoryKeyFetcher, TimeSource, VerificationCategory, VerifierConfig,
    VerifyOptions, assert_callback_error,
    jose::{ISSUED_AT_CLAIM, ISSUER_CLAIM, JTI_CLAIM, PATH_CLAIM, SUBJECT_CLAIM},
    testutil::{
        ManualTimeSource, TEST_CALLBACK_URL, TEST_PAYMENT_ID, callback_header, craft_signature,
        format_issued_at, generate_test_keypair, sign_callback,
    },
};
use rstest::rstest;
use serde_json::{Value, json};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

const KID: &str = "es256-2024-01";

struct Fixture {
    signing_key: EcSigningKey,
    fetcher: Arc<MemoryKeyFetcher>,
    clock: Arc<ManualTimeSource>,
    verifier: CallbackVerifier,
}

impl Fixture {
    fn new() -> Self {
        Self::with_config(
            VerifierConfig::builder()
                .subject(TEST_PAYMENT_ID)
                .callback_url(TEST_CALLBACK_URL)
                .build(),
        )
    }

    fn with_config(config: VerifierConfig) -> Self {
        let (signing_key, jwk) = generate_test_keypair(KID);
        let fetcher = Arc::new(MemoryKeyFetcher::new(vec![jwk]));
        // `iat` carries milliseconds; a finer clock would skew the window bounds.
        let clock = Arc::new(ManualTimeSource::new(Utc::now().trunc_subsecs(3)));
        let cache = Arc::new(KeyCache::with_time_source(
            Environment::External,
            Arc::clone(&fetcher) as Arc<dyn KeyFetcher>,
            Arc::clone(&clock) as Arc<dyn TimeSource>,
        ));
        let verifier = CallbackVerifier::new(cache, config)
            .with_time_source(Arc::clone(&clock) as Arc<dyn TimeSource>);
        Self { signing_key, fetcher, clock, verifier }
    }

    fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    fn header(&self) -> Value {
        callback_header(KID, self.now())
    }

    fn sign(&self, header: &Value, body: &[u8]) -> String {
        sign_callback(&self.signing_key, header, body)
    }

    fn genuine(&self) -> String {
        self.sign(&self.header(), BODY)
    }

    async fn verify(&self, signature: &str, body: &[u8]) -> Result<(), CallbackError> {
        self.verifier.verify(signature, body, &VerifyOptions::default()).await
    }
}

const BODY: &[u8] = br#"{"paymentId":"5fb3a2e1bc1b440006ab9e1f","transferAmount":1250,"tippingAmount":0,"amount":1250,"totalAmount":1250,"createdAt":"2024-03-01T12:00:00.000Z","expireAt":"2024-03-01T12:20:00.000Z","succeededAt":"2024-03-01T12:00:30.000Z","status":"SUCCEEDED","currency":"EUR"}"#;

fn set(header: &mut Value, member: &str, value: Value) {
    header.as_object_mut().expect("header is an object").insert(member.to_owned(), value);
}

// ---------------------------------------------------------------------------
// Genuine callbacks
// ---------------------------------------------------------------------------

#[tokio::test]
async fn genuine_callback_accepted() {
    let fixture = Fixture::new();
    fixture.verify(&fixture.genuine(), BODY).await.expect("genuine callback must verify");
    assert_eq!(fixture.fetcher.fetch_count(), 1);
}

#[tokio::test]
async fn lowercase_algorithm_accepted() {
    let fixture = Fixture::new();
    let mut header = fixture.header();
    set(&mut header, "alg", json!("es256"));
    let signature = fixture.sign(&header, BODY);
    assert!(fixture.verify(&signature, BODY).await.is_ok());
}

#[tokio::test]
async fn standard_alphabet_signature_segment_accepted() {
    let fixture = Fixture::new();
    // Retry until the signature segment actually contains a URL-safe character.
    for _ in 0..64 {
        let signature = fixture.genuine();
        let (header_b64, signature_b64) = signature.split_once("..").unwrap();
        if !signature_b64.contains('-') {
            continue;
        }
        let standard = format!("{header_b64}..{}", signature_b64.replace('-', "+"));
        fixture.verify(&standard, BODY).await.expect("'+' must decode like '-'");
        return;
    }
}

#[tokio::test]
async fn empty_body_signature_verifies() {
    let fixture = Fixture::new();
    let signature = fixture.sign(&fixture.header(), b"");
    assert!(fixture.verify(&signature, b"").await.is_ok());
}

// ---------------------------------------------------------------------------
// Envelope and header shape
// ---------------------------------------------------------------------------

#[rstest]
#[case::jwt_shape("aaa.bbb.ccc")]
#[case::single_dot("aaa.bbb")]
#[case::empty("")]
#[case::whitespace(" aaa..bbb")]
#[case::slash("aa/a..bbb")]
#[tokio::test]
async fn malformed_envelope_rejected(#[case] signature: &str) {
    let fixture = Fixture::new();
    let result = fixture.verify(signature, BODY).await;
    assert_callback_error!(result, Incorrect, "Incorrect compact detached signature");
    assert_eq!(fixture.fetcher.fetch_count(), 0, "no key fetch before the envelope is valid");
}

#[tokio::test]
async fn undecodable_header_is_malformed() {
    let fixture = Fixture::new();
    let not_json = URL_SAFE_NO_PAD.encode(b"{not json");
    let result = fixture.verify(&format!("{not_json}..AAAA"), BODY).await;
    assert!(matches!(result, Err(CallbackError::MalformedHeader { .. })), "got {result:?}");
    assert_eq!(result.unwrap_err().category(), None);
}

#[rstest]
#[case::missing_jti(JTI_CLAIM)]
#[case::missing_kid("kid")]
#[case::missing_crit("crit")]
#[case::missing_path(PATH_CLAIM)]
#[tokio::test]
async fn missing_header_member_rejected(#[case] member: &str) {
    let fixture = Fixture::new();
    let mut header = fixture.header();
    header.as_object_mut().unwrap().remove(member);
    let result = fixture.verify(&fixture.sign(&header, BODY), BODY).await;
    assert_callback_error!(result, Invalid, "Invalid header");
}

#[tokio::test]
async fn unknown_critical_claim_rejected() {
    let fixture = Fixture::new();
    let mut header = fixture.header();
    set(&mut header, "crit", json!([SUBJECT_CLAIM, "https://payconiq.com/exp"]));
    let result = fixture.verify(&fixture.sign(&header, BODY), BODY).await;
    assert_callback_error!(result, Invalid, "Invalid header");
}

// ---------------------------------------------------------------------------
// Single-claim mutations
// ---------------------------------------------------------------------------

#[rstest]
#[case::jwt_type("typ", json!("JWT"), VerificationCategory::Unsupported, "Unsupported type")]
#[case::rs256("alg", json!("RS256"), VerificationCategory::Unsupported, "Unsupported algorithm")]
#[case::hs256("alg", json!("HS256"), VerificationCategory::Unsupported, "Unsupported algorithm")]
#[case::alg_none("alg", json!("none"), VerificationCategory::Unsupported, "Unsupported algorithm")]
#[case::issuer(ISSUER_CLAIM, json!("payconiq"), VerificationCategory::Invalid, "Invalid issuer")]
#[case::subject(SUBJECT_CLAIM, json!("000000000000000000000000"), VerificationCategory::Invalid, "Invalid subject")]
#[case::path(PATH_CLAIM, json!("https://attacker.example/callback"), VerificationCategory::Invalid, "Invalid path")]
#[case::iat_garbage(ISSUED_AT_CLAIM, json!("yesterday"), VerificationCategory::Invalid, "Invalid issued at")]
#[case::unknown_kid("kid", json!("rotated-away"), VerificationCategory::Invalid, "Missing kid")]
#[tokio::test]
async fn single_mutation_rejected(
    #[case] member: &str,
    #[case] value: Value,
    #[case] category: VerificationCategory,
    #[case] message: &str,
) {
    let fixture = Fixture::new();
    let mut header = fixture.header();
    set(&mut header, member, value);
    let err = fixture.verify(&fixture.sign(&header, BODY), BODY).await.unwrap_err();
    assert_eq!(err.category(), Some(category), "{err}");
    assert_eq!(err.to_string(), message);
}

#[rstest]
#[case::too_old(-5_001, false)]
#[case::at_max_age(-5_000, true)]
#[case::slightly_future(100, true)]
#[case::too_far_future(101, false)]
#[tokio::test]
async fn freshness_window(#[case] offset_ms: i64, #[case] accepted: bool) {
    let fixture = Fixture::new();
    let issued_at = fixture.now() + chrono::Duration::milliseconds(offset_ms);
    let header = callback_header(KID, issued_at);
    let result = fixture.verify(&fixture.sign(&header, BODY), BODY).await;
    if accepted {
        result.expect("within the freshness window");
    } else {
        assert_callback_error!(result, Invalid, "Invalid issued at");
    }
}

#[tokio::test]
async fn per_call_max_age_and_reference_time() {
    let fixture = Fixture::new();
    let issued_at = fixture.now() - chrono::Duration::seconds(30);
    let signature = fixture.sign(&callback_header(KID, issued_at), BODY);

    let result = fixture.verify(&signature, BODY).await;
    assert_callback_error!(result, Invalid, "Invalid issued at");

    let options = VerifyOptions::builder().max_age(Duration::from_secs(60)).build();
    assert!(fixture.verifier.verify(&signature, BODY, &options).await.is_ok());

    let options = VerifyOptions::builder().now(issued_at + chrono::Duration::seconds(1)).build();
    assert!(fixture.verifier.verify(&signature, BODY, &options).await.is_ok());
}

// ---------------------------------------------------------------------------
// Subject and path binding
// ---------------------------------------------------------------------------

#[tokio::test]
async fn unbound_subject_accepts_any_payment_profile() {
    let fixture = Fixture::with_config(VerifierConfig::builder().callback_url(TEST_CALLBACK_URL).build());
    let mut header = fixture.header();
    set(&mut header, SUBJECT_CLAIM, json!("another-profile"));
    assert!(fixture.verify(&fixture.sign(&header, BODY), BODY).await.is_ok());
}

#[tokio::test]
async fn missing_callback_url_rejected() {
    let fixture = Fixture::with_config(VerifierConfig::builder().subject(TEST_PAYMENT_ID).build());
    let result = fixture.verify(&fixture.genuine(), BODY).await;
    assert_callback_error!(result, Invalid, "Missing callbackURL");
}

#[tokio::test]
async fn per_call_callback_url_overrides_default() {
    let fixture = Fixture::new();
    let mut header = fixture.header();
    set(&mut header, PATH_CLAIM, json!("https://shop.example/other"));
    let signature = fixture.sign(&header, BODY);

    let result = fixture.verify(&signature, BODY).await;
    assert_callback_error!(result, Invalid, "Invalid path");

    let options = VerifyOptions::builder().callback_url("https://shop.example/other").build();
    assert!(fixture.verifier.verify(&signature, BODY, &options).await.is_ok());
}

#[tokio::test]
async fn unchecked_path_skips_comparison() {
    let fixture = Fixture::with_config(
        VerifierConfig::builder().subject(TEST_PAYMENT_ID).callback_url(CallbackPath::Unchecked).build(),
    );
    let mut header = fixture.header();
    set(&mut header, PATH_CLAIM, json!("https://anything.example/"));
    assert!(fixture.verify(&fixture.sign(&header, BODY), BODY).await.is_ok());
}

// ---------------------------------------------------------------------------
// Cryptographic check
// ---------------------------------------------------------------------------

#[tokio::test]
async fn tampered_body_fails() {
    let fixture = Fixture::new();
    let signature = fixture.genuine();
    let tampered = String::from_utf8_lossy(BODY).replace("1250", "1");
    let result = fixture.verify(&signature, tampered.as_bytes()).await;
    assert_callback_error!(result, Failed, "Failed verification");
}

#[tokio::test]
async fn tampered_header_fails() {
    let fixture = Fixture::new();
    let signature = fixture.genuine();
    let (_, signature_b64) = signature.split_once("..").unwrap();

    // Same claims, different jti: still a valid header, no longer the signed one.
    let mut header = fixture.header();
    set(&mut header, JTI_CLAIM, json!("forged-jti"));
    let forged = format!(
        "{}..{signature_b64}",
        URL_SAFE_NO_PAD.encode(serde_json::to_vec(&header).unwrap())
    );
    let result = fixture.verify(&forged, BODY).await;
    assert_callback_error!(result, Failed, "Failed verification");
}

#[tokio::test]
async fn signature_from_unpublished_key_fails() {
    let fixture = Fixture::new();
    let (attacker_key, _) = generate_test_keypair(KID);
    let forged = sign_callback(&attacker_key, &fixture.header(), BODY);
    let result = fixture.verify(&forged, BODY).await;
    assert_callback_error!(result, Failed, "Failed verification");
}

#[rstest]
#[case::empty_bytes(&[][..])]
#[case::short(&[0u8; 32][..])]
#[case::zeroes(&[0u8; 64][..])]
#[case::der_length(&[0x30u8; 72][..])]
#[tokio::test]
async fn bogus_signature_bytes_fail(#[case] bytes: &[u8]) {
    let fixture = Fixture::new();
    let signature = if bytes.is_empty() {
        format!("{}..A", payconiq_callback::testutil::encode_header(&fixture.header()))
    } else {
        craft_signature(&fixture.header(), bytes)
    };
    let result = fixture.verify(&signature, BODY).await;
    assert_callback_error!(result, Failed, "Failed verification");
}

#[tokio::test]
async fn rsa_key_never_satisfies_es256() {
    let fixture = Fixture::new();
    let rsa = Jwk {
        kty: "RSA".into(),
        key_use: Some("sig".into()),
        kid: Some("rsa-1".into()),
        alg: Some("RS256".into()),
        x5c: vec!["MIIBrsa".into()],
        n: Some("sXchDaQebHnPiGvyDOAT4saGEUetSyo9MKLOoWFsueri23bOdgWp4Dy1Wl".into()),
        e: Some("AQAB".into()),
        ..Jwk::default()
    };
    fixture.fetcher.set_keys(vec![rsa]);

    let signature = fixture.sign(&callback_header("rsa-1", fixture.now()), BODY);
    let result = fixture.verify(&signature, BODY).await;
    assert_callback_error!(result, Failed, "Failed verification");
}

// ---------------------------------------------------------------------------
// Key rotation and cache behaviour
// ---------------------------------------------------------------------------

#[tokio::test]
async fn unknown_kid_costs_exactly_one_refetch() {
    let fixture = Fixture::new();
    fixture.verify(&fixture.genuine(), BODY).await.unwrap();
    assert_eq!(fixture.fetcher.fetch_count(), 1);

    for expected in [2, 3] {
        let signature = fixture.sign(&callback_header("unknown", fixture.now()), BODY);
        let result = fixture.verify(&signature, BODY).await;
        assert_callback_error!(result, Invalid, "Missing kid");
        assert_eq!(fixture.fetcher.fetch_count(), expected);
    }

    // The known key keeps being served from the cache.
    fixture.verify(&fixture.genuine(), BODY).await.unwrap();
    assert_eq!(fixture.fetcher.fetch_count(), 3);
}

#[tokio::test]
async fn rotated_in_key_accepted_after_forced_refetch() {
    let fixture = Fixture::new();
    fixture.verify(&fixture.genuine(), BODY).await.unwrap();

    let (new_key, new_jwk) = generate_test_keypair("es256-2024-07");
    fixture.fetcher.set_keys(vec![new_jwk]);

    let signature = sign_callback(&new_key, &callback_header("es256-2024-07", fixture.now()), BODY);
    fixture.verify(&signature, BODY).await.expect("rotated key must be picked up");
    assert_eq!(fixture.fetcher.fetch_count(), 2);

    // The old key left the set with the rotation.
    let result = fixture.verify(&fixture.genuine(), BODY).await;
    assert_callback_error!(result, Invalid, "Missing kid");
}

#[tokio::test]
async fn stale_key_set_refetched_after_twelve_hours() {
    let fixture = Fixture::new();
    fixture.verify(&fixture.genuine(), BODY).await.unwrap();

    fixture.clock.advance(chrono::Duration::hours(12));
    fixture.verify(&fixture.genuine(), BODY).await.unwrap();
    assert_eq!(fixture.fetcher.fetch_count(), 1, "exactly 12 hours is still fresh");

    fixture.clock.advance(chrono::Duration::milliseconds(1));
    fixture.verify(&fixture.genuine(), BODY).await.unwrap();
    assert_eq!(fixture.fetcher.fetch_count(), 2);
}

#[tokio::test]
async fn key_fetch_failure_propagates() {
    let fixture = Fixture::new();
    fixture.fetcher.set_failure(Some("certificates unavailable".into()));

    let err = fixture.verify(&fixture.genuine(), BODY).await.unwrap_err();
    assert!(matches!(err, CallbackError::KeyFetch { .. }), "got {err:?}");
    assert_eq!(err.category(), None);
}

#[tokio::test]
async fn concurrent_verifications_share_one_cache() {
    let fixture = Arc::new(Fixture::new());
    fixture.verify(&fixture.genuine(), BODY).await.unwrap();

    let mut handles = Vec::new();
    for _ in 0..32 {
        let fixture = Arc::clone(&fixture);
        handles.push(tokio::spawn(async move { fixture.verify(&fixture.genuine(), BODY).await }));
    }
    for handle in handles {
        handle.await.unwrap().expect("concurrent verification");
    }
    assert_eq!(fixture.fetcher.fetch_count(), 1);
}

// ---------------------------------------------------------------------------
// Replay detection
// ---------------------------------------------------------------------------

fn replay_fixture() -> Fixture {
    let mut fixture = Fixture::new();
    fixture.verifier = fixture
        .verifier
        .with_replay_detector(Arc::new(InMemoryReplayDetector::new(1_000)));
    fixture
}

#[tokio::test]
async fn replayed_callback_rejected() {
    let fixture = replay_fixture();
    let signature = fixture.genuine();

    fixture.verify(&signature, BODY).await.expect("first delivery");
    let result = fixture.verify(&signature, BODY).await;
    assert_callback_error!(result, Invalid, "Replayed jti");
}

#[tokio::test]
async fn unbounded_max_age_with_replay_detection() {
    let fixture = replay_fixture();
    let issued_at = fixture.now() - chrono::Duration::days(400);
    let signature = fixture.sign(&callback_header(KID, issued_at), BODY);
    let options = VerifyOptions::builder().max_age(Duration::MAX).build();

    fixture.verifier.verify(&signature, BODY, &options).await.expect("first delivery");
    let result = fixture.verifier.verify(&signature, BODY, &options).await;
    assert_callback_error!(result, Invalid, "Replayed jti");
}

#[tokio::test]
async fn forged_callback_does_not_burn_jti() {
    let fixture = replay_fixture();
    let header = fixture.header();

    let (attacker_key, _) = generate_test_keypair(KID);
    let forged = sign_callback(&attacker_key, &header, BODY);
    let result = fixture.verify(&forged, BODY).await;
    assert_callback_error!(result, Failed, "Failed verification");

    fixture.verify(&fixture.sign(&header, BODY), BODY).await.expect("genuine delivery");
}

#[tokio::test]
async fn distinct_jtis_accepted() {
    let fixture = replay_fixture();
    for n in 0..3 {
        let mut header = fixture.header();
        set(&mut header, JTI_CLAIM, json!(format!("jti-{n}")));
        set(&mut header, ISSUED_AT_CLAIM, json!(format_issued_at(fixture.now())));
        fixture.verify(&fixture.sign(&header, BODY), BODY).await.expect("distinct jti");
    }
}

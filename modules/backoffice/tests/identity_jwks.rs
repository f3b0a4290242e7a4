//! Bearer-token verification against a mocked JWKS endpoint.

use std::time::{SystemTime, UNIX_EPOCH};

use httpmock::prelude::*;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use modkit::TracedClient;
use serde_json::json;

use backoffice::config::IdentityConfig;
use backoffice::domain::ports::{AuthError, IdentityVerifier};
use backoffice::infra::identity::JwksVerifier;

const DOMAIN: &str = "tenant.example";
const AUDIENCE: &str = "backoffice-api";
const KID: &str = "test-key";
const MODULUS: &str = "qXViIDOimItKC0Abv5ADElU0TqZs1XPL_ZMyl4P2smqFurLI7lcuPn5MMAwlQv6H0DgjfeJM45TuvYj5tQsCI48ulP9A_S9LcCr0lca6hNVZUWAy03qgzi7kG9YPDcHfw9I4GjWquxR2aXBcgsuSiQ48f1L8GJ-U1UbmsRvJdAG7C-h40fdCVh7xQV3mPh_e89DWpIsQK5wNA6O8eufkqZal_isQQb3S6xCJvkF4uffZggKwOAJ1P63LlvO46VMUDX5e1eK5G2xytE6f57kRY9EMo2apjJSdo4Q1s4m81XybxQs6qzXqv4SZ28fwwp5GczXhhQ_NoM6d_KbMDQDo-w";

fn now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock after epoch")
        .as_secs()
}

fn sign(kid: &str, claims: serde_json::Value) -> String {
    let key = EncodingKey::from_rsa_pem(include_bytes!("fixtures/test_rsa_key.pem"))
        .expect("fixture key parses");
    let mut header = Header::new(Algorithm::RS256);
    header.kid = Some(kid.to_string());
    encode(&header, &claims, &key).expect("token signs")
}

fn claims(aud: &str, exp: u64) -> serde_json::Value {
    json!({
        "sub": "auth0|alice",
        "email": "alice@example.com",
        "iss": format!("https://{DOMAIN}/"),
        "aud": aud,
        "iat": now(),
        "exp": exp,
    })
}

async fn jwks_server() -> MockServer {
    MockServer::start_async().await
}

fn verifier(server: &MockServer) -> JwksVerifier {
    verifier_with_cooldown(server, 30)
}

fn verifier_with_cooldown(server: &MockServer, cooldown_secs: u64) -> JwksVerifier {
    let config = IdentityConfig {
        domain: DOMAIN.to_string(),
        audience: AUDIENCE.to_string(),
        jwks_ttl_secs: 600,
        jwks_refetch_cooldown_secs: cooldown_secs,
        jwks_url: Some(server.url("/.well-known/jwks.json")),
    };
    JwksVerifier::new(&config, TracedClient::new(reqwest::Client::new()))
}

fn key_set() -> serde_json::Value {
    json!({
        "keys": [{
            "kty": "RSA",
            "use": "sig",
            "alg": "RS256",
            "kid": KID,
            "n": MODULUS,
            "e": "AQAB"
        }]
    })
}

#[tokio::test]
async fn valid_token_yields_claims_and_key_set_is_cached() {
    let server = jwks_server().await;
    let jwks = server
        .mock_async(|when, then| {
            when.method(GET).path("/.well-known/jwks.json");
            then.status(200).json_body(key_set());
        })
        .await;
    let verifier = verifier(&server);
    let token = sign(KID, claims(AUDIENCE, now() + 3600));

    let identity = verifier.verify(&token).await.expect("token verifies");
    assert_eq!(identity.subject, "auth0|alice");
    assert_eq!(identity.email.as_deref(), Some("alice@example.com"));

    verifier.verify(&token).await.expect("second verify");
    assert_eq!(jwks.hits_async().await, 1);
}

#[tokio::test]
async fn wrong_audience_and_expired_tokens_are_rejected() {
    let server = jwks_server().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/.well-known/jwks.json");
            then.status(200).json_body(key_set());
        })
        .await;
    let verifier = verifier(&server);

    let wrong_aud = sign(KID, claims("someone-else", now() + 3600));
    assert!(matches!(
        verifier.verify(&wrong_aud).await,
        Err(AuthError::Rejected(_))
    ));

    let expired = sign(KID, claims(AUDIENCE, now() - 3600));
    assert!(matches!(
        verifier.verify(&expired).await,
        Err(AuthError::Rejected(_))
    ));
}

#[tokio::test]
async fn unknown_kid_refetches_at_most_once_per_cooldown() {
    let server = jwks_server().await;
    let jwks = server
        .mock_async(|when, then| {
            when.method(GET).path("/.well-known/jwks.json");
            then.status(200).json_body(key_set());
        })
        .await;
    let verifier = verifier(&server);
    let good = sign(KID, claims(AUDIENCE, now() + 3600));
    verifier.verify(&good).await.expect("token verifies");

    for kid in ["rotated-key", "another-key", "rotated-key"] {
        let token = sign(kid, claims(AUDIENCE, now() + 3600));
        assert!(matches!(
            verifier.verify(&token).await,
            Err(AuthError::UnknownKey(k)) if k == kid
        ));
    }
    assert_eq!(jwks.hits_async().await, 1);
}

#[tokio::test]
async fn unknown_kid_refetches_after_cooldown() {
    let server = jwks_server().await;
    let jwks = server
        .mock_async(|when, then| {
            when.method(GET).path("/.well-known/jwks.json");
            then.status(200).json_body(key_set());
        })
        .await;
    let verifier = verifier_with_cooldown(&server, 0);
    let token = sign("rotated-key", claims(AUDIENCE, now() + 3600));

    assert!(matches!(
        verifier.verify(&token).await,
        Err(AuthError::UnknownKey(kid)) if kid == "rotated-key"
    ));
    assert!(matches!(
        verifier.verify(&token).await,
        Err(AuthError::UnknownKey(_))
    ));
    assert_eq!(jwks.hits_async().await, 2);
}

#[tokio::test]
async fn malformed_and_symmetric_tokens_fail_before_key_lookup() {
    let server = jwks_server().await;
    let jwks = server
        .mock_async(|when, then| {
            when.method(GET).path("/.well-known/jwks.json");
            then.status(200).json_body(key_set());
        })
        .await;
    let verifier = verifier(&server);

    assert!(matches!(
        verifier.verify("not.a.jwt").await,
        Err(AuthError::Malformed(_))
    ));

    let mut header = Header::new(Algorithm::HS256);
    header.kid = Some(KID.to_string());
    let hs = encode(
        &header,
        &claims(AUDIENCE, now() + 3600),
        &EncodingKey::from_secret(b"shared"),
    )
    .expect("token signs");
    assert!(matches!(
        verifier.verify(&hs).await,
        Err(AuthError::Rejected(_))
    ));

    assert_eq!(jwks.hits_async().await, 0);
}

#[tokio::test]
async fn unreachable_key_set_is_reported() {
    let server = jwks_server().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/.well-known/jwks.json");
            then.status(503);
        })
        .await;
    let verifier = verifier(&server);
    let token = sign(KID, claims(AUDIENCE, now() + 3600));

    assert!(matches!(
        verifier.verify(&token).await,
        Err(AuthError::KeySet(_))
    ));
}

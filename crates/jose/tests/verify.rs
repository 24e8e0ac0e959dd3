//! Tests for JWT signature verification against keys, certificate chains and
//! JWK Sets.

use base64ct::{Base64UrlUnpadded, Encoding};
use rand_core::OsRng;
use rsa::RsaPrivateKey;
use rsa::pkcs1v15::SigningKey;
use rsa::signature::{SignatureEncoding as _, Signer as _};
use serde_json::{Value, json};
use sha2::Sha256;
use test_utils::{Verifier, Wallet};
use wallet_core::http::{DEFAULT_TIMEOUT, HttpClient};
use wallet_jose::{
    Algorithm, Error, Header, Jwk, Jwks, PublicKey, TrustAnchors, decode_jwt, encode_jws,
    verify_jwt, verify_jwt_with_jwks, verify_jwt_with_x509,
};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn http() -> HttpClient {
    HttpClient::new(DEFAULT_TIMEOUT).expect("should build client")
}

// ----------------------------------------------------------------------------
// Keys
// ----------------------------------------------------------------------------

// A JWT signed with an EC key verifies with its public key and fails with any
// other.
#[tokio::test]
async fn ec_key_pair() {
    test_utils::init_tracer();

    let wallet = Wallet::new();
    let header = Header::new(Algorithm::Es256);
    let jwt = encode_jws(&header, &json!({"sub": "alice"}), &wallet).await.expect("should sign");

    let verified = verify_jwt::<Value>(&jwt, &wallet.public_key()).expect("should verify");
    assert_eq!(verified.claims["sub"], "alice");

    let other = Wallet::new();
    let err = verify_jwt::<Value>(&jwt, &other.public_key()).unwrap_err();
    assert!(matches!(err, Error::Verification(_)));
}

// DER signatures from a platform signer are converted to JOSE form.
#[tokio::test]
async fn der_signer() {
    let wallet = Wallet::der();
    let jwt = encode_jws(&Header::new(Algorithm::Es256), &json!({"n": 1}), &wallet)
        .await
        .expect("should sign");

    let decoded = decode_jwt::<Value>(&jwt).expect("should decode");
    assert_eq!(decoded.signature.len(), 64);
    assert!(verify_jwt::<Value>(&jwt, &wallet.public_key()).is_ok());
}

#[tokio::test]
async fn rsa_key_pair() {
    let private_key = RsaPrivateKey::new(&mut OsRng, 1024).expect("should generate");
    let public_key = PublicKey::Rsa(private_key.to_public_key());

    let header = Base64UrlUnpadded::encode_string(br#"{"alg":"RS256"}"#);
    let payload = Base64UrlUnpadded::encode_string(br#"{"sub":"bob"}"#);
    let signing_input = format!("{header}.{payload}");
    let signature = SigningKey::<Sha256>::new(private_key).sign(signing_input.as_bytes()).to_vec();
    let jwt = format!("{signing_input}.{}", Base64UrlUnpadded::encode_string(&signature));

    let verified = verify_jwt::<Value>(&jwt, &public_key).expect("should verify");
    assert_eq!(verified.claims["sub"], "bob");

    // tampered payload
    let forged = Base64UrlUnpadded::encode_string(br#"{"sub":"eve"}"#);
    let tampered = format!("{header}.{forged}.{}", Base64UrlUnpadded::encode_string(&signature));
    assert!(matches!(verify_jwt::<Value>(&tampered, &public_key), Err(Error::Verification(_))));

    // algorithm and key type must agree
    let wallet = Wallet::new();
    let err = verify_jwt::<Value>(&jwt, &wallet.public_key()).unwrap_err();
    assert!(matches!(err, Error::UnsupportedAlgorithm(_)));
}

// ----------------------------------------------------------------------------
// Certificate chains
// ----------------------------------------------------------------------------

#[tokio::test]
async fn x5c_chain() {
    let verifier = Verifier::new();
    let jwt = verifier.request_object(&json!({"client_id": "verifier.example.com"})).await;

    let (decoded, chain) =
        verify_jwt_with_x509::<Value>(&jwt, &http(), &TrustAnchors::SelfAnchored)
            .await
            .expect("should verify");
    assert_eq!(decoded.claims["client_id"], "verifier.example.com");
    assert_eq!(chain.len(), 2);

    let pinned = TrustAnchors::Certificates(vec![verifier.root()]);
    assert!(verify_jwt_with_x509::<Value>(&jwt, &http(), &pinned).await.is_ok());

    // a different root is not trusted
    let stranger = TrustAnchors::Certificates(vec![Verifier::new().root()]);
    let err = verify_jwt_with_x509::<Value>(&jwt, &http(), &stranger).await.unwrap_err();
    assert!(matches!(err, Error::Certificate(_)));
}

// The signature must come from the leaf certificate's key.
#[tokio::test]
async fn x5c_wrong_signer() {
    let verifier = Verifier::new();
    let imposter = Wallet::new();

    let mut header = Header::new(Algorithm::Es256);
    header.x5c = Some(verifier.x5c());
    let jwt = encode_jws(&header, &json!({}), &imposter).await.expect("should sign");

    let err = verify_jwt_with_x509::<Value>(&jwt, &http(), &TrustAnchors::SelfAnchored)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Verification(_)));
}

#[tokio::test]
async fn x5u_bundle() {
    let server = MockServer::start().await;
    let verifier = Verifier::new();
    Mock::given(method("GET"))
        .and(path("/certs.pem"))
        .respond_with(ResponseTemplate::new(200).set_body_string(verifier.pem_bundle()))
        .mount(&server)
        .await;

    let x5u = format!("{}/certs.pem", server.uri());
    let jwt = verifier.request_object_x5u(&json!({"nonce": "n"}), &x5u).await;

    let (decoded, chain) =
        verify_jwt_with_x509::<Value>(&jwt, &http(), &TrustAnchors::SelfAnchored)
            .await
            .expect("should verify");
    assert_eq!(decoded.claims["nonce"], "n");
    assert_eq!(chain.len(), 2);
}

#[tokio::test]
async fn no_chain() {
    let wallet = Wallet::new();
    let jwt = encode_jws(&Header::new(Algorithm::Es256), &json!({}), &wallet).await.unwrap();

    let err = verify_jwt_with_x509::<Value>(&jwt, &http(), &TrustAnchors::SelfAnchored)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Certificate(_)));
}

// ----------------------------------------------------------------------------
// JWK Sets
// ----------------------------------------------------------------------------

#[tokio::test]
async fn jwks_lookup() {
    let server = MockServer::start().await;
    let wallet = Wallet::new();
    let other = Wallet::new();

    let jwks = Jwks {
        keys: vec![
            Jwk { kid: Some("other".to_string()), ..other.jwk() },
            Jwk { kid: Some("key-1".to_string()), ..wallet.jwk() },
        ],
    };
    Mock::given(method("GET"))
        .and(path("/jwks.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(&jwks))
        .mount(&server)
        .await;
    let jwks_uri = format!("{}/jwks.json", server.uri());

    let mut header = Header::new(Algorithm::Es256);
    header.kid = Some("key-1".to_string());
    let jwt = encode_jws(&header, &json!({"iss": "rp"}), &wallet).await.unwrap();
    let verified = verify_jwt_with_jwks::<Value>(&jwt, &jwks_uri, &http()).await.expect("verify");
    assert_eq!(verified.claims["iss"], "rp");

    header.kid = Some("missing".to_string());
    let jwt = encode_jws(&header, &json!({}), &wallet).await.unwrap();
    let err = verify_jwt_with_jwks::<Value>(&jwt, &jwks_uri, &http()).await.unwrap_err();
    assert!(matches!(err, Error::KeyNotFound(_)));
}

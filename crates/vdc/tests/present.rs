//! Tests for building SD-JWT and JWT-VC presentations.

use chrono::Duration;
use serde_json::{Map, Value, json};
use test_utils::{Issuer, Wallet};
use wallet_jose::{decode_jwt, verify_jwt};
use wallet_vdc::pex::{Constraints, Field, InputDescriptor, PresentationDefinition, select_disclosure};
use wallet_vdc::sd_jwt::{KbJwtClaims, SdJwtVpBuilder, decode_sd_jwt, divide_sd_jwt, sd_hash};
use wallet_vdc::w3c_vc::{VpClaims, W3cVpBuilder};

fn age_definition() -> PresentationDefinition {
    PresentationDefinition {
        id: "age-check".to_string(),
        input_descriptors: vec![InputDescriptor {
            id: "age".to_string(),
            constraints: Constraints {
                fields: Some(vec![Field {
                    path: vec!["$.is_older_than_13".to_string()],
                    ..Field::default()
                }]),
                ..Constraints::default()
            },
            ..InputDescriptor::default()
        }],
        ..PresentationDefinition::default()
    }
}

// Only the selected disclosures are presented and the KB-JWT hash covers
// exactly what precedes it.
#[tokio::test]
async fn sd_jwt_presentation() {
    test_utils::init_tracer();

    let wallet = Wallet::new();
    let issuer = Issuer::new();
    let credential = issuer
        .sd_jwt(&wallet.jwk(), &[
            ("given_name", json!("Alice")),
            ("is_older_than_13", json!(true)),
            ("address", json!({"country": "NZ"})),
        ])
        .await;

    let decoded = decode_sd_jwt(&credential).expect("should decode");
    assert_eq!(decoded.disclosures.len(), 3);
    assert!(decoded.key_binding_jwt.is_none());

    let pd = age_definition();
    let (descriptor, selected) = select_disclosure(&credential, &pd).expect("should match");
    assert_eq!(descriptor.id, "age");

    let parts = divide_sd_jwt(&credential);
    let vp = SdJwtVpBuilder::new()
        .matched(&parts.issuer_signed_jwt, &selected)
        .client_id("https://verifier.example.com/cb")
        .nonce("n-0S6_WzA2Mj")
        .signer(&wallet)
        .build()
        .await
        .expect("should build");

    let presented = divide_sd_jwt(&vp);
    assert_eq!(presented.issuer_signed_jwt, parts.issuer_signed_jwt);
    assert_eq!(presented.disclosures, vec![selected[0].disclosure.clone()]);
    let kb_jwt = presented.key_binding_jwt.expect("should have KB-JWT");

    let kb = verify_jwt::<KbJwtClaims>(&kb_jwt, &wallet.public_key()).expect("should verify");
    assert_eq!(kb.header.typ.as_deref(), Some("kb+jwt"));
    assert_eq!(kb.header.alg, "ES256");
    assert_eq!(kb.claims.aud, "https://verifier.example.com/cb");
    assert_eq!(kb.claims.nonce, "n-0S6_WzA2Mj");

    let prefix = &vp[..vp.len() - kb_jwt.len()];
    assert!(prefix.ends_with('~'));
    assert_eq!(kb.claims.sd_hash, sd_hash(prefix));
}

// Platform keystores return DER signatures; the KB-JWT must still verify.
#[tokio::test]
async fn sd_jwt_der_signer() {
    let wallet = Wallet::der();
    let credential = Issuer::new().sd_jwt(&wallet.jwk(), &[("is_older_than_13", json!(true))]).await;
    let (_, selected) = select_disclosure(&credential, &age_definition()).expect("should match");

    let vp = SdJwtVpBuilder::new()
        .matched(&divide_sd_jwt(&credential).issuer_signed_jwt, &selected)
        .client_id("rp")
        .signer(&wallet)
        .build()
        .await
        .expect("should build");

    let kb_jwt = divide_sd_jwt(&vp).key_binding_jwt.expect("should have KB-JWT");
    let kb = verify_jwt::<KbJwtClaims>(&kb_jwt, &wallet.public_key()).expect("should verify");
    assert_eq!(kb.claims.nonce, "");
}

#[tokio::test]
async fn jwt_vp_presentation() {
    let wallet = Wallet::new();
    let issuer = Issuer::new();
    let mut claims = Map::new();
    claims.insert("family_name".to_string(), json!("Doe"));
    let credential = issuer.jwt_vc("did:example:holder", claims).await;

    let vp = W3cVpBuilder::new()
        .credential(&credential)
        .client_id("https://verifier.example.com")
        .nonce("abc")
        .signer(&wallet)
        .build()
        .await
        .expect("should build");

    let verified = verify_jwt::<VpClaims>(&vp, &wallet.public_key()).expect("should verify");
    let claims = verified.claims;
    assert_eq!(claims.aud, "https://verifier.example.com");
    assert_eq!(claims.nonce.as_deref(), Some("abc"));
    assert_eq!(claims.exp - claims.nbf, Duration::hours(2));
    assert_eq!(claims.iss, wallet.jwk().thumbprint_uri().unwrap());
    assert_eq!(claims.vp.verifiable_credential, vec![credential.clone()]);
    assert_eq!(claims.vp.type_, vec!["VerifiablePresentation"]);
    assert_eq!(verified.header.jwk, Some(wallet.jwk()));

    // the wrapped credential is untouched
    let vc = decode_jwt::<Value>(&claims.vp.verifiable_credential[0]).expect("should decode");
    assert_eq!(vc.claims["vc"]["credentialSubject"]["family_name"], "Doe");
}

#[tokio::test]
async fn jwt_vp_validity() {
    let wallet = Wallet::new();
    let vp = W3cVpBuilder::new()
        .credential("header.payload.signature")
        .client_id("rp")
        .expires_in(Duration::minutes(5))
        .signer(&wallet)
        .build()
        .await
        .expect("should build");

    let claims = decode_jwt::<VpClaims>(&vp).expect("should decode").claims;
    assert_eq!(claims.exp - claims.nbf, Duration::minutes(5));
    assert!(claims.nonce.is_none());
}

#[tokio::test]
async fn jwt_vp_expiry_out_of_range() {
    let wallet = Wallet::new();
    let result = W3cVpBuilder::new()
        .credential("header.payload.signature")
        .client_id("rp")
        .expires_in(Duration::days(1_000_000_000))
        .signer(&wallet)
        .build()
        .await;

    let err = result.expect_err("should reject");
    assert!(err.to_string().contains("out of range"));
}

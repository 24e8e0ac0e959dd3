//! Tests for ID Token and VP Token responses

use std::collections::HashMap;

use serde_json::{Map, Value, json};
use test_utils::{Issuer, Wallet, init_tracer};
use wallet_oid4vp::core::urlencode::encode;
use wallet_oid4vp::jose::{Signer, decode_jwt};
use wallet_oid4vp::provider::Processed;
use wallet_oid4vp::vdc::pex::{InputDescriptor, PresentationSubmission};
use wallet_oid4vp::{Error, IdTokenClaims, OpenIdProvider, ProviderOption, SubmissionCredential};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn descriptor(id: &str, claim: &str) -> InputDescriptor {
    serde_json::from_value(json!({
        "id": id,
        "constraints": {"fields": [{"path": [format!("$.{claim}")]}]}
    }))
    .expect("should deserialize")
}

// An unsigned `redirect_uri` request whose responses go to `/post` on the
// mock server.
fn request_uri(server: &MockServer, response_type: &str, response_mode: &str) -> String {
    let client_id = format!("{}/post", server.uri());
    let params = json!({
        "client_id": client_id,
        "client_id_scheme": "redirect_uri",
        "response_type": response_type,
        "response_mode": response_mode,
        "redirect_uri": client_id,
        "nonce": "n-1",
        "state": "s-1",
        "client_metadata": {"client_name": "Example Verifier"},
        "presentation_definition": {
            "id": "pd-1",
            "input_descriptors": [
                descriptor("identity", "given_name"),
                descriptor("identity-0", "given_name"),
                descriptor("identity-1", "given_name"),
            ]
        },
    });
    format!("openid4vp://?{}", encode(&params).expect("should encode"))
}

async fn processed<'a>(uri: &str, wallet: &'a Wallet) -> OpenIdProvider<'a, Wallet, Processed> {
    processed_with(uri, wallet, ProviderOption::default()).await
}

async fn processed_with<'a>(
    uri: &str, wallet: &'a Wallet, option: ProviderOption,
) -> OpenIdProvider<'a, Wallet, Processed> {
    let provider = OpenIdProvider::new(uri, wallet, option).expect("should create");
    match provider.process_authorization_request().await {
        Ok(processed) => processed,
        Err(e) => panic!("should process: {e}"),
    }
}

// The form fields of the only request posted to the mock server.
async fn posted_form(server: &MockServer) -> HashMap<String, String> {
    let requests = server.received_requests().await.expect("should record requests");
    let posts = requests.iter().filter(|r| r.method.as_str() == "POST").collect::<Vec<_>>();
    assert_eq!(posts.len(), 1);
    serde_urlencoded::from_bytes(&posts[0].body).expect("should decode form")
}

async fn mount_accept(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/post"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("location", "https://rp.example.com/done")
                .append_header("set-cookie", "session=abc")
                .set_body_string(""),
        )
        .expect(1)
        .mount(server)
        .await;
}

#[tokio::test]
async fn id_token_response() {
    init_tracer();

    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/post"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"redirect_uri": "https://rp.example.com/done"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let wallet = Wallet::new();
    let provider = processed(&request_uri(&server, "id_token", "direct_post"), &wallet).await;
    let result = provider.respond_id_token_response().await.expect("should respond");

    assert_eq!(result.status_code, 200);
    assert_eq!(result.location.as_deref(), Some("https://rp.example.com/done"));
    assert!(result.response_body.is_some());

    let form = posted_form(&server).await;
    assert_eq!(form.get("state").map(String::as_str), Some("s-1"));

    let id_token = decode_jwt::<IdTokenClaims>(&form["id_token"]).expect("should decode");
    let jwk = wallet.public_jwk().await.expect("should have key");
    let thumbprint = jwk.thumbprint_uri().expect("should compute thumbprint");

    assert_eq!(id_token.header.typ.as_deref(), Some("JWT"));
    assert_eq!(id_token.claims.iss, thumbprint);
    assert_eq!(id_token.claims.sub, thumbprint);
    assert_eq!(id_token.claims.aud, format!("{}/post", server.uri()));
    assert_eq!(id_token.claims.nonce.as_deref(), Some("n-1"));
    assert_eq!(id_token.claims.sub_jwk, jwk);
    assert_eq!((id_token.claims.exp - id_token.claims.iat).num_seconds(), 600);
}

#[tokio::test]
async fn sd_jwt_response() {
    init_tracer();

    let server = MockServer::start().await;
    mount_accept(&server).await;

    let wallet = Wallet::new();
    let holder = wallet.public_jwk().await.expect("should have key");
    let sd_jwt = Issuer::new()
        .sd_jwt(&holder, &[("given_name", json!("Alice")), ("family_name", json!("Smith"))])
        .await;
    let credential = SubmissionCredential {
        id: "cred-1".to_string(),
        format: "vc+sd-jwt".to_string(),
        types: vec!["IdentityCredential".to_string()],
        credential: sd_jwt,
        input_descriptor: descriptor("identity", "given_name"),
    };

    let provider = processed(&request_uri(&server, "vp_token", "direct_post"), &wallet).await;
    let (result, shared) = provider.respond_vp_response(&[credential]).await.expect("should respond");

    assert_eq!(result.status_code, 200);
    assert_eq!(result.location.as_deref(), Some("https://rp.example.com/done"));
    assert_eq!(result.cookies, vec!["session=abc".to_string()]);
    assert!(result.response_body.is_none());

    assert_eq!(shared.len(), 1);
    assert_eq!(shared[0].id, "cred-1");
    assert_eq!(Value::Object(shared[0].shared_claims.clone()), json!({"given_name": "Alice"}));

    let form = posted_form(&server).await;
    assert_eq!(form.get("state").map(String::as_str), Some("s-1"));

    // issuer-signed JWT, the one referenced disclosure, and the KB-JWT
    let parts = form["vp_token"].split('~').collect::<Vec<_>>();
    assert_eq!(parts.len(), 3);
    let kb_jwt = decode_jwt::<Value>(parts[2]).expect("should decode");
    assert_eq!(kb_jwt.header.typ.as_deref(), Some("kb+jwt"));
    assert_eq!(kb_jwt.claims["aud"], format!("{}/post", server.uri()));
    assert_eq!(kb_jwt.claims["nonce"], "n-1");

    let submission: PresentationSubmission =
        serde_json::from_str(&form["presentation_submission"]).expect("should deserialize");
    assert_eq!(submission.definition_id, "pd-1");
    assert_eq!(submission.descriptor_map.len(), 1);
    assert_eq!(submission.descriptor_map[0].id, "identity");
    assert_eq!(submission.descriptor_map[0].format, "vc+sd-jwt");
    assert_eq!(submission.descriptor_map[0].path, "$");
    assert!(submission.descriptor_map[0].path_nested.is_none());
}

#[tokio::test]
async fn jwt_vc_responses() {
    init_tracer();

    let server = MockServer::start().await;
    mount_accept(&server).await;

    let issuer = Issuer::new();
    let mut credentials = vec![];
    for (i, name) in ["Alice", "Bob"].iter().enumerate() {
        let mut claims = Map::new();
        claims.insert("given_name".to_string(), json!(name));
        credentials.push(SubmissionCredential {
            id: format!("cred-{i}"),
            format: "jwt_vc_json".to_string(),
            types: vec![],
            credential: issuer.jwt_vc("did:example:holder", claims).await,
            input_descriptor: descriptor(&format!("identity-{i}"), "given_name"),
        });
    }

    let wallet = Wallet::new();
    let provider = processed(&request_uri(&server, "vp_token", "direct_post"), &wallet).await;
    let (_, shared) = provider.respond_vp_response(&credentials).await.expect("should respond");

    assert_eq!(shared.len(), 2);
    assert_eq!(shared[1].shared_claims["given_name"], "Bob");
    assert_eq!(shared[1].shared_claims["id"], "did:example:holder");

    let form = posted_form(&server).await;
    let vp_token: Vec<String> = serde_json::from_str(&form["vp_token"]).expect("should be array");
    assert_eq!(vp_token.len(), 2);

    let vp = decode_jwt::<Value>(&vp_token[0]).expect("should decode");
    assert_eq!(vp.claims["aud"], format!("{}/post", server.uri()));
    assert_eq!(vp.claims["nonce"], "n-1");
    assert_eq!(vp.claims["vp"]["verifiableCredential"][0], credentials[0].credential);

    let submission: PresentationSubmission =
        serde_json::from_str(&form["presentation_submission"]).expect("should deserialize");
    for (i, map) in submission.descriptor_map.iter().enumerate() {
        assert_eq!(map.id, format!("identity-{i}"));
        assert_eq!(map.format, "jwt_vp_json");
        assert_eq!(map.path, format!("$[{i}]"));
        let nested = map.path_nested.as_ref().expect("should be nested");
        assert_eq!(nested.format, "jwt_vc_json");
        assert_eq!(nested.path, format!("$[{i}].vp.verifiableCredential[0]"));
    }
}

#[tokio::test]
async fn jwt_vc_requires_direct_post() {
    init_tracer();

    let server = MockServer::start().await;
    let credential = SubmissionCredential {
        id: "cred-1".to_string(),
        format: "jwt_vc_json".to_string(),
        credential: Issuer::new().jwt_vc("did:example:holder", Map::new()).await,
        input_descriptor: descriptor("identity", "given_name"),
        ..SubmissionCredential::default()
    };

    let wallet = Wallet::new();
    let provider = processed(&request_uri(&server, "vp_token", "fragment"), &wallet).await;
    let err = provider.respond_vp_response(&[credential]).await.expect_err("should reject");

    assert!(matches!(err, Error::UnsupportedResponseMode(_)));
    let requests = server.received_requests().await.expect("should record requests");
    assert!(requests.is_empty());
}

#[tokio::test]
async fn unusable_credentials() {
    init_tracer();

    let server = MockServer::start().await;
    let wallet = Wallet::new();
    let holder = wallet.public_jwk().await.expect("should have key");
    let sd_jwt = Issuer::new().sd_jwt(&holder, &[("family_name", json!("Smith"))]).await;

    let mdoc = SubmissionCredential {
        id: "cred-1".to_string(),
        format: "mso_mdoc".to_string(),
        credential: "o2d2ZXJzaW9u".to_string(),
        input_descriptor: descriptor("identity", "given_name"),
        ..SubmissionCredential::default()
    };
    let provider = processed(&request_uri(&server, "vp_token", "direct_post"), &wallet).await;
    let err = provider.respond_vp_response(&[mdoc]).await.expect_err("should reject");
    assert!(matches!(err, Error::VpFormatsNotSupported(_)));

    // discloses nothing the descriptor asks for
    let unmatched = SubmissionCredential {
        id: "cred-2".to_string(),
        format: "dc+sd-jwt".to_string(),
        credential: sd_jwt,
        input_descriptor: descriptor("identity", "given_name"),
        ..SubmissionCredential::default()
    };
    let provider = processed(&request_uri(&server, "vp_token", "direct_post"), &wallet).await;
    let err = provider.respond_vp_response(&[unmatched]).await.expect_err("should reject");
    assert!(matches!(err, Error::InvalidRequest(_)));
}

#[tokio::test]
async fn undescribed_sd_jwt() {
    init_tracer();

    let server = MockServer::start().await;
    mount_accept(&server).await;

    let wallet = Wallet::new();
    let holder = wallet.public_jwk().await.expect("should have key");
    let sd_jwt = Issuer::new().sd_jwt(&holder, &[("given_name", json!("Alice"))]).await;
    let credential = SubmissionCredential {
        id: "cred-1".to_string(),
        format: "vc+sd-jwt".to_string(),
        credential: sd_jwt,
        ..SubmissionCredential::default()
    };

    let provider = processed(&request_uri(&server, "vp_token", "direct_post"), &wallet).await;
    let (_, shared) = provider.respond_vp_response(&[credential]).await.expect("should respond");
    assert_eq!(Value::Object(shared[0].shared_claims.clone()), json!({"given_name": "Alice"}));

    let form = posted_form(&server).await;
    let submission: PresentationSubmission =
        serde_json::from_str(&form["presentation_submission"]).expect("should deserialize");
    assert_eq!(submission.descriptor_map[0].id, "identity");
}

#[tokio::test]
async fn unrequested_descriptor() {
    init_tracer();

    let server = MockServer::start().await;
    let wallet = Wallet::new();
    let holder = wallet.public_jwk().await.expect("should have key");
    let issuer = Issuer::new();

    // the descriptor's constraints match, but the Verifier never asked for it
    let sd_jwt = SubmissionCredential {
        id: "cred-1".to_string(),
        format: "vc+sd-jwt".to_string(),
        credential: issuer.sd_jwt(&holder, &[("given_name", json!("Alice"))]).await,
        input_descriptor: descriptor("passport", "given_name"),
        ..SubmissionCredential::default()
    };
    let provider = processed(&request_uri(&server, "vp_token", "direct_post"), &wallet).await;
    let err = provider.respond_vp_response(&[sd_jwt]).await.expect_err("should reject");
    assert!(matches!(err, Error::InvalidRequest(_)));

    let mut claims = Map::new();
    claims.insert("given_name".to_string(), json!("Alice"));
    let jwt_vc = SubmissionCredential {
        id: "cred-2".to_string(),
        format: "jwt_vc_json".to_string(),
        credential: issuer.jwt_vc("did:example:holder", claims).await,
        input_descriptor: descriptor("passport", "given_name"),
        ..SubmissionCredential::default()
    };
    let provider = processed(&request_uri(&server, "vp_token", "direct_post"), &wallet).await;
    let err = provider.respond_vp_response(&[jwt_vc]).await.expect_err("should reject");
    assert!(matches!(err, Error::InvalidRequest(_)));

    // an SD-JWT satisfying no requested descriptor
    let unnamed = SubmissionCredential {
        id: "cred-3".to_string(),
        format: "dc+sd-jwt".to_string(),
        credential: issuer.sd_jwt(&holder, &[("family_name", json!("Smith"))]).await,
        ..SubmissionCredential::default()
    };
    let provider = processed(&request_uri(&server, "vp_token", "direct_post"), &wallet).await;
    let err = provider.respond_vp_response(&[unnamed]).await.expect_err("should reject");
    assert!(matches!(err, Error::InvalidRequest(_)));

    let requests = server.received_requests().await.expect("should record requests");
    assert!(requests.is_empty());
}

#[tokio::test]
async fn expiry_out_of_range() {
    init_tracer();

    let server = MockServer::start().await;
    let wallet = Wallet::new();
    let option = ProviderOption { id_token_expires_in: i64::MAX / 1000, ..ProviderOption::default() };

    let uri = request_uri(&server, "id_token", "direct_post");
    let provider = processed_with(&uri, &wallet, option).await;
    let err = provider.respond_id_token_response().await.expect_err("should reject");
    assert!(matches!(err, Error::ServerError(_)));

    let requests = server.received_requests().await.expect("should record requests");
    assert!(requests.is_empty());
}

#[tokio::test]
async fn rejected_response() {
    init_tracer();

    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/post"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({"message": "nonce mismatch"})))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/post"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let wallet = Wallet::new();
    let uri = request_uri(&server, "id_token", "direct_post");

    let provider = processed(&uri, &wallet).await;
    let err = provider.respond_id_token_response().await.expect_err("should reject");
    assert_eq!(err, Error::AccessDenied("nonce mismatch".to_string()));

    let provider = processed(&uri, &wallet).await;
    let err = provider.respond_id_token_response().await.expect_err("should reject");
    assert_eq!(
        err,
        Error::AccessDenied("verifier rejected the response with status 500".to_string())
    );
}

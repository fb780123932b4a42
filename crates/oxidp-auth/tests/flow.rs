//! End-to-end tests driving the HTTP surface: authorization request,
//! login, consent, code exchange, refresh, and userinfo.

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, Response, StatusCode, header};
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use oxidp_auth::account::{Account, AccountStore};
use oxidp_auth::config::{AuthConfig, ResourceServerConfig};
use oxidp_auth::http::{OidcState, router};
use oxidp_auth::oauth::InteractionFlow;
use oxidp_auth::registry::{ClientRegistry, ClientSources};
use oxidp_auth::storage::MemoryStorage;
use oxidp_auth::token::{JwtService, SigningKeyPair, TokenService, TracingObserver};

const BASIC: &str = "Basic ZGV2LXJwOmRldi1zZWNyZXQ="; // dev-rp:dev-secret

fn app() -> Router {
    let registry = ClientRegistry::load(ClientSources {
        env_json: Some(
            r#"[{
                "client_id": "dev-rp",
                "client_secret": "dev-secret",
                "redirect_uris": ["https://app.example/callback"],
                "grant_types": ["authorization_code", "refresh_token"]
            }]"#
            .to_string(),
        ),
        ..ClientSources::default()
    })
    .unwrap();

    let accounts = AccountStore::new(vec![
        Account {
            id: "acct-1".to_string(),
            email: "alice@example.com".to_string(),
            password: "passw0rd".to_string(),
            display_name: "Alice Example".to_string(),
            oauth_authorized: true,
        },
        Account {
            id: "acct-2".to_string(),
            email: "bob@example.com".to_string(),
            password: "hunter2".to_string(),
            display_name: "Bob Example".to_string(),
            oauth_authorized: false,
        },
    ]);

    let config = Arc::new(AuthConfig {
        resources: vec![ResourceServerConfig {
            indicator: "https://api.example.com".to_string(),
            scopes: vec!["read".to_string(), "write".to_string()],
            access_token_ttl: None,
        }],
        ..AuthConfig::default()
    });

    let registry = Arc::new(registry);
    let accounts = Arc::new(accounts);
    let jwt = Arc::new(JwtService::new(
        SigningKeyPair::generate().unwrap(),
        config.issuer.clone(),
    ));
    let storage = Arc::new(MemoryStorage::new());

    let flow = Arc::new(InteractionFlow::new(
        registry.clone(),
        accounts.clone(),
        config.clone(),
        storage.clone(),
        storage.clone(),
        storage.clone(),
    ));
    let tokens = Arc::new(TokenService::new(
        jwt.clone(),
        registry,
        accounts.clone(),
        config.clone(),
        storage.clone(),
        storage.clone(),
        storage.clone(),
        storage.clone(),
        Arc::new(TracingObserver),
    ));

    router(OidcState {
        flow,
        tokens,
        accounts,
        access_tokens: storage,
        jwt,
        config,
    })
}

async fn get(app: &Router, uri: &str) -> Response<Body> {
    app.clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap()
}

async fn post_form(app: &Router, uri: &str, body: &str) -> Response<Body> {
    app.clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap()
}

async fn post_token(app: &Router, body: &str) -> Response<Body> {
    app.clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/token")
                .header(header::AUTHORIZATION, BASIC)
                .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap()
}

fn location(response: &Response<Body>) -> String {
    response
        .headers()
        .get(header::LOCATION)
        .unwrap()
        .to_str()
        .unwrap()
        .to_string()
}

async fn body_string(response: Response<Body>) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

async fn body_json(response: Response<Body>) -> Value {
    serde_json::from_str(&body_string(response).await).unwrap()
}

/// Runs authorize -> login -> consent and returns the authorization code.
async fn authorize(app: &Router, scope_query: &str, extra_query: &str) -> String {
    let uri = format!(
        "/authorize?response_type=code&client_id=dev-rp\
         &redirect_uri=https%3A%2F%2Fapp.example%2Fcallback\
         &scope={scope_query}&state=xyz{extra_query}"
    );
    let response = get(app, &uri).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    let interaction_path = location(&response);
    assert!(interaction_path.starts_with("/interaction/"));

    let response = post_form(
        app,
        &format!("{interaction_path}/login"),
        "email=alice%40example.com&password=passw0rd",
    )
    .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);

    // A covering grant resolves straight from login, otherwise confirm
    let redirect = if location(&response) == interaction_path {
        let response = post_form(app, &format!("{interaction_path}/confirm"), "").await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        location(&response)
    } else {
        location(&response)
    };

    assert!(redirect.starts_with("https://app.example/callback?"));
    let url = url::Url::parse(&redirect).unwrap();
    let code = url
        .query_pairs()
        .find(|(k, _)| k == "code")
        .map(|(_, v)| v.to_string())
        .expect("redirect carries a code");
    assert!(url.query_pairs().any(|(k, v)| k == "state" && v == "xyz"));
    code
}

#[tokio::test]
async fn test_full_flow_without_resource_yields_opaque_token() {
    let app = app();
    let code = authorize(&app, "openid%20profile%20email", "").await;

    let response = post_token(
        &app,
        &format!(
            "grant_type=authorization_code&code={code}\
             &redirect_uri=https%3A%2F%2Fapp.example%2Fcallback"
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;

    assert_eq!(body["token_type"], "Bearer");
    let access_token = body["access_token"].as_str().unwrap();
    // No resource indicator: opaque, not a JWT
    assert_eq!(access_token.split('.').count(), 1);
    // openid was granted, so an ID token rides along
    assert_eq!(body["id_token"].as_str().unwrap().split('.').count(), 3);
    // No offline_access: no refresh token
    assert!(body.get("refresh_token").is_none() || body["refresh_token"].is_null());

    // The opaque token resolves at userinfo
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/userinfo")
                .header(header::AUTHORIZATION, format!("Bearer {access_token}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let claims = body_json(response).await;
    assert_eq!(claims["sub"], "acct-1");
    assert_eq!(claims["email"], "alice@example.com");
}

#[tokio::test]
async fn test_resource_indicator_yields_jwt_and_refresh_rotates() {
    let app = app();
    let code = authorize(
        &app,
        "openid%20offline_access%20read%20write",
        "&resource=https%3A%2F%2Fapi.example.com",
    )
    .await;

    let response = post_token(
        &app,
        &format!(
            "grant_type=authorization_code&code={code}\
             &redirect_uri=https%3A%2F%2Fapp.example%2Fcallback\
             &resource=https%3A%2F%2Fapi.example.com"
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;

    // Resource indicator present: signed JWT narrowed to the resource
    assert_eq!(body["access_token"].as_str().unwrap().split('.').count(), 3);
    assert_eq!(body["scope"], "read write");
    let refresh = body["refresh_token"].as_str().unwrap().to_string();

    // Refresh without the indicator falls back to opaque
    let response = post_token(&app, &format!("grant_type=refresh_token&refresh_token={refresh}")).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["access_token"].as_str().unwrap().split('.').count(), 1);
    let rotated = body["refresh_token"].as_str().unwrap().to_string();
    assert_ne!(rotated, refresh);

    // The consumed token is gone
    let response = post_token(&app, &format!("grant_type=refresh_token&refresh_token={refresh}")).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["error"], "invalid_grant");
}

#[tokio::test]
async fn test_code_is_single_use() {
    let app = app();
    let code = authorize(&app, "openid", "").await;
    let body = format!(
        "grant_type=authorization_code&code={code}\
         &redirect_uri=https%3A%2F%2Fapp.example%2Fcallback"
    );

    let response = post_token(&app, &body).await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = post_token(&app, &body).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["error"], "invalid_grant");
}

#[tokio::test]
async fn test_cancel_redirects_access_denied_without_code() {
    let app = app();
    let response = get(
        &app,
        "/authorize?response_type=code&client_id=dev-rp\
         &redirect_uri=https%3A%2F%2Fapp.example%2Fcallback\
         &scope=openid&state=xyz",
    )
    .await;
    let interaction_path = location(&response);

    post_form(
        &app,
        &format!("{interaction_path}/login"),
        "email=alice%40example.com&password=passw0rd",
    )
    .await;

    let response = post_form(&app, &format!("{interaction_path}/cancel"), "").await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(
        location(&response),
        "https://app.example/callback?error=access_denied&state=xyz"
    );
}

#[tokio::test]
async fn test_unauthorized_account_bounces_to_client() {
    let app = app();
    let response = get(
        &app,
        "/authorize?response_type=code&client_id=dev-rp\
         &redirect_uri=https%3A%2F%2Fapp.example%2Fcallback\
         &scope=openid&state=xyz",
    )
    .await;
    let interaction_path = location(&response);

    let response = post_form(
        &app,
        &format!("{interaction_path}/login"),
        "email=bob%40example.com&password=hunter2",
    )
    .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    let redirect = location(&response);
    assert!(redirect.starts_with("https://app.example/callback?"));
    assert!(redirect.contains("error=unauthorized_client"));
    assert!(redirect.contains("state=xyz"));
    assert!(!redirect.contains("code="));
}

#[tokio::test]
async fn test_failed_login_rerenders_form_with_email() {
    let app = app();
    let response = get(
        &app,
        "/authorize?response_type=code&client_id=dev-rp\
         &redirect_uri=https%3A%2F%2Fapp.example%2Fcallback\
         &scope=openid&state=xyz",
    )
    .await;
    let interaction_path = location(&response);

    let response = post_form(
        &app,
        &format!("{interaction_path}/login"),
        "email=alice%40example.com&password=wrong",
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let html = body_string(response).await;
    assert!(html.contains("Invalid email or password"));
    assert!(html.contains("alice@example.com"));
}

#[tokio::test]
async fn test_unknown_client_stays_local() {
    let app = app();
    let response = get(
        &app,
        "/authorize?response_type=code&client_id=ghost\
         &redirect_uri=https%3A%2F%2Fevil.example%2Fcb\
         &scope=openid&state=xyz",
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(response.headers().get(header::LOCATION).is_none());
}

#[tokio::test]
async fn test_bad_response_type_redirects_to_client() {
    let app = app();
    let response = get(
        &app,
        "/authorize?response_type=token&client_id=dev-rp\
         &redirect_uri=https%3A%2F%2Fapp.example%2Fcallback\
         &scope=openid&state=xyz",
    )
    .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    let redirect = location(&response);
    assert!(redirect.starts_with("https://app.example/callback?"));
    assert!(redirect.contains("error=unsupported_response_type"));
    assert!(redirect.contains("state=xyz"));
}

#[tokio::test]
async fn test_covering_grant_skips_consent_on_second_flow() {
    let app = app();
    let first = authorize(&app, "openid%20profile", "").await;
    assert!(!first.is_empty());

    // Second run with the same scopes never shows the consent page;
    // the authorize() helper resolves straight from the login redirect.
    let uri = "/authorize?response_type=code&client_id=dev-rp\
               &redirect_uri=https%3A%2F%2Fapp.example%2Fcallback\
               &scope=openid%20profile&state=xyz";
    let response = get(&app, uri).await;
    let interaction_path = location(&response);
    let response = post_form(
        &app,
        &format!("{interaction_path}/login"),
        "email=alice%40example.com&password=passw0rd",
    )
    .await;
    let redirect = location(&response);
    assert!(redirect.starts_with("https://app.example/callback?"));
    assert!(redirect.contains("code="));
}

#[tokio::test]
async fn test_wrong_client_secret_is_challenged() {
    let app = app();
    let code = authorize(&app, "openid", "").await;

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/token")
                .header(header::AUTHORIZATION, "Basic ZGV2LXJwOndyb25n") // dev-rp:wrong
                .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(Body::from(format!(
                    "grant_type=authorization_code&code={code}\
                     &redirect_uri=https%3A%2F%2Fapp.example%2Fcallback"
                )))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(
        response
            .headers()
            .get(header::WWW_AUTHENTICATE)
            .unwrap()
            .to_str()
            .unwrap()
            .starts_with("Basic")
    );
    let body = body_json(response).await;
    assert_eq!(body["error"], "invalid_client");
}

#[tokio::test]
async fn test_discovery_and_jwks() {
    let app = app();

    let response = get(&app, "/.well-known/openid-configuration").await;
    assert_eq!(response.status(), StatusCode::OK);
    let doc = body_json(response).await;
    assert_eq!(doc["issuer"], "http://localhost:3000");
    assert_eq!(doc["response_types_supported"][0], "code");
    assert_eq!(doc["code_challenge_methods_supported"][0], "S256");
    assert!(doc["jwks_uri"].as_str().unwrap().ends_with("/jwks"));

    let response = get(&app, "/jwks").await;
    assert_eq!(response.status(), StatusCode::OK);
    let jwks = body_json(response).await;
    assert_eq!(jwks["keys"][0]["kty"], "RSA");
    assert_eq!(jwks["keys"][0]["alg"], "RS256");
    assert_eq!(jwks["keys"][0]["e"], "AQAB");
}

#[tokio::test]
async fn test_userinfo_without_token_is_challenged() {
    let app = app();
    let response = get(&app, "/userinfo").await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(
        response
            .headers()
            .get(header::WWW_AUTHENTICATE)
            .unwrap()
            .to_str()
            .unwrap()
            .starts_with("Bearer")
    );
}

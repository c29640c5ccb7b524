mod common;

use axum::http::StatusCode;
use common::{location, query_pairs, TestApp, ORIGIN};

#[tokio::test]
async fn sign_in_redirects_to_realm_authorization_endpoint() {
    let app = TestApp::spawn().await;

    let response = app.get("/auth/sign-in").await;

    assert_eq!(response.status(), StatusCode::FOUND);
    let location = location(&response);
    assert!(location.starts_with(&format!(
        "{}/auth/realms/marketplace/protocol/openid-connect/auth?",
        app.keycloak.uri()
    )));

    let query = query_pairs(&location);
    assert_eq!(query["client_id"], "dm-app");
    assert_eq!(query["client_secret"], "s3cret");
    assert_eq!(query["response_mode"], "query");
    assert_eq!(query["response_type"], "code");
    assert_eq!(query["scope"], "openid");
    assert_eq!(query["redirect_uri"], format!("{}/auth/callback", ORIGIN));
    assert!(!query["nonce"].is_empty());
    assert!(!query.contains_key("kc_idp_hint"));
}

#[tokio::test]
async fn recognized_provider_hints_are_forwarded() {
    let app = TestApp::spawn().await;

    for provider in ["github", "idir"] {
        let response = app.get(&format!("/auth/sign-in?provider={}", provider)).await;
        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(query_pairs(&location(&response))["kc_idp_hint"], provider);
    }
}

#[tokio::test]
async fn unrecognized_provider_hint_is_omitted() {
    let app = TestApp::spawn().await;

    for provider in ["google", "IDIR", ""] {
        let response = app.get(&format!("/auth/sign-in?provider={}", provider)).await;
        assert_eq!(response.status(), StatusCode::FOUND);
        assert!(!query_pairs(&location(&response)).contains_key("kc_idp_hint"));
    }
}

#[tokio::test]
async fn redirect_target_travels_inside_callback_url() {
    let app = TestApp::spawn().await;

    let response = app
        .get("/auth/sign-in?provider=github&redirectOnSuccess=%2Fopportunities%3Fid%3D7")
        .await;

    let query = query_pairs(&location(&response));
    assert_eq!(
        query["redirect_uri"],
        format!(
            "{}/auth/callback?redirectOnSuccess=%2Fopportunities%3Fid%3D7",
            ORIGIN
        )
    );
}

#[tokio::test]
async fn off_site_redirect_target_is_dropped() {
    let app = TestApp::spawn().await;

    let response = app
        .get("/auth/sign-in?redirectOnSuccess=https%3A%2F%2Fevil.example")
        .await;

    let query = query_pairs(&location(&response));
    assert_eq!(query["redirect_uri"], format!("{}/auth/callback", ORIGIN));
}

#[tokio::test]
async fn same_origin_absolute_redirect_target_is_kept() {
    let app = TestApp::spawn().await;
    let target = format!("{}/opportunities", ORIGIN);

    let response = app
        .get(&format!(
            "/auth/sign-in?redirectOnSuccess={}",
            urlencoding::encode(&target)
        ))
        .await;

    let query = query_pairs(&location(&response));
    assert_eq!(
        query["redirect_uri"],
        format!(
            "{}/auth/callback?redirectOnSuccess={}",
            ORIGIN,
            urlencoding::encode(&target)
        )
    );
}

#[tokio::test]
async fn nonce_is_unique_per_request() {
    let app = TestApp::spawn().await;

    let first = query_pairs(&location(&app.get("/auth/sign-in").await))["nonce"].clone();
    let second = query_pairs(&location(&app.get("/auth/sign-in").await))["nonce"].clone();
    assert_ne!(first, second);
}

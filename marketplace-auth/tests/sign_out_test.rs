mod common;

use axum::http::{header, StatusCode};
use chrono::Utc;
use common::{location, TestApp, LOGOUT_PATH};
use marketplace_auth::models::{NewUser, Session, UserStatus, UserType};
use marketplace_auth::services::Store;
use wiremock::{
    matchers::{body_string_contains, method, path},
    Mock, ResponseTemplate,
};

async fn signed_in(app: &TestApp) -> Session {
    let user = NewUser {
        user_type: UserType::Vendor,
        status: UserStatus::Active,
        name: "Bob".to_string(),
        email: String::new(),
        job_title: String::new(),
        idp_username: "bob@github".to_string(),
    }
    .into_user(Utc::now());
    app.store.insert_user(user.clone()).unwrap();
    app.store
        .create_session(user.id, "refresh-xyz")
        .await
        .unwrap()
}

#[tokio::test]
async fn sign_out_deletes_session_and_revokes_refresh_token() {
    let app = TestApp::spawn().await;
    let session = signed_in(&app).await;
    Mock::given(method("POST"))
        .and(path(LOGOUT_PATH))
        .and(body_string_contains("refresh_token=refresh-xyz"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&app.keycloak)
        .await;

    let response = app
        .get_with_cookie("/auth/sign-out", &format!("sid={}", session.id))
        .await;

    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(location(&response), "/");
    assert!(app.store.sessions().unwrap().is_empty());

    let cookie = response.headers()[header::SET_COOKIE].to_str().unwrap();
    assert!(cookie.starts_with("sid="));
    assert!(cookie.contains("Max-Age=0"));
}

#[tokio::test]
async fn failed_revocation_still_signs_out() {
    let app = TestApp::spawn().await;
    let session = signed_in(&app).await;
    Mock::given(method("POST"))
        .and(path(LOGOUT_PATH))
        .respond_with(ResponseTemplate::new(500))
        .mount(&app.keycloak)
        .await;

    let response = app
        .get_with_cookie("/auth/sign-out", &format!("sid={}", session.id))
        .await;

    assert_eq!(location(&response), "/");
    assert!(app.store.sessions().unwrap().is_empty());
}

#[tokio::test]
async fn sign_out_without_session_just_redirects() {
    let app = TestApp::spawn().await;

    let response = app.get("/auth/sign-out").await;
    assert_eq!(response.status(), StatusCode::FOUND);
    assert_eq!(location(&response), "/");

    let response = app.get_with_cookie("/auth/sign-out", "sid=not-a-uuid").await;
    assert_eq!(location(&response), "/");
    assert!(app.keycloak.received_requests().await.unwrap().is_empty());
}

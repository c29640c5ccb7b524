//! Shared setup for marketplace-auth integration tests.
//!
//! Runs the real router against an in-memory store, a recording notifier
//! and a wiremock stand-in for Keycloak.

#![allow(dead_code)]

use axum::{
    body::Body,
    http::{header, Request, Response},
    Router,
};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use marketplace_auth::{
    build_router,
    config::{
        DatabaseConfig, Environment, KeycloakConfig, MarketplaceConfig, SmtpConfig,
    },
    services::{FederationService, KeycloakClient, MemoryStore, RecordingNotifier},
    AppState,
};
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use tower::util::ServiceExt;
use wiremock::{
    matchers::{method, path},
    Mock, MockServer, ResponseTemplate,
};

pub const ORIGIN: &str = "http://localhost:3000";
pub const REALM: &str = "marketplace";
pub const TOKEN_PATH: &str = "/auth/realms/marketplace/protocol/openid-connect/token";
pub const LOGOUT_PATH: &str = "/auth/realms/marketplace/protocol/openid-connect/logout";

pub struct TestApp {
    pub router: Router,
    pub store: Arc<MemoryStore>,
    pub notifier: Arc<RecordingNotifier>,
    pub keycloak: MockServer,
    pub config: MarketplaceConfig,
}

pub fn test_config(keycloak_url: &str, token_timeout_seconds: u64) -> MarketplaceConfig {
    MarketplaceConfig {
        common: service_core::config::Config::default(),
        environment: Environment::Dev,
        service_name: "marketplace-auth-test".to_string(),
        log_level: "debug".to_string(),
        otlp_endpoint: None,
        origin: ORIGIN.to_string(),
        keycloak: KeycloakConfig {
            url: keycloak_url.to_string(),
            realm: REALM.to_string(),
            client_id: "dm-app".to_string(),
            client_secret: "s3cret".to_string(),
            token_timeout_seconds,
        },
        database: DatabaseConfig {
            url: "postgres://unused".to_string(),
            max_connections: 1,
            min_connections: 1,
        },
        smtp: SmtpConfig {
            enabled: false,
            host: "localhost".to_string(),
            port: 587,
            user: String::new(),
            password: String::new(),
            from_email: "noreply@marketplace.local".to_string(),
            from_name: "Digital Marketplace".to_string(),
        },
    }
}

impl TestApp {
    pub async fn spawn() -> Self {
        Self::spawn_with_timeout(5).await
    }

    pub async fn spawn_with_timeout(token_timeout_seconds: u64) -> Self {
        let keycloak = MockServer::start().await;
        let config = test_config(&keycloak.uri(), token_timeout_seconds);

        let store = Arc::new(MemoryStore::new());
        let notifier = Arc::new(RecordingNotifier::new());
        let client = KeycloakClient::new(&config.keycloak, config.origin())
            .expect("Failed to build Keycloak client");
        let federation = FederationService::new(client, store.clone(), notifier.clone());

        let router = build_router(AppState {
            config: config.clone(),
            store: store.clone(),
            federation,
        });

        Self {
            router,
            store,
            notifier,
            keycloak,
            config,
        }
    }

    pub async fn get(&self, uri: &str) -> Response<Body> {
        self.request(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
    }

    pub async fn get_with_cookie(&self, uri: &str, cookie: &str) -> Response<Body> {
        self.request(
            Request::builder()
                .uri(uri)
                .header(header::COOKIE, cookie)
                .body(Body::empty())
                .unwrap(),
        )
        .await
    }

    async fn request(&self, request: Request<Body>) -> Response<Body> {
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("Router failed to respond")
    }

    /// Keycloak answers the code exchange with a token set for `username`.
    pub async fn mock_token_success(&self, username: &str, email: Option<&str>) {
        Mock::given(method("POST"))
            .and(path(TOKEN_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(token_body(username, email)))
            .mount(&self.keycloak)
            .await;
    }

    pub async fn mock_token_status(&self, status: u16) {
        Mock::given(method("POST"))
            .and(path(TOKEN_PATH))
            .respond_with(
                ResponseTemplate::new(status).set_body_json(token_body("alice@idir", None)),
            )
            .mount(&self.keycloak)
            .await;
    }

    /// Form fields of every request Keycloak received on `endpoint`.
    pub async fn received_forms(&self, endpoint: &str) -> Vec<HashMap<String, String>> {
        self.keycloak
            .received_requests()
            .await
            .unwrap_or_default()
            .into_iter()
            .filter(|r| r.url.path() == endpoint)
            .map(|r| serde_urlencoded::from_bytes(&r.body).expect("Form body"))
            .collect()
    }
}

pub fn id_token(claims: serde_json::Value) -> String {
    format!(
        "eyJhbGciOiJSUzI1NiIsInR5cCI6IkpXVCJ9.{}.c2lnbmF0dXJl",
        URL_SAFE_NO_PAD.encode(claims.to_string())
    )
}

pub fn token_body(username: &str, email: Option<&str>) -> serde_json::Value {
    let mut claims = json!({
        "sub": "f1d2c3b4",
        "preferred_username": username,
        "name": "Test User",
    });
    if let Some(email) = email {
        claims["email"] = json!(email);
    }

    json!({
        "access_token": "access-abc",
        "refresh_token": "refresh-abc",
        "id_token": id_token(claims),
        "token_type": "Bearer",
        "expires_in": 300
    })
}

pub fn location(response: &Response<Body>) -> String {
    response.headers()[header::LOCATION]
        .to_str()
        .expect("Location header")
        .to_string()
}

pub fn query_pairs(url: &str) -> HashMap<String, String> {
    reqwest::Url::parse(url)
        .expect("Absolute URL")
        .query_pairs()
        .into_owned()
        .collect()
}

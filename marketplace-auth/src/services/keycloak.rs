//! Keycloak OpenID Connect client: authorization URLs, code exchange and
//! refresh token revocation.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use rand::Rng;
use serde::Serialize;
use service_core::error::AppError;
use service_core::observability::TracedClientExt;
use service_core::utils::parse_json_safely;
use std::time::Duration;

use crate::config::KeycloakConfig;
use crate::models::IdentityProvider;
use crate::services::claims::TokenSet;
use crate::services::error::FederationError;

pub const CALLBACK_PATH: &str = "/auth/callback";
pub const REDIRECT_PARAM: &str = "redirectOnSuccess";

#[derive(Serialize)]
struct AuthQuery<'a> {
    client_id: &'a str,
    client_secret: &'a str,
    redirect_uri: &'a str,
    response_mode: &'static str,
    response_type: &'static str,
    scope: &'static str,
    nonce: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    kc_idp_hint: Option<&'static str>,
}

#[derive(Serialize)]
struct TokenRequest<'a> {
    code: &'a str,
    grant_type: &'static str,
    client_id: &'a str,
    client_secret: &'a str,
    scope: &'static str,
    redirect_uri: &'a str,
}

#[derive(Serialize)]
struct LogoutRequest<'a> {
    client_id: &'a str,
    client_secret: &'a str,
    refresh_token: &'a str,
}

#[derive(Clone)]
pub struct KeycloakClient {
    http: reqwest::Client,
    base_url: String,
    realm: String,
    client_id: String,
    client_secret: String,
    origin: String,
}

impl KeycloakClient {
    pub fn new(config: &KeycloakConfig, origin: &str) -> Result<Self, AppError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.token_timeout_seconds))
            .build()
            .map_err(|e| {
                AppError::ConfigError(anyhow::anyhow!("Failed to build Keycloak HTTP client: {}", e))
            })?;

        Ok(Self {
            http,
            base_url: config.url.trim_end_matches('/').to_string(),
            realm: config.realm.clone(),
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
            origin: origin.trim_end_matches('/').to_string(),
        })
    }

    pub fn origin(&self) -> &str {
        &self.origin
    }

    /// `{url}/auth/realms/{realm}/protocol/openid-connect`
    pub fn realm_url(&self) -> String {
        format!(
            "{}/auth/realms/{}/protocol/openid-connect",
            self.base_url, self.realm
        )
    }

    /// Callback URL registered with Keycloak.
    ///
    /// Both the authorization request and the token request must present
    /// the same value, so both are built here.
    pub fn callback_url(&self, redirect_on_success: Option<&str>) -> String {
        match redirect_on_success {
            Some(target) => format!(
                "{}{}?{}={}",
                self.origin,
                CALLBACK_PATH,
                REDIRECT_PARAM,
                urlencoding::encode(target)
            ),
            None => format!("{}{}", self.origin, CALLBACK_PATH),
        }
    }

    pub fn authorization_url(
        &self,
        hint: Option<IdentityProvider>,
        redirect_on_success: Option<&str>,
    ) -> Result<String, FederationError> {
        let redirect_uri = self.callback_url(redirect_on_success);
        let nonce = generate_nonce();
        let query = AuthQuery {
            client_id: &self.client_id,
            client_secret: &self.client_secret,
            redirect_uri: &redirect_uri,
            response_mode: "query",
            response_type: "code",
            scope: "openid",
            nonce: &nonce,
            kc_idp_hint: hint.map(|p| p.as_str()),
        };

        let query = serde_urlencoded::to_string(&query).map_err(|e| {
            FederationError::Configuration(format!("Failed to encode authorization query: {}", e))
        })?;

        Ok(format!("{}/auth?{}", self.realm_url(), query))
    }

    /// Exchange an authorization code for tokens. Anything other than a
    /// 200 with a JSON body is a failure; there are no retries.
    #[tracing::instrument(skip_all)]
    pub async fn exchange_code(
        &self,
        code: &str,
        redirect_on_success: Option<&str>,
    ) -> Result<TokenSet, FederationError> {
        let redirect_uri = self.callback_url(redirect_on_success);
        let request = TokenRequest {
            code,
            grant_type: "authorization_code",
            client_id: &self.client_id,
            client_secret: &self.client_secret,
            scope: "openid",
            redirect_uri: &redirect_uri,
        };

        let response = self
            .http
            .traced_post(&format!("{}/token", self.realm_url()))
            .form(&request)
            .send()
            .await
            .map_err(|e| FederationError::TokenExchange(format!("Token request failed: {}", e)))?;

        let status = response.status();
        if status != reqwest::StatusCode::OK {
            return Err(FederationError::TokenExchange(format!(
                "Token endpoint returned {}",
                status
            )));
        }

        let body = response.text().await.map_err(|e| {
            FederationError::TokenExchange(format!("Failed to read token response: {}", e))
        })?;

        let value = parse_json_safely(&body).ok_or_else(|| {
            FederationError::TokenExchange("Token response is not valid JSON".to_string())
        })?;

        serde_json::from_value(value).map_err(|e| {
            FederationError::TokenExchange(format!("Unexpected token response shape: {}", e))
        })
    }

    /// Revoke a refresh token at the end-session endpoint.
    pub async fn revoke(&self, refresh_token: &str) -> Result<(), FederationError> {
        let request = LogoutRequest {
            client_id: &self.client_id,
            client_secret: &self.client_secret,
            refresh_token,
        };

        let response = self
            .http
            .traced_post(&format!("{}/logout", self.realm_url()))
            .form(&request)
            .send()
            .await
            .map_err(|e| FederationError::TokenExchange(format!("Logout request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(FederationError::TokenExchange(format!(
                "Logout endpoint returned {}",
                response.status()
            )));
        }
        Ok(())
    }
}

fn generate_nonce() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}
